mod error;
mod shutdown;

pub mod prelude {
    pub use crate::error::BenchError;
    pub use crate::shutdown::{ShutdownHandle, ShutdownListener, ShutdownSignalError};
}
