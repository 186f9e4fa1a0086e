use indicatif::{ProgressBar, ProgressStyle};

/// Displays a progress bar over all the trials of a run so the user can see how many are left.
pub struct TrialProgress {
    bar: Option<ProgressBar>,
}

impl TrialProgress {
    pub fn start(total_trials: usize, enabled: bool) -> Self {
        if !enabled {
            return Self { bar: None };
        }

        let bar = ProgressBar::new(total_trials as u64);
        match ProgressStyle::with_template(
            "{spinner:.green} [{wide_bar:.cyan/blue}] {pos}/{len} trials [{elapsed_precise}] {msg}",
        ) {
            Ok(style) => bar.set_style(style.progress_chars("#>-")),
            Err(e) => log::warn!("Failed to set progress style: {e}"),
        }

        Self { bar: Some(bar) }
    }

    pub fn set_message(&self, message: String) {
        if let Some(bar) = &self.bar {
            bar.set_message(message);
        }
    }

    pub fn trial_done(&self) {
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
    }

    /// Logging while the bar is drawn would garble the terminal, so the bar is cleared on any exit.
    pub fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}

impl Drop for TrialProgress {
    fn drop(&mut self) {
        self.finish();
    }
}
