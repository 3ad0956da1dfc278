use indicatif::{ProgressBar, ProgressStyle};

/// Spinner shown only when a human is watching stderr
pub(crate) fn progress_spinner(template: &str) -> ProgressBar {
    if console::user_attended_stderr() {
        ProgressBar::new_spinner().with_style(
            ProgressStyle::with_template(template).expect("style template is valid"),
        )
    } else {
        ProgressBar::hidden()
    }
}

/// Bounded progress bar, hidden when stderr is not a terminal
pub(crate) fn progress_bar(len: u64, template: &str) -> ProgressBar {
    if console::user_attended_stderr() {
        ProgressBar::new(len).with_style(
            ProgressStyle::with_template(template).expect("style template is valid"),
        )
    } else {
        ProgressBar::hidden()
    }
}
