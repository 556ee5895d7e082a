//! Progress bar helpers for long-running calls

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Attempt counter for a bounded poll
pub fn create_attempt_bar(max_attempts: u64, message: &str) -> ProgressBar {
    let bar = ProgressBar::new(max_attempts);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.cyan} {msg} [{bar:30.cyan/blue}] attempt {pos}/{len} ({elapsed})")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓▒░ ");
    bar.set_style(style);
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

pub fn finish_success(bar: &ProgressBar, message: &str) {
    finish_with_prefix(bar, "{prefix:.green} {msg}", "✓", message);
}

pub fn finish_error(bar: &ProgressBar, message: &str) {
    finish_with_prefix(bar, "{prefix:.red} {msg}", "✗", message);
}

fn finish_with_prefix(bar: &ProgressBar, template: &str, prefix: &'static str, message: &str) {
    bar.set_style(
        ProgressStyle::default_spinner()
            .template(template)
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.set_prefix(prefix);
    bar.finish_with_message(message.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempt_bar_finishes_successfully() {
        let bar = create_attempt_bar(5, "Provisioning");
        assert!(!bar.is_finished());
        finish_success(&bar, "Ready");
        assert!(bar.is_finished());
    }

    #[test]
    fn test_attempt_bar() {
        let bar = create_attempt_bar(60, "Provisioning");
        assert_eq!(bar.length(), Some(60));
        bar.inc(3);
        assert_eq!(bar.position(), 3);
        finish_error(&bar, "Timed out");
        assert!(bar.is_finished());
    }
}
