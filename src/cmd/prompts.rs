//! Interactive prompts and status lines

use colored::Colorize;
use dialoguer::{Confirm, Input, Select, theme::ColorfulTheme};
use securepulse::error::Result;

/// Prompt for yes/no confirmation with a default value
pub fn confirm(message: &str, default: bool) -> Result<bool> {
    let result = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(message)
        .default(default)
        .interact()?;
    Ok(result)
}

/// Prompt for text that may be left blank
pub fn input_optional(message: &str, initial: Option<&str>) -> Result<Option<String>> {
    let theme = ColorfulTheme::default();
    let result = optional_text_prompt(&theme, message, initial).interact_text()?;
    let result = result.trim();
    Ok((!result.is_empty()).then(|| result.to_string()))
}

fn optional_text_prompt<'a>(
    theme: &'a ColorfulTheme,
    message: &str,
    initial: Option<&str>,
) -> Input<'a, String> {
    let mut prompt = Input::<String>::with_theme(theme)
        .with_prompt(message)
        .allow_empty(true);

    if let Some(initial) = initial {
        prompt = prompt.with_initial_text(initial);
    }

    prompt
}

/// Prompt for selection from a list of options
pub fn select<T: ToString>(message: &str, options: &[T], default: usize) -> Result<usize> {
    let items: Vec<String> = options.iter().map(|o| o.to_string()).collect();
    let result = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(message)
        .items(&items)
        .default(default)
        .interact()?;
    Ok(result)
}

pub fn section_header(title: &str) {
    println!();
    println!("{}", "─".repeat(60).dimmed());
    println!("{}", title.cyan().bold());
    println!("{}", "─".repeat(60).dimmed());
}

/// Aligned `label: value` line
pub fn field(label: &str, value: &str) {
    println!("  {:<16} {}", format!("{}:", label).dimmed(), value);
}

pub fn success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

pub fn info(message: &str) {
    println!("{} {}", "→".cyan(), message);
}

pub fn warning(message: &str) {
    println!("{} {}", "!".yellow().bold(), message);
}

pub fn error(message: &str) {
    println!("{} {}", "✗".red().bold(), message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_helpers() {
        // Just ensure they don't panic
        section_header("Test Section");
        field("Tenant", "t-123");
        success("ok");
        warning("careful");
    }

    #[test]
    fn test_optional_text_prompt_builds_with_initial_text() {
        let theme = ColorfulTheme::default();
        // Building must not need a terminal; only interaction does
        let _blank = optional_text_prompt(&theme, "Company (optional)", None);
        let _filled = optional_text_prompt(&theme, "Company (optional)", Some("Contoso"));
    }
}
