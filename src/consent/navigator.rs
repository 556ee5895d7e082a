use super::{PopupGeometry, ScreenSize};
use crate::error::{Result, SecurePulseError};
use colored::Colorize;
use std::process::Command;

/// Where the consent page gets opened
pub trait Navigator {
    /// Replace the current browsing context with `url`
    fn navigate(&self, url: &str) -> Result<()>;

    /// Open `url` in a named secondary window
    fn open_popup(&self, url: &str, name: &str, geometry: &PopupGeometry) -> Result<()>;

    fn screen_size(&self) -> ScreenSize {
        ScreenSize::default()
    }
}

/// Hands the URL to the platform's default browser
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBrowser;

impl SystemBrowser {
    fn open(url: &str) -> Result<()> {
        let mut command = opener_command(url);
        let status = command.status().map_err(|e| {
            SecurePulseError::NavigationError(format!("failed to launch browser: {}", e))
        })?;

        if !status.success() {
            return Err(SecurePulseError::NavigationError(format!(
                "browser launcher exited with {}",
                status
            )));
        }

        Ok(())
    }
}

#[cfg(target_os = "macos")]
fn opener_command(url: &str) -> Command {
    let mut command = Command::new("open");
    command.arg(url);
    command
}

#[cfg(target_os = "windows")]
fn opener_command(url: &str) -> Command {
    let mut command = Command::new("cmd");
    command.args(["/C", "start", ""]).arg(url);
    command
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn opener_command(url: &str) -> Command {
    let mut command = Command::new("xdg-open");
    command.arg(url);
    command
}

impl Navigator for SystemBrowser {
    fn navigate(&self, url: &str) -> Result<()> {
        Self::open(url)
    }

    fn open_popup(&self, url: &str, name: &str, geometry: &PopupGeometry) -> Result<()> {
        // Desktop browsers opened from a terminal ignore window geometry
        tracing::debug!("Popup '{}' requested with {}", name, geometry.features());
        Self::open(url)
    }
}

/// Prints the consent URL for the user to open by hand
#[derive(Debug, Default, Clone, Copy)]
pub struct PrintNavigator;

impl Navigator for PrintNavigator {
    fn navigate(&self, url: &str) -> Result<()> {
        println!("\n{} Open this URL to grant admin consent:", "→".cyan());
        println!("  {}\n", url.underline());
        Ok(())
    }

    fn open_popup(&self, url: &str, _name: &str, geometry: &PopupGeometry) -> Result<()> {
        println!(
            "\n{} Open this URL in a {}x{} window to grant admin consent:",
            "→".cyan(),
            geometry.width,
            geometry.height
        );
        println!("  {}\n", url.underline());
        Ok(())
    }
}
