//! Package manager helpers (apt-get assumed).

use crate::capture;
use crate::error::{Error, Result};
use crate::session::Session;
use crate::utils::shell;
use serde::Serialize;

const INSTALLED_STATUS: &str = "install ok installed";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallReport {
    pub host: String,
    pub installed: Vec<String>,
    pub already_present: Vec<String>,
}

/// Refresh the package manager's package lists.
pub fn update_package_lists(session: &Session) -> Result<()> {
    session.sudo("apt-get update").require_success()?;
    Ok(())
}

/// Whether the package manager reports a package as installed.
pub fn is_installed(session: &Session, package: &str) -> bool {
    let lines = capture::run_and_get_stdout(
        session,
        &format!("dpkg -s {}", shell::quote_arg(package)),
        false,
    );
    status_is_installed(&lines)
}

/// Install the packages that are not already present.
pub fn install_missing(session: &Session, packages: &[String]) -> Result<InstallReport> {
    let mut missing = Vec::new();
    let mut already_present = Vec::new();

    for package in packages {
        if is_installed(session, package) {
            already_present.push(package.clone());
        } else {
            missing.push(package.clone());
        }
    }

    if !missing.is_empty() {
        log_status!("packages", "Installing {} on {}", missing.join(","), session.label());
        let quoted: Vec<String> = missing.iter().map(|p| shell::quote_arg(p)).collect();
        session
            .sudo(&format!("apt-get install -y {}", quoted.join(" ")))
            .require_success()
            .map_err(|e| {
                Error::provision_failed(format!(
                    "Package install failed on '{}': {}",
                    session.label(),
                    e
                ))
            })?;
    }

    Ok(InstallReport {
        host: session.label().to_string(),
        installed: missing,
        already_present,
    })
}

/// True only when a `Status: ` line says exactly "install ok installed".
fn status_is_installed(lines: &[String]) -> bool {
    const STATUS_PREFIX: &str = "Status: ";
    for line in lines {
        if let Some(status) = line.strip_prefix(STATUS_PREFIX) {
            return status.trim() == INSTALLED_STATUS;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn installed_status_matches_exactly() {
        let output = lines(&[
            "Package: vim",
            "Status: install ok installed",
            "Priority: optional",
        ]);
        assert!(status_is_installed(&output));
    }

    #[test]
    fn deinstalled_status_is_not_installed() {
        let output = lines(&["Package: vim", "Status: deinstall ok config-files"]);
        assert!(!status_is_installed(&output));
    }

    #[test]
    fn missing_status_line_is_not_installed() {
        let output = lines(&["dpkg-query: package 'vim' is not installed"]);
        assert!(!status_is_installed(&output));
    }

    #[test]
    fn first_status_line_wins() {
        let output = lines(&["Status: half-configured", "Status: install ok installed"]);
        assert!(!status_is_installed(&output));
    }
}
