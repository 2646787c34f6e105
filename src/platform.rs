//! Platform detection.

use crate::error::{ShellError, ShellResult};

pub fn is_mac() -> bool {
    cfg!(target_os = "macos")
}

/// Fails on platforms the shell has never been run on.
pub fn check_supported() -> ShellResult<()> {
    check_os(std::env::consts::OS)
}

pub fn check_os(os: &str) -> ShellResult<()> {
    match os {
        "linux" | "windows" | "macos" => Ok(()),
        other => Err(ShellError::UnsupportedPlatform(other.to_string())),
    }
}
