//! Launch at login.
//!
//! Linux uses an XDG autostart desktop entry, macOS a LaunchAgent and Windows
//! the `Run` registry key. The minimized variant passes `--minimized` so the
//! window stays hidden in the tray until opened.

use thiserror::Error;

use crate::settings::Settings;

pub const MINIMIZED_ARG: &str = "--minimized";

#[derive(Error, Debug)]
pub enum AutostartError {
    #[error("could not determine {0}")]
    Location(&'static str),

    #[error("failed to update autostart entry: {0}")]
    Io(#[from] std::io::Error),
}

/// Arguments the autostart entry launches the shell with.
pub fn launch_args(minimized: bool) -> Vec<&'static str> {
    if minimized {
        vec!["run", MINIMIZED_ARG]
    } else {
        vec!["run"]
    }
}

fn exe_path() -> Result<String, AutostartError> {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.to_str().map(String::from))
        .ok_or(AutostartError::Location("executable path"))
}

/// XDG desktop entry launching `exe`.
pub fn desktop_entry(exe: &str, minimized: bool) -> String {
    format!(
        r#"[Desktop Entry]
Type=Application
Name=ttth
Comment=Messaging services in one window
Exec="{}" {}
Icon=ttth
Terminal=false
Categories=Network;InstantMessaging;
X-GNOME-Autostart-enabled=true
"#,
        exe,
        launch_args(minimized).join(" ")
    )
}

/// LaunchAgent property list running `program` with `args`.
pub fn launch_agent_plist(label: &str, program: &str, args: &[&str]) -> String {
    let mut arguments = format!("      <string>{program}</string>\n");
    for arg in args {
        arguments.push_str(&format!("      <string>{arg}</string>\n"));
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>Label</key>
    <string>{label}</string>
    <key>ProgramArguments</key>
    <array>
{arguments}    </array>
    <key>RunAtLoad</key>
    <true/>
    <key>KeepAlive</key>
    <false/>
    <key>ProcessType</key>
    <string>Interactive</string>
</dict>
</plist>
"#
    )
}

#[cfg(target_os = "linux")]
mod linux {
    use super::{desktop_entry, exe_path, AutostartError};
    use std::fs;
    use std::path::PathBuf;

    fn desktop_file_path() -> Result<PathBuf, AutostartError> {
        dirs::config_dir()
            .map(|c| c.join("autostart").join("ttth.desktop"))
            .ok_or(AutostartError::Location("autostart directory"))
    }

    pub fn is_enabled() -> bool {
        desktop_file_path().is_ok_and(|p| p.exists())
    }

    pub fn enable(minimized: bool) -> Result<(), AutostartError> {
        let path = desktop_file_path()?;
        let exe = exe_path()?;

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&path, desktop_entry(&exe, minimized))?;

        tracing::info!(path = %path.display(), minimized, "Autostart enabled via XDG autostart");
        Ok(())
    }

    pub fn disable() -> Result<(), AutostartError> {
        let path = desktop_file_path()?;
        if path.exists() {
            fs::remove_file(&path)?;
            tracing::info!("Autostart disabled");
        }
        Ok(())
    }
}

#[cfg(target_os = "macos")]
mod macos {
    use super::{exe_path, launch_agent_plist, launch_args, AutostartError};
    use std::fs;
    use std::path::PathBuf;
    use std::process::Command;

    const LAUNCHAGENT_LABEL: &str = "io.github.ttth";

    fn plist_path() -> Result<PathBuf, AutostartError> {
        dirs::home_dir()
            .map(|h| {
                h.join("Library/LaunchAgents")
                    .join(format!("{LAUNCHAGENT_LABEL}.plist"))
            })
            .ok_or(AutostartError::Location("LaunchAgents directory"))
    }

    pub fn is_enabled() -> bool {
        plist_path().is_ok_and(|p| p.exists())
    }

    pub fn enable(minimized: bool) -> Result<(), AutostartError> {
        let path = plist_path()?;
        let exe = exe_path()?;

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(
            &path,
            launch_agent_plist(LAUNCHAGENT_LABEL, &exe, &launch_args(minimized)),
        )?;

        if let Some(path) = path.to_str() {
            let _ = Command::new("launchctl").args(["load", "-w", path]).output();
        }

        tracing::info!(minimized, "Autostart enabled via LaunchAgent");
        Ok(())
    }

    pub fn disable() -> Result<(), AutostartError> {
        let path = plist_path()?;
        if path.exists() {
            if let Some(path) = path.to_str() {
                let _ = Command::new("launchctl").args(["unload", "-w", path]).output();
            }
            fs::remove_file(&path)?;
            tracing::info!("Autostart disabled");
        }
        Ok(())
    }
}

#[cfg(target_os = "windows")]
mod windows {
    use super::{exe_path, launch_args, AutostartError};
    use winreg::enums::{HKEY_CURRENT_USER, KEY_READ, KEY_WRITE};
    use winreg::RegKey;

    const RUN_KEY: &str = r"Software\Microsoft\Windows\CurrentVersion\Run";
    const VALUE_NAME: &str = "ttth";

    pub fn is_enabled() -> bool {
        let hkcu = RegKey::predef(HKEY_CURRENT_USER);
        let Ok(run_key) = hkcu.open_subkey_with_flags(RUN_KEY, KEY_READ) else {
            return false;
        };
        run_key.get_value::<String, _>(VALUE_NAME).is_ok()
    }

    pub fn enable(minimized: bool) -> Result<(), AutostartError> {
        let command = format!("\"{}\" {}", exe_path()?, launch_args(minimized).join(" "));

        let hkcu = RegKey::predef(HKEY_CURRENT_USER);
        let (run_key, _) = hkcu.create_subkey(RUN_KEY)?;
        run_key.set_value(VALUE_NAME, &command)?;

        tracing::info!(minimized, "Autostart enabled via Registry");
        Ok(())
    }

    pub fn disable() -> Result<(), AutostartError> {
        let hkcu = RegKey::predef(HKEY_CURRENT_USER);
        let Ok(run_key) = hkcu.open_subkey_with_flags(RUN_KEY, KEY_WRITE) else {
            return Ok(());
        };
        // already gone is fine
        let _ = run_key.delete_value(VALUE_NAME);

        tracing::info!("Autostart disabled");
        Ok(())
    }
}

#[cfg(target_os = "linux")]
pub use linux::{disable, enable, is_enabled};

#[cfg(target_os = "macos")]
pub use macos::{disable, enable, is_enabled};

#[cfg(target_os = "windows")]
pub use windows::{disable, enable, is_enabled};

/// Make the OS entry match the persisted settings.
pub fn apply(settings: &Settings) -> Result<(), AutostartError> {
    if settings.autostart {
        enable(settings.autostart_minimized)
    } else {
        disable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_args() {
        assert_eq!(launch_args(false), vec!["run"]);
        assert_eq!(launch_args(true), vec!["run", "--minimized"]);
    }

    #[test]
    fn test_desktop_entry_exec_line() {
        let entry = desktop_entry("/usr/bin/ttth", true);
        assert!(entry.contains("Exec=\"/usr/bin/ttth\" run --minimized\n"));
        assert!(entry.starts_with("[Desktop Entry]"));
    }

    #[test]
    fn test_launch_agent_lists_every_argument() {
        let plist = launch_agent_plist("io.github.ttth", "/Applications/ttth", &["run"]);
        assert!(plist.contains("<string>/Applications/ttth</string>"));
        assert!(plist.contains("<string>run</string>"));
        assert!(plist.contains("<string>io.github.ttth</string>"));
    }
}
