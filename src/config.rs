use configparser::ini::Ini;
use std::{env, path::Path, path::PathBuf, time::Duration};

/// Environment variable that relocates the whole configuration directory.
pub const CONFIG_DIR_ENV: &str = "TTTH_CONFIG_DIR";

/// Interval between two unread-count polls of a service view.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5000);

/// Polling faster than this hammers the embedded pages for no benefit.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Desktop Chrome user agent; several services refuse unknown embedded browsers.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/71.0.3578.98 Safari/537.36";

const GENERAL_SECTION: &str = "General";

/// Directory holding every file ttth writes.
pub fn config_dir_path() -> PathBuf {
    if let Ok(dir) = env::var(CONFIG_DIR_ENV) {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }

    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ttth")
}

/// One JSON file per configured service lives here.
pub fn services_dir(base: &Path) -> PathBuf {
    base.join("services")
}

pub fn settings_file(base: &Path) -> PathBuf {
    base.join("settings.ini")
}

pub fn log_dir(base: &Path) -> PathBuf {
    base.join("logs")
}

/// Runtime tuning read from `ttth.ini`.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub config_dir: PathBuf,
    pub poll_interval: Duration,
    pub log_level: String,
    pub user_agent: String,
}

impl AppConfig {
    pub fn with_dir(config_dir: PathBuf) -> Self {
        AppConfig {
            config_dir,
            poll_interval: DEFAULT_POLL_INTERVAL,
            log_level: "info".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    pub fn services_dir(&self) -> PathBuf {
        services_dir(&self.config_dir)
    }

    pub fn settings_file(&self) -> PathBuf {
        settings_file(&self.config_dir)
    }

    pub fn log_dir(&self) -> PathBuf {
        log_dir(&self.config_dir)
    }
}

/// Load `ttth.ini` from the configuration directory.
///
/// A missing file yields the defaults; unreadable or out-of-range values are
/// logged and replaced by their default so a typo never keeps the shell from
/// starting.
pub fn load_config() -> AppConfig {
    load_config_from(config_dir_path())
}

pub fn load_config_from(config_dir: PathBuf) -> AppConfig {
    let mut cfg = AppConfig::with_dir(config_dir);
    let path = cfg.config_dir.join("ttth.ini");

    if !path.exists() {
        tracing::debug!(path = %path.display(), "No ttth.ini found, using defaults");
        return cfg;
    }

    let mut ini = Ini::new();
    if let Err(e) = ini.load(&path) {
        tracing::warn!("Failed to load {}: {}", path.display(), e);
        return cfg;
    }

    match ini.getuint(GENERAL_SECTION, "pollIntervalMs") {
        Ok(Some(ms)) => {
            let interval = Duration::from_millis(ms);
            if interval < MIN_POLL_INTERVAL {
                tracing::warn!(
                    poll_interval_ms = ms,
                    "Poll interval below {}ms, clamping",
                    MIN_POLL_INTERVAL.as_millis()
                );
                cfg.poll_interval = MIN_POLL_INTERVAL;
            } else {
                cfg.poll_interval = interval;
            }
        }
        Ok(None) => {}
        Err(e) => tracing::warn!("Invalid pollIntervalMs: {}", e),
    }

    if let Some(level) = ini.get(GENERAL_SECTION, "logLevel").filter(|s| !s.is_empty()) {
        cfg.log_level = level;
    }

    if let Some(ua) = ini.get(GENERAL_SECTION, "userAgent").filter(|s| !s.is_empty()) {
        cfg.user_agent = ua;
    }

    cfg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(dir.path().to_path_buf());

        assert_eq!(cfg.poll_interval, DEFAULT_POLL_INTERVAL);
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.user_agent, DEFAULT_USER_AGENT);
    }

    #[test]
    fn test_values_are_read_and_clamped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("ttth.ini"),
            "[General]\npollIntervalMs = 200\nlogLevel = debug\n",
        )
        .unwrap();

        let cfg = load_config_from(dir.path().to_path_buf());
        assert_eq!(cfg.poll_interval, MIN_POLL_INTERVAL);
        assert_eq!(cfg.log_level, "debug");
    }

    #[test]
    fn test_paths_hang_off_config_dir() {
        let cfg = AppConfig::with_dir(PathBuf::from("/base"));
        assert_eq!(cfg.services_dir(), PathBuf::from("/base/services"));
        assert_eq!(cfg.settings_file(), PathBuf::from("/base/settings.ini"));
        assert_eq!(cfg.log_dir(), PathBuf::from("/base/logs"));
    }
}
