pub mod adapter;
pub mod autostart;
pub mod badge;
pub mod catalog;
pub mod chrome;
pub mod cli;
pub mod config;
pub mod controller;
pub mod error;
pub mod host;
pub mod icon;
pub mod notify;
pub mod platform;
pub mod probe;
pub mod registry;
pub mod settings;
pub mod shell;
pub mod tabs;

// Platform-specific tray implementations:
// - Linux: ksni (KDE StatusNotifierItem) for native KDE/freedesktop support
// - Windows/macOS: tray-icon crate
#[cfg(target_os = "linux")]
#[path = "tray_linux.rs"]
pub mod tray;

#[cfg(not(target_os = "linux"))]
pub mod tray;

#[cfg(feature = "webview")]
pub mod app;
