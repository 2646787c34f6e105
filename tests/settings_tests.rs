// Tests for settings module in src/settings.rs

mod common;

use common::fixtures::id;
use ttth::settings::Settings;

#[test]
fn test_missing_file_means_everything_off() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings::load(dir.path().join("settings.ini")).unwrap();

    assert!(!settings.autostart);
    assert!(!settings.autostart_minimized);
    assert!(!settings.hide_menubar);
    assert_eq!(settings.default_view, None);
}

#[test]
fn test_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/settings.ini");
    let mut settings = Settings::empty(&path);
    settings.set_autostart_minimized(true);
    settings.set_hide_menubar(true);
    settings.set_default_view(Some(id("a_whatsapp")));

    settings.save().unwrap();
    let loaded = Settings::load(&path).unwrap();

    assert_eq!(loaded, settings);
}

#[test]
fn test_text_flags_from_older_versions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.ini");
    std::fs::write(
        &path,
        "[Settings]\nautostart = yes\nautostartMinimized = 0\nhideMenubar = maybe\ndefaultView = ../x\n",
    )
    .unwrap();

    let settings = Settings::load(&path).unwrap();

    assert!(settings.autostart);
    assert!(!settings.autostart_minimized);
    assert!(!settings.hide_menubar);
    assert_eq!(settings.default_view, None);
}

#[test]
fn test_clearing_default_view_removes_key() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.ini");
    let mut settings = Settings::empty(&path);
    settings.set_default_view(Some(id("a_whatsapp")));
    settings.save().unwrap();

    settings.set_default_view(None);
    settings.save().unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(!raw.contains("defaultView"));
}
