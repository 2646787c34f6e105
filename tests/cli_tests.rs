// Tests for cli module in src/cli.rs

mod common;

use clap::Parser;
use common::fixtures::{id, service, write_services};
use ttth::cli::{execute, Cli};
use ttth::config::AppConfig;
use ttth::registry::Registry;
use ttth::settings::Settings;

fn run(config: &AppConfig, args: &[&str]) -> Result<String, String> {
    let cli = Cli::try_parse_from(std::iter::once("ttth").chain(args.iter().copied()))
        .map_err(|e| e.to_string())?;
    let mut out = Vec::new();
    execute(cli.command, config, &mut out).map_err(|e| e.to_string())?;
    Ok(String::from_utf8(out).unwrap())
}

fn config() -> (tempfile::TempDir, AppConfig) {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig::with_dir(dir.path().to_path_buf());
    (dir, config)
}

#[test]
fn test_catalog_lists_every_type() {
    let (_dir, config) = config();
    let out = run(&config, &["catalog"]).unwrap();

    assert_eq!(out.lines().count(), 10);
    assert!(out.contains("Google Mail"));
    assert!(out
        .lines()
        .any(|l| l.starts_with("whatsapp") && l.ends_with("(single instance)")));
}

#[test]
fn test_config_dir_is_printed() {
    let (dir, config) = config();
    let out = run(&config, &["config-dir"]).unwrap();
    assert_eq!(out.trim(), dir.path().display().to_string());
}

#[test]
fn test_add_list_disable_delete() {
    let (dir, config) = config();

    let out = run(&config, &["services", "add", "slack", "--name", "Work"]).unwrap();
    let new_id = id(out.trim());
    assert_eq!(new_id.service_type(), Some("slack"));

    let listing = run(&config, &["services", "list"]).unwrap();
    assert!(listing.contains("enabled"));
    assert!(listing.contains("Work"));

    run(&config, &["services", "disable", new_id.as_str()]).unwrap();
    let registry = Registry::open(dir.path().join("services")).unwrap();
    assert!(!registry.get(&new_id).unwrap().service_enable_status);

    run(&config, &["services", "delete", new_id.as_str()]).unwrap();
    assert!(registry.list().unwrap().is_empty());
}

#[test]
fn test_add_single_instance_twice_fails() {
    let (_dir, config) = config();
    run(&config, &["services", "add", "telegram"]).unwrap();

    let err = run(&config, &["services", "add", "telegram"]).unwrap_err();
    assert!(err.contains("telegram"));
}

#[test]
fn test_configure_rejects_empty_name() {
    let (dir, config) = config();
    write_services(dir.path(), &[service("a_slack", "slack", true)]);

    let err = run(&config, &["services", "configure", "a_slack", "--name", " "]).unwrap_err();
    assert!(err.contains("name"));

    run(
        &config,
        &["services", "configure", "a_slack", "--url", "https://team.slack.com"],
    )
    .unwrap();
    let registry = Registry::open(dir.path().join("services")).unwrap();
    assert_eq!(registry.get(&id("a_slack")).unwrap().url, "https://team.slack.com");
}

#[test]
fn test_default_view_commands() {
    let (dir, config) = config();
    write_services(
        dir.path(),
        &[
            service("a_slack", "slack", true),
            service("b_xing", "xing", false),
        ],
    );

    assert!(run(&config, &["settings", "set-default-view", "b_xing"]).is_err());
    run(&config, &["settings", "set-default-view", "a_slack"]).unwrap();

    let shown = run(&config, &["settings", "show"]).unwrap();
    assert!(shown.contains("defaultView        = a_slack"));

    run(&config, &["settings", "reset-default-view"]).unwrap();
    let stored = Settings::load(config.settings_file()).unwrap();
    assert_eq!(stored.default_view, None);
}

#[test]
fn test_invalid_id_is_rejected() {
    let (_dir, config) = config();
    assert!(run(&config, &["services", "enable", "../settings"]).is_err());
}
