//! Command line front end.
//!
//! `run` starts the windowed shell; every other command manages services and
//! settings on disk through a [`Shell`] without any views attached.

use clap::{Parser, Subcommand, ValueEnum};
use std::io::Write;
use std::path::PathBuf;

use crate::autostart;
use crate::catalog::Catalog;
use crate::config::AppConfig;
use crate::controller::{BrowsingContext, ContextError, ContextFactory, Subscription, ViewSpec};
use crate::error::ShellResult;
use crate::host::{HostMessage, HostSink};
use crate::registry::ServiceId;
use crate::shell::Shell;

/// Web messengers and mail services in one tabbed window.
#[derive(Parser, Debug)]
#[command(name = "ttth")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log level, overrides `logLevel` from ttth.ini
    #[arg(long, env = "TTTH_LOG_LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Configuration directory
    #[arg(long, env = "TTTH_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Switch {
    On,
    Off,
}

impl Switch {
    pub fn is_on(self) -> bool {
        self == Switch::On
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open the main window
    Run {
        /// Start hidden in the tray
        #[arg(long)]
        minimized: bool,
    },

    /// List the supported service types
    Catalog,

    /// Manage configured services
    Services {
        #[command(subcommand)]
        action: ServicesAction,
    },

    /// Show or change settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },

    /// Print the configuration directory
    ConfigDir,
}

#[derive(Subcommand, Debug)]
pub enum ServicesAction {
    /// List configured services
    List,

    /// Add a service of the given type
    Add {
        service_type: String,
        #[command(flatten)]
        fields: FormFields,
    },

    /// Enable a service
    Enable { id: String },

    /// Disable a service
    Disable { id: String },

    /// Delete a service
    Delete { id: String },

    /// Change name, icon or url of a service
    Configure {
        id: String,
        #[command(flatten)]
        fields: FormFields,
    },
}

#[derive(clap::Args, Debug, Default)]
pub struct FormFields {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub icon: Option<String>,
    #[arg(long)]
    pub url: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum SettingsAction {
    /// Print all settings
    Show,

    /// Service shown on startup
    SetDefaultView { id: String },

    /// Start on the Settings tab again
    ResetDefaultView,

    /// Start at login
    Autostart { state: Switch },

    /// Start at login, hidden in the tray
    AutostartMinimized { state: Switch },

    /// Hide the menubar (ignored on macOS)
    HideMenubar { state: Switch },
}

/// View that is never rendered.
pub struct Detached;

impl BrowsingContext for Detached {
    fn request_probe(&mut self) -> Result<(), ContextError> {
        Ok(())
    }

    fn load_url(&mut self, _url: &str) -> Result<(), ContextError> {
        Ok(())
    }

    fn set_visible(&mut self, _visible: bool) {}
}

pub struct DetachedFactory;

impl ContextFactory for DetachedFactory {
    type Context = Detached;

    fn create(&mut self, spec: &ViewSpec, _subscription: Subscription) -> Result<Detached, ContextError> {
        tracing::trace!(service_id = %spec.service_id, "Detached view");
        Ok(Detached)
    }
}

/// Host that only logs; notices are already logged by the shell.
pub struct LogSink;

impl HostSink for LogSink {
    fn send(&self, message: HostMessage) {
        tracing::trace!(?message, "Host message without a window");
    }
}

pub type ManagementShell = Shell<DetachedFactory, LogSink>;

pub fn management_shell(config: &AppConfig) -> ShellResult<ManagementShell> {
    let catalog = Catalog::bundled()?;
    Shell::new(config.clone(), catalog, DetachedFactory, LogSink)
}

/// Run a command other than `run`.
pub fn execute(
    command: Command,
    config: &AppConfig,
    out: &mut impl Write,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Run { .. } => Err("the run command needs the window host".into()),
        Command::Catalog => {
            for definition in Catalog::bundled()?.iter() {
                writeln!(
                    out,
                    "{:<16} {:<28} {}{}",
                    definition.id,
                    definition.name_long,
                    definition.url,
                    if definition.multiple { "" } else { "  (single instance)" }
                )?;
            }
            Ok(())
        }
        Command::ConfigDir => {
            writeln!(out, "{}", config.config_dir.display())?;
            Ok(())
        }
        Command::Services { action } => services(action, config, out),
        Command::Settings { action } => settings(action, config, out),
    }
}

fn services(
    action: ServicesAction,
    config: &AppConfig,
    out: &mut impl Write,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut shell = management_shell(config)?;

    match action {
        ServicesAction::List => {
            for (id, service) in shell.registry().list()? {
                writeln!(
                    out,
                    "{:<40} {:<8} {:<16} {:<20} {}",
                    id.to_string(),
                    if service.service_enable_status { "enabled" } else { "disabled" },
                    service.service_type,
                    service.name,
                    service.url
                )?;
            }
        }
        ServicesAction::Add { service_type, fields } => {
            shell.request_new_service(&service_type)?;
            let mut form = shell.begin_new(&service_type)?;
            fields.apply(&mut form);
            let id = form.id.clone();
            shell.commit(form)?;
            writeln!(out, "{}", id)?;
        }
        ServicesAction::Enable { id } => shell.enable(&ServiceId::parse(&id)?)?,
        ServicesAction::Disable { id } => shell.disable(&ServiceId::parse(&id)?)?,
        ServicesAction::Delete { id } => shell.delete(&ServiceId::parse(&id)?)?,
        ServicesAction::Configure { id, fields } => {
            let mut form = shell.begin_configure(&ServiceId::parse(&id)?)?;
            fields.apply(&mut form);
            shell.commit(form)?;
        }
    }
    Ok(())
}

impl FormFields {
    fn apply(self, form: &mut crate::shell::ServiceForm) {
        if let Some(name) = self.name {
            form.name = name;
        }
        if let Some(icon) = self.icon {
            form.icon = icon;
        }
        if let Some(url) = self.url {
            form.url = url;
        }
    }
}

fn settings(
    action: SettingsAction,
    config: &AppConfig,
    out: &mut impl Write,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut shell = management_shell(config)?;

    match action {
        SettingsAction::Show => {
            let s = shell.settings();
            writeln!(out, "autostart          = {}", s.autostart)?;
            writeln!(out, "autostartMinimized = {}", s.autostart_minimized)?;
            writeln!(out, "hideMenubar        = {}", s.hide_menubar)?;
            writeln!(
                out,
                "defaultView        = {}",
                s.default_view.as_ref().map(ServiceId::to_string).unwrap_or_default()
            )?;
        }
        SettingsAction::SetDefaultView { id } => {
            shell.startup()?;
            shell.set_default_view(&ServiceId::parse(&id)?)?;
        }
        SettingsAction::ResetDefaultView => shell.reset_default_view()?,
        SettingsAction::Autostart { state } => {
            shell.set_autostart(state.is_on())?;
            autostart::apply(shell.settings())?;
        }
        SettingsAction::AutostartMinimized { state } => {
            shell.set_autostart_minimized(state.is_on())?;
            autostart::apply(shell.settings())?;
        }
        SettingsAction::HideMenubar { state } => shell.set_hide_menubar(state.is_on())?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_nested_commands() {
        let cli = Cli::try_parse_from(["ttth", "services", "add", "slack", "--name", "Work"]).unwrap();
        match cli.command {
            Command::Services {
                action: ServicesAction::Add { service_type, fields },
            } => {
                assert_eq!(service_type, "slack");
                assert_eq!(fields.name.as_deref(), Some("Work"));
                assert!(fields.url.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }

        let cli = Cli::try_parse_from(["ttth", "run", "--minimized"]).unwrap();
        assert!(matches!(cli.command, Command::Run { minimized: true }));

        let cli = Cli::try_parse_from(["ttth", "settings", "autostart", "off"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Settings {
                action: SettingsAction::Autostart { state: Switch::Off }
            }
        ));
    }
}
