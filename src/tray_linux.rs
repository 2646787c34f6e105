//! Linux-specific tray implementation using ksni (KDE StatusNotifierItem).
//!
//! This module provides native integration with KDE Plasma and other desktop environments
//! that support the freedesktop StatusNotifierItem specification.

use crossbeam_channel::{Receiver, Sender};
use ksni::blocking::TrayMethods;
use ksni::menu::*;
use std::sync::{Arc, RwLock};

use crate::badge::TrayState;
use crate::icon;

/// Commands that can be triggered from the tray menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayCommand {
    ShowSettings,
    NextTab,
    PreviousTab,
    ReloadService,
    ToggleAutostart,
    Quit,
}

/// Shared between the ksni service thread and the main thread.
struct MenuState {
    unread: TrayState,
    autostart_enabled: bool,
    command_sender: Sender<TrayCommand>,
}

struct TtthTray {
    state: Arc<RwLock<MenuState>>,
}

impl TtthTray {
    fn send(&self, command: TrayCommand) {
        if let Ok(state) = self.state.read() {
            let _ = state.command_sender.send(command);
        }
    }

    fn item(label: &str, command: TrayCommand) -> MenuItem<Self> {
        StandardItem {
            label: label.into(),
            activate: Box::new(move |tray: &mut Self| tray.send(command)),
            ..Default::default()
        }
        .into()
    }
}

impl ksni::Tray for TtthTray {
    const MENU_ON_ACTIVATE: bool = true;

    fn id(&self) -> String {
        "ttth".into()
    }

    fn icon_name(&self) -> String {
        "ttth".into()
    }

    fn icon_pixmap(&self) -> Vec<ksni::Icon> {
        let state = self
            .state
            .read()
            .map(|s| s.unread)
            .unwrap_or_default();
        let image = icon::themed(state);
        let (width, height) = image.dimensions();

        vec![ksni::Icon {
            width: width as i32,
            height: height as i32,
            data: icon::to_argb(&image),
        }]
    }

    fn title(&self) -> String {
        "ttth".into()
    }

    fn tool_tip(&self) -> ksni::ToolTip {
        let description = match self.state.read().map(|s| s.unread) {
            Ok(TrayState::Unread) => "Unread messages",
            _ => "No unread messages",
        };

        ksni::ToolTip {
            icon_name: String::new(),
            icon_pixmap: vec![],
            title: "ttth".into(),
            description: description.into(),
        }
    }

    fn menu(&self) -> Vec<MenuItem<Self>> {
        let autostart_enabled = self
            .state
            .read()
            .map(|s| s.autostart_enabled)
            .unwrap_or(false);

        vec![
            Self::item("Settings", TrayCommand::ShowSettings),
            MenuItem::Separator,
            Self::item("Next Tab", TrayCommand::NextTab),
            Self::item("Previous Tab", TrayCommand::PreviousTab),
            Self::item("Reload Service", TrayCommand::ReloadService),
            MenuItem::Separator,
            CheckmarkItem {
                label: "Start at Login".into(),
                enabled: true,
                checked: autostart_enabled,
                activate: Box::new(|tray: &mut Self| tray.send(TrayCommand::ToggleAutostart)),
                ..Default::default()
            }
            .into(),
            MenuItem::Separator,
            Self::item("Quit ttth", TrayCommand::Quit),
        ]
    }
}

/// Handle to the tray icon, allowing updates from the main thread.
pub struct Tray {
    handle: ksni::blocking::Handle<TtthTray>,
    menu_state: Arc<RwLock<MenuState>>,
    command_receiver: Receiver<TrayCommand>,
}

impl Tray {
    /// Spawns the D-Bus StatusNotifierItem service on its own thread.
    pub fn new(autostart_enabled: bool) -> Result<Self, Box<dyn std::error::Error>> {
        let (command_sender, command_receiver) = crossbeam_channel::unbounded();

        let menu_state = Arc::new(RwLock::new(MenuState {
            unread: TrayState::Default,
            autostart_enabled,
            command_sender,
        }));

        let tray = TtthTray {
            state: Arc::clone(&menu_state),
        };

        let handle = tray.spawn().map_err(|e| {
            tracing::error!("Failed to spawn ksni tray: {}", e);
            Box::new(std::io::Error::other(format!("ksni spawn failed: {}", e)))
                as Box<dyn std::error::Error>
        })?;

        tracing::info!("System tray initialized (ksni/StatusNotifierItem)");

        Ok(Tray {
            handle,
            menu_state,
            command_receiver,
        })
    }

    /// Swap between the default and the unread icon.
    pub fn set_state(&mut self, state: TrayState) {
        if let Ok(mut menu_state) = self.menu_state.write() {
            if menu_state.unread == state {
                return;
            }
            menu_state.unread = state;
        }
        self.handle.update(|_| {});
    }

    pub fn set_autostart(&mut self, enabled: bool) {
        if let Ok(mut menu_state) = self.menu_state.write() {
            menu_state.autostart_enabled = enabled;
        }
        self.handle.update(|_| {});
    }

    pub fn poll_events(&mut self) -> Option<TrayCommand> {
        let command = self.command_receiver.try_recv().ok()?;
        tracing::debug!(?command, "Tray menu command");
        Some(command)
    }
}
