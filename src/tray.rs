//! System tray implementation using tray-icon (Windows/macOS).
//!
//! This module is only compiled on non-Linux platforms.
//! Linux uses the ksni-based implementation in tray_linux.rs.

use crossbeam_channel::Receiver;
use tray_icon::{
    menu::{CheckMenuItem, Menu, MenuEvent, MenuId, MenuItem, PredefinedMenuItem},
    Icon, TrayIcon, TrayIconBuilder,
};

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

pub struct Tray {
    tray_icon: TrayIcon,
    menu_receiver: Receiver<MenuEvent>,
    items: Vec<(MenuId, TrayCommand)>,
    autostart_item: CheckMenuItem,
    state: TrayState,
}

fn load_icon(state: TrayState) -> Result<Icon, Box<dyn std::error::Error>> {
    let image = icon::themed(state);
    let (width, height) = image.dimensions();
    Icon::from_rgba(image.into_raw(), width, height).map_err(|e| e.into())
}

impl Tray {
    pub fn new(autostart_enabled: bool) -> Result<Self, Box<dyn std::error::Error>> {
        let settings_item = MenuItem::new("Settings", true, None);
        let next_item = MenuItem::new("Next Tab", true, None);
        let previous_item = MenuItem::new("Previous Tab", true, None);
        let reload_item = MenuItem::new("Reload Service", true, None);
        let autostart_item = CheckMenuItem::new("Start at Login", true, autostart_enabled, None);
        let quit_item = MenuItem::new("Quit ttth", true, None);

        let menu = Menu::new();
        menu.append(&settings_item)?;
        menu.append(&PredefinedMenuItem::separator())?;
        menu.append(&next_item)?;
        menu.append(&previous_item)?;
        menu.append(&reload_item)?;
        menu.append(&PredefinedMenuItem::separator())?;
        menu.append(&autostart_item)?;
        menu.append(&PredefinedMenuItem::separator())?;
        menu.append(&quit_item)?;

        let items = vec![
            (settings_item.id().clone(), TrayCommand::ShowSettings),
            (next_item.id().clone(), TrayCommand::NextTab),
            (previous_item.id().clone(), TrayCommand::PreviousTab),
            (reload_item.id().clone(), TrayCommand::ReloadService),
            (autostart_item.id().clone(), TrayCommand::ToggleAutostart),
            (quit_item.id().clone(), TrayCommand::Quit),
        ];

        let tray_icon = TrayIconBuilder::new()
            .with_menu(Box::new(menu))
            .with_tooltip("ttth")
            .with_icon(load_icon(TrayState::Default)?)
            .build()?;

        tracing::info!("System tray initialized");

        Ok(Tray {
            tray_icon,
            menu_receiver: MenuEvent::receiver().clone(),
            items,
            autostart_item,
            state: TrayState::Default,
        })
    }

    /// Swap between the default and the unread icon.
    pub fn set_state(&mut self, state: TrayState) {
        if state == self.state {
            return;
        }
        match load_icon(state) {
            Ok(icon) => {
                if let Err(e) = self.tray_icon.set_icon(Some(icon)) {
                    tracing::warn!("Failed to update tray icon: {}", e);
                    return;
                }
                let tooltip = match state {
                    TrayState::Default => "ttth",
                    TrayState::Unread => "ttth: unread messages",
                };
                let _ = self.tray_icon.set_tooltip(Some(tooltip));
                self.state = state;
            }
            Err(e) => tracing::warn!("Failed to render tray icon: {}", e),
        }
    }

    pub fn set_autostart(&mut self, enabled: bool) {
        self.autostart_item.set_checked(enabled);
    }

    pub fn poll_events(&mut self) -> Option<TrayCommand> {
        let event = self.menu_receiver.try_recv().ok()?;
        let command = self
            .items
            .iter()
            .find(|(id, _)| *id == event.id)
            .map(|(_, command)| *command)?;
        tracing::debug!(?command, "Tray menu command");
        Some(command)
    }
}
