//! Tab strip state and keyboard navigation.
//!
//! [`TabManager`] owns the explicit [`UiState`]: the service tabs in strip
//! order (the Settings tab is a fixed trailing anchor and is not stored),
//! the entries of the default-view selector and the active tab.

use serde::Serialize;
use std::fmt;
use std::time::Instant;

use crate::controller::{BrowsingContext, ViewController};
use crate::registry::{ServiceConfig, ServiceId};

pub const SETTINGS_TITLE: &str = "Settings";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TabId {
    Settings,
    Service(ServiceId),
}

impl TabId {
    pub fn service(&self) -> Option<&ServiceId> {
        match self {
            TabId::Settings => None,
            TabId::Service(id) => Some(id),
        }
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TabId::Settings => f.write_str("settings"),
            TabId::Service(id) => write!(f, "{}", id),
        }
    }
}

/// A numbered keyboard shortcut bound to a service tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessKey {
    pub key: u32,
    pub service_id: ServiceId,
}

impl AccessKey {
    pub fn accelerator(&self) -> String {
        format!("CmdOrCtrl+{}", self.key)
    }
}

/// Entry of the default-view selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewOption {
    pub id: ServiceId,
    pub name: String,
}

pub struct ServiceTab<C> {
    pub id: ServiceId,
    pub name: String,
    pub icon: String,
    pub url: String,
    pub access_key: Option<u32>,
    controller: ViewController<C>,
}

impl<C> ServiceTab<C> {
    pub fn controller(&self) -> &ViewController<C> {
        &self.controller
    }
}

pub struct UiState<C> {
    tabs: Vec<ServiceTab<C>>,
    default_view_options: Vec<ViewOption>,
    active: TabId,
}

impl<C> UiState<C> {
    pub fn tabs(&self) -> &[ServiceTab<C>] {
        &self.tabs
    }

    pub fn default_view_options(&self) -> &[ViewOption] {
        &self.default_view_options
    }

    pub fn active(&self) -> &TabId {
        &self.active
    }

    fn position(&self, id: &ServiceId) -> Option<usize> {
        self.tabs.iter().position(|tab| &tab.id == id)
    }
}

pub struct TabManager<C> {
    ui: UiState<C>,
}

impl<C: BrowsingContext> Default for TabManager<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: BrowsingContext> TabManager<C> {
    pub fn new() -> Self {
        TabManager {
            ui: UiState {
                tabs: Vec::new(),
                default_view_options: Vec::new(),
                active: TabId::Settings,
            },
        }
    }

    pub fn ui(&self) -> &UiState<C> {
        &self.ui
    }

    pub fn active(&self) -> &TabId {
        &self.ui.active
    }

    pub fn contains(&self, id: &ServiceId) -> bool {
        self.ui.position(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.ui.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ui.tabs.is_empty()
    }

    /// Visible service tabs in strip order.
    pub fn visible_ids(&self) -> Vec<ServiceId> {
        self.ui.tabs.iter().map(|tab| tab.id.clone()).collect()
    }

    pub fn tab(&self, id: &ServiceId) -> Option<&ServiceTab<C>> {
        self.ui.tabs.iter().find(|tab| &tab.id == id)
    }

    pub fn controller_mut(&mut self, id: &ServiceId) -> Option<&mut ViewController<C>> {
        self.ui
            .tabs
            .iter_mut()
            .find(|tab| &tab.id == id)
            .map(|tab| &mut tab.controller)
    }

    /// Append a tab in front of the Settings anchor.
    ///
    /// Returns the renumbered access keys of every visible service tab.
    pub fn add_tab(&mut self, config: &ServiceConfig, mut controller: ViewController<C>) -> Vec<AccessKey> {
        if self.contains(&config.id) {
            tracing::warn!(service_id = %config.id, "Tab already exists, ignoring");
            return self.access_keys();
        }

        controller.set_visible(false);
        self.ui.tabs.push(ServiceTab {
            id: config.id.clone(),
            name: config.name.clone(),
            icon: config.icon.clone(),
            url: config.url.clone(),
            access_key: None,
            controller,
        });
        self.ui.default_view_options.push(ViewOption {
            id: config.id.clone(),
            name: config.name.clone(),
        });
        tracing::info!(service_id = %config.id, name = %config.name, "Added tab");

        self.assign_access_keys()
    }

    /// Detach the tab's controller, then drop the strip entry, its pane and
    /// its default-view selector entry.
    ///
    /// Returns the detached browsing context together with the renumbered
    /// access keys, or `None` if no such tab exists.
    pub fn remove_tab(&mut self, id: &ServiceId) -> Option<(C, Vec<AccessKey>)> {
        let index = self.ui.position(id)?;
        let tab = self.ui.tabs.remove(index);
        let mut context = tab.controller.detach();
        context.set_visible(false);

        self.ui.default_view_options.retain(|option| &option.id != id);
        if self.ui.active == TabId::Service(id.clone()) {
            self.ui.active = TabId::Settings;
        }
        tracing::info!(service_id = %id, "Removed tab");

        Some((context, self.assign_access_keys()))
    }

    /// Swap in a new controller for an existing tab and refresh its fields.
    /// Position, access key and the active tab stay as they were.
    ///
    /// Returns the detached context of the old controller, or `None` if no
    /// such tab exists.
    pub fn replace_tab(&mut self, config: &ServiceConfig, mut controller: ViewController<C>) -> Option<C> {
        let index = self.ui.position(&config.id)?;
        controller.set_visible(self.ui.active == TabId::Service(config.id.clone()));

        let tab = &mut self.ui.tabs[index];
        tab.name = config.name.clone();
        tab.icon = config.icon.clone();
        tab.url = config.url.clone();
        let old = std::mem::replace(&mut tab.controller, controller);

        if let Some(option) = self
            .ui
            .default_view_options
            .iter_mut()
            .find(|option| option.id == config.id)
        {
            option.name = config.name.clone();
        }
        tracing::info!(service_id = %config.id, name = %config.name, "Replaced tab view");

        let mut context = old.detach();
        context.set_visible(false);
        Some(context)
    }

    /// Dense 1..N numbering in strip order.
    fn assign_access_keys(&mut self) -> Vec<AccessKey> {
        for (index, tab) in self.ui.tabs.iter_mut().enumerate() {
            tab.access_key = Some(index as u32 + 1);
        }
        self.access_keys()
    }

    pub fn access_keys(&self) -> Vec<AccessKey> {
        self.ui
            .tabs
            .iter()
            .filter_map(|tab| {
                tab.access_key.map(|key| AccessKey {
                    key,
                    service_id: tab.id.clone(),
                })
            })
            .collect()
    }

    /// Activate a tab; returns the title to show, or `None` if it does not exist.
    pub fn switch_to(&mut self, target: &TabId) -> Option<String> {
        let title = match target {
            TabId::Settings => SETTINGS_TITLE.to_string(),
            TabId::Service(id) => match self.tab(id) {
                Some(tab) => tab.name.clone(),
                None => {
                    tracing::debug!(service_id = %id, "Cannot switch to a tab that is not visible");
                    return None;
                }
            },
        };

        if let TabId::Service(previous) = self.ui.active.clone() {
            if let Some(controller) = self.controller_mut(&previous) {
                controller.set_visible(false);
            }
        }
        if let TabId::Service(id) = target {
            if let Some(controller) = self.controller_mut(id) {
                controller.set_visible(true);
            }
        }

        self.ui.active = target.clone();
        tracing::debug!(tab = %target, "Switched tab");
        Some(title)
    }

    /// The tab after the active one, wrapping to the first.
    pub fn next(&self) -> Option<TabId> {
        let len = self.ui.tabs.len();
        if len == 0 {
            return None;
        }
        let index = match self.active_position() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        Some(TabId::Service(self.ui.tabs[index].id.clone()))
    }

    /// The tab before the active one, wrapping to the last.
    pub fn previous(&self) -> Option<TabId> {
        let len = self.ui.tabs.len();
        if len == 0 {
            return None;
        }
        let index = match self.active_position() {
            Some(i) if i > 0 => i - 1,
            _ => len - 1,
        };
        Some(TabId::Service(self.ui.tabs[index].id.clone()))
    }

    fn active_position(&self) -> Option<usize> {
        self.ui.active.service().and_then(|id| self.ui.position(id))
    }

    /// Drive every controller's poll timer.
    pub fn tick(&mut self, now: Instant) {
        for tab in &mut self.ui.tabs {
            tab.controller.tick(now);
        }
    }

    /// Earliest pending poll across all tabs.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.ui.tabs.iter().map(|tab| tab.controller.next_poll()).min()
    }

    /// Detach and return every browsing context, leaving an empty strip.
    pub fn clear(&mut self) -> Vec<C> {
        self.ui.default_view_options.clear();
        self.ui.active = TabId::Settings;
        self.ui
            .tabs
            .drain(..)
            .map(|tab| tab.controller.detach())
            .collect()
    }
}
