//! The shell: keeps the tab strip, the service registry, the badges and the
//! host in agreement.
//!
//! Every user or host action enters through one method of [`Shell`]. Errors
//! from those entry points are logged and turned into notices by
//! [`Shell::handle_command`]; the direct methods return them so callers like
//! the command line can report them their own way.

use serde::Serialize;
use std::time::Instant;

use crate::adapter::adapter_for;
use crate::badge::{BadgeAggregator, BadgeUpdate};
use crate::catalog::Catalog;
use crate::config::AppConfig;
use crate::controller::{
    ContextFactory, ControllerOutput, Subscription, ViewController, ViewEvent, ViewSpec,
};
use crate::error::{ShellError, ShellResult};
use crate::host::{ConfigTarget, HostCommand, HostMessage, HostSink};
use crate::notify::{Notice, NoticeLevel};
use crate::platform;
use crate::probe;
use crate::registry::{Registry, ServiceConfig, ServiceId};
use crate::settings::Settings;
use crate::tabs::{AccessKey, TabId, TabManager};

/// Editable fields of the single-service configuration window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceForm {
    pub id: ServiceId,
    pub service_type: String,
    pub name: String,
    pub icon: String,
    pub url: String,
    pub inject_code: String,
    /// `true` until the service has been persisted once.
    pub is_new: bool,
}

impl ServiceForm {
    /// Name, icon and url must all be filled in.
    pub fn validate(&self) -> ShellResult<()> {
        if self.name.trim().is_empty() {
            return Err(ShellError::Validation("name"));
        }
        if self.icon.trim().is_empty() {
            return Err(ShellError::Validation("icon"));
        }
        if self.url.trim().is_empty() {
            return Err(ShellError::Validation("url"));
        }
        Ok(())
    }

    fn into_config(self, enabled: bool) -> ServiceConfig {
        ServiceConfig {
            id: self.id,
            service_type: self.service_type,
            name: self.name.trim().to_string(),
            icon: self.icon.trim().to_string(),
            url: self.url.trim().to_string(),
            inject_code: self.inject_code,
            service_enable_status: enabled,
        }
    }
}

/// One tab as the tab strip renders it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TabView {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub badge: String,
    pub access_key: Option<u32>,
    pub active: bool,
}

pub struct Shell<F: ContextFactory, S: HostSink> {
    config: AppConfig,
    catalog: Catalog,
    registry: Registry,
    settings: Settings,
    tabs: TabManager<F::Context>,
    badges: BadgeAggregator,
    factory: F,
    host: S,
    form: Option<ServiceForm>,
}

impl<F: ContextFactory, S: HostSink> Shell<F, S> {
    pub fn new(config: AppConfig, catalog: Catalog, factory: F, host: S) -> ShellResult<Self> {
        let registry = Registry::open(config.services_dir())?;
        let settings = Settings::load(config.settings_file())?;

        Ok(Shell {
            config,
            catalog,
            registry,
            settings,
            tabs: TabManager::new(),
            badges: BadgeAggregator::new(),
            factory,
            host,
            form: None,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn tabs(&self) -> &TabManager<F::Context> {
        &self.tabs
    }

    pub fn badges(&self) -> &BadgeAggregator {
        &self.badges
    }

    pub fn factory_mut(&mut self) -> &mut F {
        &mut self.factory
    }

    /// The form of the configuration window, while one is open.
    pub fn form(&self) -> Option<&ServiceForm> {
        self.form.as_ref()
    }

    pub fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Error => tracing::error!("{}", notice.message),
            NoticeLevel::Warning => tracing::warn!("{}", notice.message),
            _ => tracing::info!("{}", notice.message),
        }
        self.host.send(HostMessage::Notify(notice));
    }

    fn report(&self, err: &ShellError) {
        self.notify(Notice::from_error(err));
    }

    /// Build the tab strip from the registry and restore the default view.
    pub fn startup(&mut self) -> ShellResult<()> {
        if let Err(e) = platform::check_supported() {
            self.report(&e);
        }

        if self.settings.apply_platform_rules(platform::is_mac()) {
            tracing::info!("Menubar cannot be hidden on this platform, resetting setting");
            self.save_settings()?;
        }
        self.host.send(if self.settings.hide_menubar {
            HostMessage::HideMenubar
        } else {
            HostMessage::ShowMenubar
        });

        let services = self.registry.list()?;
        tracing::info!(count = services.len(), "Loaded configured services");
        for config in services.values().filter(|c| c.service_enable_status) {
            if let Err(e) = self.open_tab(config) {
                tracing::error!(service_id = %config.id, "Failed to open tab: {}", e);
                self.report(&e);
            }
        }

        self.restore_default_view()
    }

    fn restore_default_view(&mut self) -> ShellResult<()> {
        let target = match self.settings.default_view.clone() {
            Some(id) if self.tabs.contains(&id) => TabId::Service(id),
            Some(id) => {
                tracing::info!(service_id = %id, "Default view is not available, resetting it");
                self.settings.set_default_view(None);
                self.save_settings()?;
                TabId::Settings
            }
            None => TabId::Settings,
        };
        self.switch_tab(&target)
    }

    fn build_controller(
        &mut self,
        config: &ServiceConfig,
    ) -> ShellResult<ViewController<F::Context>> {
        let adapter = adapter_for(&config.service_type);
        let custom = probe::load_custom_probe(&self.config.config_dir, &config.inject_code);
        let spec = ViewSpec {
            service_id: config.id.clone(),
            url: config.url.clone(),
            user_agent: self.config.user_agent.clone(),
            script: probe::build_script(adapter, custom.as_deref()),
        };

        let subscription = Subscription::new();
        let context = self.factory.create(&spec, subscription.clone())?;
        Ok(ViewController::new(
            config,
            context,
            subscription,
            self.config.poll_interval,
            Instant::now(),
        ))
    }

    fn open_tab(&mut self, config: &ServiceConfig) -> ShellResult<()> {
        if self.tabs.contains(&config.id) {
            return Ok(());
        }

        let controller = self.build_controller(config)?;
        let keys = self.tabs.add_tab(config, controller);
        self.badges.track(&config.id);
        self.publish_shortcuts(&keys);
        Ok(())
    }

    /// Give a live tab a fresh view built from `config`. The tab keeps its
    /// position and access key.
    fn rebuild_tab(&mut self, config: &ServiceConfig) -> ShellResult<()> {
        let controller = self.build_controller(config)?;
        if let Some(context) = self.tabs.replace_tab(config, controller) {
            drop(context);
        }
        if self.tabs.active() == &TabId::Service(config.id.clone()) {
            self.host
                .send(HostMessage::UpdateWindowTitle(config.name.clone()));
        }
        Ok(())
    }

    fn close_tab(&mut self, id: &ServiceId) {
        let was_active = self.tabs.active() == &TabId::Service(id.clone());
        let Some((context, keys)) = self.tabs.remove_tab(id) else {
            return;
        };
        drop(context);

        if let Some(tray) = self.badges.untrack(id) {
            self.host.send(HostMessage::ChangeTrayIcon(tray));
        }
        self.publish_shortcuts(&keys);
        if was_active {
            self.host
                .send(HostMessage::UpdateWindowTitle(crate::tabs::SETTINGS_TITLE.to_string()));
        }
    }

    fn publish_shortcuts(&self, keys: &[AccessKey]) {
        for key in keys {
            self.host.send(HostMessage::CreateGlobalShortcut {
                accelerator: key.accelerator(),
                tab: TabId::Service(key.service_id.clone()),
            });
        }
    }

    pub fn switch_tab(&mut self, target: &TabId) -> ShellResult<()> {
        match self.tabs.switch_to(target) {
            Some(title) => {
                self.host.send(HostMessage::UpdateWindowTitle(title));
                Ok(())
            }
            None => Err(ShellError::NotFound(target.to_string())),
        }
    }

    pub fn next_tab(&mut self) -> ShellResult<()> {
        match self.tabs.next() {
            Some(target) => self.switch_tab(&target),
            None => Ok(()),
        }
    }

    pub fn previous_tab(&mut self) -> ShellResult<()> {
        match self.tabs.previous() {
            Some(target) => self.switch_tab(&target),
            None => Ok(()),
        }
    }

    /// Reload the active service from its persisted url.
    pub fn reload_current(&mut self) -> ShellResult<()> {
        let Some(id) = self.tabs.active().service().cloned() else {
            tracing::debug!("Settings tab is active, nothing to reload");
            return Ok(());
        };
        let config = self.registry.get(&id)?;
        if let Some(controller) = self.tabs.controller_mut(&id) {
            tracing::info!(service_id = %id, url = %config.url, "Reloading service");
            controller.reload(&config.url);
        }
        Ok(())
    }

    /// Flip the enable status of a service.
    pub fn toggle(&mut self, id: &ServiceId) -> ShellResult<bool> {
        let enabled = self.registry.get(id)?.service_enable_status;
        if enabled {
            self.disable(id)?;
        } else {
            self.enable(id)?;
        }
        Ok(!enabled)
    }

    pub fn enable(&mut self, id: &ServiceId) -> ShellResult<()> {
        let config = self.registry.set_enabled(id, true)?;
        if let Err(e) = self.open_tab(&config) {
            if let Err(rollback) = self.registry.set_enabled(id, false) {
                tracing::error!(service_id = %id, "Failed to restore disabled state: {}", rollback);
            }
            return Err(e);
        }
        tracing::info!(service_id = %id, "Enabled service");
        self.notify(Notice::success(format!("Enabled the service {}", config.name)));
        Ok(())
    }

    pub fn disable(&mut self, id: &ServiceId) -> ShellResult<()> {
        let config = self.registry.set_enabled(id, false)?;
        self.close_tab(id);
        tracing::info!(service_id = %id, "Disabled service");
        self.notify(Notice::success(format!("Disabled the service {}", config.name)));
        Ok(())
    }

    /// Remove a service for good: record first, then its tab.
    pub fn delete(&mut self, id: &ServiceId) -> ShellResult<()> {
        let config = self.registry.get(id)?;
        self.registry.delete(id)?;
        self.close_tab(id);

        if self.settings.default_view.as_ref() == Some(id) {
            self.settings.set_default_view(None);
            self.save_settings()?;
        }
        if self.form.as_ref().is_some_and(|form| &form.id == id) {
            self.form = None;
            self.host.send(HostMessage::CloseServiceConfigWindow);
        }

        self.host.send(HostMessage::ReloadMainWindow);
        self.notify(Notice::success(format!("Deleted the service {}", config.name)));
        Ok(())
    }

    /// Ask the host to open the configuration window for a new service.
    pub fn request_new_service(&mut self, service_type: &str) -> ShellResult<()> {
        let definition = self.catalog.require(service_type)?;
        if !definition.multiple {
            self.registry.ensure_no_instance_of(service_type)?;
        }
        self.host.send(HostMessage::OpenServiceConfigWindow(ConfigTarget::New(
            service_type.to_string(),
        )));
        Ok(())
    }

    /// Ask the host to open the configuration window for an existing service.
    pub fn request_configure(&mut self, id: &ServiceId) -> ShellResult<()> {
        self.registry.get(id)?;
        self.host
            .send(HostMessage::OpenServiceConfigWindow(ConfigTarget::Existing(id.clone())));
        Ok(())
    }

    /// Open a form pre-filled from the catalog, with a fresh id.
    pub fn begin_new(&mut self, service_type: &str) -> ShellResult<ServiceForm> {
        let definition = self.catalog.require(service_type)?;
        let form = ServiceForm {
            id: ServiceId::generate(&definition.id),
            service_type: definition.id.clone(),
            name: definition.name.clone(),
            icon: definition.icon.clone(),
            url: definition.url.clone(),
            inject_code: definition.inject_code.clone(),
            is_new: true,
        };
        self.form = Some(form.clone());
        Ok(form)
    }

    /// Open a form with the persisted fields of a service.
    pub fn begin_configure(&mut self, id: &ServiceId) -> ShellResult<ServiceForm> {
        let config = self.registry.get(id)?;
        let form = ServiceForm {
            id: config.id,
            service_type: config.service_type,
            name: config.name,
            icon: config.icon,
            url: config.url,
            inject_code: config.inject_code,
            is_new: false,
        };
        self.form = Some(form.clone());
        Ok(form)
    }

    /// Persist an edited form. On failure the form stays open and nothing
    /// persisted changes.
    pub fn commit(&mut self, form: ServiceForm) -> ShellResult<()> {
        form.validate()?;
        let id = form.id.clone();

        if form.is_new {
            let config = form.into_config(true);
            self.registry.create(&self.catalog, &config)?;
            if let Err(e) = self.open_tab(&config) {
                if let Err(rollback) = self.registry.delete(&id) {
                    tracing::error!(service_id = %id, "Failed to discard new service: {}", rollback);
                }
                return Err(e);
            }
            self.notify(Notice::success(format!("Added service {}", config.name)));
        } else {
            let persisted = self.registry.get(&id)?;
            let mut config = form.into_config(persisted.service_enable_status);
            config.service_type = persisted.service_type.clone();
            self.registry.update(&config)?;

            if self.tabs.contains(&id) {
                if let Err(e) = self.rebuild_tab(&config) {
                    if let Err(rollback) = self.registry.update(&persisted) {
                        tracing::error!(service_id = %id, "Failed to restore service: {}", rollback);
                    }
                    return Err(e);
                }
            }
            self.notify(Notice::success(format!("Updated service {}", config.name)));
        }

        self.form = None;
        self.host.send(HostMessage::ReloadMainWindow);
        self.host.send(HostMessage::CloseServiceConfigWindow);
        Ok(())
    }

    /// Close the configuration window without saving.
    pub fn cancel(&mut self) {
        if self.form.take().is_some() {
            self.host.send(HostMessage::CloseServiceConfigWindow);
        }
    }

    pub fn set_default_view(&mut self, id: &ServiceId) -> ShellResult<()> {
        if !self.tabs.contains(id) {
            return Err(ShellError::NotFound(id.to_string()));
        }
        self.settings.set_default_view(Some(id.clone()));
        self.save_settings()?;
        self.notify(Notice::success("Default view saved"));
        Ok(())
    }

    pub fn reset_default_view(&mut self) -> ShellResult<()> {
        self.settings.set_default_view(None);
        self.save_settings()?;
        self.notify(Notice::success("Default view reset"));
        Ok(())
    }

    pub fn set_autostart(&mut self, enabled: bool) -> ShellResult<()> {
        self.settings.set_autostart(enabled);
        self.save_settings()
    }

    pub fn set_autostart_minimized(&mut self, enabled: bool) -> ShellResult<()> {
        self.settings.set_autostart_minimized(enabled);
        self.save_settings()
    }

    pub fn set_hide_menubar(&mut self, hidden: bool) -> ShellResult<()> {
        self.settings.set_hide_menubar(hidden);
        self.settings.apply_platform_rules(platform::is_mac());
        self.save_settings()?;
        let state = if self.settings.hide_menubar {
            self.host.send(HostMessage::HideMenubar);
            "enabled"
        } else {
            self.host.send(HostMessage::ShowMenubar);
            "disabled"
        };
        self.notify(Notice::success(format!(
            "Hide menubar on startup is now {}",
            state
        )));
        Ok(())
    }

    fn save_settings(&self) -> ShellResult<()> {
        self.settings.save()
    }

    pub fn open_config_folder(&self) {
        self.host
            .send(HostMessage::OpenConfigFolder(self.config.config_dir.clone()));
    }

    /// Run one host command; failures become notices.
    pub fn handle_command(&mut self, command: HostCommand) {
        tracing::debug!(?command, "Host command");
        let result = match command {
            HostCommand::ReloadCurrentService => self.reload_current(),
            HostCommand::ShowSettings => self.switch_tab(&TabId::Settings),
            HostCommand::StartSearchUpdates => {
                self.notify(Notice::new(
                    NoticeLevel::Info,
                    "Update checks are not available in this build",
                ));
                Ok(())
            }
            HostCommand::NextTab => self.next_tab(),
            HostCommand::PreviousTab => self.previous_tab(),
            HostCommand::ServiceToCreate(service_type) => self.begin_new(&service_type).map(drop),
            HostCommand::ServiceToConfigure(id) => self.begin_configure(&id).map(drop),
            HostCommand::SwitchToTab(target) => self.switch_tab(&target),
        };

        if let Err(e) = result {
            self.report(&e);
        }
    }

    /// Route a browsing-context event to its controller.
    pub fn on_view_event(&mut self, id: &ServiceId, event: ViewEvent) -> Option<BadgeUpdate> {
        let controller = match self.tabs.controller_mut(id) {
            Some(controller) => controller,
            None => {
                tracing::trace!(service_id = %id, "Event for a closed tab");
                return None;
            }
        };

        match controller.dispatch(event) {
            ControllerOutput::Nothing => None,
            ControllerOutput::OpenExternal(url) => {
                self.host.send(HostMessage::OpenExternal(url));
                None
            }
            ControllerOutput::Report(raw) => {
                let update = self.badges.on_report(id, &raw)?;
                if update.tray_changed {
                    self.host.send(HostMessage::ChangeTrayIcon(update.tray));
                }
                Some(update)
            }
        }
    }

    pub fn tick(&mut self, now: Instant) {
        self.tabs.tick(now);
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.tabs.next_deadline()
    }

    /// The tab strip as rendered, Settings last.
    pub fn strip(&self) -> Vec<TabView> {
        let active = self.tabs.active();
        let mut views: Vec<TabView> = self
            .tabs
            .ui()
            .tabs()
            .iter()
            .map(|tab| TabView {
                id: tab.id.to_string(),
                name: tab.name.clone(),
                icon: tab.icon.clone(),
                badge: self.badges.badge(&tab.id).display(),
                access_key: tab.access_key,
                active: active == &TabId::Service(tab.id.clone()),
            })
            .collect();
        views.push(TabView {
            id: TabId::Settings.to_string(),
            name: crate::tabs::SETTINGS_TITLE.to_string(),
            icon: "fas fa-cog".to_string(),
            badge: String::new(),
            access_key: None,
            active: active == &TabId::Settings,
        });
        views
    }

    /// Tear down every view.
    pub fn shutdown(&mut self) {
        let contexts = self.tabs.clear();
        tracing::info!(count = contexts.len(), "Closed all service views");
    }
}
