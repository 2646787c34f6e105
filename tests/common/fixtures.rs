// In-memory views, a recording host and on-disk service records for tests
// Allow dead code since fixtures are used by different test files compiled separately
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;
use std::time::Instant;

use tempfile::TempDir;
use ttth::catalog::Catalog;
use ttth::config::AppConfig;
use ttth::controller::{
    BrowsingContext, ContextError, ContextFactory, Subscription, ViewController, ViewSpec,
};
use ttth::host::{HostMessage, HostSink};
use ttth::registry::{Registry, ServiceConfig, ServiceId};
use ttth::shell::Shell;

/// Everything a fake view was asked to do.
#[derive(Debug, Default)]
pub struct ViewLog {
    pub probe_requests: u32,
    pub loads: Vec<String>,
    pub visible: bool,
    pub script: String,
}

pub struct FakeView {
    pub service_id: ServiceId,
    pub log: Rc<RefCell<ViewLog>>,
}

impl FakeView {
    pub fn new(service_id: &ServiceId) -> Self {
        FakeView {
            service_id: service_id.clone(),
            log: Rc::default(),
        }
    }
}

impl BrowsingContext for FakeView {
    fn request_probe(&mut self) -> Result<(), ContextError> {
        self.log.borrow_mut().probe_requests += 1;
        Ok(())
    }

    fn load_url(&mut self, url: &str) -> Result<(), ContextError> {
        self.log.borrow_mut().loads.push(url.to_string());
        Ok(())
    }

    fn set_visible(&mut self, visible: bool) {
        self.log.borrow_mut().visible = visible;
    }
}

/// Hands out fake views and keeps a handle on each for inspection.
#[derive(Default)]
pub struct FakeFactory {
    pub views: HashMap<ServiceId, Rc<RefCell<ViewLog>>>,
    pub subscriptions: HashMap<ServiceId, Subscription>,
    pub created: Vec<ServiceId>,
    /// Service ids whose view fails to build.
    pub failing: Vec<ServiceId>,
}

impl FakeFactory {
    pub fn log(&self, id: &ServiceId) -> Rc<RefCell<ViewLog>> {
        Rc::clone(&self.views[id])
    }
}

impl ContextFactory for FakeFactory {
    type Context = FakeView;

    fn create(
        &mut self,
        spec: &ViewSpec,
        subscription: Subscription,
    ) -> Result<FakeView, ContextError> {
        if self.failing.contains(&spec.service_id) {
            return Err(ContextError {
                service_id: spec.service_id.clone(),
                message: "no display".to_string(),
            });
        }

        let view = FakeView::new(&spec.service_id);
        view.log.borrow_mut().script = spec.script.clone();
        view.log.borrow_mut().loads.push(spec.url.clone());
        self.views
            .insert(spec.service_id.clone(), Rc::clone(&view.log));
        self.subscriptions
            .insert(spec.service_id.clone(), subscription);
        self.created.push(spec.service_id.clone());
        Ok(view)
    }
}

/// Host sink that keeps every message; clones share the same buffer.
#[derive(Clone, Default)]
pub struct RecordingSink {
    messages: Rc<RefCell<Vec<HostMessage>>>,
}

impl RecordingSink {
    pub fn take(&self) -> Vec<HostMessage> {
        std::mem::take(&mut *self.messages.borrow_mut())
    }

    pub fn messages(&self) -> Vec<HostMessage> {
        self.messages.borrow().clone()
    }
}

impl HostSink for RecordingSink {
    fn send(&self, message: HostMessage) {
        self.messages.borrow_mut().push(message);
    }
}

pub type TestShell = Shell<FakeFactory, RecordingSink>;

pub fn id(raw: &str) -> ServiceId {
    ServiceId::parse(raw).unwrap()
}

/// A service record of `service_type` with catalog defaults.
pub fn service(raw_id: &str, service_type: &str, enabled: bool) -> ServiceConfig {
    let catalog = Catalog::bundled().unwrap();
    let mut config = ServiceConfig::from_definition(id(raw_id), catalog.require(service_type).unwrap());
    config.service_enable_status = enabled;
    config
}

/// Persist records directly, bypassing the single-instance check.
pub fn write_services(dir: &Path, services: &[ServiceConfig]) {
    let registry = Registry::open(dir.join("services")).unwrap();
    for config in services {
        std::fs::write(
            registry.dir().join(format!("{}.json", config.id)),
            serde_json::to_string_pretty(config).unwrap(),
        )
        .unwrap();
    }
}

pub fn shell_in(dir: &Path) -> (TestShell, RecordingSink) {
    let sink = RecordingSink::default();
    let shell = Shell::new(
        AppConfig::with_dir(dir.to_path_buf()),
        Catalog::bundled().unwrap(),
        FakeFactory::default(),
        sink.clone(),
    )
    .unwrap();
    (shell, sink)
}

/// A started shell over the given records.
pub fn started_shell(services: &[ServiceConfig]) -> (TempDir, TestShell, RecordingSink) {
    let dir = tempfile::tempdir().unwrap();
    write_services(dir.path(), services);
    let (mut shell, sink) = shell_in(dir.path());
    shell.startup().unwrap();
    (dir, shell, sink)
}

pub fn controller(config: &ServiceConfig) -> (ViewController<FakeView>, Rc<RefCell<ViewLog>>) {
    let view = FakeView::new(&config.id);
    let log = Rc::clone(&view.log);
    let controller = ViewController::new(
        config,
        view,
        Subscription::new(),
        ttth::config::DEFAULT_POLL_INTERVAL,
        Instant::now(),
    );
    (controller, log)
}

/// Probe answer carrying a page title.
pub fn title_snapshot(title: &str) -> String {
    serde_json::json!({ "kind": "snapshot", "title": title, "indicator": null }).to_string()
}

pub fn indicator_snapshot(indicator: &str) -> String {
    serde_json::json!({ "kind": "snapshot", "title": "", "indicator": indicator }).to_string()
}

/// Tray icon changes the shell asked the host for, in order.
pub fn tray_changes(messages: &[HostMessage]) -> Vec<ttth::badge::TrayState> {
    messages
        .iter()
        .filter_map(|m| match m {
            HostMessage::ChangeTrayIcon(state) => Some(*state),
            _ => None,
        })
        .collect()
}
