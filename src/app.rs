//! Window host: one winit window holding a wry webview per enabled service,
//! the tab strip page on top and the Settings page below it.
//!
//! Webview callbacks never touch the shell directly. They post [`AppEvent`]s
//! through the event loop proxy, guarded by the tab's [`Subscription`], and
//! the shell handles them on the event loop thread.

use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use winit::application::ApplicationHandler;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop, EventLoopProxy};
use winit::keyboard::{Key, ModifiersState};
use winit::window::{Window, WindowId};
use wry::dpi::{LogicalPosition, LogicalSize};
use wry::http::Request;
use wry::{NewWindowFeatures, NewWindowResponse, PageLoadEvent, Rect, WebContext, WebView, WebViewBuilder};

use crate::autostart;
use crate::catalog::Catalog;
use crate::chrome::{self, NoticeView, SettingsView, StripView, UiAction, STRIP_HEIGHT};
use crate::config::AppConfig;
use crate::controller::{
    open_external, BrowsingContext, ContextError, ContextFactory, Subscription, ViewEvent, ViewSpec,
};
use crate::error::ShellResult;
use crate::host::{ChannelSink, ConfigTarget, HostCommand, HostMessage};
use crate::notify::{Notice, NoticeBoard};
use crate::probe::REQUEST_SCRIPT;
use crate::registry::ServiceId;
use crate::shell::Shell;
use crate::tabs::TabId;
use crate::tray::{Tray, TrayCommand};

/// How often the loop wakes up to look at the tray and expired notices.
const IDLE_WAKEUP: Duration = Duration::from_millis(100);

#[derive(Debug)]
pub enum AppEvent {
    View { id: ServiceId, event: ViewEvent },
    Ui(UiAction),
}

fn strip_bounds(window: &Window) -> Rect {
    let size = window.inner_size().to_logical::<f64>(window.scale_factor());
    Rect {
        position: LogicalPosition::new(0.0, 0.0).into(),
        size: LogicalSize::new(size.width, STRIP_HEIGHT).into(),
    }
}

fn content_bounds(window: &Window) -> Rect {
    let size = window.inner_size().to_logical::<f64>(window.scale_factor());
    Rect {
        position: LogicalPosition::new(0.0, STRIP_HEIGHT).into(),
        size: LogicalSize::new(size.width, (size.height - STRIP_HEIGHT).max(0.0)).into(),
    }
}

pub struct WebviewContext {
    service_id: ServiceId,
    webview: WebView,
    _web_context: WebContext,
}

impl WebviewContext {
    fn error(&self, e: wry::Error) -> ContextError {
        ContextError {
            service_id: self.service_id.clone(),
            message: e.to_string(),
        }
    }

    fn set_bounds(&self, bounds: Rect) {
        if let Err(e) = self.webview.set_bounds(bounds) {
            tracing::warn!(service_id = %self.service_id, "Failed to resize view: {}", e);
        }
    }
}

impl BrowsingContext for WebviewContext {
    fn request_probe(&mut self) -> Result<(), ContextError> {
        self.webview
            .evaluate_script(REQUEST_SCRIPT)
            .map_err(|e| self.error(e))
    }

    fn load_url(&mut self, url: &str) -> Result<(), ContextError> {
        self.webview.load_url(url).map_err(|e| self.error(e))
    }

    fn set_visible(&mut self, visible: bool) {
        if let Err(e) = self.webview.set_visible(visible) {
            tracing::warn!(service_id = %self.service_id, "Failed to change view visibility: {}", e);
        }
    }
}

/// Builds service webviews as children of the main window, each with its own
/// data directory.
pub struct WebviewFactory {
    window: Rc<Window>,
    proxy: EventLoopProxy<AppEvent>,
    data_dir: PathBuf,
}

impl WebviewFactory {
    fn forward(&self, id: &ServiceId, subscription: &Subscription) -> impl Fn(ViewEvent) + 'static {
        let proxy = self.proxy.clone();
        let id = id.clone();
        let subscription = subscription.clone();
        move |event| {
            if subscription.is_active() {
                let _ = proxy.send_event(AppEvent::View {
                    id: id.clone(),
                    event,
                });
            }
        }
    }
}

impl ContextFactory for WebviewFactory {
    type Context = WebviewContext;

    fn create(
        &mut self,
        spec: &ViewSpec,
        subscription: Subscription,
    ) -> Result<WebviewContext, ContextError> {
        let mut web_context = WebContext::new(Some(self.data_dir.join(spec.service_id.as_str())));

        let on_message = self.forward(&spec.service_id, &subscription);
        let on_load = self.forward(&spec.service_id, &subscription);
        let on_new_window = self.forward(&spec.service_id, &subscription);

        let webview = WebViewBuilder::with_web_context(&mut web_context)
            .with_url(spec.url.as_str())
            .with_user_agent(spec.user_agent.as_str())
            .with_initialization_script(spec.script.as_str())
            .with_ipc_handler(move |request: Request<String>| {
                on_message(ViewEvent::Message(request.body().clone()))
            })
            .with_on_page_load_handler(move |event, _url| {
                on_load(match event {
                    PageLoadEvent::Started => ViewEvent::LoadStarted,
                    PageLoadEvent::Finished => ViewEvent::LoadStopped,
                })
            })
            .with_new_window_req_handler(move |url: String, _features: NewWindowFeatures| {
                on_new_window(ViewEvent::NewWindow(url));
                NewWindowResponse::Deny
            })
            .with_bounds(content_bounds(&self.window))
            .with_visible(false)
            .build_as_child(&*self.window)
            .map_err(|e| ContextError {
                service_id: spec.service_id.clone(),
                message: e.to_string(),
            })?;

        tracing::debug!(service_id = %spec.service_id, url = %spec.url, "Created service view");
        Ok(WebviewContext {
            service_id: spec.service_id.clone(),
            webview,
            _web_context: web_context,
        })
    }
}

fn chrome_page(window: &Window, html: String, bounds: Rect, proxy: &EventLoopProxy<AppEvent>) -> wry::Result<WebView> {
    let proxy = proxy.clone();
    WebViewBuilder::new()
        .with_html(html)
        .with_bounds(bounds)
        .with_ipc_handler(move |request: Request<String>| {
            if let Some(action) = UiAction::decode(request.body()) {
                let _ = proxy.send_event(AppEvent::Ui(action));
            }
        })
        .build_as_child(window)
}

struct Running {
    window: Rc<Window>,
    shell: Shell<WebviewFactory, ChannelSink>,
    host_rx: Receiver<HostMessage>,
    strip: WebView,
    settings_page: WebView,
    tray: Option<Tray>,
    notices: NoticeBoard,
    shortcuts: HashMap<u32, TabId>,
    modifiers: ModifiersState,
    dirty: bool,
}

impl Running {
    fn start(
        event_loop: &ActiveEventLoop,
        config: AppConfig,
        minimized: bool,
        proxy: &EventLoopProxy<AppEvent>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let attributes = Window::default_attributes()
            .with_title("ttth")
            .with_inner_size(winit::dpi::LogicalSize::new(1200.0, 800.0))
            .with_visible(!minimized);
        let window = Rc::new(event_loop.create_window(attributes)?);

        let strip = chrome_page(&window, chrome::strip_page(), strip_bounds(&window), proxy)?;
        let settings_page = chrome_page(&window, chrome::settings_page(), content_bounds(&window), proxy)?;

        let factory = WebviewFactory {
            window: Rc::clone(&window),
            proxy: proxy.clone(),
            data_dir: config.config_dir.join("webviews"),
        };
        let (sink, host_rx) = ChannelSink::unbounded();
        let mut shell = Shell::new(config, Catalog::bundled()?, factory, sink)?;

        let tray = match Tray::new(shell.settings().autostart) {
            Ok(tray) => Some(tray),
            Err(e) => {
                tracing::warn!("Running without a tray icon: {}", e);
                None
            }
        };

        if let Err(e) = shell.startup() {
            shell.notify(Notice::from_error(&e));
        }

        let mut running = Running {
            window,
            shell,
            host_rx,
            strip,
            settings_page,
            tray,
            notices: NoticeBoard::new(),
            shortcuts: HashMap::new(),
            modifiers: ModifiersState::empty(),
            dirty: true,
        };
        running.drain_host_messages();
        Ok(running)
    }

    fn report(&self, result: ShellResult<()>) {
        if let Err(e) = result {
            self.shell.notify(Notice::from_error(&e));
        }
    }

    fn show_window(&self) {
        self.window.set_visible(true);
        self.window.focus_window();
    }

    fn drain_host_messages(&mut self) {
        let rx = self.host_rx.clone();
        while let Ok(message) = rx.try_recv() {
            self.on_host_message(message);
        }
    }

    fn on_host_message(&mut self, message: HostMessage) {
        self.dirty = true;
        match message {
            HostMessage::OpenConfigFolder(path) => {
                if let Err(e) = webbrowser::open(&path.to_string_lossy()) {
                    tracing::warn!(path = %path.display(), "Failed to open config folder: {}", e);
                }
            }
            HostMessage::OpenServiceConfigWindow(target) => {
                let command = match target {
                    ConfigTarget::New(service_type) => HostCommand::ServiceToCreate(service_type),
                    ConfigTarget::Existing(id) => HostCommand::ServiceToConfigure(id),
                };
                self.shell.handle_command(command);
                self.shell.handle_command(HostCommand::ShowSettings);
                self.show_window();
            }
            HostMessage::CloseServiceConfigWindow | HostMessage::ReloadMainWindow => {}
            HostMessage::UpdateWindowTitle(name) => {
                self.window.set_title(&format!("ttth - {}", name));
            }
            HostMessage::CreateGlobalShortcut { accelerator, tab } => {
                match accelerator.rsplit('+').next().and_then(|k| k.parse::<u32>().ok()) {
                    Some(key) => {
                        self.shortcuts.insert(key, tab);
                    }
                    None => tracing::warn!(accelerator, "Unsupported shortcut"),
                }
            }
            HostMessage::ShowMenubar | HostMessage::HideMenubar => {
                tracing::debug!("Window has no menubar to toggle");
            }
            HostMessage::ChangeTrayIcon(state) => {
                if let Some(tray) = self.tray.as_mut() {
                    tray.set_state(state);
                }
            }
            HostMessage::OpenExternal(url) => {
                open_external(&url);
            }
            HostMessage::Notify(notice) => {
                self.notices.push(notice, Instant::now());
            }
        }
    }

    fn on_ui_action(&mut self, action: UiAction) {
        self.dirty = true;
        match action {
            UiAction::SwitchTab { tab } => match UiAction::tab_id(&tab) {
                Ok(target) => self.shell.handle_command(HostCommand::SwitchToTab(target)),
                Err(e) => self.report(Err(e)),
            },
            UiAction::Toggle { id } => {
                let result = self.shell.toggle(&id).map(drop);
                self.report(result);
            }
            UiAction::Delete { id } => {
                let result = self.shell.delete(&id);
                self.report(result);
            }
            UiAction::Configure { id } => {
                let result = self.shell.request_configure(&id);
                self.report(result);
            }
            UiAction::AddService { service_type } => {
                let result = self.shell.request_new_service(&service_type);
                self.report(result);
            }
            UiAction::SaveForm { name, icon, url } => {
                if let Some(mut form) = self.shell.form().cloned() {
                    form.name = name;
                    form.icon = icon;
                    form.url = url;
                    let result = self.shell.commit(form);
                    self.report(result);
                }
            }
            UiAction::CancelForm => self.shell.cancel(),
            UiAction::SetDefaultView { id } => {
                let result = self.shell.set_default_view(&id);
                self.report(result);
            }
            UiAction::ResetDefaultView => {
                let result = self.shell.reset_default_view();
                self.report(result);
            }
            UiAction::Autostart { enabled } => {
                let result = self.shell.set_autostart(enabled);
                self.report(result);
                self.sync_autostart();
            }
            UiAction::AutostartMinimized { enabled } => {
                let result = self.shell.set_autostart_minimized(enabled);
                self.report(result);
                self.sync_autostart();
            }
            UiAction::HideMenubar { enabled } => {
                let result = self.shell.set_hide_menubar(enabled);
                self.report(result);
            }
            UiAction::OpenConfigFolder => self.shell.open_config_folder(),
            UiAction::DismissNotice { index } => {
                if !self.notices.dismiss(index) {
                    tracing::debug!(index, "Notice already gone");
                }
            }
        }
    }

    fn sync_autostart(&mut self) {
        if let Err(e) = autostart::apply(self.shell.settings()) {
            self.shell.notify(Notice::error(e.to_string()));
        }
        let enabled = self.shell.settings().autostart;
        if let Some(tray) = self.tray.as_mut() {
            tray.set_autostart(enabled);
        }
    }

    /// Returns `false` when the app should quit.
    fn on_tray_command(&mut self, command: TrayCommand) -> bool {
        self.dirty = true;
        match command {
            TrayCommand::ShowSettings => {
                self.show_window();
                self.shell.handle_command(HostCommand::ShowSettings);
            }
            TrayCommand::NextTab => self.shell.handle_command(HostCommand::NextTab),
            TrayCommand::PreviousTab => self.shell.handle_command(HostCommand::PreviousTab),
            TrayCommand::ReloadService => self.shell.handle_command(HostCommand::ReloadCurrentService),
            TrayCommand::ToggleAutostart => {
                let enabled = !self.shell.settings().autostart;
                let result = self.shell.set_autostart(enabled);
                self.report(result);
                self.sync_autostart();
            }
            TrayCommand::Quit => {
                tracing::info!("Quit requested from tray menu");
                return false;
            }
        }
        true
    }

    fn on_shortcut(&mut self, event: &KeyEvent) {
        if event.state != ElementState::Pressed {
            return;
        }
        if !(self.modifiers.control_key() || self.modifiers.super_key()) {
            return;
        }
        let Key::Character(text) = &event.logical_key else {
            return;
        };
        if let Some(tab) = text.parse::<u32>().ok().and_then(|n| self.shortcuts.get(&n)) {
            let tab = tab.clone();
            self.shell.handle_command(HostCommand::SwitchToTab(tab));
            self.dirty = true;
        }
    }

    fn layout(&self) {
        if let Err(e) = self.strip.set_bounds(strip_bounds(&self.window)) {
            tracing::warn!("Failed to resize tab strip: {}", e);
        }
        if let Err(e) = self.settings_page.set_bounds(content_bounds(&self.window)) {
            tracing::warn!("Failed to resize settings page: {}", e);
        }
        for tab in self.shell.tabs().ui().tabs() {
            tab.controller().context().set_bounds(content_bounds(&self.window));
        }
    }

    fn render(&mut self) {
        let visible_tabs = self.shell.tabs().len() as u32;
        self.shortcuts.retain(|key, _| *key <= visible_tabs);

        let strip = StripView {
            tabs: self.shell.strip(),
            notices: self.notices.iter().map(NoticeView::from).collect(),
        };
        if let Err(e) = self.strip.evaluate_script(&chrome::render_script(&strip)) {
            tracing::warn!("Failed to render tab strip: {}", e);
        }

        let on_settings = self.shell.tabs().active() == &TabId::Settings;
        if let Err(e) = self.settings_page.set_visible(on_settings) {
            tracing::warn!("Failed to toggle settings page: {}", e);
        }
        match SettingsView::from_shell(&self.shell) {
            Ok(view) => {
                if let Err(e) = self.settings_page.evaluate_script(&chrome::render_script(&view)) {
                    tracing::warn!("Failed to render settings page: {}", e);
                }
            }
            Err(e) => tracing::error!("Failed to read settings state: {}", e),
        }

        self.dirty = false;
    }
}

pub struct App {
    config: AppConfig,
    minimized: bool,
    proxy: EventLoopProxy<AppEvent>,
    running: Option<Running>,
}

impl ApplicationHandler<AppEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.running.is_some() {
            return;
        }
        match Running::start(event_loop, self.config.clone(), self.minimized, &self.proxy) {
            Ok(running) => {
                tracing::info!("Main window ready");
                self.running = Some(running);
            }
            Err(e) => {
                tracing::error!("Failed to start: {}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let Some(running) = self.running.as_mut() else {
            return;
        };
        match event {
            WindowEvent::CloseRequested => {
                if running.tray.is_some() {
                    // stays in the tray
                    running.window.set_visible(false);
                } else {
                    running.shell.shutdown();
                    event_loop.exit();
                }
            }
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => running.layout(),
            WindowEvent::ModifiersChanged(modifiers) => running.modifiers = modifiers.state(),
            WindowEvent::KeyboardInput { event, .. } => running.on_shortcut(&event),
            _ => {}
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: AppEvent) {
        let Some(running) = self.running.as_mut() else {
            return;
        };
        match event {
            AppEvent::View { id, event } => {
                if running.shell.on_view_event(&id, event).is_some() {
                    running.dirty = true;
                }
            }
            AppEvent::Ui(action) => running.on_ui_action(action),
        }
        running.drain_host_messages();
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let Some(running) = self.running.as_mut() else {
            return;
        };

        #[cfg(target_os = "linux")]
        while gtk::events_pending() {
            gtk::main_iteration_do(false);
        }

        let now = Instant::now();
        running.shell.tick(now);

        while let Some(command) = running.tray.as_mut().and_then(Tray::poll_events) {
            if !running.on_tray_command(command) {
                running.shell.shutdown();
                event_loop.exit();
                return;
            }
        }

        running.drain_host_messages();
        if running.notices.expire(now) {
            running.dirty = true;
        }
        if running.dirty {
            running.render();
        }

        let wake = running
            .shell
            .next_deadline()
            .map_or(now + IDLE_WAKEUP, |deadline| deadline.min(now + IDLE_WAKEUP));
        event_loop.set_control_flow(ControlFlow::WaitUntil(wake));
    }
}

/// Open the main window and run until quit.
pub fn run(config: AppConfig, minimized: bool) -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(target_os = "linux")]
    gtk::init()?;

    let event_loop = EventLoop::<AppEvent>::with_user_event().build()?;
    let mut app = App {
        config,
        minimized,
        proxy: event_loop.create_proxy(),
        running: None,
    };

    tracing::info!(minimized, "Starting window host");
    event_loop.run_app(&mut app)?;
    Ok(())
}
