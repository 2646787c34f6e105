//! Per-service view controller.
//!
//! One controller owns the embedded browsing context of an enabled service,
//! decides when to poll its probe, and turns the context's lifecycle events
//! into badge reports. Everything the context can call back with arrives as a
//! [`ViewEvent`] through [`ViewController::dispatch`], so tearing a controller
//! down is a single [`ViewController::detach`].

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::adapter::{adapter_for, ProbeOutcome, ServiceAdapter};
use crate::badge::RawCount;
use crate::probe::ProbeMessage;
use crate::registry::{ServiceConfig, ServiceId};

/// Timer intervals without any answer before a probe is reported as silent.
const SILENT_AFTER_INTERVALS: u32 = 3;

#[derive(Error, Debug)]
#[error("browsing context for {service_id}: {message}")]
pub struct ContextError {
    pub service_id: ServiceId,
    pub message: String,
}

/// The embedded browser view of one service, as seen by the controller.
pub trait BrowsingContext {
    /// Deliver the probe's "request" signal.
    fn request_probe(&mut self) -> Result<(), ContextError>;

    fn load_url(&mut self, url: &str) -> Result<(), ContextError>;

    fn set_visible(&mut self, visible: bool);
}

/// Everything needed to build the browsing context of one service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewSpec {
    pub service_id: ServiceId,
    pub url: String,
    pub user_agent: String,
    /// Initialization script: the probe bridge plus any custom probe.
    pub script: String,
}

/// Creates browsing contexts; implemented by the window host.
pub trait ContextFactory {
    type Context: BrowsingContext;

    /// Build a context whose callbacks only fire while `subscription` is active.
    fn create(
        &mut self,
        spec: &ViewSpec,
        subscription: Subscription,
    ) -> Result<Self::Context, ContextError>;
}

/// Shared liveness flag for every callback registered on a context.
///
/// Callbacks check it before forwarding anything, so cancelling it detaches
/// all of them at once.
#[derive(Debug, Clone)]
pub struct Subscription(Arc<AtomicBool>);

impl Subscription {
    pub fn new() -> Self {
        Subscription(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_active(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn cancel(&self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Default for Subscription {
    fn default() -> Self {
        Self::new()
    }
}

/// Lifecycle and message events of a browsing context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    LoadStarted,
    DomReady,
    LoadStopped,
    /// Raw ipc payload posted by the probe.
    Message(String),
    /// The page asked to open `url` in a new window.
    NewWindow(String),
}

/// What the shell has to act on after a dispatched event.
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerOutput {
    Nothing,
    Report(RawCount),
    OpenExternal(String),
}

/// Only plain web links are handed to the external browser.
pub fn is_web_link(url: &str) -> bool {
    match url.split_once(':') {
        Some((scheme, _)) => {
            scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https")
        }
        None => false,
    }
}

/// Open a link in the user's default browser.
pub fn open_external(url: &str) -> bool {
    match webbrowser::open(url) {
        Ok(()) => {
            tracing::debug!(url, "Opened link in external browser");
            true
        }
        Err(e) => {
            tracing::warn!(url, "Failed to open link in external browser: {}", e);
            false
        }
    }
}

pub struct ViewController<C> {
    service_id: ServiceId,
    adapter: &'static dyn ServiceAdapter,
    context: C,
    subscription: Subscription,
    interval: Duration,
    next_poll: Instant,
    last_report: Option<DateTime<Utc>>,
    /// A request went out and nothing has answered it yet.
    awaiting_answer: bool,
    unanswered_intervals: u32,
    silence_logged: bool,
}

impl<C: BrowsingContext> ViewController<C> {
    pub fn new(
        config: &ServiceConfig,
        context: C,
        subscription: Subscription,
        interval: Duration,
        now: Instant,
    ) -> Self {
        let adapter = adapter_for(&config.service_type);
        tracing::debug!(
            service_id = %config.id,
            polls_unread = adapter.polls_unread(),
            external_links = adapter.opens_links_externally(),
            "Created view controller"
        );

        ViewController {
            service_id: config.id.clone(),
            adapter,
            context,
            subscription,
            interval,
            next_poll: now + interval,
            last_report: None,
            awaiting_answer: false,
            unanswered_intervals: 0,
            silence_logged: false,
        }
    }

    pub fn service_id(&self) -> &ServiceId {
        &self.service_id
    }

    pub fn is_attached(&self) -> bool {
        self.subscription.is_active()
    }

    pub fn last_report(&self) -> Option<DateTime<Utc>> {
        self.last_report
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut C {
        &mut self.context
    }

    /// When the fixed-interval timer fires next.
    pub fn next_poll(&self) -> Instant {
        self.next_poll
    }

    /// Advance the interval timer; polls at most once per call.
    pub fn tick(&mut self, now: Instant) -> bool {
        if !self.is_attached() || now < self.next_poll {
            return false;
        }
        self.next_poll = now + self.interval;
        if self.awaiting_answer {
            self.count_silent_interval();
        }
        self.poll();
        true
    }

    /// Send one "request" to the probe. Returns whether it went out.
    pub fn poll(&mut self) -> bool {
        if !self.is_attached() || !self.adapter.polls_unread() {
            return false;
        }

        if let Err(e) = self.context.request_probe() {
            tracing::warn!("Failed to request probe: {}", e);
            return false;
        }
        self.awaiting_answer = true;
        true
    }

    fn count_silent_interval(&mut self) {
        self.unanswered_intervals = self.unanswered_intervals.saturating_add(1);
        if self.is_silent() && !self.silence_logged {
            tracing::debug!(
                service_id = %self.service_id,
                intervals = self.unanswered_intervals,
                "Probe is silent"
            );
            self.silence_logged = true;
        }
    }

    /// Whether the last few timer intervals all passed without a report.
    pub fn is_silent(&self) -> bool {
        self.unanswered_intervals >= SILENT_AFTER_INTERVALS
    }

    pub fn dispatch(&mut self, event: ViewEvent) -> ControllerOutput {
        if !self.is_attached() {
            tracing::trace!(service_id = %self.service_id, ?event, "Dropping event for detached view");
            return ControllerOutput::Nothing;
        }

        match event {
            ViewEvent::LoadStarted | ViewEvent::DomReady | ViewEvent::LoadStopped => {
                tracing::trace!(service_id = %self.service_id, ?event, "View lifecycle event");
                self.poll();
                ControllerOutput::Nothing
            }
            ViewEvent::Message(payload) => self.on_message(&payload),
            ViewEvent::NewWindow(url) => {
                if self.adapter.opens_links_externally() && is_web_link(&url) {
                    ControllerOutput::OpenExternal(url)
                } else {
                    tracing::debug!(service_id = %self.service_id, url, "Ignoring new-window request");
                    ControllerOutput::Nothing
                }
            }
        }
    }

    fn on_message(&mut self, payload: &str) -> ControllerOutput {
        if !self.adapter.polls_unread() {
            return ControllerOutput::Nothing;
        }

        let raw = match ProbeMessage::decode(payload) {
            ProbeMessage::DomReady => {
                self.poll();
                return ControllerOutput::Nothing;
            }
            ProbeMessage::Snapshot(page) => match self.adapter.probe(&page) {
                ProbeOutcome::Count(count) => RawCount::from(count),
                ProbeOutcome::NoIndicator => {
                    tracing::debug!(service_id = %self.service_id, "Probe found no unread indicator");
                    return ControllerOutput::Nothing;
                }
            },
            ProbeMessage::Raw(RawCount::Null) => {
                tracing::debug!(service_id = %self.service_id, "Probe answered with null");
                return ControllerOutput::Nothing;
            }
            ProbeMessage::Raw(raw) => raw,
        };

        self.last_report = Some(Utc::now());
        self.awaiting_answer = false;
        self.unanswered_intervals = 0;
        self.silence_logged = false;
        ControllerOutput::Report(raw)
    }

    /// Point the view back at its configured url.
    pub fn reload(&mut self, url: &str) {
        if let Err(e) = self.context.load_url(url) {
            tracing::warn!("Failed to reload view: {}", e);
        }
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.context.set_visible(visible);
    }

    /// Cancel the timer and every callback as one unit, then hand the
    /// context back so it can be destroyed.
    pub fn detach(self) -> C {
        self.subscription.cancel();
        tracing::debug!(service_id = %self.service_id, "Detached view controller");
        self.context
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_web_link() {
        assert!(is_web_link("https://example.com"));
        assert!(is_web_link("HTTP://example.com"));
        assert!(!is_web_link("mailto:someone@example.com"));
        assert!(!is_web_link("file:///etc/passwd"));
        assert!(!is_web_link("example.com"));
    }

    #[test]
    fn test_subscription_cancel_is_shared() {
        let sub = Subscription::new();
        let clone = sub.clone();
        assert!(clone.is_active());
        sub.cancel();
        assert!(!clone.is_active());
    }
}
