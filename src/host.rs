//! Messages exchanged with the process that owns the window and the tray.

use crossbeam_channel::{Receiver, Sender};
use std::path::PathBuf;

use crate::badge::TrayState;
use crate::notify::Notice;
use crate::registry::ServiceId;
use crate::tabs::TabId;

/// Which service the single-service configuration window edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigTarget {
    /// A new instance of the given service type.
    New(String),
    Existing(ServiceId),
}

/// Sent from the shell to the host.
#[derive(Debug, Clone, PartialEq)]
pub enum HostMessage {
    OpenConfigFolder(PathBuf),
    OpenServiceConfigWindow(ConfigTarget),
    CloseServiceConfigWindow,
    ReloadMainWindow,
    UpdateWindowTitle(String),
    CreateGlobalShortcut { accelerator: String, tab: TabId },
    ShowMenubar,
    HideMenubar,
    ChangeTrayIcon(TrayState),
    OpenExternal(String),
    Notify(Notice),
}

/// Sent from the host (menu, tray, shortcuts, config window) to the shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCommand {
    ReloadCurrentService,
    ShowSettings,
    StartSearchUpdates,
    NextTab,
    PreviousTab,
    ServiceToCreate(String),
    ServiceToConfigure(ServiceId),
    SwitchToTab(TabId),
}

pub trait HostSink {
    fn send(&self, message: HostMessage);
}

/// Host sink backed by a channel drained by the window event loop.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<HostMessage>,
}

impl ChannelSink {
    pub fn new(tx: Sender<HostMessage>) -> Self {
        ChannelSink { tx }
    }

    pub fn unbounded() -> (Self, Receiver<HostMessage>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (ChannelSink { tx }, rx)
    }
}

impl HostSink for ChannelSink {
    fn send(&self, message: HostMessage) {
        tracing::trace!(?message, "Host message");
        if self.tx.send(message).is_err() {
            tracing::debug!("Host receiver is gone, dropping message");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_sink_delivers_in_order() {
        let (sink, rx) = ChannelSink::unbounded();
        sink.send(HostMessage::ShowMenubar);
        sink.send(HostMessage::ReloadMainWindow);
        assert_eq!(rx.try_recv().unwrap(), HostMessage::ShowMenubar);
        assert_eq!(rx.try_recv().unwrap(), HostMessage::ReloadMainWindow);
    }

    #[test]
    fn test_channel_sink_survives_dropped_receiver() {
        let (sink, rx) = ChannelSink::unbounded();
        drop(rx);
        sink.send(HostMessage::HideMenubar);
    }
}
