//! Per-tab unread badges and the tray aggregate derived from them.
//!
//! The per-service count kept here is the source of truth; the on-screen
//! badge text is a projection of it and is never read back.

use serde_json::Value;
use std::collections::HashMap;

use crate::registry::ServiceId;

/// An unread value exactly as it came over the probe channel.
#[derive(Debug, Clone, PartialEq)]
pub enum RawCount {
    Null,
    Number(f64),
    Text(String),
}

impl RawCount {
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => RawCount::Null,
            Value::Number(n) => n.as_f64().map_or(RawCount::Null, RawCount::Number),
            Value::String(s) => RawCount::Text(s.clone()),
            Value::Bool(b) => RawCount::Number(if *b { 1.0 } else { 0.0 }),
            other => RawCount::Text(other.to_string()),
        }
    }
}

impl From<u32> for RawCount {
    fn from(count: u32) -> Self {
        RawCount::Number(f64::from(count))
    }
}

/// Normalized badge: `None` renders as an empty badge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Badge(pub Option<u32>);

impl Badge {
    /// `null`, `"null"`, `0`, `"0"` and empty text all mean "no badge".
    pub fn normalize(raw: &RawCount) -> Badge {
        let count = match raw {
            RawCount::Null => None,
            RawCount::Number(n) if n.is_finite() && *n >= 1.0 => Some(n.trunc().min(u32::MAX as f64) as u32),
            RawCount::Number(_) => None,
            RawCount::Text(text) => {
                let text = text.trim();
                if text.is_empty() || text.eq_ignore_ascii_case("null") {
                    None
                } else {
                    match text.parse::<u32>() {
                        Ok(0) => None,
                        Ok(n) => Some(n),
                        Err(_) => {
                            tracing::debug!(value = %text, "Ignoring non-numeric unread value");
                            None
                        }
                    }
                }
            }
        };
        Badge(count)
    }

    pub fn count(&self) -> u32 {
        self.0.unwrap_or(0)
    }

    /// Text shown on the tab.
    pub fn display(&self) -> String {
        self.0.map(|n| n.to_string()).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TrayState {
    #[default]
    Default,
    Unread,
}

/// Result of a single report: what to draw on the tab and on the tray.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadgeUpdate {
    pub service_id: ServiceId,
    pub badge: Badge,
    pub tray: TrayState,
    pub tray_changed: bool,
}

/// Aggregates counts of the currently visible service tabs.
#[derive(Debug, Default)]
pub struct BadgeAggregator {
    counts: HashMap<ServiceId, Badge>,
    tray: TrayState,
}

impl BadgeAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start counting a visible tab, with an empty badge.
    pub fn track(&mut self, id: &ServiceId) {
        self.counts.entry(id.clone()).or_default();
    }

    /// Forget a tab; returns the tray state if dropping it changed the aggregate.
    pub fn untrack(&mut self, id: &ServiceId) -> Option<TrayState> {
        self.counts.remove(id);
        self.recompute()
    }

    pub fn is_tracked(&self, id: &ServiceId) -> bool {
        self.counts.contains_key(id)
    }

    /// Record a probe report. Reports for tabs that are not visible are dropped.
    pub fn on_report(&mut self, id: &ServiceId, raw: &RawCount) -> Option<BadgeUpdate> {
        let Some(slot) = self.counts.get_mut(id) else {
            tracing::debug!(service_id = %id, "Report for a tab that is not visible");
            return None;
        };

        let badge = Badge::normalize(raw);
        *slot = badge;
        tracing::debug!(service_id = %id, badge = %badge.display(), "Updated service badge");

        let tray_changed = self.recompute().is_some();
        Some(BadgeUpdate {
            service_id: id.clone(),
            badge,
            tray: self.tray,
            tray_changed,
        })
    }

    pub fn badge(&self, id: &ServiceId) -> Badge {
        self.counts.get(id).copied().unwrap_or_default()
    }

    pub fn total_unread(&self) -> u64 {
        self.counts.values().map(|b| u64::from(b.count())).sum()
    }

    pub fn tray_state(&self) -> TrayState {
        self.tray
    }

    fn recompute(&mut self) -> Option<TrayState> {
        let total = self.total_unread();
        let next = if total > 0 {
            TrayState::Unread
        } else {
            TrayState::Default
        };
        tracing::trace!(total, "Recomputed overall unread count");

        if next != self.tray {
            self.tray = next;
            Some(next)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_empty_values() {
        assert_eq!(Badge::normalize(&RawCount::Null).display(), "");
        assert_eq!(Badge::normalize(&RawCount::Number(0.0)).display(), "");
        assert_eq!(Badge::normalize(&RawCount::Text("null".into())).display(), "");
        assert_eq!(Badge::normalize(&RawCount::Text("0".into())).display(), "");
        assert_eq!(Badge::normalize(&RawCount::Text("".into())).display(), "");
    }

    #[test]
    fn test_normalize_counts() {
        assert_eq!(Badge::normalize(&RawCount::Text("5".into())).display(), "5");
        assert_eq!(Badge::normalize(&RawCount::Number(7.0)).count(), 7);
        assert_eq!(Badge::normalize(&RawCount::Text("abc".into())).count(), 0);
        assert_eq!(Badge::normalize(&RawCount::Number(-3.0)).count(), 0);
    }

    #[test]
    fn test_raw_count_from_json() {
        assert_eq!(RawCount::from_json(&json!(null)), RawCount::Null);
        assert_eq!(RawCount::from_json(&json!(3)), RawCount::Number(3.0));
        assert_eq!(RawCount::from_json(&json!("4")), RawCount::Text("4".into()));
    }
}
