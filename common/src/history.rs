use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    config::DashboardConfig,
    pump::PumpControl,
    types::StatsView,
};

pub const UNKNOWN_TIME: &str = "a while ago";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Automatic,
    Manual,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    #[serde(rename = "measurementTimestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moisture: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WateringEvent {
    #[serde(rename = "eventType")]
    pub event_type: EventType,
    #[serde(rename = "eventTimestamp")]
    pub timestamp: DateTime<Utc>,
}

/// Reply to a history fetch, oldest first. Both lists may be empty when the
/// device has not recorded anything yet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistorySnapshot {
    #[serde(default)]
    pub measurements: Vec<Measurement>,
    #[serde(default)]
    pub events: Vec<WateringEvent>,
}

/// Recent measurements and watering events, newest last.
#[derive(Debug, Clone)]
pub struct History {
    last_measurement: Option<Measurement>,
    events: VecDeque<WateringEvent>,
    max_events: usize,
    is_fetching: bool,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DashboardConfig::default().max_history_events)
    }
}

impl History {
    pub fn new(max_events: usize) -> Self {
        Self {
            last_measurement: None,
            events: VecDeque::new(),
            max_events: max_events.max(1),
            is_fetching: false,
        }
    }

    pub fn is_fetching(&self) -> bool {
        self.is_fetching
    }

    pub fn begin_fetch(&mut self) {
        self.is_fetching = true;
    }

    /// Replaces the recorded history with a fetch reply and ends the fetch.
    pub fn apply_snapshot(&mut self, snapshot: HistorySnapshot) {
        self.is_fetching = false;
        self.last_measurement = snapshot.measurements.into_iter().last();
        self.events.clear();
        for event in snapshot.events {
            self.push_event(event);
        }
    }

    pub fn record_measurement(&mut self, measurement: Measurement) {
        self.is_fetching = false;
        self.last_measurement = Some(measurement);
    }

    pub fn record_event(&mut self, event: WateringEvent) {
        self.is_fetching = false;
        self.push_event(event);
    }

    fn push_event(&mut self, event: WateringEvent) {
        self.events.push_back(event);
        while self.events.len() > self.max_events {
            self.events.pop_front();
        }
    }

    pub fn last_measurement(&self) -> Option<&Measurement> {
        self.last_measurement.as_ref()
    }

    pub fn last_event(&self, event_type: EventType) -> Option<&WateringEvent> {
        self.events
            .iter()
            .rev()
            .find(|event| event.event_type == event_type)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Builds the stats widget: title, relative event times and the pump button.
    pub fn stats_view(
        &self,
        pump: &PumpControl,
        device_name: Option<&str>,
        token: Option<&str>,
        settings_fetching: bool,
        config: &DashboardConfig,
        now: DateTime<Utc>,
    ) -> StatsView {
        let device_name = device_name.filter(|name| !name.is_empty());
        let relative = |at: Option<DateTime<Utc>>| {
            at.map(|at| time_ago(at, now))
                .unwrap_or_else(|| UNKNOWN_TIME.to_string())
        };

        StatsView {
            title: device_name
                .unwrap_or(config.fallback_widget_title.as_str())
                .to_string(),
            loading: settings_fetching || self.is_fetching,
            last_measurement: relative(self.last_measurement().map(|m| m.timestamp)),
            last_automatic_watering: relative(
                self.last_event(EventType::Automatic).map(|e| e.timestamp),
            ),
            last_manual_watering: relative(self.last_event(EventType::Manual).map(|e| e.timestamp)),
            pump_phase: pump.phase(),
            pump_label: pump.label(device_name),
            pump_enabled: pump.is_enabled(token),
        }
    }
}

/// English relative time, e.g. "just now", "1 minute ago", "3 days ago".
pub fn time_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = now.signed_duration_since(then).num_seconds();
    if seconds < 10 {
        return "just now".to_string();
    }
    if seconds < 60 {
        return format!("{seconds} seconds ago");
    }

    const UNITS: [(i64, &str); 6] = [
        (365 * 24 * 3600, "year"),
        (30 * 24 * 3600, "month"),
        (7 * 24 * 3600, "week"),
        (24 * 3600, "day"),
        (3600, "hour"),
        (60, "minute"),
    ];

    for (unit_seconds, unit) in UNITS {
        let count = seconds / unit_seconds;
        if count >= 1 {
            return if count == 1 {
                format!("1 {unit} ago")
            } else {
                format!("{count} {unit}s ago")
            };
        }
    }

    "just now".to_string()
}
