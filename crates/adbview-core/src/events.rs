//! Publish/subscribe bus for events pushed to the presentation surface.
//!
//! The controller publishes; any number of listeners subscribe by event name.
//! A listener unsubscribes by dropping its [`Subscription`].

use crate::config::EventConfig;
use crate::devices::Device;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use tokio::sync::broadcast;
use tracing::warn;

/// Names of the events the bridge may push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    LogcatData,
    LogcatError,
    LogcatClosed,
    DeviceStatusChanged,
}

impl EventName {
    pub const ALL: [EventName; 4] = [
        EventName::LogcatData,
        EventName::LogcatError,
        EventName::LogcatClosed,
        EventName::DeviceStatusChanged,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventName::LogcatData => "logcat-data",
            EventName::LogcatError => "logcat-error",
            EventName::LogcatClosed => "logcat-closed",
            EventName::DeviceStatusChanged => "device-status-changed",
        }
    }

}

impl FromStr for EventName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| format!("Unknown event: {}", s))
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event with its payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum BridgeEvent {
    /// Chunk of logcat standard output.
    LogcatData(String),
    /// Chunk of logcat standard error, or a message synthesized by the controller.
    LogcatError(String),
    /// The stream ended. `None` when the exit status carried no code.
    LogcatClosed(Option<i32>),
    DeviceStatusChanged(Vec<Device>),
}

impl BridgeEvent {
    pub fn name(&self) -> EventName {
        match self {
            BridgeEvent::LogcatData(_) => EventName::LogcatData,
            BridgeEvent::LogcatError(_) => EventName::LogcatError,
            BridgeEvent::LogcatClosed(_) => EventName::LogcatClosed,
            BridgeEvent::DeviceStatusChanged(_) => EventName::DeviceStatusChanged,
        }
    }

    /// The payload alone, as delivered to listeners of [`Self::name`].
    pub fn payload(&self) -> Value {
        match self {
            BridgeEvent::LogcatData(s) | BridgeEvent::LogcatError(s) => json!(s),
            BridgeEvent::LogcatClosed(code) => json!(code),
            BridgeEvent::DeviceStatusChanged(devices) => json!(devices),
        }
    }
}

/// One-to-many event fan-out.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<BridgeEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(EventConfig::CHANNEL_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to every current subscriber. Never blocks; with no subscribers
    /// the event is dropped.
    pub fn publish(&self, event: BridgeEvent) {
        let _ = self.sender.send(event);
    }

    /// Subscribe to the given event names. An empty list subscribes to all.
    pub fn subscribe(&self, names: &[EventName]) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
            filter: names.iter().copied().collect(),
        }
    }

    pub fn subscribe_all(&self) -> Subscription {
        self.subscribe(&[])
    }

    pub fn listener_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// A listener registration. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    receiver: broadcast::Receiver<BridgeEvent>,
    filter: HashSet<EventName>,
}

impl Subscription {
    fn wants(&self, event: &BridgeEvent) -> bool {
        self.filter.is_empty() || self.filter.contains(&event.name())
    }

    /// Wait for the next matching event. Returns `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<BridgeEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.wants(&event) => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Event subscriber lagged, skipped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Next matching event if one is already queued.
    pub fn try_recv(&mut self) -> Option<BridgeEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.wants(&event) => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!("Event subscriber lagged, skipped {} events", skipped);
                }
                Err(_) => return None,
            }
        }
    }

    /// Hand the raw receiver to stream adapters. The name filter is returned
    /// alongside so the adapter can apply it.
    pub fn into_parts(self) -> (broadcast::Receiver<BridgeEvent>, HashSet<EventName>) {
        (self.receiver, self.filter)
    }
}
