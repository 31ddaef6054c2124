//! Telemetry streams the in-game script can be asked to emit

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{RelayError, Result};

/// A telemetry stream kind understood by the in-game script.
///
/// The wire identifier is an explicit field of each variant and is the only
/// thing transmitted; renaming or reordering variants does not affect the
/// protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub enum EventSubscription {
    /// Every stream below at once
    #[serde(rename = "enableMapDataRelay")]
    EnableMapDataRelay,

    /// `[x, y, z, heading]` every 100ms
    #[serde(rename = "enablePosition")]
    EnablePosition,

    /// `[[x, y, z], ..]` for nearby players every 100ms
    #[serde(rename = "enablePlayers")]
    EnablePlayers,

    /// `[[x, y, z], ..]` for nearby peds every 400ms
    #[serde(rename = "enablePeds")]
    EnablePeds,

    /// `[[x, y, z, sprite, colour, alpha, type], ..]` every 30s
    #[serde(rename = "enableBlips")]
    EnableBlips,

    /// One event per chat message; payload shape depends on the message
    #[serde(rename = "enableChat")]
    EnableChat,
}

impl EventSubscription {
    /// Every subscription, in contract order
    pub const ALL: [EventSubscription; 6] = [
        EventSubscription::EnableMapDataRelay,
        EventSubscription::EnablePosition,
        EventSubscription::EnablePlayers,
        EventSubscription::EnablePeds,
        EventSubscription::EnableBlips,
        EventSubscription::EnableChat,
    ];

    /// Identifier sent verbatim in the bridge call
    pub const fn wire_id(self) -> &'static str {
        match self {
            EventSubscription::EnableMapDataRelay => "enableMapDataRelay",
            EventSubscription::EnablePosition => "enablePosition",
            EventSubscription::EnablePlayers => "enablePlayers",
            EventSubscription::EnablePeds => "enablePeds",
            EventSubscription::EnableBlips => "enableBlips",
            EventSubscription::EnableChat => "enableChat",
        }
    }

    /// Emission period, or `None` for event-driven and aggregate streams
    pub fn period(self) -> Option<Duration> {
        match self {
            EventSubscription::EnablePosition | EventSubscription::EnablePlayers => {
                Some(Duration::from_millis(100))
            }
            EventSubscription::EnablePeds => Some(Duration::from_millis(400)),
            EventSubscription::EnableBlips => Some(Duration::from_secs(30)),
            EventSubscription::EnableMapDataRelay | EventSubscription::EnableChat => None,
        }
    }
}

impl fmt::Display for EventSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_id())
    }
}

impl FromStr for EventSubscription {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self> {
        EventSubscription::ALL.into_iter().find(|sub| sub.wire_id() == s).ok_or_else(|| {
            RelayError::config_error(format!(
                "unknown subscription '{}', expected one of: {}",
                s,
                EventSubscription::ALL.map(|sub| sub.wire_id()).join(", ")
            ))
        })
    }
}

/// Ordered list of subscriptions applied once per session.
///
/// Order is preserved exactly and duplicates are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionSet(Vec<EventSubscription>);

impl SubscriptionSet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = EventSubscription> + '_ {
        self.0.iter().copied()
    }

    pub fn as_slice(&self) -> &[EventSubscription] {
        &self.0
    }
}

impl From<EventSubscription> for SubscriptionSet {
    fn from(subscription: EventSubscription) -> Self {
        Self(vec![subscription])
    }
}

impl From<Vec<EventSubscription>> for SubscriptionSet {
    fn from(subscriptions: Vec<EventSubscription>) -> Self {
        Self(subscriptions)
    }
}

impl From<&[EventSubscription]> for SubscriptionSet {
    fn from(subscriptions: &[EventSubscription]) -> Self {
        Self(subscriptions.to_vec())
    }
}

impl<const N: usize> From<[EventSubscription; N]> for SubscriptionSet {
    fn from(subscriptions: [EventSubscription; N]) -> Self {
        Self(subscriptions.to_vec())
    }
}

impl FromIterator<EventSubscription> for SubscriptionSet {
    fn from_iter<I: IntoIterator<Item = EventSubscription>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for SubscriptionSet {
    type Item = EventSubscription;
    type IntoIter = std::vec::IntoIter<EventSubscription>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
