//! Publisher configuration
//!
//! Settings are read from environment variables (a `.env` file is loaded by
//! the binary first). Every variable is optional; unset variables fall back
//! to the defaults below, which reproduce the plain unbounded buffer.
//!
//! | variable | default |
//! |---|---|
//! | `PUBRELAY_PUB_TOPIC` | `pubrelay/event` |
//! | `PUBRELAY_QOS` | `0` |
//! | `PUBRELAY_MAX_PENDING` | unset (unbounded) |
//! | `PUBRELAY_OVERFLOW_POLICY` | `reject_new` |
//! | `PUBRELAY_LIVE_FAILURE_POLICY` | `drop` |

use std::num::NonZeroUsize;

use anyhow::{Context, Result};
use pubrelay_domain::{DomainError, QoS, Topic};
use serde::{Deserialize, Serialize};

const DEFAULT_PUB_TOPIC: &str = "pubrelay/event";

// ============================================================================
// Overflow Policy
// ============================================================================

/// What to do when a bounded pending queue is full.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Evict the oldest pending entry to make room.
    DropOldest,
    /// Refuse the new entry and report `QueueFull`.
    #[default]
    RejectNew,
}

impl std::fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverflowPolicy::DropOldest => write!(f, "drop_oldest"),
            OverflowPolicy::RejectNew => write!(f, "reject_new"),
        }
    }
}

impl std::str::FromStr for OverflowPolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drop_oldest" | "dropoldest" | "oldest" => Ok(OverflowPolicy::DropOldest),
            "reject_new" | "rejectnew" | "reject" => Ok(OverflowPolicy::RejectNew),
            other => Err(DomainError::parse(format!(
                "Unknown overflow policy: {}",
                other
            ))),
        }
    }
}

// ============================================================================
// Live Send Failure Policy
// ============================================================================

/// What happens to a message whose live (non-buffered) send fails.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LiveSendFailurePolicy {
    /// The message is lost; the caller gets the error.
    #[default]
    Drop,
    /// The message is appended to the pending queue for the next flush.
    Requeue,
}

impl std::fmt::Display for LiveSendFailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LiveSendFailurePolicy::Drop => write!(f, "drop"),
            LiveSendFailurePolicy::Requeue => write!(f, "requeue"),
        }
    }
}

impl std::str::FromStr for LiveSendFailurePolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drop" => Ok(LiveSendFailurePolicy::Drop),
            "requeue" | "rebuffer" => Ok(LiveSendFailurePolicy::Requeue),
            other => Err(DomainError::parse(format!(
                "Unknown live send failure policy: {}",
                other
            ))),
        }
    }
}

// ============================================================================
// Queue Limit
// ============================================================================

/// Optional bound on the pending queue.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueueLimit {
    /// Maximum number of pending entries; `None` means unbounded.
    pub max_pending: Option<NonZeroUsize>,
    /// Applied only when `max_pending` is set.
    pub overflow: OverflowPolicy,
}

impl QueueLimit {
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Bound the queue to `max_pending` entries.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if `max_pending` is zero; a queue
    /// that can hold nothing cannot buffer.
    pub fn bounded(max_pending: usize, overflow: OverflowPolicy) -> Result<Self, DomainError> {
        let max_pending = NonZeroUsize::new(max_pending)
            .ok_or_else(|| DomainError::validation("Pending queue bound must be at least 1"))?;
        Ok(Self {
            max_pending: Some(max_pending),
            overflow,
        })
    }

    /// Capacity of a bounded queue.
    pub fn capacity(&self) -> Option<usize> {
        self.max_pending.map(NonZeroUsize::get)
    }
}

// ============================================================================
// Publisher Config
// ============================================================================

/// Configuration for a `Publisher` and the event relay in front of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublisherConfig {
    /// Topic the event relay publishes application events on
    pub pub_topic: Topic,
    /// QoS passed to every send
    pub qos: QoS,
    /// Pending queue bound
    pub queue_limit: QueueLimit,
    /// Fate of a message whose live send fails
    pub live_failure_policy: LiveSendFailurePolicy,
}

impl PublisherConfig {
    /// Configuration publishing on `pub_topic`, everything else at its
    /// default: QoS 0, unbounded queue, lossy live sends.
    pub fn new(pub_topic: Topic) -> Self {
        Self {
            pub_topic,
            qos: QoS::default(),
            queue_limit: QueueLimit::unbounded(),
            live_failure_policy: LiveSendFailurePolicy::default(),
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let pub_topic = match lookup("PUBRELAY_PUB_TOPIC") {
            Some(raw) => Topic::new(raw).context("PUBRELAY_PUB_TOPIC must be a valid topic")?,
            None => Topic::new(DEFAULT_PUB_TOPIC)?,
        };
        let mut config = Self::new(pub_topic);

        if let Some(raw) = lookup("PUBRELAY_QOS") {
            config.qos = raw
                .parse::<QoS>()
                .context("PUBRELAY_QOS must be 0, 1 or 2")?;
        }

        let overflow = match lookup("PUBRELAY_OVERFLOW_POLICY") {
            Some(raw) => raw
                .parse::<OverflowPolicy>()
                .context("PUBRELAY_OVERFLOW_POLICY must be drop_oldest or reject_new")?,
            None => OverflowPolicy::default(),
        };

        config.queue_limit = match lookup("PUBRELAY_MAX_PENDING") {
            Some(raw) => {
                let max: usize = raw
                    .trim()
                    .parse()
                    .context("PUBRELAY_MAX_PENDING must be a positive integer")?;
                QueueLimit::bounded(max, overflow)
                    .context("PUBRELAY_MAX_PENDING must be greater than zero")?
            }
            None => QueueLimit {
                max_pending: None,
                overflow,
            },
        };

        if let Some(raw) = lookup("PUBRELAY_LIVE_FAILURE_POLICY") {
            config.live_failure_policy = raw
                .parse::<LiveSendFailurePolicy>()
                .context("PUBRELAY_LIVE_FAILURE_POLICY must be drop or requeue")?;
        }

        Ok(config)
    }
}

#[cfg(test)]
impl Default for PublisherConfig {
    fn default() -> Self {
        Self::new(Topic::new(DEFAULT_PUB_TOPIC).unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_unbounded_and_lossy() {
        let config = PublisherConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, PublisherConfig::default());
        assert_eq!(config.pub_topic.as_str(), "pubrelay/event");
        assert_eq!(config.queue_limit.max_pending, None);
        assert_eq!(config.live_failure_policy, LiveSendFailurePolicy::Drop);
    }

    #[test]
    fn reads_every_variable() {
        let config = PublisherConfig::from_lookup(lookup(&[
            ("PUBRELAY_PUB_TOPIC", "phone/42/event"),
            ("PUBRELAY_QOS", "1"),
            ("PUBRELAY_MAX_PENDING", "500"),
            ("PUBRELAY_OVERFLOW_POLICY", "drop_oldest"),
            ("PUBRELAY_LIVE_FAILURE_POLICY", "requeue"),
        ]))
        .unwrap();

        assert_eq!(config.pub_topic.as_str(), "phone/42/event");
        assert_eq!(config.qos, QoS::AtLeastOnce);
        assert_eq!(
            config.queue_limit,
            QueueLimit::bounded(500, OverflowPolicy::DropOldest).unwrap()
        );
        assert_eq!(config.queue_limit.capacity(), Some(500));
        assert_eq!(config.live_failure_policy, LiveSendFailurePolicy::Requeue);
    }

    #[test]
    fn overflow_policy_without_bound_stays_unbounded() {
        let policy = lookup(&[("PUBRELAY_OVERFLOW_POLICY", "drop_oldest")]);

        let config = PublisherConfig::from_lookup(policy).unwrap();

        assert_eq!(config.queue_limit.capacity(), None);
        assert_eq!(config.queue_limit.overflow, OverflowPolicy::DropOldest);
    }

    #[test]
    fn rejects_wildcard_topic() {
        let topic = lookup(&[("PUBRELAY_PUB_TOPIC", "a/#")]);

        let err = PublisherConfig::from_lookup(topic).unwrap_err();

        assert!(err.to_string().contains("PUBRELAY_PUB_TOPIC"));
    }

    #[test]
    fn rejects_zero_bound() {
        let zero = lookup(&[("PUBRELAY_MAX_PENDING", "0")]);
        let garbage = lookup(&[("PUBRELAY_MAX_PENDING", "x")]);

        assert!(PublisherConfig::from_lookup(zero).is_err());
        assert!(PublisherConfig::from_lookup(garbage).is_err());
    }

    #[test]
    fn bounded_limit_requires_room_for_one_entry() {
        let err = QueueLimit::bounded(0, OverflowPolicy::DropOldest).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let limit = QueueLimit::bounded(1, OverflowPolicy::DropOldest).unwrap();
        assert_eq!(limit.capacity(), Some(1));
        assert_eq!(QueueLimit::unbounded().capacity(), None);
    }

    #[test]
    fn rejects_unknown_policy() {
        let policy = lookup(&[("PUBRELAY_LIVE_FAILURE_POLICY", "retry")]);

        let err = PublisherConfig::from_lookup(policy).unwrap_err();

        assert!(err.to_string().contains("drop or requeue"));
    }

    #[test]
    fn policy_display_round_trips_through_from_str() {
        for policy in [OverflowPolicy::DropOldest, OverflowPolicy::RejectNew] {
            assert_eq!(policy.to_string().parse::<OverflowPolicy>().unwrap(), policy);
        }
        for policy in [LiveSendFailurePolicy::Drop, LiveSendFailurePolicy::Requeue] {
            assert_eq!(
                policy.to_string().parse::<LiveSendFailurePolicy>().unwrap(),
                policy
            );
        }
    }
}
