use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::status::ComplianceStatus;

/// What an upsert changed, as shown in the dashboard's recent activity feed
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    StatusChanged,
    EvidenceAdded,
    Updated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub measure_id: String,
    pub kind: ActivityKind,
    pub status: ComplianceStatus,
    pub reviewer: Option<String>,
    pub at: DateTime<Utc>,
}

impl ActivityEvent {
    pub fn describe(&self) -> String {
        match self.kind {
            ActivityKind::StatusChanged => format!(
                "Medida {} marcada como {}",
                self.measure_id,
                self.status.label().to_lowercase()
            ),
            ActivityKind::EvidenceAdded => format!("Nueva evidencia subida para {}", self.measure_id),
            ActivityKind::Updated => format!("Evaluación actualizada en {}", self.measure_id),
        }
    }
}

/// Bounded log of the most recent assessment changes. Oldest entries are
/// dropped once `capacity` is reached.
#[derive(Debug, Clone)]
pub struct ActivityLog {
    events: VecDeque<ActivityEvent>,
    capacity: usize,
}

impl ActivityLog {
    pub const DEFAULT_CAPACITY: usize = 100;

    pub fn with_capacity(capacity: usize) -> Self {
        ActivityLog {
            events: VecDeque::with_capacity(capacity.min(Self::DEFAULT_CAPACITY)),
            capacity: capacity.max(1),
        }
    }

    pub fn record(&mut self, event: ActivityEvent) {
        if self.events.len() == self.capacity {
            self.events.pop_back();
        }
        self.events.push_front(event);
    }

    /// Newest first
    pub fn recent(&self, count: usize) -> Vec<&ActivityEvent> {
        self.events.iter().take(count).collect()
    }

    /// Every retained event, oldest first
    pub fn events(&self) -> Vec<ActivityEvent> {
        self.events.iter().rev().cloned().collect()
    }

    /// Replays previously saved events (oldest first), subject to capacity
    pub fn restore(&mut self, events: impl IntoIterator<Item = ActivityEvent>) {
        for event in events {
            self.record(event);
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }
}
