//! Spectator feed: a fixed-capacity, newest-first event log.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::combat::tables::AbilityKind;

pub const LOG_CAPACITY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Attack,
    Miss,
    Ability,
    End,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub at: DateTime<Utc>,
    pub kind: LogKind,
    pub team_id: Option<String>,
    pub team_name: Option<String>,
    pub message: String,
    pub damage: Option<u32>,
    pub class_damage: Option<u32>,
    pub boss_heal: Option<u32>,
    #[serde(default)]
    pub critical_hit: bool,
    #[serde(default)]
    pub shielded: bool,
    pub ability: Option<AbilityKind>,
    pub counterattack: Option<String>,
}

impl LogEntry {
    pub fn new(at: DateTime<Utc>, kind: LogKind, message: impl Into<String>) -> Self {
        Self {
            at,
            kind,
            team_id: None,
            team_name: None,
            message: message.into(),
            damage: None,
            class_damage: None,
            boss_heal: None,
            critical_hit: false,
            shielded: false,
            ability: None,
            counterattack: None,
        }
    }

    pub fn by_team(mut self, team_id: &str, team_name: &str) -> Self {
        self.team_id = Some(team_id.to_string());
        self.team_name = Some(team_name.to_string());
        self
    }
}

/// Newest entry at index 0; never holds more than [`LOG_CAPACITY`] entries.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventLog {
    entries: VecDeque<LogEntry>,
}

impl EventLog {
    pub fn push(&mut self, entry: LogEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(LOG_CAPACITY);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn latest(&self) -> Option<&LogEntry> {
        self.entries.front()
    }

    /// Newest first.
    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }
}
