//! The battle aggregate. Serialized in camelCase; this JSON shape is the wire contract seen by
//! every subscriber.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::battle::log::EventLog;
use crate::combat::tables::Difficulty;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BattleStatus {
    Active,
    Victory,
    Defeat,
}

impl BattleStatus {
    pub fn is_terminal(self) -> bool {
        self != Self::Active
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "active" => Some(Self::Active),
            "victory" => Some(Self::Victory),
            "defeat" => Some(Self::Defeat),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Victory => "victory",
            Self::Defeat => "defeat",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Boss {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(rename = "maxHP")]
    pub max_hp: u32,
    #[serde(rename = "currentHP")]
    pub current_hp: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassHp {
    pub max: u32,
    pub current: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_index: usize,
    #[serde(default)]
    pub explanation: String,
    pub difficulty: Option<Difficulty>,
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamProgress {
    pub name: String,
    #[serde(default)]
    pub color: String,
    pub question_order: Vec<usize>,
    pub current_index: usize,
    pub finished: bool,
    pub correct_count: u32,
    pub wrong_count: u32,
    pub damage: u32,
    pub shield_active: bool,
    pub critical_hit_active: bool,
    pub shield_cooldown: u32,
    pub crit_cooldown: u32,
}

impl TeamProgress {
    pub fn new(name: impl Into<String>, color: impl Into<String>, question_order: Vec<usize>) -> Self {
        let finished = question_order.is_empty();
        Self {
            name: name.into(),
            color: color.into(),
            question_order,
            finished,
            ..Self::default()
        }
    }

    /// Index into `Battle::questions` of the question this team is currently on.
    pub fn current_question(&self) -> Option<usize> {
        self.question_order.get(self.current_index).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Battle {
    pub id: String,
    #[serde(default)]
    pub version: u64,
    pub status: BattleStatus,
    pub boss: Boss,
    #[serde(rename = "classHP")]
    pub class_hp: ClassHp,
    pub questions: Vec<Question>,
    pub team_progress: BTreeMap<String, TeamProgress>,
    #[serde(default)]
    pub log: EventLog,
    pub created_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Battle {
    pub fn is_active(&self) -> bool {
        self.status == BattleStatus::Active
    }

    pub fn all_teams_finished(&self) -> bool {
        self.team_progress.values().all(|team| team.finished)
    }

    pub fn total_damage(&self) -> u32 {
        self.team_progress.values().map(|team| team.damage).sum()
    }

    /// Move to a terminal status, stamping `ended_at` the first time.
    pub fn conclude(&mut self, status: BattleStatus, at: DateTime<Utc>) {
        self.status = status;
        if status.is_terminal() && self.ended_at.is_none() {
            self.ended_at = Some(at);
        }
    }
}

/// Compact listing row for `list_battles`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleSummary {
    pub id: String,
    pub status: BattleStatus,
    pub boss_name: String,
    #[serde(rename = "bossHP")]
    pub boss_hp: u32,
    #[serde(rename = "bossMaxHP")]
    pub boss_max_hp: u32,
    #[serde(rename = "classHP")]
    pub class_hp: u32,
    pub team_count: usize,
    pub created_at: DateTime<Utc>,
}

impl From<&Battle> for BattleSummary {
    fn from(battle: &Battle) -> Self {
        Self {
            id: battle.id.clone(),
            status: battle.status,
            boss_name: battle.boss.name.clone(),
            boss_hp: battle.boss.current_hp,
            boss_max_hp: battle.boss.max_hp,
            class_hp: battle.class_hp.current,
            team_count: battle.team_progress.len(),
            created_at: battle.created_at,
        }
    }
}
