//! Builds a fully-formed battle record ready for its single initial write.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::battle::log::EventLog;
use crate::battle::model::{Battle, BattleStatus, Boss, ClassHp, Question, TeamProgress};
use crate::combat::rng::RandomSource;
use crate::combat::scaling::{boss_hp, class_hp, DEFAULT_AVG_TEAM_SIZE};
use crate::combat::tables::Catalog;

/// Participating team as supplied by the roster subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub color: String,
}

impl TeamEntry {
    pub fn new(id: impl Into<String>, name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color: color.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBattle {
    pub boss_id: String,
    pub questions: Vec<Question>,
    pub teams: Vec<TeamEntry>,
    pub avg_team_size: Option<u32>,
}

/// Assemble the initial record. Performs no validation of pool size; an unknown boss id
/// resolves to the first catalog entry. Returns `None` only when the catalog has no bosses.
pub fn build_battle(
    request: NewBattle,
    catalog: &Catalog,
    rng: &mut impl RandomSource,
    now: DateTime<Utc>,
) -> Option<Battle> {
    let definition = catalog.boss_or_default(&request.boss_id)?;
    let avg_team_size = request.avg_team_size.unwrap_or(DEFAULT_AVG_TEAM_SIZE);
    let team_count = request.teams.len();
    let question_count = request.questions.len();

    let max_hp = boss_hp(definition.base_hp, team_count, avg_team_size);
    let class_max = class_hp(team_count, avg_team_size);

    let team_progress: BTreeMap<String, TeamProgress> = request
        .teams
        .into_iter()
        .map(|team| {
            let mut order: Vec<usize> = (0..question_count).collect();
            rng.shuffle(&mut order);
            (team.id, TeamProgress::new(team.name, team.color, order))
        })
        .collect();

    Some(Battle {
        id: uuid::Uuid::new_v4().to_string(),
        version: 0,
        status: BattleStatus::Active,
        boss: Boss {
            id: definition.id.clone(),
            name: definition.name.clone(),
            icon: definition.icon.clone(),
            max_hp,
            current_hp: max_hp,
        },
        class_hp: ClassHp {
            max: class_max,
            current: class_max,
        },
        questions: request.questions,
        team_progress,
        log: EventLog::default(),
        created_at: now,
        ended_at: None,
    })
}
