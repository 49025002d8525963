//! CSV rendering of a battle for analytics consumers.

use serde::Serialize;
use thiserror::Error;

use crate::battle::{Battle, LogKind};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("csv write failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("csv buffer flush failed: {0}")]
    Flush(String),
    #[error("csv output is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

#[derive(Debug, Serialize)]
struct LogRow<'a> {
    at: String,
    kind: &'static str,
    team_id: &'a str,
    team_name: &'a str,
    message: &'a str,
    damage: Option<u32>,
    class_damage: Option<u32>,
    boss_heal: Option<u32>,
    critical_hit: bool,
    shielded: bool,
    ability: &'a str,
    counterattack: &'a str,
}

/// One row per team, ordered by damage dealt (ties by team id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Standing {
    pub rank: usize,
    pub team_id: String,
    pub team_name: String,
    pub damage: u32,
    pub correct: u32,
    pub wrong: u32,
    pub answered: usize,
    pub finished: bool,
}

fn kind_label(kind: LogKind) -> &'static str {
    match kind {
        LogKind::Attack => "attack",
        LogKind::Miss => "miss",
        LogKind::Ability => "ability",
        LogKind::End => "end",
    }
}

/// Render the log oldest first, which is the order analytics tools expect.
pub fn log_to_csv(battle: &Battle) -> Result<String, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let entries: Vec<_> = battle.log.iter().collect();
    for entry in entries.into_iter().rev() {
        writer.serialize(LogRow {
            at: entry.at.to_rfc3339(),
            kind: kind_label(entry.kind),
            team_id: entry.team_id.as_deref().unwrap_or_default(),
            team_name: entry.team_name.as_deref().unwrap_or_default(),
            message: &entry.message,
            damage: entry.damage,
            class_damage: entry.class_damage,
            boss_heal: entry.boss_heal,
            critical_hit: entry.critical_hit,
            shielded: entry.shielded,
            ability: entry.ability.map(|a| a.as_str()).unwrap_or_default(),
            counterattack: entry.counterattack.as_deref().unwrap_or_default(),
        })?;
    }
    finish(writer)
}

pub fn standings(battle: &Battle) -> Vec<Standing> {
    let mut rows: Vec<Standing> = battle
        .team_progress
        .iter()
        .map(|(id, team)| Standing {
            rank: 0,
            team_id: id.clone(),
            team_name: team.name.clone(),
            damage: team.damage,
            correct: team.correct_count,
            wrong: team.wrong_count,
            answered: team.current_index,
            finished: team.finished,
        })
        .collect();
    rows.sort_by(|a, b| b.damage.cmp(&a.damage).then_with(|| a.team_id.cmp(&b.team_id)));
    for (i, row) in rows.iter_mut().enumerate() {
        row.rank = i + 1;
    }
    rows
}

pub fn standings_to_csv(battle: &Battle) -> Result<String, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in standings(battle) {
        writer.serialize(row)?;
    }
    finish(writer)
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<String, ExportError> {
    let bytes = writer
        .into_inner()
        .map_err(|err| ExportError::Flush(err.error().to_string()))?;
    Ok(String::from_utf8(bytes)?)
}
