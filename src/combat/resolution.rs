//! Per-write combat resolution. These functions mutate an in-memory [`Battle`] and know nothing
//! about storage; the engine runs them inside a retrying transaction.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::battle::{Battle, BattleStatus, LogEntry, LogKind};
use crate::combat::rng::RandomSource;
use crate::combat::tables::{AbilityKind, Catalog};

/// Outcome of one accepted answer submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatResult {
    pub correct: bool,
    pub damage: u32,
    pub critical_hit: bool,
    pub shielded: bool,
    pub counterattack: Option<CounterattackHit>,
    pub correct_index: usize,
    pub explanation: String,
    pub team_finished: bool,
    pub status: BattleStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterattackHit {
    pub name: String,
    pub icon: String,
    pub flavor: String,
    /// Zero when the team's shield absorbed the blow.
    pub class_damage: u32,
    pub boss_heal: u32,
}

/// Validation failures from the ability resolver. Displayed verbatim to players.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbilityError {
    #[error("battle not found")]
    BattleNotFound,
    #[error("battle is not active")]
    BattleInactive,
    #[error("team not found")]
    TeamNotFound,
    #[error("unknown ability")]
    UnknownAbility,
    #[error("{0} already active")]
    AlreadyActive(&'static str),
    #[error("{0} on cooldown ({1})")]
    OnCooldown(&'static str, u32),
}

/// Resolve one team's answer against its current question.
///
/// Returns `None` without touching `battle` when the battle is not active, the team is
/// unknown, or the team has already finished its questions.
pub fn resolve_answer(
    battle: &mut Battle,
    team_id: &str,
    answer_index: usize,
    catalog: &Catalog,
    rng: &mut impl RandomSource,
    now: DateTime<Utc>,
) -> Option<CombatResult> {
    if !battle.is_active() {
        return None;
    }
    let team = battle.team_progress.get(team_id)?;
    if team.finished {
        return None;
    }
    let question_index = team.current_question()?;
    let question = battle.questions.get(question_index)?;
    let correct_index = question.correct_index;
    let explanation = question.explanation.clone();
    let correct = answer_index == correct_index;
    let base_damage = catalog.damage.base_damage(question.difficulty);

    let team = battle.team_progress.get_mut(team_id)?;
    let team_name = team.name.clone();
    let mut result = CombatResult {
        correct,
        damage: 0,
        critical_hit: false,
        shielded: false,
        counterattack: None,
        correct_index,
        explanation,
        team_finished: false,
        status: BattleStatus::Active,
    };

    let entry = if correct {
        let mut damage = base_damage;
        if team.critical_hit_active {
            damage *= 2;
            team.critical_hit_active = false;
            result.critical_hit = true;
        }
        team.damage += damage;
        team.correct_count += 1;
        battle.boss.current_hp = battle.boss.current_hp.saturating_sub(damage);
        result.damage = damage;

        let mut entry = LogEntry::new(
            now,
            LogKind::Attack,
            if result.critical_hit {
                format!("{team_name} lands a critical hit for {damage}!")
            } else {
                format!("{team_name} hits {} for {damage}", battle.boss.name)
            },
        );
        entry.damage = Some(damage);
        entry.critical_hit = result.critical_hit;
        entry
    } else {
        team.wrong_count += 1;
        let counter = match catalog.counterattacks.len() {
            0 => None,
            len => catalog.counterattacks.get(rng.below(len)),
        };

        let mut entry = LogEntry::new(now, LogKind::Miss, format!("{team_name} missed"));
        if let Some(counter) = counter {
            let mut hit = CounterattackHit {
                name: counter.name.clone(),
                icon: counter.icon.clone(),
                flavor: counter.flavor.clone(),
                class_damage: 0,
                boss_heal: 0,
            };
            if team.shield_active {
                team.shield_active = false;
                result.shielded = true;
                entry.message = format!("{team_name}'s shield blocks {}", counter.name);
            } else {
                battle.class_hp.current = battle.class_hp.current.saturating_sub(counter.class_damage);
                hit.class_damage = counter.class_damage;
                if let Some(heal) = counter.boss_heal {
                    let healed = battle.boss.current_hp.saturating_add(heal).min(battle.boss.max_hp);
                    hit.boss_heal = healed - battle.boss.current_hp;
                    battle.boss.current_hp = healed;
                }
                entry.message = format!(
                    "{team_name} missed; {} strikes the class for {}",
                    counter.name, counter.class_damage
                );
                entry.class_damage = Some(hit.class_damage);
                entry.boss_heal = (hit.boss_heal > 0).then_some(hit.boss_heal);
            }
            entry.shielded = result.shielded;
            entry.counterattack = Some(counter.name.clone());
            result.counterattack = Some(hit);
        }
        entry
    };

    team.current_index += 1;
    if team.current_index >= team.question_order.len() {
        team.finished = true;
    }
    team.shield_cooldown = team.shield_cooldown.saturating_sub(1);
    team.crit_cooldown = team.crit_cooldown.saturating_sub(1);
    result.team_finished = team.finished;

    if battle.boss.current_hp == 0 {
        battle.conclude(BattleStatus::Victory, now);
    } else if battle.class_hp.current == 0 {
        battle.conclude(BattleStatus::Defeat, now);
    } else if battle.all_teams_finished() {
        // Running out of questions with the boss still standing counts as a loss.
        battle.conclude(BattleStatus::Defeat, now);
    }
    result.status = battle.status;

    battle.log.push(entry.by_team(team_id, &team_name));
    Some(result)
}

/// Arm a shield or critical hit for a team. `hint` is not a battle mutation and is rejected
/// here; see [`reveal_hint`].
pub fn activate_ability(
    battle: &mut Battle,
    team_id: &str,
    ability: AbilityKind,
    catalog: &Catalog,
    now: DateTime<Utc>,
) -> Result<(), AbilityError> {
    if !battle.is_active() {
        return Err(AbilityError::BattleInactive);
    }
    let team = battle
        .team_progress
        .get_mut(team_id)
        .ok_or(AbilityError::TeamNotFound)?;
    let cooldown = catalog.cooldown(ability);

    match ability {
        AbilityKind::Shield => {
            if team.shield_active {
                return Err(AbilityError::AlreadyActive("shield"));
            }
            if team.shield_cooldown > 0 {
                return Err(AbilityError::OnCooldown("shield", team.shield_cooldown));
            }
            team.shield_active = true;
            team.shield_cooldown = cooldown;
        }
        AbilityKind::CriticalHit => {
            if team.critical_hit_active {
                return Err(AbilityError::AlreadyActive("critical hit"));
            }
            if team.crit_cooldown > 0 {
                return Err(AbilityError::OnCooldown("critical hit", team.crit_cooldown));
            }
            team.critical_hit_active = true;
            team.crit_cooldown = cooldown;
        }
        AbilityKind::Hint => return Err(AbilityError::UnknownAbility),
    }

    let name = catalog
        .ability(ability)
        .map_or_else(|| ability.as_str().to_string(), |def| def.name.clone());
    let team_name = team.name.clone();
    let mut entry = LogEntry::new(now, LogKind::Ability, format!("{team_name} activates {name}"));
    entry.ability = Some(ability);
    battle.log.push(entry.by_team(team_id, &team_name));
    Ok(())
}
