//! Drives every team of a battle concurrently until the battle ends, one Rayon task per team.
//! Each team answers through the engine exactly as a live client would, so simulations
//! exercise the same transactions and conflicts as a real classroom.

use rayon::prelude::*;
use serde::Serialize;

use crate::battle::BattleStatus;
use crate::combat::{RandomSource, Rng};
use crate::engine::{EngineError, RaidEngine};
use crate::parallel::pool::WorkerPool;

#[derive(Debug, Clone, Copy)]
pub struct SimulationConfig {
    /// Probability that a simulated answer is correct.
    pub accuracy: f64,
    /// Probability, per question, of trying an ability before answering.
    pub ability_rate: f64,
    pub seed: u64,
    pub pool: WorkerPool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            accuracy: 0.7,
            ability_rate: 0.2,
            seed: 7,
            pool: WorkerPool::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RaidReport {
    pub battle_id: String,
    pub status: BattleStatus,
    #[serde(rename = "bossHP")]
    pub boss_hp: u32,
    #[serde(rename = "bossMaxHP")]
    pub boss_max_hp: u32,
    #[serde(rename = "classHP")]
    pub class_hp: u32,
    pub answers: u32,
    pub correct: u32,
    pub abilities_used: u32,
    pub total_damage: u32,
}

#[derive(Debug, Default, Clone, Copy)]
struct TeamTally {
    answers: u32,
    correct: u32,
    abilities: u32,
}

pub fn simulate_raid(
    engine: &RaidEngine,
    battle_id: &str,
    config: SimulationConfig,
) -> Result<RaidReport, EngineError> {
    let battle = engine
        .get_battle(battle_id)?
        .ok_or_else(|| EngineError::NotFound(battle_id.to_string()))?;

    let mut seeds = Rng::new(config.seed);
    let teams: Vec<(String, Rng)> = battle
        .team_progress
        .keys()
        .map(|id| (id.clone(), seeds.fork()))
        .collect();

    let tallies = config.pool.install(|| {
        teams
            .into_par_iter()
            .map(|(team_id, rng)| play_team(engine, battle_id, &team_id, rng, config))
            .collect::<Result<Vec<_>, _>>()
    })?;

    let finished = engine
        .get_battle(battle_id)?
        .ok_or_else(|| EngineError::NotFound(battle_id.to_string()))?;
    let report = RaidReport {
        battle_id: battle_id.to_string(),
        status: finished.status,
        boss_hp: finished.boss.current_hp,
        boss_max_hp: finished.boss.max_hp,
        class_hp: finished.class_hp.current,
        answers: tallies.iter().map(|t| t.answers).sum(),
        correct: tallies.iter().map(|t| t.correct).sum(),
        abilities_used: tallies.iter().map(|t| t.abilities).sum(),
        total_damage: finished.total_damage(),
    };
    tracing::info!(
        battle_id,
        status = report.status.as_str(),
        answers = report.answers,
        "raid simulation finished"
    );
    Ok(report)
}

fn play_team(
    engine: &RaidEngine,
    battle_id: &str,
    team_id: &str,
    mut rng: Rng,
    config: SimulationConfig,
) -> Result<TeamTally, EngineError> {
    let mut tally = TeamTally::default();
    loop {
        let Some(battle) = engine.get_battle(battle_id)? else {
            break;
        };
        if !battle.is_active() {
            break;
        }
        let Some(question) = battle
            .team_progress
            .get(team_id)
            .and_then(|team| team.current_question())
            .and_then(|index| battle.questions.get(index))
        else {
            break;
        };

        if rng.chance(config.ability_rate) {
            let ability = if rng.chance(0.5) { "criticalHit" } else { "shield" };
            if engine.use_ability(battle_id, team_id, ability)?.error.is_none() {
                tally.abilities += 1;
            }
        }

        let answer = pick_answer(&mut rng, question.options.len(), question.correct_index, config.accuracy);
        match engine.submit_answer(battle_id, team_id, answer)? {
            Some(result) => {
                tally.answers += 1;
                if result.correct {
                    tally.correct += 1;
                }
            }
            None => break,
        }
    }
    Ok(tally)
}

fn pick_answer(rng: &mut Rng, option_count: usize, correct: usize, accuracy: f64) -> usize {
    if option_count < 2 || rng.chance(accuracy) {
        return correct;
    }
    (correct + 1 + rng.below(option_count - 1)) % option_count
}
