//! Hints spend team mana, not battle state. The battle record is only read to find the team's
//! current question; the cost is checked and deducted against an external [`ManaLedger`].

use std::collections::HashMap;
use std::sync::Mutex;

use serde::Serialize;
use thiserror::Error;

use crate::battle::Battle;
use crate::combat::rng::RandomSource;
use crate::combat::tables::{AbilityKind, Catalog};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManaError {
    #[error("not enough mana (need {needed}, have {available})")]
    Insufficient { needed: u32, available: u32 },
    #[error("mana ledger unavailable: {0}")]
    Unavailable(String),
}

/// Balance-check-and-deduct interface of the mana subsystem.
pub trait ManaLedger: Send + Sync {
    fn balance(&self, team_id: &str) -> Result<u32, ManaError>;

    /// Atomically deduct `amount`, returning the remaining balance.
    fn spend(&self, team_id: &str, amount: u32) -> Result<u32, ManaError>;
}

#[derive(Debug, Default)]
pub struct MemoryManaLedger {
    balances: Mutex<HashMap<String, u32>>,
}

impl MemoryManaLedger {
    pub fn with_balances<I, S>(balances: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        Self {
            balances: Mutex::new(balances.into_iter().map(|(k, v)| (k.into(), v)).collect()),
        }
    }

    pub fn credit(&self, team_id: &str, amount: u32) -> Result<u32, ManaError> {
        let mut balances = self.lock()?;
        let balance = balances.entry(team_id.to_string()).or_default();
        *balance = balance.saturating_add(amount);
        Ok(*balance)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, u32>>, ManaError> {
        self.balances
            .lock()
            .map_err(|e| ManaError::Unavailable(format!("lock poisoned: {e}")))
    }
}

impl ManaLedger for MemoryManaLedger {
    fn balance(&self, team_id: &str) -> Result<u32, ManaError> {
        Ok(self.lock()?.get(team_id).copied().unwrap_or(0))
    }

    fn spend(&self, team_id: &str, amount: u32) -> Result<u32, ManaError> {
        let mut balances = self.lock()?;
        let available = balances.get(team_id).copied().unwrap_or(0);
        if available < amount {
            return Err(ManaError::Insufficient {
                needed: amount,
                available,
            });
        }
        let remaining = available - amount;
        balances.insert(team_id.to_string(), remaining);
        Ok(remaining)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HintError {
    #[error("battle not found")]
    BattleNotFound,
    #[error("battle is not active")]
    BattleInactive,
    #[error("team not found")]
    TeamNotFound,
    #[error("team has no question left")]
    TeamFinished,
    #[error("no wrong option left to remove")]
    NothingToEliminate,
    #[error(transparent)]
    Mana(#[from] ManaError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HintResult {
    pub question_index: usize,
    pub eliminated_option: usize,
    pub mana_remaining: u32,
}

/// Pick one wrong option of the team's current question (skipping `already_eliminated`) and
/// charge the hint's mana cost. Nothing is charged when no option can be removed.
pub fn reveal_hint(
    battle: &Battle,
    team_id: &str,
    already_eliminated: &[usize],
    catalog: &Catalog,
    ledger: &dyn ManaLedger,
    rng: &mut impl RandomSource,
) -> Result<HintResult, HintError> {
    if !battle.is_active() {
        return Err(HintError::BattleInactive);
    }
    let team = battle
        .team_progress
        .get(team_id)
        .ok_or(HintError::TeamNotFound)?;
    let question_index = match team.current_question() {
        Some(index) if !team.finished => index,
        _ => return Err(HintError::TeamFinished),
    };
    let question = battle
        .questions
        .get(question_index)
        .ok_or(HintError::TeamFinished)?;

    let candidates: Vec<usize> = (0..question.options.len())
        .filter(|&i| i != question.correct_index && !already_eliminated.contains(&i))
        .collect();
    if candidates.is_empty() {
        return Err(HintError::NothingToEliminate);
    }

    let cost = catalog.ability(AbilityKind::Hint).map_or(0, |a| a.mana_cost);
    let mana_remaining = ledger.spend(team_id, cost)?;
    let eliminated_option = candidates[rng.below(candidates.len())];
    tracing::debug!(team_id, question_index, eliminated_option, "hint revealed");

    Ok(HintResult {
        question_index,
        eliminated_option,
        mana_remaining,
    })
}
