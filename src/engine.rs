//! Public entry point: creates battles, routes answer and ability calls through retrying
//! transactions, and exposes the administrative lifecycle operations.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use thiserror::Error;

use crate::battle::{build_battle, Battle, BattleStatus, BattleSummary, LogEntry, LogKind, NewBattle};
use crate::combat::{
    activate_ability, resolve_answer, reveal_hint, AbilityError, AbilityKind, Catalog,
    CombatResult, HintError, HintResult, ManaLedger, Rng,
};
use crate::config::EngineConfig;
use crate::store::transaction::{decode, encode};
use crate::store::{
    run_transaction, BattleStore, ListenerId, MemoryStore, Record, RetryPolicy, Step, StoreError,
    TransactionError,
};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("a battle needs at least one question")]
    EmptyQuestionPool,
    #[error("a battle needs at least one team")]
    NoTeams,
    #[error("duplicate team id '{0}'")]
    DuplicateTeam(String),
    #[error("catalog has no bosses")]
    EmptyCatalog,
    #[error("'{0}' is not a terminal status")]
    NotTerminal(&'static str),
    #[error("battle '{0}' not found")]
    NotFound(String),
    #[error("battle could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    Transaction(#[from] TransactionError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of `use_ability`, shaped for clients as `{ "error": null | "<message>" }`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct AbilityOutcome {
    pub error: Option<String>,
}

impl From<Result<(), AbilityError>> for AbilityOutcome {
    fn from(result: Result<(), AbilityError>) -> Self {
        Self {
            error: result.err().map(|e| e.to_string()),
        }
    }
}

pub struct RaidEngine {
    store: Arc<dyn BattleStore>,
    catalog: Arc<Catalog>,
    rng: Mutex<Rng>,
    retry: RetryPolicy,
    avg_team_size: u32,
}

impl std::fmt::Debug for RaidEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RaidEngine")
            .field("retry", &self.retry)
            .field("avg_team_size", &self.avg_team_size)
            .finish_non_exhaustive()
    }
}

impl RaidEngine {
    pub fn new(store: Arc<dyn BattleStore>, catalog: Arc<Catalog>, config: &EngineConfig) -> Self {
        let rng = config.seed.map_or_else(Rng::from_entropy, Rng::new);
        Self {
            store,
            catalog,
            rng: Mutex::new(rng),
            retry: config.retry_policy(),
            avg_team_size: config.avg_team_size,
        }
    }

    /// In-memory engine with the builtin catalog and a fixed seed.
    pub fn in_memory(seed: u64) -> Self {
        let config = EngineConfig {
            seed: Some(seed),
            ..EngineConfig::default()
        };
        Self::new(Arc::new(MemoryStore::new()), Arc::new(Catalog::builtin()), &config)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Draw a child RNG so the shared one is only locked briefly.
    fn fork_rng(&self) -> Rng {
        match self.rng.lock() {
            Ok(mut rng) => rng.fork(),
            Err(poisoned) => poisoned.into_inner().fork(),
        }
    }

    pub fn create_battle(&self, mut request: NewBattle) -> Result<Battle, EngineError> {
        if request.questions.is_empty() {
            return Err(EngineError::EmptyQuestionPool);
        }
        if request.teams.is_empty() {
            return Err(EngineError::NoTeams);
        }
        let mut seen = HashSet::new();
        if let Some(team) = request.teams.iter().find(|team| !seen.insert(team.id.as_str())) {
            return Err(EngineError::DuplicateTeam(team.id.clone()));
        }
        request.avg_team_size = request.avg_team_size.or(Some(self.avg_team_size));

        let mut rng = self.fork_rng();
        let mut battle = build_battle(request, &self.catalog, &mut rng, Utc::now())
            .ok_or(EngineError::EmptyCatalog)?;
        battle.version = 1;
        self.store.insert(&battle.id, encode(&battle)?)?;

        tracing::info!(
            battle_id = %battle.id,
            boss = %battle.boss.name,
            boss_hp = battle.boss.max_hp,
            class_hp = battle.class_hp.max,
            teams = battle.team_progress.len(),
            "battle created"
        );
        Ok(battle)
    }

    /// Resolve one answer. `Ok(None)` means the call was a no-op: unknown battle or team,
    /// battle already over, or team out of questions.
    pub fn submit_answer(
        &self,
        battle_id: &str,
        team_id: &str,
        answer_index: usize,
    ) -> Result<Option<CombatResult>, EngineError> {
        let outcome = run_transaction(self.store.as_ref(), battle_id, self.retry, |battle| {
            let mut rng = self.fork_rng();
            match resolve_answer(battle, team_id, answer_index, &self.catalog, &mut rng, Utc::now()) {
                Some(result) => Step::Commit(Some(result)),
                None => Step::Skip(None),
            }
        })?
        .flatten();

        if let Some(result) = &outcome {
            tracing::debug!(
                battle_id,
                team_id,
                correct = result.correct,
                damage = result.damage,
                critical = result.critical_hit,
                shielded = result.shielded,
                "answer resolved"
            );
            if result.status.is_terminal() {
                tracing::info!(battle_id, status = result.status.as_str(), "battle concluded");
            }
        }
        Ok(outcome)
    }

    /// Arm `shield` or `criticalHit`. Validation failures come back inside the outcome,
    /// never as an `Err`.
    pub fn use_ability(
        &self,
        battle_id: &str,
        team_id: &str,
        ability_id: &str,
    ) -> Result<AbilityOutcome, EngineError> {
        let ability = match AbilityKind::parse(ability_id) {
            Some(kind) if kind != AbilityKind::Hint => kind,
            _ => return Ok(AbilityOutcome::from(Err::<(), _>(AbilityError::UnknownAbility))),
        };
        let result = run_transaction(self.store.as_ref(), battle_id, self.retry, |battle| {
            match activate_ability(battle, team_id, ability, &self.catalog, Utc::now()) {
                Ok(()) => Step::Commit(Ok(())),
                Err(err) => Step::Skip(Err(err)),
            }
        })?
        .unwrap_or(Err(AbilityError::BattleNotFound));

        match &result {
            Ok(()) => tracing::debug!(battle_id, team_id, ability = ability.as_str(), "ability activated"),
            Err(err) => tracing::debug!(battle_id, team_id, ability = ability.as_str(), %err, "ability rejected"),
        }
        Ok(result.into())
    }

    /// Spend mana on a hint for the team's current question. Reads the battle, never writes it.
    pub fn use_hint(
        &self,
        battle_id: &str,
        team_id: &str,
        already_eliminated: &[usize],
        ledger: &dyn ManaLedger,
    ) -> Result<Result<HintResult, HintError>, EngineError> {
        let Some(battle) = self.get_battle(battle_id)? else {
            return Ok(Err(HintError::BattleNotFound));
        };
        let mut rng = self.fork_rng();
        Ok(reveal_hint(&battle, team_id, already_eliminated, &self.catalog, ledger, &mut rng))
    }

    /// Instructor override. Lands on the latest record, so answers committed in the meantime
    /// survive. A battle that has already ended is returned as stored.
    pub fn end_battle(&self, battle_id: &str, forced_status: BattleStatus) -> Result<Battle, EngineError> {
        if !forced_status.is_terminal() {
            return Err(EngineError::NotTerminal(forced_status.as_str()));
        }
        let now = Utc::now();
        let (battle, ended) = run_transaction(self.store.as_ref(), battle_id, self.retry, |battle| {
            if !battle.is_active() {
                return Step::Skip((battle.clone(), false));
            }
            battle.conclude(forced_status, now);
            battle.log.push(LogEntry::new(
                now,
                LogKind::End,
                format!("Battle ended by the instructor: {}", forced_status.as_str()),
            ));
            battle.version += 1;
            Step::Commit((battle.clone(), true))
        })?
        .ok_or_else(|| EngineError::NotFound(battle_id.to_string()))?;

        if ended {
            tracing::info!(battle_id, status = forced_status.as_str(), "battle force-ended");
        } else {
            tracing::debug!(battle_id, status = battle.status.as_str(), "battle already over");
        }
        Ok(battle)
    }

    pub fn get_battle(&self, battle_id: &str) -> Result<Option<Battle>, EngineError> {
        match self.store.get(battle_id)? {
            Some(record) => Ok(Some(decode_record(battle_id, record)?)),
            None => Ok(None),
        }
    }

    /// Newest first.
    pub fn list_battles(&self) -> Result<Vec<BattleSummary>, EngineError> {
        let mut battles = Vec::new();
        for (id, record) in self.store.list()? {
            match decode_record(&id, record) {
                Ok(battle) => battles.push(BattleSummary::from(&battle)),
                Err(err) => tracing::warn!(battle_id = %id, %err, "skipping undecodable battle"),
            }
        }
        battles.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(battles)
    }

    pub fn delete_battle(&self, battle_id: &str) -> Result<bool, EngineError> {
        let removed = self.store.delete(battle_id)?;
        if removed {
            tracing::info!(battle_id, "battle deleted");
        }
        Ok(removed)
    }

    /// Push the full battle snapshot to `callback` now and after every change. Dropping the
    /// returned handle stops delivery.
    pub fn subscribe<F>(&self, battle_id: &str, callback: F) -> Subscription
    where
        F: Fn(&Battle) + Send + Sync + 'static,
    {
        let id = battle_id.to_string();
        let listener = self.store.listen(
            battle_id,
            Arc::new(move |record: &Record| match decode_record(&id, record.clone()) {
                Ok(battle) => callback(&battle),
                Err(err) => tracing::warn!(battle_id = %id, %err, "dropping undecodable snapshot"),
            }),
        );
        Subscription {
            store: self.store.clone(),
            battle_id: battle_id.to_string(),
            listener,
        }
    }
}

fn decode_record(id: &str, record: Record) -> Result<Battle, TransactionError> {
    let mut battle = decode(id, record.doc)?;
    battle.version = record.version;
    Ok(battle)
}

/// Live change feed for one battle; unsubscribes on drop.
pub struct Subscription {
    store: Arc<dyn BattleStore>,
    battle_id: String,
    listener: ListenerId,
}

impl Subscription {
    pub fn battle_id(&self) -> &str {
        &self.battle_id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.store.unlisten(&self.battle_id, self.listener);
    }
}
