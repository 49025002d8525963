pub mod hint;
pub mod resolution;
pub mod rng;
pub mod scaling;
pub mod tables;

pub use hint::{reveal_hint, HintError, HintResult, ManaError, ManaLedger, MemoryManaLedger};
pub use resolution::{activate_ability, resolve_answer, AbilityError, CombatResult, CounterattackHit};
pub use rng::{RandomSource, Rng};
pub use scaling::{boss_hp, class_hp, DEFAULT_AVG_TEAM_SIZE};
pub use tables::{
    AbilityDefinition, AbilityKind, BossDefinition, Catalog, CatalogError, Counterattack,
    DamageTable, Difficulty, DEFAULT_BASE_DAMAGE,
};
