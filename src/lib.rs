//! Co-op boss battle raid engine: teams answer quiz questions to damage a shared boss while
//! defending a shared class health pool, with every write serialized through optimistic,
//! retrying transactions on one battle document.

pub mod battle;
pub mod cli;
pub mod combat;
pub mod config;
pub mod engine;
pub mod export;
pub mod lesson;
pub mod parallel;
pub mod server;
pub mod store;

pub use config::EngineConfig;
pub use engine::{AbilityOutcome, EngineError, RaidEngine, Subscription};
