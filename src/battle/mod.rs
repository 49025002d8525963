pub mod factory;
pub mod log;
pub mod model;

pub use factory::{build_battle, NewBattle, TeamEntry};
pub use log::{EventLog, LogEntry, LogKind, LOG_CAPACITY};
pub use model::{Battle, BattleStatus, BattleSummary, Boss, ClassHp, Question, TeamProgress};
