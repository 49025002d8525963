pub mod pool;
pub mod raid;

pub use pool::WorkerPool;
pub use raid::{simulate_raid, RaidReport, SimulationConfig};
