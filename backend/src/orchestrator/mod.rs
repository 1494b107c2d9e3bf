//! Orchestration: the event queue, the main simulation loop, and run
//! snapshots.

pub mod engine;
pub mod queue;
pub mod snapshot;

pub use engine::{
    RunSummary, SimulationEngine, SimulationError, StopHandle, StopMode,
};
pub use queue::{EventQueue, QueuedEvent};
pub use snapshot::{compute_config_hash, validate_snapshot, RunSnapshot, SnapshotError};
