//! Social Simulator Core - Rust Engine
//!
//! Discrete-event simulation kernel for a population of autonomous persons
//! who post, purchase and self-develop inside a social network while
//! information trends spread among them with a decaying/growing virality
//! score.
//!
//! # Architecture
//!
//! - **core**: simulated time and the two clock strategies (instant
//!   fast-forward, wall-clock synchronized)
//! - **config**: the immutable simulation configuration and the
//!   profession/topic tables
//! - **models**: domain types (Person, Trend, SimEvent, SimulationState)
//! - **events**: event handlers mutating the live world
//! - **orchestrator**: the event queue, the main loop, and run snapshots
//! - **persistence**: the pending mutation batch and the gateway seam
//! - **rng**: deterministic random number generation
//!
//! # Critical Invariants
//!
//! 1. Dynamic person attributes stay in [0.0, 5.0]; the time budget stays
//!    on the 0.5 grid
//! 2. All randomness is deterministic (seeded RNG)
//! 3. The pending batch is cleared only after a fully successful flush

// Module declarations
pub mod config;
pub mod core;
pub mod events;
pub mod models;
pub mod orchestrator;
pub mod persistence;
pub mod rng;

// Re-exports for convenience
pub use config::{
    builtin_attribute_ranges, validate_attribute_ranges, AffinityTable, AttributeRanges,
    ConfigError, PurchaseTierConfig, SimulationConfig,
};
pub use core::clock::{Clock, ClockError, InstantClock, WallClock};
pub use core::time::{day_of, SimTime, MINUTES_PER_DAY};
pub use events::handler::{Disposition, FollowUp, HandlerContext, HandlerOutcome};
pub use models::{
    event::{EventId, EventPriority, SimEvent},
    person::{ActionKind, AttributeChange, Person, Profession, PurchaseTier, Sex},
    state::SimulationState,
    trend::{CoverageLevel, Sentiment, Topic, Trend, TrendError, TrendId},
};
pub use orchestrator::{
    compute_config_hash, validate_snapshot, EventQueue, QueuedEvent, RunSnapshot, RunSummary,
    SimulationEngine, SimulationError, SnapshotError, StopHandle, StopMode,
};
pub use persistence::{
    AttributeHistoryRecord, EventLogRecord, FlushReport, GatewayError, InMemoryGateway,
    ParticipantTrackingRecord, PendingBatch, PersistenceGateway, RunId, RunStatus,
    TrendCreationRecord,
};
pub use rng::RngManager;
