//! Batch persistence: the pending-mutation accumulator and the gateway seam.

pub mod batch;
pub mod gateway;

pub use batch::{
    AttributeHistoryRecord, EventLogRecord, FlushReport, ParticipantTrackingRecord, PendingBatch,
    TrendCreationRecord,
};
pub use gateway::{GatewayError, InMemoryGateway, PersistenceGateway, RunId, RunStatus};
