//! Event execution: handlers mutating the live world.

pub mod handler;

pub use handler::{Disposition, FollowUp, HandlerContext, HandlerOutcome};
