// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("resource quota exceeded at {queue_path}: {dimension} {attempted} > {limit}")]
    ResourceQuotaExceeded {
        queue_path: String,
        dimension: String,
        attempted: i64,
        limit: i64,
    },

    #[error("application quota exceeded at {queue_path}: {attempted} running > {limit}")]
    ApplicationQuotaExceeded {
        queue_path: String,
        attempted: usize,
        limit: u32,
    },

    #[error("unknown queue {queue_path}: segment {segment} was never created")]
    UnknownQueuePath { queue_path: String, segment: String },

    #[error("usage underflow at {queue_path}: {dimension} {current} - {delta} is negative")]
    UsageUnderflow {
        queue_path: String,
        dimension: String,
        current: i64,
        delta: i64,
    },

    #[error("invalid hierarchy: {reason}")]
    InvalidHierarchy { reason: String },
}

pub type Result<T> = std::result::Result<T, DomainError>;
