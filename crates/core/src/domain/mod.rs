// Domain Layer - Pure accounting logic and entities

pub mod error;
pub mod headroom;
pub mod limits;
pub mod queue_tracker;
pub mod resource;

// Re-exports
pub use error::DomainError;
pub use headroom::Headroom;
pub use limits::QueueLimits;
pub use queue_tracker::{QueueTracker, ROOT_QUEUE};
pub use resource::ResourceVector;
