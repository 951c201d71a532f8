//! Actor-based concurrency layer
//!
//! Each repository runs as a long-lived task owning that repository's index
//! operations; callers communicate over `mpsc` mailboxes instead of sharing
//! state behind locks. The mailbox is the per-repository exclusion slot:
//! messages are handled strictly in arrival order, so a second operation
//! against a busy repository queues behind the first instead of overlapping
//! it. A shared semaphore bounds how many repositories run at once.
//!
//! # Actors
//!
//! - [`RepositoryActor`]: owns one repository's lifecycle operations
//! - [`RepositoryRouter`]: routes to RepositoryActors, spawning on demand
//! - [`Scheduler`]: turns configured recurring tasks into queued passes

pub mod handle;
pub mod message;
mod repository;
mod router;
mod scheduler;

#[cfg(test)]
mod __tests__;

pub use repository::RepositoryActor;
pub use router::RepositoryRouter;
pub use scheduler::Scheduler;
