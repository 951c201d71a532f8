//! Actor integration tests.

mod helpers;

mod concurrency;
mod scheduling;
