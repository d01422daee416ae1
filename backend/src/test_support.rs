//! Test utilities for the backend crate.
//!
//! Shared by unit tests (in `src/`) and integration tests (in `tests/`),
//! which enable the `test-support` feature.

pub mod in_memory_store;
pub mod runtime;

pub use in_memory_store::{InMemoryBookingStore, InMemoryTransaction, StoreCounters};
pub use runtime::{
    BlockingSleeper, FixtureClock, ImmediateSleeper, MutableClock, NoJitter, RecordingSleeper,
};
