//! Deterministic test doubles for `courier-core`.
//!
//! # Overview
//! - `MockTransport` answers from stubs keyed by URL or method + URL.
//! - `SequencedMockTransport` answers from a FIFO queue; use it to drive
//!   retry scenarios.
//! - `MockTokenProvider` returns a fixed token.
//! - `RecordingPlugin` records every hook invocation for exactly-once checks.
//!
//! None of them sleep. Compose with `RetryTransport::with_sleep` for timing.

pub mod recording;
pub mod sequenced;
pub mod stub;
pub mod token;

pub use recording::{Event, RecordingPlugin};
pub use sequenced::{QueueExhausted, SequencedMockTransport};
pub use stub::{MatchRule, MissingStub, MockTransport, Stub};
pub use token::MockTokenProvider;
