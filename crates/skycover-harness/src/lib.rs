#![forbid(unsafe_code)]

//! Deterministic replay of recorded visits.
//!
//! A trace is JSONL: one [`TraceStep`] per line, each carrying a host
//! timestamp and either an input event or a panel action. Replaying feeds the
//! steps to a [`DisguiseSession`](skycover_core::DisguiseSession) over the
//! recording environment and reports every transition and effect.
//!
//! # Reproducibility
//!
//! The quick-exit target is drawn from a seeded RNG. Set `SKYCOVER_SEED` to
//! replay a run exactly:
//!
//! ```sh
//! SKYCOVER_SEED=42 cargo run -p skycover-harness -- visit.jsonl
//! ```

pub mod replay;
pub mod trace;

pub use replay::{ReplayReport, StepRecord, replay, seed_from_env};
pub use trace::{TraceAction, TraceError, TraceStep, parse_trace};
