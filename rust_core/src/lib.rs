//! Matchday Core - match event classification and derived state.
//!
//! This crate provides:
//! - Classification of raw operator input into structured match events,
//!   with normalized player identity and opposition marker handling
//! - Content-keyed duplicate detection for double-taps and retried
//!   webhooks
//! - Lifecycle gating from pre-match through full time
//! - Score, discipline and minutes-played state derived by folding the
//!   append-only event sequence, so replaying the ledger reproduces the
//!   live state exactly
//! - Flat notification payload assembly for downstream delivery
//! - Redis pub/sub plumbing shared by the services

pub mod errors;
pub mod models;

// Pipeline stages
pub mod assembler;
pub mod classify;
pub mod idempotency;
pub mod lifecycle;
pub mod processor;

// Derived state
pub mod discipline;
pub mod pitch_time;
pub mod scoreboard;

// Storage & delivery seams
pub mod dispatch;
pub mod ledger;
pub mod redis;

pub use classify::{classify, normalize_name, Classified, PlayerRegistry};
pub use errors::ValidationError;
pub use processor::{
    EventOutcome, MatchContext, MatchProcessor, ProcessorConfig, SubmitError,
};
