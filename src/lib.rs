//! Minimal Kafka interaction demos for a managed cluster (e.g. AWS MSK).
//!
//! Three flows over one shared connection config:
//!
//! - Producer: blocking acknowledged sends (`acks=all`) of JSON records,
//!   plus a paced batch mode that tallies partial success
//! - Consumer: a group-subscribed streaming loop with auto-committed
//!   offsets (at-least-once), bounded by message count or idle timeout and
//!   cancellable via a cooperative token
//! - Smoke test: connectivity check, idempotent topic creation, produce a
//!   handful of records, consume them back
//!
//! Durability, partitioning, offset management, and replication all live in
//! the broker and librdkafka; this crate is orchestration only.

/// Administrative channel: metadata queries and idempotent topic creation
pub mod admin;

/// Shared connection parameters (brokers, topic, group)
pub mod config;

/// Streaming consume loop with bounded and cancellable variants
pub mod consumer;
pub mod error;
pub mod message;

/// Blocking-acknowledgment producer and paced batch sends
pub mod producer;
pub mod smoke;

// Re-export main types for easy access
pub use admin::{ClusterAdmin, TopicStatus};
pub use config::ConnectionConfig;
pub use consumer::{Consumer, StreamOptions};
pub use error::{Error, Result};
pub use message::{Delivery, PendingRecord, Record};
pub use producer::{BatchReport, Producer, DEFAULT_INTER_RECORD_DELAY};
pub use smoke::{SmokeFailure, SmokeReport};
