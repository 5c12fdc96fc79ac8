use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Cluster unreachable or metadata fetch failed. Fatal to the current flow.
    #[error("connection error: {0}")]
    Connection(String),

    /// A record failed delivery after librdkafka's internal retries.
    /// Recorded by batch flows, which continue with the remaining records.
    #[error("send failed: {0}")]
    SendFailure(String),

    /// No broker acknowledgment within the bounded wait.
    #[error("no acknowledgment within {timeout:?} for topic '{topic}'")]
    AckTimeout { topic: String, timeout: Duration },

    #[error("consumer error: {0}")]
    Consumer(String),

    /// Administrative operation failed for a reason other than "topic
    /// already exists" (which is success, not an error).
    #[error("admin error: {0}")]
    Admin(String),

    #[error("kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("message key is not valid UTF-8: {0}")]
    InvalidKey(#[from] std::string::FromUtf8Error),
}

pub type Result<T> = std::result::Result<T, Error>;
