use crate::config::ConnectionConfig;
use crate::error::{Error, Result};
use crate::message::{self, Record};
use rdkafka::consumer::{Consumer as RdkafkaConsumer, StreamConsumer};
use rdkafka::message::{BorrowedMessage, Message as RdkafkaMessage};
use rdkafka::ClientConfig;
use std::time::Duration;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Offsets are auto-committed on this interval, decoupled from record
/// processing. A crash between processing and the next commit redelivers
/// on restart with the same group: at-least-once, never loss.
const AUTO_COMMIT_INTERVAL: Duration = Duration::from_secs(1);

const SESSION_TIMEOUT: Duration = Duration::from_secs(30);

/// Bounds for one call to [`Consumer::run`]. `max_messages` is per call,
/// not cumulative across calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamOptions {
    pub max_messages: Option<u64>,
    /// Terminate after this long with no new record, instead of blocking
    /// forever. Used by the smoke flow.
    pub idle_timeout: Option<Duration>,
}

/// JSON consumer bound to one topic and consumer group.
///
/// Not safe for concurrent use from multiple tasks. Dropping the consumer
/// releases the subscription and session on every exit path.
pub struct Consumer {
    consumer: StreamConsumer,
    topic: String,
}

impl Consumer {
    /// Subscribe to the configured topic under the configured group.
    ///
    /// With `from_beginning` the reset policy is `earliest`: a group with no
    /// committed offset starts at the earliest retained record. Otherwise it
    /// starts at the tail and sees only records produced after subscription.
    pub fn connect(config: &ConnectionConfig, from_beginning: bool) -> Result<Self> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", config.bootstrap_servers())
            .set("group.id", &config.group_id)
            .set(
                "auto.offset.reset",
                if from_beginning { "earliest" } else { "latest" },
            )
            .set("enable.auto.commit", "true")
            .set(
                "auto.commit.interval.ms",
                AUTO_COMMIT_INTERVAL.as_millis().to_string(),
            )
            .set(
                "session.timeout.ms",
                SESSION_TIMEOUT.as_millis().to_string(),
            )
            .set("enable.partition.eof", "false")
            .create()
            .map_err(|e| Error::Connection(format!("failed to create consumer: {e}")))?;

        consumer
            .subscribe(&[&config.topic])
            .map_err(|e| Error::Consumer(format!("failed to subscribe to topic: {e}")))?;

        debug!(
            brokers = %config.bootstrap_servers(),
            topic = %config.topic,
            group = %config.group_id,
            "consumer subscribed"
        );

        Ok(Self {
            consumer,
            topic: config.topic.clone(),
        })
    }

    /// Receive and decode one record. Returns `Ok(None)` if `idle_timeout`
    /// elapses with nothing arriving; blocks indefinitely without one.
    pub async fn next_record(&self, idle_timeout: Option<Duration>) -> Result<Option<Record>> {
        let received = match idle_timeout {
            Some(idle) => match timeout(idle, self.consumer.recv()).await {
                Ok(res) => res,
                Err(_) => return Ok(None),
            },
            None => self.consumer.recv().await,
        };

        let msg =
            received.map_err(|e| Error::Consumer(format!("error receiving message: {e}")))?;
        self.decode_message(&msg).map(Some)
    }

    /// The streaming loop: decode records and hand each to `on_record`
    /// until `max_messages` is reached, `idle_timeout` elapses, or the
    /// cancellation token fires. The token is checked at every iteration
    /// boundary, so an interrupt never leaves the loop mid-wait.
    ///
    /// Returns the number of records consumed in this call. The session
    /// stays open afterwards; drop the consumer to release it.
    pub async fn run<F>(
        &self,
        opts: StreamOptions,
        cancel: &CancellationToken,
        mut on_record: F,
    ) -> Result<u64>
    where
        F: FnMut(Record),
    {
        let mut consumed = 0u64;

        loop {
            if let Some(max) = opts.max_messages {
                if consumed >= max {
                    info!(consumed, max, topic = %self.topic, "message limit reached");
                    break;
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    info!(consumed, topic = %self.topic, "interrupted, stopping consume loop");
                    break;
                }
                next = self.next_record(opts.idle_timeout) => match next {
                    Ok(Some(record)) => {
                        consumed += 1;
                        on_record(record);
                    }
                    Ok(None) => {
                        info!(
                            consumed,
                            idle_timeout = ?opts.idle_timeout,
                            topic = %self.topic,
                            "no new records within idle timeout"
                        );
                        break;
                    }
                    // A malformed record is skipped, not fatal: the flow
                    // reports partial progress rather than aborting.
                    Err(e @ (Error::Serialization(_) | Error::InvalidKey(_))) => {
                        warn!(error = %e, topic = %self.topic, "skipping undecodable record");
                    }
                    Err(e) => return Err(e),
                },
            }
        }

        Ok(consumed)
    }

    fn decode_message(&self, msg: &BorrowedMessage<'_>) -> Result<Record> {
        let payload = msg
            .payload()
            .ok_or_else(|| Error::Consumer("message has no payload".to_string()))?;

        Ok(Record {
            key: message::decode_key(msg.key())?,
            value: message::decode_value(payload)?,
            topic: msg.topic().to_string(),
            partition: msg.partition(),
            offset: msg.offset(),
            timestamp: msg.timestamp().to_millis(),
        })
    }
}
