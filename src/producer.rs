use crate::config::ConnectionConfig;
use crate::error::{Error, Result};
use crate::message::{self, Delivery, PendingRecord};
use rdkafka::error::KafkaError;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer as _};
use rdkafka::types::RDKafkaErrorCode;
use rdkafka::ClientConfig;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Bound on the wait for a single record's broker acknowledgment.
const ACK_TIMEOUT: Duration = Duration::from_secs(10);

/// Bound on the initial reachability check.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default pause between records in a batch, to pace a demo cluster.
pub const DEFAULT_INTER_RECORD_DELAY: Duration = Duration::from_millis(500);

/// Outcome of a batch send. A failed record is tallied, never fatal.
/// `attempted` counts the sends actually performed; it falls short of the
/// batch size only when the batch was interrupted.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchReport {
    pub attempted: usize,
    pub succeeded: usize,
}

/// JSON producer with blocking-acknowledgment sends.
///
/// Every send waits for all in-sync replicas (`acks=all`) and librdkafka
/// retries transient failures up to 3 times before the call reports final
/// failure. Not safe for concurrent use from multiple tasks; dropping the
/// producer releases the session, but call [`Producer::flush`] first or
/// queued records may be lost.
pub struct Producer {
    producer: FutureProducer,
    topic: String,
}

impl Producer {
    /// Open a session to the cluster and verify at least one broker is
    /// reachable within a bounded timeout.
    pub fn connect(config: &ConnectionConfig) -> Result<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", config.bootstrap_servers())
            .set("acks", "all")
            .set("retries", "3")
            .set("message.timeout.ms", ACK_TIMEOUT.as_millis().to_string())
            .create()
            .map_err(|e| Error::Connection(format!("failed to create producer: {e}")))?;

        // rdkafka connects lazily; a metadata fetch forces the handshake so
        // an unreachable cluster fails here instead of on the first send.
        producer
            .client()
            .fetch_metadata(None, CONNECT_TIMEOUT)
            .map_err(|e| Error::Connection(format!("cluster unreachable: {e}")))?;

        debug!(brokers = %config.bootstrap_servers(), topic = %config.topic, "producer connected");

        Ok(Self {
            producer,
            topic: config.topic.clone(),
        })
    }

    /// Send one record and block until the broker acknowledges it or the
    /// bounded wait elapses.
    pub async fn send(&self, record: &PendingRecord) -> Result<Delivery> {
        let payload = message::encode_value(&record.value)?;

        let mut future_record: FutureRecord<'_, String, Vec<u8>> =
            FutureRecord::to(&self.topic).payload(&payload);
        if let Some(key) = record.key.as_ref() {
            future_record = future_record.key(key);
        }

        match self.producer.send(future_record, ACK_TIMEOUT).await {
            Ok((partition, offset)) => {
                debug!(
                    topic = %self.topic,
                    partition,
                    offset,
                    key = record.key.as_deref().unwrap_or("<none>"),
                    "record acknowledged"
                );
                Ok(Delivery { partition, offset })
            }
            Err((KafkaError::MessageProduction(RDKafkaErrorCode::MessageTimedOut), _)) => {
                Err(Error::AckTimeout {
                    topic: self.topic.clone(),
                    timeout: ACK_TIMEOUT,
                })
            }
            Err((e, _)) => Err(Error::SendFailure(e.to_string())),
        }
    }

    /// Send records sequentially with a fixed pause between them, tallying
    /// successes. A record's failure is logged and counted; only the
    /// cancellation token stops the batch early, checked at each iteration
    /// boundary so an interrupt returns the partial tally promptly.
    pub async fn send_batch(
        &self,
        records: &[PendingRecord],
        inter_record_delay: Duration,
        cancel: &CancellationToken,
    ) -> BatchReport {
        let mut report = BatchReport::default();

        for (i, record) in records.iter().enumerate() {
            if cancel.is_cancelled() {
                warn!(
                    sent = report.attempted,
                    total = records.len(),
                    "batch interrupted, stopping"
                );
                break;
            }

            report.attempted += 1;
            match self.send(record).await {
                Ok(delivery) => {
                    report.succeeded += 1;
                    debug!(
                        record = i + 1,
                        total = records.len(),
                        partition = delivery.partition,
                        offset = delivery.offset,
                        "batch record sent"
                    );
                }
                Err(e) => {
                    warn!(record = i + 1, total = records.len(), error = %e, "batch record failed");
                }
            }

            if i + 1 < records.len() {
                // Wake early on cancel; the loop's boundary check exits.
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = tokio::time::sleep(inter_record_delay) => {}
                }
            }
        }

        report
    }

    /// Block until every submitted, not-yet-acknowledged send completes.
    pub fn flush(&self, timeout: Duration) -> Result<()> {
        self.producer
            .flush(timeout)
            .map_err(|e| Error::SendFailure(format!("flush failed: {e}")))
    }

    /// Flush outstanding sends and release the session.
    pub fn close(self, timeout: Duration) -> Result<()> {
        self.flush(timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_report_default_is_empty() {
        let report = BatchReport::default();
        assert_eq!(report.attempted, 0);
        assert_eq!(report.succeeded, 0);
    }
}
