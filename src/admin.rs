use crate::config::ConnectionConfig;
use crate::error::{Error, Result};
use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::client::DefaultClientContext;
use rdkafka::types::RDKafkaErrorCode;
use rdkafka::ClientConfig;
use std::time::Duration;
use tracing::{debug, info};

const OPERATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Outcome of [`ClusterAdmin::ensure_topic`]. "Already exists" is the
/// expected second-run outcome of an idempotent create, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicStatus {
    Created,
    AlreadyExists,
}

/// Administrative channel for metadata queries and topic creation.
pub struct ClusterAdmin {
    admin: AdminClient<DefaultClientContext>,
}

impl ClusterAdmin {
    pub fn connect(config: &ConnectionConfig) -> Result<Self> {
        let admin: AdminClient<DefaultClientContext> = ClientConfig::new()
            .set("bootstrap.servers", config.bootstrap_servers())
            .create()
            .map_err(|e| Error::Connection(format!("failed to create admin client: {e}")))?;

        Ok(Self { admin })
    }

    /// Fetch the set of existing topic names. Doubles as the connectivity
    /// check: an unreachable cluster fails here with `Error::Connection`.
    pub fn list_topics(&self, timeout: Duration) -> Result<Vec<String>> {
        let metadata = self
            .admin
            .inner()
            .fetch_metadata(None, timeout)
            .map_err(|e| Error::Connection(format!("metadata fetch failed: {e}")))?;

        let topics = metadata
            .topics()
            .iter()
            .map(|t| t.name().to_string())
            .collect::<Vec<_>>();
        debug!(count = topics.len(), "fetched cluster topics");
        Ok(topics)
    }

    /// Create the topic if it does not exist. Idempotent: a
    /// `TopicAlreadyExists` result from the broker is success.
    pub async fn ensure_topic(
        &self,
        topic: &str,
        partitions: i32,
        replication_factor: i32,
    ) -> Result<TopicStatus> {
        let new_topic = NewTopic::new(topic, partitions, TopicReplication::Fixed(replication_factor));
        let opts = AdminOptions::new().operation_timeout(Some(OPERATION_TIMEOUT));

        let results = self
            .admin
            .create_topics(&[new_topic], &opts)
            .await
            .map_err(|e| Error::Admin(format!("topic creation request failed: {e}")))?;

        match results.into_iter().next() {
            Some(Ok(name)) => {
                info!(topic = %name, partitions, replication_factor, "topic created");
                Ok(TopicStatus::Created)
            }
            Some(Err((name, RDKafkaErrorCode::TopicAlreadyExists))) => {
                info!(topic = %name, "topic already exists");
                Ok(TopicStatus::AlreadyExists)
            }
            Some(Err((name, code))) => Err(Error::Admin(format!(
                "failed to create topic '{name}': {code}"
            ))),
            None => Err(Error::Admin(
                "broker returned no result for topic creation".to_string(),
            )),
        }
    }
}
