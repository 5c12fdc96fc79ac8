use clap::Parser;

/// Connection parameters shared by the producer, consumer, and admin flows.
///
/// Immutable after parsing; pass by reference into each component's
/// constructor. Defaults match the demo cluster conventions so every flow
/// runs flag-free against a local broker.
#[derive(Debug, Clone, Parser)]
pub struct ConnectionConfig {
    /// Kafka bootstrap brokers (comma-separated or multiple --brokers)
    #[clap(
        long,
        value_delimiter = ',',
        default_value = "localhost:9092",
        env = "KAFKA_BROKERS"
    )]
    pub brokers: Vec<String>,

    /// Topic to produce to / consume from
    #[clap(long, default_value = "test-topic", env = "KAFKA_TOPIC")]
    pub topic: String,

    /// Consumer group ID (consumer and smoke flows)
    #[clap(long, default_value = "test-consumer-group", env = "KAFKA_GROUP_ID")]
    pub group_id: String,
}

impl ConnectionConfig {
    pub fn new(
        brokers: Vec<String>,
        topic: impl Into<String>,
        group_id: impl Into<String>,
    ) -> Self {
        Self {
            brokers,
            topic: topic.into(),
            group_id: group_id.into(),
        }
    }

    /// Broker list in the comma-separated form librdkafka expects.
    pub fn bootstrap_servers(&self) -> String {
        self.brokers.join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConnectionConfig::try_parse_from(["kafka-smoke"]).unwrap();
        assert_eq!(config.brokers, vec!["localhost:9092"]);
        assert_eq!(config.topic, "test-topic");
        assert_eq!(config.group_id, "test-consumer-group");
    }

    #[test]
    fn test_comma_separated_brokers() {
        let config = ConnectionConfig::try_parse_from([
            "kafka-smoke",
            "--brokers",
            "b-1.cluster:9092,b-2.cluster:9092,b-3.cluster:9092",
        ])
        .unwrap();
        assert_eq!(config.brokers.len(), 3);
        assert_eq!(
            config.bootstrap_servers(),
            "b-1.cluster:9092,b-2.cluster:9092,b-3.cluster:9092"
        );
    }
}
