//! Command-line interface for kafka-smoke
//!
//! # Usage Examples
//!
//! ```bash
//! # Produce one demo record, then a paced batch of 10
//! kafka-smoke --brokers b-1.cluster:9092,b-2.cluster:9092 produce
//!
//! # Stream records until Ctrl-C (from the earliest retained offset)
//! kafka-smoke --topic test-topic --group-id test-consumer-group consume
//!
//! # Tail only (skip the backlog), stop after 20 records
//! kafka-smoke consume --from-latest --max-messages 20
//!
//! # End-to-end smoke test: connectivity, topic creation, produce, consume
//! kafka-smoke smoke
//! ```

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use kafka_smoke::{
    ConnectionConfig, Consumer, PendingRecord, Producer, StreamOptions, DEFAULT_INTER_RECORD_DELAY,
};
use serde_json::json;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "kafka-smoke")]
#[command(about = "Produce/consume demos and an end-to-end smoke test for a Kafka cluster")]
struct Cli {
    /// Cluster connection options, shared by all flows
    #[command(flatten)]
    config: ConnectionConfig,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a demo record, then a paced batch, then flush
    Produce {
        /// Number of records in the batch
        #[arg(long, default_value_t = 10)]
        count: usize,

        /// Pause between batch records, in milliseconds
        #[arg(long, default_value_t = DEFAULT_INTER_RECORD_DELAY.as_millis() as u64)]
        delay_ms: u64,
    },

    /// Stream records until Ctrl-C or an optional message limit
    Consume {
        /// Start at the latest offset instead of the earliest
        #[arg(long)]
        from_latest: bool,

        /// Stop after this many records
        #[arg(long)]
        max_messages: Option<u64>,
    },

    /// Run the end-to-end smoke test against the cluster
    Smoke,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match run_main().await {
        Ok(()) => {}
        Err(e) => {
            eprintln!("Error: {e:?}");
            std::process::exit(1);
        }
    }
}

async fn run_main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Ctrl-C cancels the token; loops check it cooperatively and release
    // their sessions before returning.
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, shutting down");
            signal_cancel.cancel();
        }
    });

    match cli.command {
        Commands::Produce { count, delay_ms } => {
            run_produce(&cli.config, count, Duration::from_millis(delay_ms), &cancel).await
        }
        Commands::Consume {
            from_latest,
            max_messages,
        } => run_consume(&cli.config, !from_latest, max_messages, &cancel).await,
        Commands::Smoke => {
            let report = kafka_smoke::smoke::run(&cli.config, &cancel).await?;
            info!(
                topics_found = report.topics_found,
                produced = report.produced,
                consumed = report.consumed,
                "smoke test passed"
            );
            Ok(())
        }
    }
}

async fn run_produce(
    config: &ConnectionConfig,
    count: usize,
    delay: Duration,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let producer = Producer::connect(config).context("failed to open producer session")?;

    // Single demo record first, reporting where the broker placed it.
    let demo = PendingRecord::new(
        "test-key",
        json!({
            "content": "kafka-smoke demo record",
            "timestamp": Utc::now().to_rfc3339(),
        }),
    );
    let delivery = producer.send(&demo).await?;
    info!(
        topic = %config.topic,
        partition = delivery.partition,
        offset = delivery.offset,
        "demo record acknowledged"
    );

    // Then the paced batch.
    let records: Vec<PendingRecord> = (0..count)
        .map(|i| {
            PendingRecord::new(
                format!("key-{i}"),
                json!({
                    "message_id": i,
                    "content": format!("batch record #{i}"),
                    "timestamp": Utc::now().to_rfc3339(),
                    "source": "kafka-smoke-producer",
                }),
            )
        })
        .collect();

    let report = producer.send_batch(&records, delay, cancel).await;
    producer
        .close(Duration::from_secs(30))
        .context("failed to flush producer")?;

    info!(
        succeeded = report.succeeded,
        attempted = report.attempted,
        "batch send complete"
    );
    Ok(())
}

async fn run_consume(
    config: &ConnectionConfig,
    from_beginning: bool,
    max_messages: Option<u64>,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let consumer =
        Consumer::connect(config, from_beginning).context("failed to open consumer session")?;

    info!(
        topic = %config.topic,
        group = %config.group_id,
        from_beginning,
        "consuming (Ctrl-C to stop)"
    );

    let opts = StreamOptions {
        max_messages,
        idle_timeout: None,
    };
    let consumed = consumer
        .run(opts, cancel, |record| {
            info!(
                topic = %record.topic,
                partition = record.partition,
                offset = record.offset,
                key = record.key.as_deref().unwrap_or("<none>"),
                timestamp = record.timestamp,
                value = %record.value,
                "received record"
            );
        })
        .await?;

    info!(consumed, "consumer stopped");
    Ok(())
}
