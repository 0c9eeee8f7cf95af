//! Runs a consumer against an in-memory work queue.
//!
//! Bounded run (default): closes the consumer after `--run-secs`.
//! `--no-err`: runs until SIGINT/SIGTERM/SIGQUIT or until the pipeline stops itself.
//!
//! ```text
//! RUST_LOG=info cargo run --example consumer
//! RUST_LOG=info cargo run --example consumer -- --no-err --workers 8
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use clap::Parser;
use pullvisor::memory::{MemoryMessage, MemoryQueue};
use pullvisor::{
    Consumer, ConsumerConfig, Delay, HandlerRef, StopCause, SubscriptionTarget,
    wait_for_shutdown_signal,
};
use tracing_subscriber::EnvFilter;

const STREAM: &str = "TEST-STREAM";
const DURABLE: &str = "TEST-STREAM-C";
const SUBJECT: &str = "test.stream.foo";

#[derive(Parser, Debug)]
#[command(name = "consumer", about = "Bounded at-least-once pull consumer demo")]
struct Args {
    /// Run until a termination signal instead of closing after `--run-secs`.
    #[arg(long)]
    no_err: bool,

    /// Number of workers.
    #[arg(long, env = "PULLVISOR_WORKERS", default_value_t = 4)]
    workers: usize,

    /// Messages published before the consumer starts.
    #[arg(long, default_value_t = 100)]
    messages: usize,

    /// Simulated processing time per message, in milliseconds.
    #[arg(long, default_value_t = 1_500)]
    process_ms: u64,

    /// Bounded-run duration, in seconds.
    #[arg(long, default_value_t = 3)]
    run_secs: u64,

    /// Maximum time one fetch blocks, in milliseconds.
    #[arg(long, default_value_t = 5_000)]
    fetch_timeout_ms: u64,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    tracing::info!(bounded = !args.no_err, "application starting");

    let cfg = ConsumerConfig {
        workers: args.workers,
        fetch_timeout: Duration::from_millis(args.fetch_timeout_ms),
        ..ConsumerConfig::default()
    };

    // Poller and workers get their own threads; close() runs on the control runtime.
    let next_thread = AtomicUsize::new(1);
    let pool = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(cfg.pool_size())
        .thread_name_fn(move || {
            let id = next_thread.fetch_add(1, Ordering::Relaxed);
            format!("pullvisor-consumer-{id}")
        })
        .enable_time()
        .build()?;
    let control = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let cause = control.block_on(run(args, cfg, pool.handle().clone()))?;
    pool.shutdown_timeout(Duration::from_secs(1));

    match cause {
        Some(cause) if cause.is_failure() => tracing::error!(%cause, "application ended"),
        Some(cause) => tracing::info!(%cause, "application ended"),
        None => tracing::info!("application ended"),
    }
    Ok(())
}

async fn run(
    args: Args,
    cfg: ConsumerConfig,
    pool: tokio::runtime::Handle,
) -> anyhow::Result<Option<StopCause>> {
    let queue = MemoryQueue::new(STREAM);
    for i in 0..args.messages {
        queue.publish(i.to_string()).await;
    }

    let handler: HandlerRef<MemoryMessage> =
        Arc::new(Delay::new(Duration::from_millis(args.process_ms)));
    let mut consumer = Consumer::builder(
        queue.clone(),
        SubscriptionTarget::new(STREAM, DURABLE, SUBJECT),
        handler,
    )
    .with_config(cfg)
    .with_runtime(pool)
    .build();

    if let Err(err) = consumer.start().await {
        consumer.close().await;
        return Err(err.into());
    }

    if args.no_err {
        tokio::select! {
            res = wait_for_shutdown_signal() => match res {
                Ok(signal) => tracing::info!(%signal, "shutdown requested"),
                Err(err) => tracing::warn!(%err, "cannot listen for signals, closing"),
            },
            _ = consumer.cancelled() => {}
        }
    } else {
        tokio::time::sleep(Duration::from_secs(args.run_secs)).await;
    }

    consumer.close().await;
    tracing::info!(
        acked = queue.acked().await.len(),
        pending = queue.pending().await,
        in_flight = queue.in_flight().await,
        "queue after close"
    );
    Ok(consumer.cause().cloned())
}
