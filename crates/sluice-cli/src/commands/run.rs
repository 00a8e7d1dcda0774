use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;

use sluice_core::Dispatcher;
use sluice_core::domain::{DispatchEvent, FunctionId, QueueId};
use sluice_core::impls::{
    HttpInvoker, InMemoryQueue, JsonEcho, LocalInvoker, MemoryEventSink, QueueDepth,
    TracingEventSink,
};
use sluice_core::ports::{EventSink, FunctionInvoker, MulticastEventSink};

use crate::config::{self, InvokerConfig, SluiceConfig};

/// What `sluice run` prints when every cycle completed.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub queue: QueueId,
    pub function: FunctionId,
    pub cycles: Vec<DispatchEvent>,
    pub failures: Vec<DispatchEvent>,
    pub depth: QueueDepth,
}

/// Execute the `run` command and print the summary as JSON.
pub async fn execute(config_path: &Path, cycles: u32, interval: Duration) -> Result<()> {
    let config = config::load(config_path)?;
    let summary = run(&config, cycles, interval).await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

/// Seed the queue, then run `cycles` dispatch cycles. Stops at the first
/// cycle-level failure.
pub async fn run(config: &SluiceConfig, cycles: u32, interval: Duration) -> Result<RunSummary> {
    let queue_id = config.target.queue().clone();
    let queue = Arc::new(InMemoryQueue::new(config.queue.clone()));
    queue.create_queue(queue_id.clone()).await;
    for seed in &config.seed {
        for _ in 0..seed.repeat {
            queue
                .send(&queue_id, seed.body.clone().into_bytes())
                .await
                .context("Failed to seed queue")?;
        }
    }
    tracing::info!(queue = %queue_id, messages = config.seeded_messages(), "queue seeded");

    let recorder = Arc::new(MemoryEventSink::new());
    let events = MulticastEventSink::new(vec![
        Arc::new(TracingEventSink::new()) as Arc<dyn EventSink>,
        recorder.clone() as Arc<dyn EventSink>,
    ]);

    let dispatcher = Dispatcher::builder()
        .queue(queue.clone())
        .invoker(build_invoker(config)?)
        .event_sink(Arc::new(events))
        .config(config.dispatch.clone())
        .build()
        .context("Failed to build dispatcher")?;

    for cycle in 1..=cycles {
        if cycle > 1 && !interval.is_zero() {
            tokio::time::sleep(interval).await;
        }
        dispatcher
            .run_cycle(&config.target)
            .await
            .with_context(|| format!("Dispatch cycle {cycle} of {cycles} failed"))?;
    }

    let depth = queue.depth(&queue_id).await?;
    let (cycle_events, failures): (Vec<_>, Vec<_>) = recorder
        .events()
        .into_iter()
        .filter(|e| {
            matches!(
                e,
                DispatchEvent::CycleCompleted { .. }
                    | DispatchEvent::MessageFailed { .. }
                    | DispatchEvent::PipelineAborted { .. }
            )
        })
        .partition(|e| matches!(e, DispatchEvent::CycleCompleted { .. }));

    Ok(RunSummary {
        queue: queue_id,
        function: config.target.function().clone(),
        cycles: cycle_events,
        failures,
        depth,
    })
}

fn build_invoker(config: &SluiceConfig) -> Result<Arc<dyn FunctionInvoker>> {
    match &config.invoker {
        InvokerConfig::Local => {
            let mut invoker = LocalInvoker::new();
            invoker.register(config.target.function().clone(), Arc::new(JsonEcho))?;
            Ok(Arc::new(invoker))
        }
        InvokerConfig::Http(http) => Ok(Arc::new(
            HttpInvoker::new(http.clone()).context("Failed to create HTTP invoker")?,
        )),
    }
}
