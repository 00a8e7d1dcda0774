//! Dispatcher - 1 cycle（receive → 全メッセージ処理 → サマリ）を実行する
//!
//! # フロー
//! 1. MessageQueue::receive() で batch を取得（失敗したら cycle ごと失敗）
//! 2. メッセージごとに MessagePipeline を JoinSet に spawn（Semaphore で上限）
//! 3. 全 task を join してから CycleCompleted を emit
//!
//! 呼び出し元に見えるのは `Ok(())` か `Err(DispatchError)` だけ。
//! 個々のメッセージの成否は EventSink にしか出ない。

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{Instrument, info_span};

use crate::config::DispatchConfig;
use crate::domain::{DispatchError, DispatchEvent, DispatchTarget, Message};
use crate::ports::{EventSink, FunctionInvoker, MessageQueue};

use super::builder::DispatcherBuilder;
use super::pipeline::MessagePipeline;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct CycleTally {
    received: usize,
    succeeded: usize,
    failed: usize,
}

pub struct Dispatcher {
    queue: Arc<dyn MessageQueue>,
    invoker: Arc<dyn FunctionInvoker>,
    events: Arc<dyn EventSink>,
    config: DispatchConfig,
}

impl Dispatcher {
    pub(crate) fn new(
        queue: Arc<dyn MessageQueue>,
        invoker: Arc<dyn FunctionInvoker>,
        events: Arc<dyn EventSink>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            queue,
            invoker,
            events,
            config,
        }
    }

    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Decode a scheduled event into a target and run one cycle for it.
    ///
    /// # Errors
    ///
    /// `InvalidEvent` if the event is not a target; otherwise whatever
    /// [`Dispatcher::run_cycle`] returns.
    pub async fn handle_event(&self, event: serde_json::Value) -> Result<(), DispatchError> {
        let target: DispatchTarget = match serde_json::from_value(event) {
            Ok(target) => target,
            Err(e) => {
                let err = DispatchError::InvalidEvent(e);
                self.events.emit(&DispatchEvent::CycleAborted {
                    queue: None,
                    function: None,
                    error: err.to_string(),
                });
                return Err(err);
            }
        };
        self.run_cycle(&target).await
    }

    /// Run one receive-then-process cycle against `target`.
    ///
    /// Per-message failures are absorbed; only a failed receive is returned.
    pub async fn run_cycle(&self, target: &DispatchTarget) -> Result<(), DispatchError> {
        let span = info_span!(
            "dispatch_cycle",
            queue = %target.queue(),
            function = %target.function(),
        );

        async {
            let messages = self.receive_batch(target).await?;
            let tally = self.process_batch(target, messages).await;

            self.events.emit(&DispatchEvent::CycleCompleted {
                queue: target.queue().clone(),
                function: target.function().clone(),
                received: tally.received,
                succeeded: tally.succeeded,
                failed: tally.failed,
            });
            Ok::<(), DispatchError>(())
        }
        .instrument(span)
        .await
    }

    /// One receive call. A failure is reported at critical severity and
    /// wrapped with the target's identifiers.
    pub async fn receive_batch(&self, target: &DispatchTarget) -> Result<Vec<Message>, DispatchError> {
        match self.queue.receive(target.queue()).await {
            Ok(messages) => {
                tracing::debug!(count = messages.len(), "received batch");
                Ok(messages)
            }
            Err(source) => {
                let err = DispatchError::Receive {
                    queue: target.queue().clone(),
                    function: target.function().clone(),
                    source,
                };
                self.events.emit(&DispatchEvent::CycleAborted {
                    queue: Some(target.queue().clone()),
                    function: Some(target.function().clone()),
                    error: format!("{err}: {}", source_text(&err)),
                });
                Err(err)
            }
        }
    }

    async fn process_batch(&self, target: &DispatchTarget, messages: Vec<Message>) -> CycleTally {
        let mut tally = CycleTally {
            received: messages.len(),
            ..Default::default()
        };
        if messages.is_empty() {
            return tally;
        }

        let pipeline = MessagePipeline::new(
            Arc::new(target.clone()),
            self.queue.clone(),
            self.invoker.clone(),
            self.events.clone(),
        );
        let permits = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for message in messages {
            let pipeline = pipeline.clone();
            let permits = permits.clone();
            tasks.spawn(
                async move {
                    // the semaphore is never closed, so acquire only waits
                    let _permit = permits.acquire_owned().await.ok();
                    pipeline.process(message).await
                }
                .in_current_span(),
            );
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) if outcome.is_processed() => tally.succeeded += 1,
                Ok(_) => tally.failed += 1,
                Err(e) => {
                    tally.failed += 1;
                    self.events.emit(&DispatchEvent::PipelineAborted {
                        queue: target.queue().clone(),
                        function: target.function().clone(),
                        error: e.to_string(),
                    });
                }
            }
        }
        tally
    }
}

fn source_text(err: &DispatchError) -> String {
    std::error::Error::source(err)
        .map(ToString::to_string)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::fakes::{ScriptedInvoker, ScriptedQueue, message};
    use crate::domain::{
        InvokeError, InvokeResponse, QueueError, QueueId, ReceiptToken, Severity,
    };
    use crate::impls::{InMemoryQueue, JsonEcho, LocalInvoker, MemoryEventSink, MemoryQueueConfig};
    use crate::ports::InvocationMode;
    use rstest::rstest;

    struct Harness {
        queue: Arc<ScriptedQueue>,
        invoker: Arc<ScriptedInvoker>,
        events: Arc<MemoryEventSink>,
        dispatcher: Dispatcher,
    }

    fn harness(queue: ScriptedQueue, invoker: ScriptedInvoker) -> Harness {
        let queue = Arc::new(queue);
        let invoker = Arc::new(invoker);
        let events = Arc::new(MemoryEventSink::new());
        let dispatcher = Dispatcher::builder()
            .queue(queue.clone())
            .invoker(invoker.clone())
            .event_sink(events.clone())
            .build()
            .unwrap();
        Harness {
            queue,
            invoker,
            events,
            dispatcher,
        }
    }

    fn target() -> DispatchTarget {
        DispatchTarget::new("Q1", "F1").unwrap()
    }

    fn completed(events: &MemoryEventSink) -> (usize, usize, usize) {
        events
            .events()
            .into_iter()
            .find_map(|e| match e {
                DispatchEvent::CycleCompleted {
                    received,
                    succeeded,
                    failed,
                    ..
                } => Some((received, succeeded, failed)),
                _ => None,
            })
            .expect("cycle completed event")
    }

    #[tokio::test]
    async fn empty_receive_is_a_successful_no_op() {
        let h = harness(ScriptedQueue::with_batch(Vec::new()), ScriptedInvoker::new());

        h.dispatcher.run_cycle(&target()).await.unwrap();

        assert_eq!(h.queue.receive_calls(), vec![QueueId::new("Q1")]);
        assert!(h.invoker.requests().is_empty());
        assert!(h.queue.delete_calls().is_empty());
        assert_eq!(completed(&h.events), (0, 0, 0));
    }

    #[tokio::test]
    async fn ok_and_failed_messages_in_one_batch() {
        let h = harness(
            ScriptedQueue::with_batch(vec![message("m1", "p1", "r1"), message("m2", "p2", "r2")]),
            ScriptedInvoker::new().respond("p2", Ok(InvokeResponse::with_status(500))),
        );

        h.dispatcher.run_cycle(&target()).await.unwrap();

        assert_eq!(
            h.queue.delete_calls(),
            vec![(QueueId::new("Q1"), ReceiptToken::new("r1"))]
        );
        assert_eq!(completed(&h.events), (2, 1, 1));

        let failures = h.events.with_severity(Severity::Error);
        assert_eq!(failures.len(), 1);
        assert_eq!(
            failures[0].summary(),
            "m2 couldn't be processed. function returned status 500"
        );
    }

    #[rstest]
    #[case::transport(Err(InvokeError::Transport("reset".into())))]
    #[case::status(Ok(InvokeResponse::with_status(502)))]
    #[case::function_error(Ok(InvokeResponse::function_error("Unhandled", Vec::<u8>::new())))]
    #[tokio::test]
    async fn one_failing_message_leaves_the_rest_deleted(
        #[case] failure: Result<InvokeResponse, InvokeError>,
    ) {
        let batch = (1..=5)
            .map(|i| message(&format!("m{i}"), &format!("p{i}"), &format!("r{i}")))
            .collect();
        let h = harness(
            ScriptedQueue::with_batch(batch),
            ScriptedInvoker::new().respond("p3", failure),
        );

        h.dispatcher.run_cycle(&target()).await.unwrap();

        assert_eq!(h.invoker.requests().len(), 5);
        assert_eq!(h.queue.deleted_receipts(), vec!["r1", "r2", "r4", "r5"]);
        assert_eq!(completed(&h.events), (5, 4, 1));
    }

    #[tokio::test]
    async fn receive_failure_fails_the_cycle_without_side_effects() {
        let h = harness(
            ScriptedQueue::failing(QueueError::Unavailable("connection refused".into())),
            ScriptedInvoker::new(),
        );

        let err = h.dispatcher.run_cycle(&target()).await.unwrap_err();
        assert_eq!(h.queue.receive_calls().len(), 1);
        match &err {
            DispatchError::Receive { queue, function, source } => {
                assert_eq!(queue.as_str(), "Q1");
                assert_eq!(function.as_str(), "F1");
                assert_eq!(source, &QueueError::Unavailable("connection refused".into()));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert!(h.invoker.requests().is_empty());
        assert!(h.queue.delete_calls().is_empty());

        let events = h.events.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].severity(), Severity::Critical);
        assert!(events[0].summary().contains("connection refused"));
    }

    #[tokio::test]
    async fn delete_failure_does_not_stop_the_batch() {
        let h = harness(
            ScriptedQueue::with_batch(vec![
                message("m1", "p1", "r1"),
                message("m2", "p2", "r2"),
                message("m3", "p3", "r3"),
            ])
            .fail_delete_for("r1"),
            ScriptedInvoker::new(),
        );

        h.dispatcher.run_cycle(&target()).await.unwrap();

        assert_eq!(h.queue.deleted_receipts(), vec!["r1", "r2", "r3"]);
        assert_eq!(completed(&h.events), (3, 2, 1));
    }

    #[tokio::test]
    async fn every_call_is_synchronous_with_the_verbatim_body() {
        let body = "{\"order\": 42, \"note\": \"caf\u{e9}\"}";
        let h = harness(
            ScriptedQueue::with_batch(vec![message("m1", body, "r1")]),
            ScriptedInvoker::new(),
        );

        h.dispatcher.run_cycle(&target()).await.unwrap();

        let requests = h.invoker.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].mode, InvocationMode::RequestResponse);
        assert_eq!(requests[0].payload, body.as_bytes());
        assert_eq!(requests[0].function.as_str(), "F1");
    }

    #[tokio::test]
    async fn panicking_pipeline_is_counted_as_failed() {
        let h = harness(
            ScriptedQueue::with_batch(vec![message("m1", "p1", "r1"), message("m2", "boom", "r2")]),
            ScriptedInvoker::new().panic_on("boom"),
        );

        h.dispatcher.run_cycle(&target()).await.unwrap();

        assert_eq!(h.queue.deleted_receipts(), vec!["r1"]);
        assert_eq!(completed(&h.events), (2, 1, 1));
        assert!(h
            .events
            .events()
            .iter()
            .any(|e| matches!(e, DispatchEvent::PipelineAborted { .. })));
    }

    #[rstest]
    #[case::sequential(DispatchConfig::sequential())]
    #[case::bounded(DispatchConfig { max_concurrency: 2 })]
    #[case::unbounded(DispatchConfig { max_concurrency: 16 })]
    #[tokio::test]
    async fn concurrency_limit_does_not_change_results(#[case] config: DispatchConfig) {
        let batch = (1..=6)
            .map(|i| message(&format!("m{i}"), &format!("p{i}"), &format!("r{i}")))
            .collect();
        let queue = Arc::new(ScriptedQueue::with_batch(batch));
        let events = Arc::new(MemoryEventSink::new());
        let dispatcher = Dispatcher::builder()
            .queue(queue.clone())
            .invoker(Arc::new(
                ScriptedInvoker::new().respond("p6", Ok(InvokeResponse::with_status(500))),
            ))
            .event_sink(events.clone())
            .config(config)
            .build()
            .unwrap();

        dispatcher.run_cycle(&target()).await.unwrap();

        assert_eq!(queue.deleted_receipts().len(), 5);
        assert_eq!(completed(&events), (6, 5, 1));
    }

    #[tokio::test]
    async fn handle_event_accepts_the_scheduled_event_shape() {
        let h = harness(
            ScriptedQueue::with_batch(vec![message("m1", "p1", "r1")]),
            ScriptedInvoker::new(),
        );

        h.dispatcher
            .handle_event(serde_json::json!({"QueueUrl": "Q1", "FunctionName": "F1"}))
            .await
            .unwrap();

        assert_eq!(h.queue.receive_calls(), vec![QueueId::new("Q1")]);
        assert_eq!(h.invoker.requests()[0].function.as_str(), "F1");
    }

    #[tokio::test]
    async fn undecodable_event_never_reaches_the_queue() {
        let h = harness(ScriptedQueue::default(), ScriptedInvoker::new());

        let err = h
            .dispatcher
            .handle_event(serde_json::json!({"QueueUrl": "Q1"}))
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::InvalidEvent(_)));
        assert!(h.queue.receive_calls().is_empty());
        assert_eq!(h.events.with_severity(Severity::Critical).len(), 1);
    }

    #[tokio::test]
    async fn out_of_range_lease_surfaces_as_a_receive_error() {
        let queue = Arc::new(InMemoryQueue::new(MemoryQueueConfig {
            visibility_timeout_secs: 10_000_000_000_000,
            ..Default::default()
        }));
        let q1 = QueueId::new("Q1");
        queue.create_queue(q1.clone()).await;
        queue.send(&q1, b"{}".to_vec()).await.unwrap();

        let invoker = Arc::new(ScriptedInvoker::new());
        let dispatcher = Dispatcher::builder()
            .queue(queue)
            .invoker(invoker.clone())
            .event_sink(Arc::new(MemoryEventSink::new()))
            .build()
            .unwrap();

        let err = dispatcher.run_cycle(&target()).await.unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Receive {
                source: QueueError::Misconfigured(_),
                ..
            }
        ));
        assert!(invoker.requests().is_empty());
    }

    #[tokio::test]
    async fn drains_an_in_memory_queue_through_a_local_function() {
        let queue = Arc::new(InMemoryQueue::default());
        let q1 = QueueId::new("Q1");
        queue.create_queue(q1.clone()).await;
        queue.send(&q1, br#"{"n": 1}"#.to_vec()).await.unwrap();
        queue.send(&q1, b"not json".to_vec()).await.unwrap();

        let mut invoker = LocalInvoker::new();
        invoker.register(target().function().clone(), Arc::new(JsonEcho)).unwrap();

        let events = Arc::new(MemoryEventSink::new());
        let dispatcher = Dispatcher::builder()
            .queue(queue.clone())
            .invoker(Arc::new(invoker))
            .event_sink(events.clone())
            .build()
            .unwrap();

        dispatcher.run_cycle(&target()).await.unwrap();

        // the bad message stays leased for redelivery
        let depth = queue.depth(&q1).await.unwrap();
        assert_eq!((depth.visible, depth.in_flight), (0, 1));
        assert_eq!(completed(&events), (2, 1, 1));
    }
}
