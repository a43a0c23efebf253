//! Background execution of long-running lookups.
//!
//! A [`TaskRunner`] starts one aggregation or sweep at a time on the tokio
//! runtime and returns immediately. Progress milestones and the final result
//! arrive on an event channel the caller drains from its own loop, so UI-owned
//! state is only ever touched on the caller's side.

use crate::error::DomainPriceError;
use crate::sweep::TldSweeper;
use crate::types::{AggregateResult, DomainName, ProgressEvent, ProgressSink, SweepResult};
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, error};

/// Identifier of one started operation, unique per runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TaskId(u64);

impl TaskId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Work the runner knows how to execute.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum Operation {
    /// Best offer across registrars for one domain.
    Aggregate { domain: String },

    /// Cheapest TLD variant of a base name.
    Sweep { base_name: String, tlds: Vec<String> },
}

/// Successful result of an [`Operation`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TaskOutput {
    Aggregate(AggregateResult),
    Sweep(SweepResult),
}

/// Events delivered to the caller.
#[derive(Debug, Clone)]
pub enum TaskEvent {
    /// A real milestone inside a running operation.
    Progress { task: TaskId, event: ProgressEvent },

    /// The operation finished. Sent exactly once per started task, always
    /// after that task's progress events.
    Completed {
        task: TaskId,
        operation: Operation,
        outcome: Result<TaskOutput, DomainPriceError>,
    },
}

#[derive(Debug, Default)]
struct RunnerState {
    next_id: u64,
    active: Option<TaskId>,
}

/// Runs at most one operation at a time off the caller's thread.
///
/// Completion events are emitted in the order operations complete. Separate
/// runners share nothing.
pub struct TaskRunner {
    sweeper: TldSweeper,
    state: Arc<Mutex<RunnerState>>,
    events: mpsc::UnboundedSender<TaskEvent>,
}

impl TaskRunner {
    /// Create a runner and the receiving end of its event channel.
    pub fn new(sweeper: TldSweeper) -> (Self, mpsc::UnboundedReceiver<TaskEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let runner = Self {
            sweeper,
            state: Arc::new(Mutex::new(RunnerState::default())),
            events,
        };
        (runner, receiver)
    }

    /// The operation currently in flight, if any.
    pub fn active(&self) -> Option<TaskId> {
        self.state.lock().ok().and_then(|s| s.active)
    }

    pub fn is_busy(&self) -> bool {
        self.active().is_some()
    }

    /// Start `operation` in the background and return its id immediately.
    ///
    /// Fails with [`DomainPriceError::Busy`] while another operation is
    /// active, and with an internal error outside a tokio runtime.
    pub fn start(&self, operation: Operation) -> Result<TaskId, DomainPriceError> {
        let handle = Handle::try_current()
            .map_err(|e| DomainPriceError::internal(format!("No async runtime: {}", e)))?;

        let task = {
            let mut state = self
                .state
                .lock()
                .map_err(|_| DomainPriceError::internal("Runner state poisoned"))?;
            if let Some(active) = state.active {
                return Err(DomainPriceError::Busy { active: active.0 });
            }
            state.next_id += 1;
            let task = TaskId(state.next_id);
            state.active = Some(task);
            task
        };

        debug!(task = %task, operation = ?operation, "Starting operation");

        let sweeper = self.sweeper.clone();
        let state = self.state.clone();
        let events = self.events.clone();
        let work_operation = operation.clone();
        let progress_events = events.clone();

        let inner = handle.spawn(async move {
            let sink: ProgressSink = Arc::new(move |event: ProgressEvent| {
                // A dropped receiver means nobody is listening any more
                let _ = progress_events.send(TaskEvent::Progress { task, event });
            });
            execute(&sweeper, &work_operation, &sink).await
        });

        handle.spawn(async move {
            let outcome = match inner.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(task = %task, error = %e, "Operation aborted");
                    Err(DomainPriceError::internal(format!("Operation aborted: {}", e)))
                }
            };

            // Clearing the active slot and emitting under one lock keeps a
            // follow-up task from completing ahead of this one.
            let mut guard = match state.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            guard.active = None;
            let _ = events.send(TaskEvent::Completed {
                task,
                operation,
                outcome,
            });
            drop(guard);
        });

        Ok(task)
    }
}

async fn execute(
    sweeper: &TldSweeper,
    operation: &Operation,
    sink: &ProgressSink,
) -> Result<TaskOutput, DomainPriceError> {
    match operation {
        Operation::Aggregate { domain } => {
            let domain = DomainName::parse(domain)?;
            let result = sweeper
                .aggregator()
                .aggregate_with_progress(&domain, Some(sink))
                .await;
            Ok(TaskOutput::Aggregate(result))
        }
        Operation::Sweep { base_name, tlds } => sweeper
            .sweep_with_progress(base_name, tlds, Some(sink))
            .await
            .map(TaskOutput::Sweep),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::QuoteAggregator;
    use crate::error::LookupError;
    use crate::registrars::RegistrarClient;
    use crate::types::{Price, Quote, RegistrarId};
    use async_trait::async_trait;
    use std::time::Duration;

    struct SlowRegistrar {
        id: RegistrarId,
        delay: Duration,
    }

    #[async_trait]
    impl RegistrarClient for SlowRegistrar {
        fn id(&self) -> &RegistrarId {
            &self.id
        }

        async fn check_availability(&self, domain: &DomainName) -> Result<Quote, LookupError> {
            tokio::time::sleep(self.delay).await;
            Ok(Quote::available(
                self.id.clone(),
                domain.clone(),
                Price::native(10.0, "EUR"),
            ))
        }
    }

    fn runner(delay: Duration) -> (TaskRunner, mpsc::UnboundedReceiver<TaskEvent>) {
        let client: Arc<dyn RegistrarClient> = Arc::new(SlowRegistrar {
            id: RegistrarId::new("Slow"),
            delay,
        });
        TaskRunner::new(TldSweeper::new(QuoteAggregator::new(vec![client]), 2))
    }

    async fn next_completion(
        events: &mut mpsc::UnboundedReceiver<TaskEvent>,
    ) -> (TaskId, Result<TaskOutput, DomainPriceError>) {
        loop {
            match events.recv().await.expect("channel open") {
                TaskEvent::Completed { task, outcome, .. } => return (task, outcome),
                TaskEvent::Progress { .. } => continue,
            }
        }
    }

    #[tokio::test]
    async fn test_start_returns_before_completion() {
        let (runner, mut events) = runner(Duration::from_millis(50));
        let task = runner
            .start(Operation::Aggregate {
                domain: "example.com".to_string(),
            })
            .unwrap();

        assert_eq!(runner.active(), Some(task));

        let (done, outcome) = next_completion(&mut events).await;
        assert_eq!(done, task);
        assert!(matches!(outcome, Ok(TaskOutput::Aggregate(_))));
        assert!(!runner.is_busy());
    }

    #[tokio::test]
    async fn test_second_start_is_rejected_while_busy() {
        let (runner, mut events) = runner(Duration::from_millis(50));
        let first = runner
            .start(Operation::Aggregate {
                domain: "example.com".to_string(),
            })
            .unwrap();

        let err = runner
            .start(Operation::Aggregate {
                domain: "example.net".to_string(),
            })
            .unwrap_err();
        assert!(matches!(err, DomainPriceError::Busy { active } if active == first.get()));

        let (done, outcome) = next_completion(&mut events).await;
        assert_eq!(done, first);
        assert!(outcome.is_ok());
        let second = runner
            .start(Operation::Aggregate {
                domain: "example.net".to_string(),
            })
            .unwrap();
        assert!(second > first);
    }

    #[tokio::test]
    async fn test_completions_follow_finish_order() {
        let (runner, mut events) = runner(Duration::from_millis(5));
        let mut started = Vec::new();

        for name in ["alpha.com", "beta.com", "gamma.com"] {
            started.push(
                runner
                    .start(Operation::Aggregate {
                        domain: name.to_string(),
                    })
                    .unwrap(),
            );
            let (done, _) = next_completion(&mut events).await;
            assert_eq!(done, *started.last().unwrap());
        }
    }

    #[tokio::test]
    async fn test_progress_precedes_completion() {
        let (runner, mut events) = runner(Duration::ZERO);
        runner
            .start(Operation::Sweep {
                base_name: "example".to_string(),
                tlds: vec!["com".to_string(), "net".to_string()],
            })
            .unwrap();

        let mut progress = 0;
        loop {
            match events.recv().await.unwrap() {
                TaskEvent::Progress { .. } => progress += 1,
                TaskEvent::Completed { outcome, .. } => {
                    let Ok(TaskOutput::Sweep(sweep)) = outcome else {
                        panic!("expected sweep output");
                    };
                    assert_eq!(sweep.entries.len(), 2);
                    break;
                }
            }
        }
        // one registrar milestone and one domain milestone per candidate
        assert_eq!(progress, 4);
    }

    #[tokio::test]
    async fn test_invalid_input_completes_with_error() {
        let (runner, mut events) = runner(Duration::ZERO);
        runner
            .start(Operation::Aggregate {
                domain: "nope".to_string(),
            })
            .unwrap();

        let (_, outcome) = next_completion(&mut events).await;
        assert!(matches!(outcome, Err(DomainPriceError::InvalidDomain { .. })));
        assert!(!runner.is_busy());
    }

    #[test]
    fn test_start_outside_runtime_fails() {
        let (runner, _events) = runner(Duration::ZERO);
        let err = runner
            .start(Operation::Aggregate {
                domain: "example.com".to_string(),
            })
            .unwrap_err();
        assert!(matches!(err, DomainPriceError::Internal { .. }));
    }
}
