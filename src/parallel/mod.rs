//! # Parallel Runner
//!
//! Bounded-concurrency fan-out/fan-in. A [`ParallelRunner`] accepts any number
//! of tasks via [`ParallelRunner::run`] and executes at most `max_concurrency`
//! of them at a time; [`ParallelRunner::wait`] gathers the results.
//!
//! ## Concurrency Model
//!
//! Every task is spawned onto the Tokio runtime immediately, but its body only
//! starts once a permit is acquired from a shared [`Semaphore`]. Child runners
//! created with [`ParallelRunner::sub_runner`] share the parent's semaphore, so
//! any number of per-resource-type pipelines collectively respect one global
//! bound.
//!
//! ## Error Policy
//!
//! The first task error wins: it stops queued tasks from starting (tasks
//! already running are drained, not cancelled) and is the value returned by
//! `wait`. Partial results are never returned alongside an error. Result
//! ordering is unspecified; callers must treat the output as a set.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, Semaphore};
use tracing::debug;

/// Shared cancellation state between a runner, its handle and its tasks.
struct RunnerState<E> {
    cancelled: AtomicBool,
    stop_err: Mutex<Option<E>>,
}

impl<E> RunnerState<E> {
    fn new() -> Self {
        Self {
            cancelled: AtomicBool::new(false),
            stop_err: Mutex::new(None),
        }
    }

    fn is_stopped(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Cloneable handle used to interrupt a runner from outside its owner.
pub struct RunnerHandle<E> {
    state: Arc<RunnerState<E>>,
}

impl<E> Clone for RunnerHandle<E> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<E> RunnerHandle<E> {
    /// Stops the runner: queued task bodies will not start, and `wait` will
    /// return `err` unless a task error was observed first.
    pub fn stop(&self, err: E) {
        if !self.state.cancelled.swap(true, Ordering::AcqRel) {
            debug!("stopping parallel runner");
            if let Ok(mut slot) = self.state.stop_err.lock() {
                *slot = Some(err);
            }
        }
    }
}

enum TaskOutcome<T, E> {
    Done(Result<T, E>),
    Skipped,
}

/// A bounded fan-out/fan-in task runner.
pub struct ParallelRunner<T, E> {
    sem: Arc<Semaphore>,
    state: Arc<RunnerState<E>>,
    tx: mpsc::UnboundedSender<TaskOutcome<T, E>>,
    rx: mpsc::UnboundedReceiver<TaskOutcome<T, E>>,
}

impl<T, E> ParallelRunner<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Creates a runner with its own concurrency bound.
    pub fn new(max_concurrency: usize) -> Self {
        Self::with_semaphore(Arc::new(Semaphore::new(max_concurrency)))
    }

    fn with_semaphore(sem: Arc<Semaphore>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            sem,
            state: Arc::new(RunnerState::new()),
            tx,
            rx,
        }
    }

    /// Creates a child runner sharing this runner's semaphore.
    ///
    /// The child has independent error state: a failure in the child does not
    /// stop the parent or sibling runners, but tasks across the whole family
    /// never exceed the original concurrency bound.
    pub fn sub_runner<U, F>(&self) -> ParallelRunner<U, F>
    where
        U: Send + 'static,
        F: Send + 'static,
    {
        ParallelRunner::with_semaphore(Arc::clone(&self.sem))
    }

    /// Returns a handle that can stop this runner from another task.
    pub fn handle(&self) -> RunnerHandle<E> {
        RunnerHandle {
            state: Arc::clone(&self.state),
        }
    }

    /// Submits a task. The task is spawned immediately and waits for a
    /// concurrency permit before its body runs. If the runner was stopped or a
    /// previous task failed, the body is skipped entirely.
    pub fn run<Fut>(&self, task: Fut)
    where
        Fut: std::future::Future<Output = Result<T, E>> + Send + 'static,
    {
        let sem = Arc::clone(&self.sem);
        let state = Arc::clone(&self.state);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let _permit = match sem.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    let _ = tx.send(TaskOutcome::Skipped);
                    return;
                }
            };
            if state.is_stopped() {
                let _ = tx.send(TaskOutcome::Skipped);
                return;
            }
            let result = task.await;
            if result.is_err() {
                // Stop sibling tasks that have not started yet.
                state.cancelled.store(true, Ordering::Release);
            }
            let _ = tx.send(TaskOutcome::Done(result));
        });
    }

    /// Waits for every submitted task and returns the unordered successful
    /// results, or the first error observed. In-flight tasks are drained, not
    /// cancelled; their results are discarded when an error is returned.
    pub async fn wait(self) -> Result<Vec<T>, E> {
        let Self {
            sem: _sem,
            state,
            tx,
            mut rx,
        } = self;
        // Dropping our sender leaves only the per-task clones; the channel
        // closes once the last task reports in.
        drop(tx);

        let mut results = Vec::new();
        let mut first_err: Option<E> = None;
        while let Some(outcome) = rx.recv().await {
            match outcome {
                TaskOutcome::Done(Ok(value)) => results.push(value),
                TaskOutcome::Done(Err(err)) => {
                    state.cancelled.store(true, Ordering::Release);
                    if first_err.is_none() {
                        first_err = Some(err);
                    }
                }
                TaskOutcome::Skipped => {}
            }
        }

        if let Some(err) = first_err {
            return Err(err);
        }
        if let Ok(mut slot) = state.stop_err.lock() {
            if let Some(err) = slot.take() {
                return Err(err);
            }
        }
        Ok(results)
    }
}
