//! Async execution of table operations.
//!
//! A [`WorkerPool`] owns a tokio runtime and runs each submitted operation to
//! completion on one of its blocking threads. The outcome is handed to a
//! single-shot completion that fires exactly once: with the operation's
//! result, or with [`OperationError::Abandoned`] if the job panicked or was
//! dropped before it could run. Where the completion runs is decided by an
//! optional [`ExecutionContext`].

use crate::error::{ClientError, ClientResult, Operation, OperationError};
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::mpsc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// A unit of work posted to an execution context.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Somewhere a completion callback can be sent to run.
pub trait ExecutionContext: Send + Sync {
    fn post(&self, task: Task);
}

/// Runs posted callbacks as tasks on that runtime. A task the runtime
/// discards unpolled, because it was shut down, runs where it is dropped.
impl ExecutionContext for Handle {
    fn post(&self, task: Task) {
        let guard = RunOnDrop::new(task);
        self.spawn(async move { guard.run() });
    }
}

/// Holds a posted task and runs it on drop if nothing ran it first.
struct RunOnDrop {
    task: Option<Task>,
}

impl RunOnDrop {
    fn new(task: Task) -> Self {
        Self { task: Some(task) }
    }

    fn run(mut self) {
        if let Some(task) = self.task.take() {
            task();
        }
    }
}

impl Drop for RunOnDrop {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            warn!("execution context discarded a posted task, running it inline");
            task();
        }
    }
}

/// Creates a loop whose [`EventLoop`] side is drained by one designated
/// thread, and whose [`LoopHandle`] side can post to it from anywhere.
pub fn event_loop() -> (LoopHandle, EventLoop) {
    let (sender, receiver) = mpsc::channel();
    (LoopHandle { sender }, EventLoop { receiver })
}

/// Posting side of an [`EventLoop`].
#[derive(Clone)]
pub struct LoopHandle {
    sender: mpsc::Sender<Task>,
}

impl ExecutionContext for LoopHandle {
    fn post(&self, task: Task) {
        if let Err(mpsc::SendError(task)) = self.sender.send(task) {
            warn!("event loop is gone, running callback on the posting thread");
            task();
        }
    }
}

/// Receiving side of a posting queue, drained by the thread that owns it.
pub struct EventLoop {
    receiver: mpsc::Receiver<Task>,
}

impl EventLoop {
    /// Runs every task already queued and returns how many ran.
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.receiver.try_recv() {
            task();
            ran += 1;
        }
        ran
    }

    /// Blocks until one task arrives and runs it. Returns `false` once every
    /// handle has been dropped and the queue is empty.
    pub fn run_next(&mut self) -> bool {
        match self.receiver.recv() {
            Ok(task) => {
                task();
                true
            }
            Err(_) => false,
        }
    }

    /// Like [`run_next`](Self::run_next) but gives up after `timeout`.
    pub fn run_next_timeout(&mut self, timeout: Duration) -> bool {
        match self.receiver.recv_timeout(timeout) {
            Ok(task) => {
                task();
                true
            }
            Err(_) => false,
        }
    }
}

type Callback<T> = Box<dyn FnOnce(ClientResult<T>) + Send + 'static>;

/// Single-shot delivery of one operation's outcome.
struct Completion<T: Send + 'static> {
    operation: Operation,
    context: Option<Arc<dyn ExecutionContext>>,
    callback: Option<Callback<T>>,
}

impl<T: Send + 'static> Completion<T> {
    fn complete(mut self, result: ClientResult<T>) {
        self.deliver(result);
    }

    fn deliver(&mut self, result: ClientResult<T>) {
        let Some(callback) = self.callback.take() else {
            return;
        };
        match self.context.take() {
            Some(context) => {
                let guard = RunOnDrop::new(Box::new(move || callback(result)));
                context.post(Box::new(move || guard.run()));
            }
            None => callback(result),
        }
    }
}

impl<T: Send + 'static> Drop for Completion<T> {
    fn drop(&mut self) {
        if self.callback.is_some() {
            let operation = self.operation;
            warn!(%operation, "async operation dropped before running");
            self.deliver(Err(abandoned(operation, "worker pool shut down")));
        }
    }
}

fn abandoned(operation: Operation, reason: &str) -> ClientError {
    OperationError::Abandoned {
        operation,
        reason: reason.to_string(),
    }
    .into()
}

/// The result of an operation submitted without a callback. Await it, or
/// block on it with [`wait`](Self::wait) outside of async code.
pub struct Pending<T> {
    operation: Operation,
    receiver: oneshot::Receiver<ClientResult<T>>,
}

impl<T> Pending<T> {
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Blocks the calling thread until the outcome arrives.
    ///
    /// # Panics
    ///
    /// Panics when called from a thread driving an async runtime, as tokio
    /// forbids blocking there. Await the `Pending` instead; `spawn_blocking`
    /// threads and plain threads may wait.
    pub fn wait(self) -> ClientResult<T> {
        let operation = self.operation;
        self.receiver
            .blocking_recv()
            .unwrap_or_else(|_| Err(abandoned(operation, "completion channel closed")))
    }
}

impl<T> Future for Pending<T> {
    type Output = ClientResult<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let operation = this.operation;
        Pin::new(&mut this.receiver).poll(cx).map(|received| {
            received.unwrap_or_else(|_| Err(abandoned(operation, "completion channel closed")))
        })
    }
}

/// Worker pool for async table operations.
pub struct WorkerPool {
    runtime: Option<Runtime>,
}

impl WorkerPool {
    pub fn new(worker_threads: usize, max_blocking_threads: usize) -> std::io::Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(worker_threads.max(1))
            .max_blocking_threads(max_blocking_threads.max(1))
            .thread_name("mobilestack-worker")
            .enable_time()
            .build()?;
        Ok(Self {
            runtime: Some(runtime),
        })
    }

    /// Handle to the pool's runtime, usable as an [`ExecutionContext`].
    pub fn handle(&self) -> Option<Handle> {
        self.runtime.as_ref().map(|rt| rt.handle().clone())
    }

    /// Runs `job` against `owner` on a worker and hands its outcome to
    /// `callback`, posted to `context` when one is given and called on the
    /// worker otherwise.
    ///
    /// `owner` is released only after the outcome has been handed off. It may
    /// hold the last reference to whatever owns this pool, and dropping it
    /// shuts the pool down.
    pub fn dispatch<S, T, Job, F>(
        &self,
        operation: Operation,
        owner: S,
        job: Job,
        context: Option<Arc<dyn ExecutionContext>>,
        callback: F,
    ) where
        S: Send + 'static,
        T: Send + 'static,
        Job: FnOnce(&S) -> ClientResult<T> + Send + 'static,
        F: FnOnce(ClientResult<T>) + Send + 'static,
    {
        let completion = Completion {
            operation,
            context,
            callback: Some(Box::new(callback)),
        };
        let work = move || {
            debug!(%operation, "async operation started");
            let result = panic::catch_unwind(AssertUnwindSafe(|| job(&owner)))
                .unwrap_or_else(|_| Err(abandoned(operation, "worker panicked")));
            completion.complete(result);
            drop(owner);
        };

        match &self.runtime {
            Some(runtime) => {
                runtime.spawn_blocking(work);
            }
            // Dropping the closure drops the completion, which reports the
            // abandonment through the callback.
            None => drop(work),
        }
    }

    /// Runs `job` against `owner` on a worker and returns its eventual
    /// outcome.
    pub fn submit<S, T, Job>(&self, operation: Operation, owner: S, job: Job) -> Pending<T>
    where
        S: Send + 'static,
        T: Send + 'static,
        Job: FnOnce(&S) -> ClientResult<T> + Send + 'static,
    {
        let (sender, receiver) = oneshot::channel();
        self.dispatch(operation, owner, job, None, move |result| {
            let _ = sender.send(result);
        });
        Pending {
            operation,
            receiver,
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}
