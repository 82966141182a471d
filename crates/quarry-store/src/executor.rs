//! Single-connection executor
//!
//! One dedicated OS thread owns the storage engine. Async callers submit
//! closures over a channel and await the result on a oneshot, so every
//! statement runs sequentially against the one connection and concurrent
//! callers queue instead of racing.

use crate::engine::StorageEngine;
use crate::errors::{closed, io_error, Result};
use quarry_core::errors::{ExError, ExErrorKind};
use std::sync::{Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use tokio::sync::{mpsc, oneshot};

type Job = Box<dyn FnOnce(&mut dyn StorageEngine) + Send>;

/// Handle to the executor thread
pub struct Executor {
    sender: Mutex<Option<mpsc::UnboundedSender<Job>>>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl Executor {
    /// Move `engine` onto a new executor thread
    pub fn spawn(engine: Box<dyn StorageEngine>) -> Result<Self> {
        let (sender, receiver) = mpsc::unbounded_channel::<Job>();

        let thread = thread::Builder::new()
            .name("quarry-executor".to_string())
            .spawn(move || run_executor(engine, receiver))
            .map_err(|e| io_error("spawn_executor", e))?;

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            thread: Mutex::new(Some(thread)),
        })
    }

    /// Run `f` against the engine and await its result
    ///
    /// # Errors
    ///
    /// Returns whatever `f` returns, or `ConnectionFailed` once the executor
    /// has been shut down.
    pub async fn run<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut dyn StorageEngine) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply, response) = oneshot::channel();
        self.submit(Box::new(move |engine| {
            let _ = reply.send(f(engine));
        }))?;

        response.await.map_err(|_| {
            ExError::new(ExErrorKind::Internal)
                .with_op("executor")
                .with_message("executor dropped the request")
        })?
    }

    pub fn is_open(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|s| !s.is_closed())
    }

    /// Stop accepting work, wait for queued jobs to finish and join the
    /// thread
    ///
    /// Safe to call more than once.
    pub async fn shutdown(&self) {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(sender) = sender else {
            return;
        };

        // Queued behind everything already submitted
        let (done, drained) = oneshot::channel::<()>();
        let barrier: Job = Box::new(move |_| {
            let _ = done.send(());
        });
        if sender.send(barrier).is_ok() {
            let _ = drained.await;
        }
        drop(sender);

        let handle = self
            .thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            let _ = tokio::task::spawn_blocking(move || handle.join()).await;
        }
        tracing::debug!("executor stopped");
    }

    fn submit(&self, job: Job) -> Result<()> {
        let guard = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let sender = guard.as_ref().ok_or_else(closed)?;
        sender.send(job).map_err(|_| closed())
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        // Closing the channel lets the thread exit once the queue drains.
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

fn run_executor(mut engine: Box<dyn StorageEngine>, mut receiver: mpsc::UnboundedReceiver<Job>) {
    tracing::debug!("executor started");
    while let Some(job) = receiver.blocking_recv() {
        job(engine.as_mut());
    }
    if engine.in_transaction() {
        let _ = engine.rollback();
    }
}
