// Copyright 2025 HEM Sp. z o.o.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Per-session single-worker command lane.
//!
//! Every job submitted to a lane runs on one dedicated OS thread, strictly in
//! submission order and never concurrently with another job of the same lane.
//! Pending (not yet started) work can be cleared; a cleared job resolves its
//! ticket with [`LaneError::Superseded`]. A terminal job closes the lane: it is
//! the last job that ever runs there.

use std::future::Future;
use std::io;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::thread;

use log::{debug, error};
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};

use crate::error::LaneError;

type Job = Box<dyn FnOnce() + Send + 'static>;

struct Envelope {
    epoch: u64,
    job: Job,
}

/// Completion handle of a submitted job.
///
/// Await it from async code, or call [`LaneTicket::wait`] from a plain thread.
#[must_use = "a ticket does nothing unless waited on; drop it explicitly to fire and forget"]
pub struct LaneTicket<R> {
    rx: oneshot::Receiver<Result<R, LaneError>>,
}

impl<R> LaneTicket<R> {
    /// Blocks until the job finished or was dropped.
    ///
    /// Must not be called from inside an async runtime, nor from the lane's
    /// own worker thread.
    pub fn wait(self) -> Result<R, LaneError> {
        self.rx.blocking_recv().unwrap_or(Err(LaneError::Superseded))
    }
}

impl<R> Future for LaneTicket<R> {
    type Output = Result<R, LaneError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(LaneError::Superseded)))
    }
}

pub struct CommandLane {
    name: String,
    epoch: Arc<AtomicU64>,
    sender: Mutex<Option<mpsc::UnboundedSender<Envelope>>>,
}

impl CommandLane {
    /// Spawns the worker thread, named `name`.
    pub fn spawn(name: impl Into<String>) -> io::Result<Self> {
        let name = name.into();
        let epoch = Arc::new(AtomicU64::new(0));
        let (tx, mut rx) = mpsc::unbounded_channel::<Envelope>();

        let worker_epoch = epoch.clone();
        let worker_name = name.clone();
        thread::Builder::new().name(name.clone()).spawn(move || {
            while let Some(envelope) = rx.blocking_recv() {
                if envelope.epoch < worker_epoch.load(Ordering::Acquire) {
                    debug!("Lane {}: skipping superseded job", worker_name);
                    continue;
                }
                (envelope.job)();
            }
            debug!("Lane {} finished", worker_name);
        })?;

        Ok(Self { name, epoch, sender: Mutex::new(Some(tx)) })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_closed(&self) -> bool {
        self.sender.lock().is_none()
    }

    /// Queues `f` behind everything submitted so far.
    pub fn submit<F, R>(&self, f: F) -> Result<LaneTicket<R>, LaneError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let sender = self.sender.lock();
        let tx = sender.as_ref().ok_or(LaneError::Closed)?;
        self.push(tx, f)
    }

    /// Drops every job that has not started yet. The running job, if any,
    /// completes normally.
    pub fn clear_pending(&self) {
        let _sender = self.sender.lock();
        self.epoch.fetch_add(1, Ordering::AcqRel);
        debug!("Lane {}: pending jobs cleared", self.name);
    }

    /// [`CommandLane::clear_pending`] and [`CommandLane::submit`] as one step,
    /// so no other submission can slip in between.
    pub fn submit_replacing<F, R>(&self, f: F) -> Result<LaneTicket<R>, LaneError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let sender = self.sender.lock();
        let tx = sender.as_ref().ok_or(LaneError::Closed)?;
        self.epoch.fetch_add(1, Ordering::AcqRel);
        debug!("Lane {}: pending jobs replaced", self.name);
        self.push(tx, f)
    }

    /// Supersedes all pending work, queues `f` as the final job and closes the
    /// lane. The worker thread exits once `f` returns.
    pub fn shutdown<F, R>(&self, f: F) -> Result<LaneTicket<R>, LaneError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let mut sender = self.sender.lock();
        let tx = sender.take().ok_or(LaneError::Closed)?;
        self.epoch.fetch_add(1, Ordering::AcqRel);
        debug!("Lane {}: terminal job queued", self.name);
        self.push(&tx, f)
    }

    fn push<F, R>(&self, tx: &mpsc::UnboundedSender<Envelope>, f: F) -> Result<LaneTicket<R>, LaneError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (done_tx, done_rx) = oneshot::channel();
        let name = self.name.clone();
        let job: Job = Box::new(move || {
            let outcome = match catch_unwind(AssertUnwindSafe(f)) {
                Ok(value) => Ok(value),
                Err(_) => {
                    error!("Lane {}: job panicked", name);
                    Err(LaneError::Panicked)
                }
            };
            let _ = done_tx.send(outcome);
        });

        let envelope = Envelope { epoch: self.epoch.load(Ordering::Acquire), job };
        tx.send(envelope).map_err(|_| LaneError::Closed)?;
        Ok(LaneTicket { rx: done_rx })
    }
}

impl Drop for CommandLane {
    fn drop(&mut self) {
        // Dropping the sender lets the worker drain and exit on its own.
        self.sender.lock().take();
    }
}
