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

//! Loss-free, order-preserving event buffer between producers (engine
//! callbacks, session commands) and a consumer that may attach late.
//!
//! Events enqueued while no delegate is attached are buffered and flushed in
//! FIFO order the moment a delegate attaches. The "enqueue or flush" decision
//! and the delivery itself happen under one mutex, so concurrent producers
//! never observe reordering and nothing is delivered twice.
//!
//! Delegates are called with the queue lock held and must not call back into
//! the same queue.

use std::collections::VecDeque;
use std::sync::Arc;

use futures::channel::mpsc;
use log::debug;
use parking_lot::Mutex;

/// Item handed to a delegate.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery<T> {
    Event(T),
    Error { code: String, message: String },
    /// Terminal marker, always the last item a queue produces.
    EndOfStream,
}

/// Consumer side of an [`EventQueue`].
pub trait EventDelegate<T>: Send + Sync {
    fn deliver(&self, item: Delivery<T>);
}

impl<T, F> EventDelegate<T> for F
where
    F: Fn(Delivery<T>) + Send + Sync,
{
    fn deliver(&self, item: Delivery<T>) {
        self(item)
    }
}

struct QueueState<T> {
    pending: VecDeque<Delivery<T>>,
    delegate: Option<Arc<dyn EventDelegate<T>>>,
    closed: bool,
}

impl<T> QueueState<T> {
    fn flush(&mut self) {
        let Some(delegate) = self.delegate.as_ref() else { return; };
        while let Some(item) = self.pending.pop_front() {
            delegate.deliver(item);
        }
    }

    fn push(&mut self, item: Delivery<T>) -> bool {
        if self.closed {
            return false;
        }
        self.pending.push_back(item);
        self.flush();
        true
    }
}

pub struct EventQueue<T> {
    state: Mutex<QueueState<T>>,
}

impl<T> Default for EventQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EventQueue<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                pending: VecDeque::new(),
                delegate: None,
                closed: false,
            }),
        }
    }

    /// Delivers `event` now if a delegate is attached, buffers it otherwise.
    /// Returns `false` (and drops the event) once the queue is closed.
    pub fn enqueue(&self, event: T) -> bool {
        self.state.lock().push(Delivery::Event(event))
    }

    /// Queues an error envelope, ordered like any other event.
    pub fn error(&self, code: impl Into<String>, message: impl Into<String>) -> bool {
        self.state.lock().push(Delivery::Error { code: code.into(), message: message.into() })
    }

    /// Queues the end-of-stream marker and rejects everything afterwards.
    pub fn close(&self) {
        let mut state = self.state.lock();
        if state.push(Delivery::EndOfStream) {
            state.closed = true;
            debug!("Event queue closed, {} item(s) still pending", state.pending.len());
        }
    }

    /// Installs `delegate` and synchronously flushes everything buffered so far.
    pub fn attach_delegate(&self, delegate: Arc<dyn EventDelegate<T>>) {
        let mut state = self.state.lock();
        state.delegate = Some(delegate);
        state.flush();
    }

    /// Removes the current delegate; later events are buffered again.
    pub fn detach_delegate(&self) -> Option<Arc<dyn EventDelegate<T>>> {
        self.state.lock().delegate.take()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn has_delegate(&self) -> bool {
        self.state.lock().delegate.is_some()
    }

    pub fn pending_len(&self) -> usize {
        self.state.lock().pending.len()
    }
}

/// Delegate forwarding deliveries into an unbounded channel, turning a queue
/// into a `Stream` for async consumers.
pub struct ChannelDelegate<T> {
    tx: mpsc::UnboundedSender<Delivery<T>>,
}

impl<T: Send + 'static> ChannelDelegate<T> {
    pub fn channel() -> (Arc<Self>, mpsc::UnboundedReceiver<Delivery<T>>) {
        let (tx, rx) = mpsc::unbounded();
        (Arc::new(Self { tx }), rx)
    }
}

impl<T: Send + 'static> EventDelegate<T> for ChannelDelegate<T> {
    fn deliver(&self, item: Delivery<T>) {
        if self.tx.unbounded_send(item).is_err() {
            debug!("Event stream receiver dropped, discarding delivery");
        }
    }
}
