//! Delivery contexts: where completions run before reaching the caller.
//!
//! Every transport completion is redispatched through the router's delivery
//! context, so callers see all completions on one consistent execution
//! context regardless of the thread the transport used.

use std::sync::mpsc::{self, Sender};
use std::sync::Mutex;
use std::thread;

use tracing::warn;

/// A unit of work handed to a [`DeliveryContext`].
pub type Job = Box<dyn FnOnce() + Send + 'static>;

pub trait DeliveryContext: Send + Sync {
    fn deliver(&self, job: Job);
}

/// Runs jobs immediately on the thread that delivers them.
#[derive(Debug, Clone, Copy, Default)]
pub struct Inline;

impl DeliveryContext for Inline {
    fn deliver(&self, job: Job) {
        job()
    }
}

/// A single named worker thread running jobs in FIFO order.
///
/// The thread exits once the queue is dropped and its backlog is drained.
#[derive(Debug)]
pub struct SerialQueue {
    sender: Mutex<Sender<Job>>,
    name: String,
}

impl SerialQueue {
    pub fn new(name: impl Into<String>) -> std::io::Result<Self> {
        let name = name.into();
        let (sender, receiver) = mpsc::channel::<Job>();
        thread::Builder::new().name(name.clone()).spawn(move || {
            for job in receiver {
                job();
            }
        })?;
        Ok(Self {
            sender: Mutex::new(sender),
            name,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl DeliveryContext for SerialQueue {
    fn deliver(&self, job: Job) {
        let sent = match self.sender.lock() {
            Ok(sender) => sender.send(job),
            Err(poisoned) => poisoned.into_inner().send(job),
        };
        if sent.is_err() {
            warn!(queue = %self.name, "delivery queue has shut down, dropping completion");
        }
    }
}

#[cfg(feature = "runtime")]
impl DeliveryContext for tokio::runtime::Handle {
    fn deliver(&self, job: Job) {
        self.spawn(async move { job() });
    }
}

impl<T: DeliveryContext + ?Sized> DeliveryContext for std::sync::Arc<T> {
    fn deliver(&self, job: Job) {
        (**self).deliver(job)
    }
}
