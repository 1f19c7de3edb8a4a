//! Progress reporting for workflow runs.
//!
//! The executor pushes `ProgressEvent`s into a `ProgressSink`. The preferred
//! sink is a bounded channel the caller drains, which gives backpressure; a
//! closure sink is kept for callers that still want a callback.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use relay_core::{AgentVariant, RunId};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;

/// Payload of one progress notification: a status line or, for structured
/// consumers, a list of step labels.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ProgressUpdate {
    Text(String),
    Steps(Vec<String>),
}

impl ProgressUpdate {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text.as_str()),
            Self::Steps(_) => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressPhase {
    Planned,
    Initializing,
    Step,
    Processing,
    Completed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    pub run_id: RunId,
    pub agent: AgentVariant,
    /// Position of this event within its run, starting at zero.
    pub sequence: usize,
    pub phase: ProgressPhase,
    pub step_index: Option<usize>,
    pub update: ProgressUpdate,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ProgressError {
    #[error("progress receiver closed")]
    Closed,
    #[error("{0}")]
    Rejected(String),
}

#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn report(&self, event: ProgressEvent) -> Result<(), ProgressError>;
}

/// Bounded channel sink; `report` waits while the buffer is full.
#[derive(Clone, Debug)]
pub struct ChannelProgressSink {
    sender: mpsc::Sender<ProgressEvent>,
}

pub fn progress_channel(capacity: usize) -> (ChannelProgressSink, mpsc::Receiver<ProgressEvent>) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    (ChannelProgressSink { sender }, receiver)
}

#[async_trait]
impl ProgressSink for ChannelProgressSink {
    async fn report(&self, event: ProgressEvent) -> Result<(), ProgressError> {
        self.sender.send(event).await.map_err(|_| ProgressError::Closed)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryProgressSink {
    events: Arc<Mutex<Vec<ProgressEvent>>>,
}

impl InMemoryProgressSink {
    pub fn events(&self) -> Vec<ProgressEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| event.update.as_text().map(str::to_string))
            .collect()
    }
}

#[async_trait]
impl ProgressSink for InMemoryProgressSink {
    async fn report(&self, event: ProgressEvent) -> Result<(), ProgressError> {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
        Ok(())
    }
}

/// Adapts a plain callback into a sink.
pub struct CallbackProgressSink<F> {
    callback: F,
}

impl<F> CallbackProgressSink<F>
where
    F: Fn(&ProgressEvent) -> Result<(), ProgressError> + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

#[async_trait]
impl<F> ProgressSink for CallbackProgressSink<F>
where
    F: Fn(&ProgressEvent) -> Result<(), ProgressError> + Send + Sync,
{
    async fn report(&self, event: ProgressEvent) -> Result<(), ProgressError> {
        (self.callback)(&event)
    }
}
