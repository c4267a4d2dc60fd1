//! Scripted generation client for testing

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::generation::{CallKind, GenerationClient, GenerationRequest};

#[derive(Debug, Clone)]
enum Scripted {
    Reply(String),
    Upstream(u16),
}

impl Scripted {
    fn into_result(self, kind: CallKind) -> Result<String> {
        match self {
            Scripted::Reply(text) => Ok(text),
            Scripted::Upstream(status) => Err(Error::UpstreamService {
                status,
                body: format!("scripted failure for {kind}"),
            }),
        }
    }
}

/// Generation client that answers from per-call-kind scripts.
///
/// Queued replies are consumed in order; once a kind's queue is empty its
/// default (if any) answers every further call. A call with neither fails
/// with a 500 upstream error. Replies are produced without yielding, so
/// concurrent callers consume the queue in the order they are first polled.
#[derive(Debug, Default)]
pub struct ScriptedClient {
    queued: Mutex<HashMap<CallKind, VecDeque<Scripted>>>,
    defaults: HashMap<CallKind, Scripted>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(self, kind: CallKind, scripted: Scripted) -> Self {
        self.queued
            .lock()
            .unwrap()
            .entry(kind)
            .or_default()
            .push_back(scripted);
        self
    }

    /// Queue one reply for `kind`.
    pub fn with_reply(self, kind: CallKind, reply: impl Into<String>) -> Self {
        self.push(kind, Scripted::Reply(reply.into()))
    }

    pub fn with_replies<I, S>(self, kind: CallKind, replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        replies
            .into_iter()
            .fold(self, |client, reply| client.with_reply(kind, reply))
    }

    /// Queue one non-success response for `kind`.
    pub fn with_upstream_error(self, kind: CallKind, status: u16) -> Self {
        self.push(kind, Scripted::Upstream(status))
    }

    /// Answer every unqueued call of `kind` with `reply`.
    pub fn with_default_reply(mut self, kind: CallKind, reply: impl Into<String>) -> Self {
        self.defaults.insert(kind, Scripted::Reply(reply.into()));
        self
    }

    /// Fail every unqueued call of `kind` with `status`.
    pub fn with_default_error(mut self, kind: CallKind, status: u16) -> Self {
        self.defaults.insert(kind, Scripted::Upstream(status));
        self
    }

    pub fn calls(&self, kind: CallKind) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.kind == kind)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Every request of `kind` received so far, oldest first.
    pub fn requests(&self, kind: CallKind) -> Vec<GenerationRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.kind == kind)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl GenerationClient for ScriptedClient {
    async fn complete(&self, request: &GenerationRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());

        let queued = self
            .queued
            .lock()
            .unwrap()
            .get_mut(&request.kind)
            .and_then(VecDeque::pop_front);

        match queued.or_else(|| self.defaults.get(&request.kind).cloned()) {
            Some(scripted) => scripted.into_result(request.kind),
            None => Err(Error::UpstreamService {
                status: 500,
                body: format!("no scripted reply for {}", request.kind),
            }),
        }
    }
}
