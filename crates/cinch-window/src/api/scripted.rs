//! In-memory completion service.
//!
//! [`ScriptedService`] replays queued completions in order and records every
//! request it receives. When the queue is empty it echoes the last user
//! message, which makes it usable for offline runs of the CLI.

use crate::api::service::{Completion, CompletionFuture, CompletionRequest, CompletionService};
use crate::{MessageRole, ServiceError};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Completion service that replays a script.
#[derive(Debug, Default)]
pub struct ScriptedService {
    script: Mutex<VecDeque<Result<Completion, ServiceError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful completion.
    pub fn with_reply(self, completion: Completion) -> Self {
        self.push(Ok(completion));
        self
    }

    /// Queue a failure.
    pub fn with_error(self, error: ServiceError) -> Self {
        self.push(Err(error));
        self
    }

    /// Queue an outcome on a shared reference.
    pub fn push(&self, outcome: Result<Completion, ServiceError>) {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(outcome);
    }

    /// Every request received so far, oldest first.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Number of queued outcomes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.script.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl CompletionService for ScriptedService {
    fn complete<'a>(&'a self, request: &'a CompletionRequest) -> CompletionFuture<'a> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());

        let next = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();

        let outcome = next.unwrap_or_else(|| Ok(echo(request)));
        Box::pin(async move { outcome })
    }
}

fn echo(request: &CompletionRequest) -> Completion {
    let last_user = request
        .messages
        .iter()
        .rev()
        .find(|m| m.role == MessageRole::User)
        .and_then(|m| m.content.as_deref())
        .unwrap_or("");
    Completion::text(format!("echo: {last_user}"))
}
