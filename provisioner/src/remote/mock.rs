//! Scripted command runner for tests and dry runs.
//!
//! Replies are chosen by the first rule whose pattern is a substring of the
//! command (or of the upload path). Unmatched commands succeed with empty
//! output. Every call is recorded in order.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::errors::ProvisionError;
use crate::remote::runner::{CommandRunner, ExitResult, RemoteFile};

/// What a rule answers with
#[derive(Debug, Clone)]
pub enum MockReply {
    Exit(ExitResult),
    Disconnect(String),
    Timeout,
}

#[derive(Debug)]
struct Rule {
    pattern: String,
    reply: MockReply,
    remaining: Option<usize>,
}

/// A recorded call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Run(String),
    Upload { target: RemoteFile, contents: Vec<u8> },
}

/// Test-double runner that records calls and returns scripted replies
#[derive(Debug, Default)]
pub struct MockRunner {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<MockCall>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every matching call with `reply`
    pub fn on(self, pattern: impl Into<String>, reply: MockReply) -> Self {
        self.push_rule(pattern.into(), reply, None);
        self
    }

    /// Answer only the next `times` matching calls with `reply`
    pub fn on_times(self, pattern: impl Into<String>, times: usize, reply: MockReply) -> Self {
        self.push_rule(pattern.into(), reply, Some(times));
        self
    }

    /// Succeed with `stdout`
    pub fn on_output(self, pattern: impl Into<String>, stdout: impl Into<String>) -> Self {
        self.on(pattern, MockReply::Exit(ExitResult::ok(stdout)))
    }

    /// Fail with `status` and `stderr`
    pub fn on_failure(self, pattern: impl Into<String>, status: i32, stderr: impl Into<String>) -> Self {
        self.on(pattern, MockReply::Exit(ExitResult::failed(status, stderr)))
    }

    fn push_rule(&self, pattern: String, reply: MockReply, remaining: Option<usize>) {
        if let Ok(mut rules) = self.rules.lock() {
            rules.push(Rule {
                pattern,
                reply,
                remaining,
            });
        }
    }

    fn reply_for(&self, key: &str) -> Result<ExitResult, ProvisionError> {
        let reply = match self.rules.lock() {
            Ok(mut rules) => rules
                .iter_mut()
                .find(|r| key.contains(&r.pattern) && r.remaining != Some(0))
                .map(|r| {
                    if let Some(n) = r.remaining.as_mut() {
                        *n -= 1;
                    }
                    r.reply.clone()
                }),
            Err(_) => None,
        };

        match reply {
            None => Ok(ExitResult::default()),
            Some(MockReply::Exit(result)) => Ok(result),
            Some(MockReply::Disconnect(reason)) => Err(ProvisionError::ConnectionError(reason)),
            Some(MockReply::Timeout) => Err(ProvisionError::TimeoutError {
                command: key.to_string(),
                secs: 0,
            }),
        }
    }

    fn record(&self, call: MockCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    /// Every call, in order
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Command lines run, in order
    pub fn commands(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                MockCall::Run(cmd) => Some(cmd),
                MockCall::Upload { .. } => None,
            })
            .collect()
    }

    /// Uploads performed, in order
    pub fn uploads(&self) -> Vec<(RemoteFile, Vec<u8>)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                MockCall::Upload { target, contents } => Some((target, contents)),
                MockCall::Run(_) => None,
            })
            .collect()
    }

    /// Number of commands containing `pattern`
    pub fn count_commands(&self, pattern: &str) -> usize {
        self.commands().iter().filter(|c| c.contains(pattern)).count()
    }
}

#[async_trait]
impl CommandRunner for MockRunner {
    async fn run(&self, command: &str) -> Result<ExitResult, ProvisionError> {
        self.record(MockCall::Run(command.to_string()));
        self.reply_for(command)
    }

    async fn upload(&self, contents: &[u8], target: &RemoteFile) -> Result<ExitResult, ProvisionError> {
        self.record(MockCall::Upload {
            target: target.clone(),
            contents: contents.to_vec(),
        });
        self.reply_for(&target.path)
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }
}
