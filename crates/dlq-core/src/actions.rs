//! Purge and redrive actions over a caller-supplied batch of queues.
//!
//! Every item is handled on its own: a failing queue is reported in its
//! [`OperationResult`] and never stops the rest of the batch.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::arn::QueueArn;
use crate::backend::{BatchReport, QueueBackend};
use crate::error::QueueError;
use crate::sqs::MessageModel;

pub const PURGED: &str = "Purged successfully";
pub const REDRIVEN: &str = "Redriven successfully";

/// Upper bound on receive rounds per queue when moving messages.
pub const MAX_REDRIVE_ROUNDS: usize = 10;

/// One queue named in a purge or redrive request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueRef {
    pub queue_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_queue_arn: Option<String>,
}

/// Body of `POST /dlqs/purge` and `POST /dlqs/redrive`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct BatchRequest {
    #[serde(default)]
    pub queues: Vec<QueueRef>,
}

/// Result of acting on a single queue.
///
/// Serializes as `{"queue_url", "status"}` or `{"queue_url", "error"}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    pub queue_url: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Status(String),
    Error(String),
}

impl OperationResult {
    pub fn status(queue_url: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            queue_url: queue_url.into(),
            outcome: Outcome::Status(status.into()),
        }
    }

    pub fn error(queue_url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            queue_url: queue_url.into(),
            outcome: Outcome::Error(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Status(_))
    }
}

/// Deletes all messages from each queue, in input order.
pub async fn purge(backend: &dyn QueueBackend, queues: &[QueueRef]) -> Vec<OperationResult> {
    let mut results = Vec::with_capacity(queues.len());

    for queue in queues {
        let result = match backend.purge_queue(&queue.queue_url).await {
            Ok(()) => {
                log::info!("purged {}", queue.queue_url);
                OperationResult::status(&queue.queue_url, PURGED)
            }
            Err(e) => {
                log::error!("{e}");
                OperationResult::error(&queue.queue_url, e.to_string())
            }
        };
        results.push(result);
    }

    results
}

/// How `POST /dlqs/redrive` treats the queues it is given.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RedriveMode {
    /// Report every queue as redriven without touching the backend.
    #[default]
    Stub,
    /// Move messages from each DLQ back to its source queue.
    Move,
}

impl FromStr for RedriveMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stub" => Ok(Self::Stub),
            "move" => Ok(Self::Move),
            other => Err(format!("unknown redrive mode '{other}', expected 'stub' or 'move'")),
        }
    }
}

impl fmt::Display for RedriveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stub => write!(f, "stub"),
            Self::Move => write!(f, "move"),
        }
    }
}

/// Stage of the move at which a message failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Send,
    Delete,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Send => write!(f, "resend"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageFailure {
    pub message_id: String,
    pub stage: Stage,
    pub reason: String,
}

/// What happened to the messages of one DLQ during a move.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RedriveReport {
    /// Messages resent to the source queue and removed from the DLQ.
    pub moved: usize,
    pub failures: Vec<MessageFailure>,
    /// Set when a whole batch call failed and the move stopped early.
    pub aborted: Option<String>,
}

impl RedriveReport {
    fn record(&mut self, stage: Stage, failed: Vec<(String, String)>) {
        self.failures
            .extend(failed.into_iter().map(|(message_id, reason)| MessageFailure {
                message_id,
                stage,
                reason,
            }));
    }

    pub fn into_result(self, queue_url: &str) -> OperationResult {
        if self.failures.is_empty() && self.aborted.is_none() {
            return OperationResult::status(queue_url, format!("Redriven {} messages", self.moved));
        }

        let mut summary = format!(
            "redrove {} messages, {} failed",
            self.moved,
            self.failures.len()
        );
        if let Some(first) = self.failures.first() {
            summary.push_str(&format!(
                "; first failure: {} of message {}: {}",
                first.stage, first.message_id, first.reason
            ));
        }
        if let Some(reason) = self.aborted {
            summary.push_str(&format!("; stopped early: {reason}"));
        }
        OperationResult::error(queue_url, summary)
    }
}

/// Redrives each queue, in input order.
pub async fn redrive(backend: &dyn QueueBackend, mode: RedriveMode, queues: &[QueueRef]) -> Vec<OperationResult> {
    let mut results = Vec::with_capacity(queues.len());

    for queue in queues {
        let result = match mode {
            RedriveMode::Stub => OperationResult::status(&queue.queue_url, REDRIVEN),
            RedriveMode::Move => match move_messages(backend, queue).await {
                Ok(report) => {
                    log::info!(
                        "moved {} messages out of {} ({} failed)",
                        report.moved,
                        queue.queue_url,
                        report.failures.len()
                    );
                    report.into_result(&queue.queue_url)
                }
                Err(e) => {
                    log::error!("{e}");
                    OperationResult::error(&queue.queue_url, e.to_string())
                }
            },
        };
        results.push(result);
    }

    results
}

/// Moves messages from a DLQ back to its source queue.
///
/// Each round receives a batch, resends it, then deletes from the DLQ only the
/// messages the source queue accepted. Rounds stop when the DLQ returns no
/// messages or after [`MAX_REDRIVE_ROUNDS`]. Errors before the first round
/// (unknown source queue) are returned; a batch call failing mid-move stops
/// the move and is kept in the report alongside what was already moved.
pub async fn move_messages(backend: &dyn QueueBackend, queue: &QueueRef) -> Result<RedriveReport, QueueError> {
    let source_arn = queue
        .source_queue_arn
        .as_deref()
        .filter(|arn| !arn.is_empty())
        .ok_or_else(|| QueueError::MissingSourceQueue(queue.queue_url.clone()))?;
    let source_arn = QueueArn::parse(source_arn)?;
    let source_url = backend.queue_url_for_arn(&source_arn).await?;

    let mut report = RedriveReport::default();
    for _ in 0..MAX_REDRIVE_ROUNDS {
        match move_round(backend, &queue.queue_url, &source_url, &mut report).await {
            Ok(true) => continue,
            Ok(false) => break,
            Err(e) => {
                report.aborted = Some(e.to_string());
                break;
            }
        }
    }

    Ok(report)
}

/// Runs one receive/resend/delete round. Returns `false` once the DLQ is drained.
async fn move_round(
    backend: &dyn QueueBackend,
    dlq_url: &str,
    source_url: &str,
    report: &mut RedriveReport,
) -> Result<bool, QueueError> {
    let messages = backend.receive(dlq_url).await?;
    if messages.is_empty() {
        return Ok(false);
    }

    let sent = backend.send_batch(source_url, &messages).await?;
    let confirmed: Vec<MessageModel> = messages
        .into_iter()
        .filter(|m| sent.successful.contains(&m.message_id))
        .collect();
    report.record(Stage::Send, sent.failed);

    if !confirmed.is_empty() {
        let BatchReport { successful, failed } = backend.delete_batch(dlq_url, &confirmed).await?;
        report.moved += successful.len();
        report.record(Stage::Delete, failed);
    }

    Ok(true)
}
