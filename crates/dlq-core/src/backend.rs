//! The seam between queue management logic and the service that hosts the queues.

use async_trait::async_trait;

use crate::arn::QueueArn;
use crate::error::QueueError;
use crate::sqs::MessageModel;

/// The two attributes fetched for every queue when building the directory.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueueAttributes {
    pub queue_arn: Option<String>,
    /// Raw JSON text of the `RedrivePolicy` attribute.
    pub redrive_policy: Option<String>,
}

/// Per-entry outcome of a batch send or delete.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Message ids the backend confirmed.
    pub successful: Vec<String>,
    /// `(message id, reason)` for every entry the backend rejected.
    pub failed: Vec<(String, String)>,
}

impl BatchReport {
    pub fn merge(&mut self, other: BatchReport) {
        self.successful.extend(other.successful);
        self.failed.extend(other.failed);
    }
}

/// Operations the service needs from a message-queue backend.
///
/// [`crate::DeadLetterQueue`] implements this against AWS SQS. Handlers only
/// ever see a `dyn QueueBackend`, so tests swap in `MockQueueBackend`,
/// generated when the `mock` feature is on.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait QueueBackend: Send + Sync {
    /// Queue URLs in the order the backend enumerates them.
    async fn list_queues(&self) -> Result<Vec<String>, QueueError>;

    async fn get_queue_attributes(&self, queue_url: &str) -> Result<QueueAttributes, QueueError>;

    async fn purge_queue(&self, queue_url: &str) -> Result<(), QueueError>;

    async fn queue_url_for_arn(&self, arn: &QueueArn) -> Result<String, QueueError>;

    /// Receives up to one batch of messages, hiding them from other consumers.
    async fn receive(&self, queue_url: &str) -> Result<Vec<MessageModel>, QueueError>;

    async fn send_batch(&self, queue_url: &str, messages: &[MessageModel]) -> Result<BatchReport, QueueError>;

    async fn delete_batch(&self, queue_url: &str, messages: &[MessageModel]) -> Result<BatchReport, QueueError>;
}
