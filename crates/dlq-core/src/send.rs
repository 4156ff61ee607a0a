use aws_sdk_sqs::types::{DeleteMessageBatchRequestEntry, SendMessageBatchRequestEntry};

use crate::backend::BatchReport;
use crate::error::{sdk_message, QueueError};
use crate::sqs::{DeadLetterQueue, MessageModel};

/// Identifier of one entry in an SQS batch request.
///
/// SQS requires 1 to 80 characters drawn from alphanumerics, `-` and `_`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchId(String);

impl BatchId {
    pub fn new<S: Into<String>>(id: S) -> Result<Self, QueueError> {
        let id = id.into();
        if id.is_empty() {
            return Err(QueueError::InvalidBatchId("batch id cannot be empty".to_string()));
        }
        if id.len() > 80 {
            return Err(QueueError::InvalidBatchId(format!(
                "batch id exceeds maximum length: {} > 80 characters",
                id.len()
            )));
        }
        if let Some(c) = id.chars().find(|c| !c.is_ascii_alphanumeric() && *c != '-' && *c != '_') {
            return Err(QueueError::InvalidBatchId(format!(
                "invalid character '{c}'; allowed: alphanumeric, '-', '_'"
            )));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Splits messages into those usable as batch entries and a report holding
/// the ones whose id SQS would reject.
fn keyed(messages: &[MessageModel]) -> (Vec<(BatchId, &MessageModel)>, BatchReport) {
    let mut report = BatchReport::default();
    let mut entries = Vec::with_capacity(messages.len());

    for message in messages {
        match BatchId::new(message.message_id.as_str()) {
            Ok(id) => entries.push((id, message)),
            Err(e) => report.failed.push((message.message_id.clone(), e.to_string())),
        }
    }

    (entries, report)
}

impl DeadLetterQueue {
    /// Sends the bodies of `messages` to `queue_url` in one batch request.
    ///
    /// Entries are keyed by message id, so the returned report names the
    /// received messages. Callers keep batches at or under 10 messages.
    pub(crate) async fn send_messages(
        &self,
        queue_url: &str,
        messages: &[MessageModel],
    ) -> Result<BatchReport, QueueError> {
        let (keyed, mut report) = keyed(messages);

        // SQS doesn't allow empty batch requests
        if keyed.is_empty() {
            return Ok(report);
        }

        let entries = keyed
            .into_iter()
            .map(|(id, message)| {
                SendMessageBatchRequestEntry::builder()
                    .id(id.as_str())
                    .message_body(message.body.as_str())
                    .build()
                    .map_err(|e| QueueError::BuildEntry(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let output = self
            .client
            .send_message_batch()
            .queue_url(queue_url)
            .set_entries(Some(entries))
            .send()
            .await
            .map_err(|e| QueueError::SendBatch {
                queue_url: queue_url.to_string(),
                message: sdk_message(&e),
            })?;

        report.merge(BatchReport {
            successful: output.successful().iter().map(|e| e.id().to_string()).collect(),
            failed: output
                .failed()
                .iter()
                .map(|e| (e.id().to_string(), e.message().unwrap_or(e.code()).to_string()))
                .collect(),
        });

        Ok(report)
    }

    /// Deletes `messages` from `queue_url` using their receipt handles.
    pub(crate) async fn delete_messages(
        &self,
        queue_url: &str,
        messages: &[MessageModel],
    ) -> Result<BatchReport, QueueError> {
        let (keyed, mut report) = keyed(messages);

        if keyed.is_empty() {
            return Ok(report);
        }

        let entries = keyed
            .into_iter()
            .map(|(id, message)| {
                DeleteMessageBatchRequestEntry::builder()
                    .id(id.as_str())
                    .receipt_handle(message.receipt_handle.as_str())
                    .build()
                    .map_err(|e| QueueError::BuildEntry(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let output = self
            .client
            .delete_message_batch()
            .queue_url(queue_url)
            .set_entries(Some(entries))
            .send()
            .await
            .map_err(|e| QueueError::DeleteBatch {
                queue_url: queue_url.to_string(),
                message: sdk_message(&e),
            })?;

        report.merge(BatchReport {
            successful: output.successful().iter().map(|e| e.id().to_string()).collect(),
            failed: output
                .failed()
                .iter()
                .map(|e| (e.id().to_string(), e.message().unwrap_or(e.code()).to_string()))
                .collect(),
        });

        Ok(report)
    }
}
