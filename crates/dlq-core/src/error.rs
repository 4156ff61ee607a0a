//! Errors raised while talking to the queue backend.

use aws_sdk_sqs::error::{DisplayErrorContext, SdkError};

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("failed to list queues: {0}")]
    ListQueues(String),

    #[error("failed to get attributes of {queue_url}: {message}")]
    GetQueueAttributes { queue_url: String, message: String },

    #[error("failed to purge {queue_url}: {message}")]
    PurgeQueue { queue_url: String, message: String },

    #[error("failed to resolve queue url for {arn}: {message}")]
    GetQueueUrl { arn: String, message: String },

    #[error("failed to receive messages from {queue_url}: {message}")]
    Receive { queue_url: String, message: String },

    #[error("failed to send batch to {queue_url}: {message}")]
    SendBatch { queue_url: String, message: String },

    #[error("failed to delete batch from {queue_url}: {message}")]
    DeleteBatch { queue_url: String, message: String },

    #[error("invalid queue ARN '{arn}': {reason}")]
    InvalidArn { arn: String, reason: &'static str },

    #[error("{0} has no source queue to redrive to")]
    MissingSourceQueue(String),

    #[error("invalid batch id: {0}")]
    InvalidBatchId(String),

    #[error("received message is missing {0}")]
    MalformedMessage(&'static str),

    #[error("failed to build batch entry: {0}")]
    BuildEntry(String),
}

/// Extracts the message worth showing to a caller from an SDK error.
///
/// Service errors carry the message SQS itself returned; anything else
/// (dispatch failures, timeouts, credential problems) is rendered with its
/// full source chain.
pub(crate) fn sdk_message<E, R>(error: &SdkError<E, R>) -> String
where
    E: std::error::Error + 'static,
    R: std::fmt::Debug,
{
    match error {
        SdkError::ServiceError(se) => se.err().to_string(),
        other => DisplayErrorContext(other).to_string(),
    }
}
