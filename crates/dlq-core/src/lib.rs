//! # dlq-core
//!
//! Core library for managing AWS SQS dead letter queues.
//!
//! This crate discovers which queues are dead letter queues, purges them, and
//! moves their messages back to the queues they came from. It also carries the
//! HTTP API that exposes those operations.
//!
//! ## Features
//!
//! - **Directory**: List every queue with its ARN and the source queue named by its redrive policy
//! - **Purge**: Delete all messages from a batch of queues, reporting per queue
//! - **Redrive**: Report-only stub by default, or move messages back to their source queue
//! - **HTTP API**: `GET /dlqs`, `POST /dlqs/purge`, `POST /dlqs/redrive`
//!
//! ## Example
//!
//! ```no_run
//! use dlq::{build_directory, AwsSettings, DeadLetterQueue};
//!
//! # async fn example() -> Result<(), dlq::QueueError> {
//! // Load AWS configuration
//! let config = AwsSettings::default().load().await;
//!
//! // Create a DLQ client
//! let dlq = DeadLetterQueue::from_config(config);
//!
//! for queue in build_directory(&dlq).await? {
//!     if !queue.source_queue_arn.is_empty() {
//!         println!("{} receives failures from {}", queue.queue_url, queue.source_queue_arn);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod actions;
mod arn;
mod backend;
mod directory;
mod error;
mod send;
mod sqs;

pub mod server;

#[cfg(test)]
mod test_utils;

pub use actions::*;
pub use arn::QueueArn;
pub use backend::{BatchReport, QueueAttributes, QueueBackend};
#[cfg(feature = "mock")]
pub use backend::MockQueueBackend;
pub use directory::{build_directory, QueueDescriptor, RedrivePolicy};
pub use error::QueueError;
pub use send::BatchId;
pub use sqs::*;
