//! SQS client wrapper and message types for dead letter queue operations.

use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_sqs as sqs;
use sqs::config::Credentials;
use sqs::types::QueueAttributeName;

use crate::arn::QueueArn;
use crate::backend::{BatchReport, QueueAttributes, QueueBackend};
use crate::error::{sdk_message, QueueError};

/// Endpoint LocalStack exposes SQS on when run with its default port mapping.
pub const LOCALSTACK_ENDPOINT: &str = "http://localhost:4566";

/// Most messages a single `ReceiveMessage` call may return.
pub const MAX_RECEIVE_BATCH: i32 = 10;

/// Seconds a received message stays hidden from other consumers.
pub const VISIBILITY_TIMEOUT: i32 = 15;

/// Where and how to reach SQS.
///
/// With `local` set, static `test` credentials are used and the endpoint
/// defaults to [`LOCALSTACK_ENDPOINT`]. Otherwise credentials come from the
/// ambient AWS environment and `endpoint` is only an optional override.
#[derive(Clone, Debug, Default)]
pub struct AwsSettings {
    pub local: bool,
    pub endpoint: Option<String>,
    pub region: Option<String>,
}

impl AwsSettings {
    /// Builds the AWS SDK configuration these settings describe.
    ///
    /// The region is resolved from `region`, then the default provider chain
    /// (`AWS_REGION`, profile, IMDS), then falls back to `us-east-1`.
    pub async fn load(&self) -> SdkConfig {
        let region = RegionProviderChain::first_try(self.region.clone().map(Region::new))
            .or_default_provider()
            .or_else(Region::from_static("us-east-1"));

        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(region);

        if self.local {
            loader = loader
                .credentials_provider(Credentials::new("test", "test", None, None, "static"))
                .endpoint_url(self.endpoint.as_deref().unwrap_or(LOCALSTACK_ENDPOINT));
        } else if let Some(endpoint) = &self.endpoint {
            loader = loader.endpoint_url(endpoint);
        }

        loader.load().await
    }
}

/// Receives messages from an SQS queue.
///
/// Retrieves up to 10 messages at a time with a 15-second visibility timeout.
/// Messages become invisible to other consumers during this period.
///
/// # Arguments
///
/// * `client` - The SQS client to use for the request
/// * `queue_url` - The URL of the queue to receive messages from
///
/// # Errors
///
/// Returns [`QueueError::Receive`] if the SQS API call fails.
pub async fn receive(
    client: &sqs::Client,
    queue_url: &str,
) -> Result<sqs::operation::receive_message::ReceiveMessageOutput, QueueError> {
    client
        .receive_message()
        .queue_url(queue_url)
        .max_number_of_messages(MAX_RECEIVE_BATCH)
        .visibility_timeout(VISIBILITY_TIMEOUT)
        .message_system_attribute_names(sqs::types::MessageSystemAttributeName::All)
        .send()
        .await
        .map_err(|e| QueueError::Receive {
            queue_url: queue_url.to_string(),
            message: sdk_message(&e),
        })
}

/// Client for managing AWS SQS dead letter queues.
///
/// This is the production [`QueueBackend`]. Build it once at startup and share
/// it; the underlying SDK client is cheap to clone and safe to use from many
/// requests at once.
///
/// # Example
///
/// ```no_run
/// use dlq::{AwsSettings, DeadLetterQueue, QueueBackend};
///
/// # async fn example() -> Result<(), dlq::QueueError> {
/// let config = AwsSettings::default().load().await;
/// let dlq = DeadLetterQueue::from_config(config);
///
/// for url in dlq.list_queues().await? {
///     println!("Queue: {}", url);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct DeadLetterQueue {
    /// The AWS SDK configuration used for SQS operations
    pub config: SdkConfig,
    /// The SQS client instance
    pub client: sqs::Client,
}

impl DeadLetterQueue {
    /// Creates a DeadLetterQueue from a pre-built AWS SDK config.
    ///
    /// The caller decides how credentials and endpoints are resolved, e.g.
    /// through [`AwsSettings`] with `local` set for LocalStack.
    pub fn from_config(config: SdkConfig) -> Self {
        let client = sqs::Client::new(&config);
        Self { config, client }
    }
}

#[async_trait]
impl QueueBackend for DeadLetterQueue {
    /// Lists queue URLs with a single `ListQueues` call.
    ///
    /// SQS pages this call at 1000 queues. Only the first page is returned;
    /// a continuation token is logged and otherwise ignored.
    async fn list_queues(&self) -> Result<Vec<String>, QueueError> {
        let output = self
            .client
            .list_queues()
            .send()
            .await
            .map_err(|e| QueueError::ListQueues(sdk_message(&e)))?;

        if output.next_token.is_some() {
            log::warn!("ListQueues returned a continuation token; only the first page is listed");
        }

        Ok(output.queue_urls.unwrap_or_default())
    }

    async fn get_queue_attributes(&self, queue_url: &str) -> Result<QueueAttributes, QueueError> {
        let output = self
            .client
            .get_queue_attributes()
            .queue_url(queue_url)
            .attribute_names(QueueAttributeName::QueueArn)
            .attribute_names(QueueAttributeName::RedrivePolicy)
            .send()
            .await
            .map_err(|e| QueueError::GetQueueAttributes {
                queue_url: queue_url.to_string(),
                message: sdk_message(&e),
            })?;

        let mut attributes = output.attributes.unwrap_or_default();

        Ok(QueueAttributes {
            queue_arn: attributes.remove(&QueueAttributeName::QueueArn),
            redrive_policy: attributes.remove(&QueueAttributeName::RedrivePolicy),
        })
    }

    async fn purge_queue(&self, queue_url: &str) -> Result<(), QueueError> {
        self.client
            .purge_queue()
            .queue_url(queue_url)
            .send()
            .await
            .map_err(|e| QueueError::PurgeQueue {
                queue_url: queue_url.to_string(),
                message: sdk_message(&e),
            })?;

        Ok(())
    }

    async fn queue_url_for_arn(&self, arn: &QueueArn) -> Result<String, QueueError> {
        let owner = Some(arn.account_id.clone()).filter(|id| !id.is_empty());

        let output = self
            .client
            .get_queue_url()
            .queue_name(&arn.queue_name)
            .set_queue_owner_aws_account_id(owner)
            .send()
            .await
            .map_err(|e| QueueError::GetQueueUrl {
                arn: arn.to_string(),
                message: sdk_message(&e),
            })?;

        output.queue_url.ok_or_else(|| QueueError::GetQueueUrl {
            arn: arn.to_string(),
            message: "response did not include a queue url".to_string(),
        })
    }

    async fn receive(&self, queue_url: &str) -> Result<Vec<MessageModel>, QueueError> {
        let output = receive(&self.client, queue_url).await?;

        output
            .messages
            .unwrap_or_default()
            .into_iter()
            .map(MessageModel::try_from)
            .collect()
    }

    async fn send_batch(&self, queue_url: &str, messages: &[MessageModel]) -> Result<BatchReport, QueueError> {
        self.send_messages(queue_url, messages).await
    }

    async fn delete_batch(&self, queue_url: &str, messages: &[MessageModel]) -> Result<BatchReport, QueueError> {
        self.delete_messages(queue_url, messages).await
    }
}

/// Serializable representation of an SQS message.
///
/// Contains the fields needed to move a message between queues and to
/// acknowledge it afterwards.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct MessageModel {
    /// Unique identifier for the message assigned by SQS
    pub message_id: String,
    /// Handle used to delete or change visibility of the message
    pub receipt_handle: String,
    /// MD5 digest of the message body for integrity verification
    pub md5_of_body: Option<String>,
    /// The actual message content
    pub body: String,
    /// MD5 digest of message attributes (if any)
    pub md5_of_message_attributes: Option<String>,
}

/// Converts an AWS SDK Message into a MessageModel.
///
/// # Errors
///
/// Returns [`QueueError::MalformedMessage`] if the message is missing its id,
/// receipt handle or body.
///
/// # See Also
///
/// - [AWS SQS Message API Reference](https://docs.aws.amazon.com/AWSSimpleQueueService/latest/APIReference/API_Message.html)
impl TryFrom<sqs::types::Message> for MessageModel {
    type Error = QueueError;

    fn try_from(message: sqs::types::Message) -> Result<Self, Self::Error> {
        Ok(Self {
            message_id: message
                .message_id
                .ok_or(QueueError::MalformedMessage("message_id"))?,
            receipt_handle: message
                .receipt_handle
                .ok_or(QueueError::MalformedMessage("receipt_handle"))?,
            md5_of_body: message.md5_of_body,
            body: message.body.ok_or(QueueError::MalformedMessage("body"))?,
            md5_of_message_attributes: message.md5_of_message_attributes,
        })
    }
}
