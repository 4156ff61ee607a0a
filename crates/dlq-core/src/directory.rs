//! Discovery of queues and their dead-letter linkage.

use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::backend::QueueBackend;
use crate::error::QueueError;

/// One queue as reported by the directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueDescriptor {
    /// Locator returned by the backend's enumeration call
    pub queue_url: String,
    /// Empty when the backend did not return one
    pub queue_arn: String,
    /// Empty unless the queue carries a redrive policy naming its source
    pub source_queue_arn: String,
}

/// The parts of a queue's `RedrivePolicy` attribute this service reads.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct RedrivePolicy {
    #[serde(rename = "sourceQueueArn", default)]
    pub source_queue_arn: Option<String>,
    #[serde(rename = "maxReceiveCount", default, deserialize_with = "lenient_count")]
    pub max_receive_count: Option<u32>,
}

impl FromStr for RedrivePolicy {
    type Err = serde_json::Error;

    /// Only a JSON object is a policy; arrays and scalars are rejected rather
    /// than matched to fields by position.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match serde_json::from_str(text)? {
            object @ serde_json::Value::Object(_) => serde_json::from_value(object),
            other => Err(serde::de::Error::custom(format!(
                "expected a JSON object, found {other}"
            ))),
        }
    }
}

// SQS hands this count back as a JSON number or as a string, depending on how
// the policy was written.
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        serde_json::Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    }))
}

/// Source queue named by a policy text, or empty when there is none.
///
/// Malformed text is logged and treated like a missing policy so that one
/// badly configured queue cannot take the whole listing down.
fn source_queue_arn(queue_url: &str, policy: Option<&str>) -> String {
    let Some(text) = policy.filter(|text| !text.trim().is_empty()) else {
        return String::new();
    };

    match text.parse::<RedrivePolicy>() {
        Ok(policy) => policy.source_queue_arn.unwrap_or_default(),
        Err(e) => {
            log::warn!("ignoring malformed redrive policy on {queue_url}: {e}");
            String::new()
        }
    }
}

/// Lists every queue visible to the backend with its ARN and source queue.
///
/// Queues come back in the order the backend enumerates them. Attributes are
/// fetched one queue at a time; the first backend error aborts the listing
/// and no partial directory is returned.
pub async fn build_directory(backend: &dyn QueueBackend) -> Result<Vec<QueueDescriptor>, QueueError> {
    let queue_urls = backend.list_queues().await?;
    let mut directory = Vec::with_capacity(queue_urls.len());

    for queue_url in queue_urls {
        let attributes = backend.get_queue_attributes(&queue_url).await?;
        let source_queue_arn = source_queue_arn(&queue_url, attributes.redrive_policy.as_deref());

        directory.push(QueueDescriptor {
            queue_arn: attributes.queue_arn.unwrap_or_default(),
            source_queue_arn,
            queue_url,
        });
    }

    log::debug!("built directory of {} queues", directory.len());
    Ok(directory)
}
