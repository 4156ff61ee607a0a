use crate::error::QueueError;

/// An SQS queue ARN: `arn:partition:sqs:region:account-id:queue-name`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueueArn {
    pub partition: String,
    pub region: String,
    pub account_id: String,
    pub queue_name: String,
}

impl QueueArn {
    pub fn parse(arn: &str) -> Result<Self, QueueError> {
        let invalid = |reason| QueueError::InvalidArn {
            arn: arn.to_string(),
            reason,
        };

        if arn.trim().is_empty() {
            return Err(invalid("ARN cannot be empty"));
        }

        let parts: Vec<&str> = arn.split(':').collect();
        if parts.len() != 6 || parts[0] != "arn" {
            return Err(invalid("expected arn:partition:service:region:account-id:resource"));
        }
        if parts[1].is_empty() {
            return Err(invalid("partition cannot be empty"));
        }
        if parts[2] != "sqs" {
            return Err(invalid("not an SQS ARN"));
        }
        if parts[5].is_empty() {
            return Err(invalid("queue name cannot be empty"));
        }

        Ok(Self {
            partition: parts[1].to_string(),
            region: parts[3].to_string(),
            account_id: parts[4].to_string(),
            queue_name: parts[5].to_string(),
        })
    }
}

impl std::fmt::Display for QueueArn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "arn:{}:sqs:{}:{}:{}",
            self.partition, self.region, self.account_id, self.queue_name
        )
    }
}
