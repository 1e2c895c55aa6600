use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::error::HandlerError;

/// The message CloudTrail publishes when it delivers a log file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CloudTrailNotification {
    #[serde(rename = "s3Bucket", alias = "S3Bucket")]
    pub s3_bucket: String,
    #[serde(rename = "s3ObjectKey", alias = "S3ObjectKey", default)]
    pub s3_object_keys: Vec<String>,
}

impl CloudTrailNotification {
    /// Only the first key is processed; CloudTrail delivers one file per notification.
    pub fn object_key(&self) -> Result<&str, HandlerError> {
        let key = self
            .s3_object_keys
            .first()
            .ok_or_else(|| HandlerError::MissingObjectKey {
                bucket: self.s3_bucket.clone(),
            })?;

        if self.s3_object_keys.len() > 1 {
            tracing::warn!(
                "Notification lists {} object keys, only {} will be processed ({} ignored)",
                self.s3_object_keys.len(),
                key,
                self.s3_object_keys.len() - 1
            );
        }

        Ok(key)
    }
}

#[derive(Debug, Deserialize)]
struct SnsEventRecord {
    #[serde(rename = "Sns")]
    sns: SnsMessage,
}

#[derive(Debug, Deserialize)]
struct SnsMessage {
    #[serde(rename = "Message")]
    message: String,
    #[serde(rename = "TopicArn", default)]
    topic_arn: Option<String>,
}

// the shapes a queue message body can take, depending on how the topic is wired to the queue
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InboundBody {
    SnsEvent {
        #[serde(rename = "Records")]
        records: Vec<SnsEventRecord>,
    },
    SnsNotification(SnsMessage),
    Raw(CloudTrailNotification),
}

/// Unwraps a queue message body down to the CloudTrail notification it carries.
pub fn parse_notification(body: &str) -> Result<CloudTrailNotification, HandlerError> {
    let inbound: InboundBody =
        serde_json::from_str(body).map_err(|err| HandlerError::Envelope(err.to_string()))?;

    let sns = match inbound {
        InboundBody::Raw(notification) => return Ok(notification),
        InboundBody::SnsNotification(sns) => sns,
        InboundBody::SnsEvent { records } => {
            if records.len() > 1 {
                tracing::warn!(
                    "SNS event carries {} records, only the first one will be processed",
                    records.len()
                );
            }
            records
                .into_iter()
                .next()
                .ok_or_else(|| HandlerError::Envelope("SNS event has no records".to_string()))?
                .sns
        }
    };

    if let Some(topic_arn) = &sns.topic_arn {
        tracing::debug!("Notification published on {}", topic_arn);
    }

    serde_json::from_str(&sns.message).map_err(|err| HandlerError::Envelope(err.to_string()))
}

/// Top level of a CloudTrail log file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AuditRecords {
    #[serde(rename = "Records")]
    pub records: Vec<AuditRecord>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    // a record without a name is kept but can never match
    #[serde(default)]
    pub event_name: String,
    #[serde(default)]
    pub event_time: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub event_source: Option<String>,
    #[serde(rename = "sourceIPAddress", default)]
    pub source_ip_address: Option<String>,
    #[serde(default)]
    pub aws_region: Option<String>,
    #[serde(rename = "eventID", default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub user_identity: Option<UserIdentity>,
    // CloudTrail writes `null` for calls without parameters
    #[serde(default, deserialize_with = "null_as_empty")]
    pub request_parameters: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    #[serde(rename = "type", default)]
    pub identity_type: Option<String>,
    #[serde(default)]
    pub arn: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
}

impl AuditRecord {
    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.request_parameters.get(name)
    }

    /// Who performed the call, for log lines.
    pub fn caller(&self) -> &str {
        self.user_identity
            .as_ref()
            .and_then(|identity| identity.arn.as_deref().or(identity.user_name.as_deref()))
            .unwrap_or("unknown caller")
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}
