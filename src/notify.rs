use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_sns as sns;
use sns::error::DisplayErrorContext;

use crate::models::AuditRecord;

pub const ALERT_MESSAGE: &str = "People be creating some Foo users...";

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, topic_arn: &str, message: &str) -> Result<(), String>;
}

#[async_trait]
impl Notifier for sns::Client {
    async fn notify(&self, topic_arn: &str, message: &str) -> Result<(), String> {
        let output = self
            .publish()
            .topic_arn(topic_arn)
            .message(message)
            .send()
            .await
            .map_err(|err| DisplayErrorContext(&err).to_string())?;

        tracing::debug!(
            "Published message {} to {}",
            output.message_id().unwrap_or("<no id>"),
            topic_arn
        );
        Ok(())
    }
}

/// Publishes a message and logs rather than propagates a failure, including one that takes
/// longer than `call_timeout`. Returns whether the message went out.
pub async fn publish_or_log(
    notifier: &dyn Notifier,
    topic_arn: &str,
    message: &str,
    call_timeout: Duration,
) -> bool {
    let result = tokio::time::timeout(call_timeout, notifier.notify(topic_arn, message))
        .await
        .unwrap_or_else(|_| Err(format!("no response within {}s", call_timeout.as_secs())));

    match result {
        Ok(()) => true,
        Err(err) => {
            tracing::error!("Failed to publish {:?} to {}: {}", message, topic_arn, err);
            false
        }
    }
}

/// Sends the single alert for an invocation. Nothing is sent when nothing matched.
pub async fn dispatch_alert(
    notifier: &dyn Notifier,
    topic_arn: &str,
    matches: &[&AuditRecord],
    call_timeout: Duration,
) -> bool {
    if matches.is_empty() {
        return false;
    }

    for record in matches {
        tracing::warn!(
            "{} by {} ({}) from {} at {} in {} [event {}]",
            record.event_name,
            record.caller(),
            record
                .user_identity
                .as_ref()
                .and_then(|identity| identity.identity_type.as_deref())
                .unwrap_or("unknown identity type"),
            record.source_ip_address.as_deref().unwrap_or("unknown address"),
            record
                .event_time
                .map(|time| time.to_rfc3339())
                .unwrap_or_else(|| "unknown time".to_string()),
            record.aws_region.as_deref().unwrap_or("unknown region"),
            record.event_id.as_deref().unwrap_or("-")
        );
    }

    let sent = publish_or_log(notifier, topic_arn, ALERT_MESSAGE, call_timeout).await;
    if sent {
        tracing::info!("Sent alert for {} matching records", matches.len());
    }
    sent
}
