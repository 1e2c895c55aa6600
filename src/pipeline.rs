use crate::config::Config;
use crate::decode::{decompress, parse_records};
use crate::error::HandlerError;
use crate::models::{AuditRecords, parse_notification};
use crate::notify::{Notifier, dispatch_alert};
use crate::remediation::{IdentityDirectory, RemediationOutcome, extract_actors, remediate};
use crate::storage::ObjectStore;

/// What one invocation did, for logging.
#[derive(Debug, Default)]
pub struct InvocationSummary {
    pub records: usize,
    pub matched: usize,
    pub alerted: bool,
    pub outcomes: Vec<RemediationOutcome>,
}

impl InvocationSummary {
    pub fn deleted(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_deleted()).count()
    }
}

pub struct Handler {
    store: Box<dyn ObjectStore>,
    notifier: Box<dyn Notifier>,
    identities: Box<dyn IdentityDirectory>,
    config: Config,
}

impl Handler {
    pub fn new(
        store: Box<dyn ObjectStore>,
        notifier: Box<dyn Notifier>,
        identities: Box<dyn IdentityDirectory>,
        config: Config,
    ) -> Self {
        Handler {
            store,
            notifier,
            identities,
            config,
        }
    }

    /// Runs one invocation for a queue message body.
    ///
    /// The invocation timeout bounds reading the log file only. Once the alert has gone out
    /// every actor is seen through to an outcome and the invocation succeeds, so the message
    /// is never replayed into a second round of deletions.
    pub async fn handle_message(&self, body: &str) -> Result<InvocationSummary, HandlerError> {
        let timeout = self.config.invocation_timeout;
        let log = tokio::time::timeout(timeout, self.read_log(body))
            .await
            .map_err(|_| HandlerError::Timeout {
                seconds: timeout.as_secs(),
            })??;

        self.respond(&log).await
    }

    async fn read_log(&self, body: &str) -> Result<AuditRecords, HandlerError> {
        tracing::debug!("Received notification: {}", body);
        let notification = parse_notification(body)?;
        let key = notification.object_key()?;
        tracing::info!("S3 Bucket: {}", notification.s3_bucket);
        tracing::info!("S3 Object Key: {}", key);

        let raw = self.store.fetch(&notification.s3_bucket, key).await?;
        let inflated = decompress(&raw)?;
        let log = parse_records(&inflated)?;
        tracing::info!("Parsed {} audit records", log.records.len());

        for record in &log.records {
            tracing::debug!(
                "{} {} by {}",
                record.event_source.as_deref().unwrap_or("-"),
                record.event_name,
                record.caller()
            );
        }

        Ok(log)
    }

    async fn respond(&self, log: &AuditRecords) -> Result<InvocationSummary, HandlerError> {
        let rule = &self.config.match_rule;
        let matches = rule.select(&log.records);
        let mut summary = InvocationSummary {
            records: log.records.len(),
            matched: matches.len(),
            ..InvocationSummary::default()
        };

        if matches.is_empty() {
            tracing::info!("No alerts were found this time... that was close...");
            return Ok(summary);
        }

        tracing::warn!(
            "{} {} records with {} starting with {:?}",
            matches.len(),
            rule.event_name,
            rule.parameter,
            rule.prefix
        );

        // checked before alerting so a rejected batch leaves nothing half done
        let actors = extract_actors(&matches, &rule.parameter)?;

        let topic = &self.config.alert_topic_arn;
        let call_timeout = self.config.remediation_call_timeout;
        summary.alerted =
            dispatch_alert(self.notifier.as_ref(), topic, &matches, call_timeout).await;

        summary.outcomes = remediate(
            self.identities.as_ref(),
            self.notifier.as_ref(),
            topic,
            actors,
            self.config.remediation_concurrency,
            call_timeout,
        )
        .await;

        Ok(summary)
    }
}
