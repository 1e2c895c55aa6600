use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_iam as iam;
use futures_util::stream::{self, StreamExt};
use iam::error::{DisplayErrorContext, SdkError};
use iam::operation::delete_user::DeleteUserError;

use crate::error::{HandlerError, RemediationError};
use crate::filter::parameter_text;
use crate::models::AuditRecord;
use crate::notify::{Notifier, publish_or_log};

// The SDK only hands back an output for a 2xx response, and IAM answers DeleteUser with 200.
const DELETE_USER_SUCCESS_STATUS: u16 = 200;

#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    /// Deletes the named user, returning the HTTP status of the call.
    async fn delete_identity(&self, user_name: &str) -> Result<u16, RemediationError>;
}

#[async_trait]
impl IdentityDirectory for iam::Client {
    async fn delete_identity(&self, user_name: &str) -> Result<u16, RemediationError> {
        self.delete_user()
            .user_name(user_name)
            .send()
            .await
            .map(|_| DELETE_USER_SUCCESS_STATUS)
            .map_err(classify_delete_error)
    }
}

fn classify_delete_error(err: SdkError<DeleteUserError>) -> RemediationError {
    let description = DisplayErrorContext(&err).to_string();
    match err.as_service_error() {
        Some(service) if service.is_no_such_entity_exception() => {
            RemediationError::AlreadyDeleted(description)
        }
        Some(service) if service.is_delete_conflict_exception() => {
            RemediationError::Conflict(description)
        }
        Some(_) => RemediationError::Service(description),
        None => RemediationError::Unexpected(description),
    }
}

#[derive(Debug)]
pub enum RemediationOutcome {
    Deleted { actor: String, status: u16 },
    Failed { actor: String, error: RemediationError },
}

impl RemediationOutcome {
    pub fn actor(&self) -> &str {
        match self {
            RemediationOutcome::Deleted { actor, .. } | RemediationOutcome::Failed { actor, .. } => {
                actor
            }
        }
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, RemediationOutcome::Deleted { .. })
    }

    /// True when the user no longer exists, whether or not this call removed it.
    pub fn is_user_gone(&self) -> bool {
        matches!(
            self,
            RemediationOutcome::Deleted { .. }
                | RemediationOutcome::Failed {
                    error: RemediationError::AlreadyDeleted(_),
                    ..
                }
        )
    }

    /// The text of the follow-up notification for this actor.
    pub fn message(&self) -> String {
        match self {
            RemediationOutcome::Deleted { actor, status } => {
                format!("Delete user: {actor} - Status: {status}")
            }
            RemediationOutcome::Failed { actor, error } if error.is_service_error() => {
                format!("Error deleting {actor}: {error}")
            }
            RemediationOutcome::Failed { actor, error } => {
                format!("An unexpected error occurred while deleting {actor}: {error}")
            }
        }
    }
}

/// Pulls the actor out of every matched record. One record without it rejects the whole
/// batch, so this runs before anything is alerted or deleted.
pub fn extract_actors(
    matches: &[&AuditRecord],
    parameter: &str,
) -> Result<Vec<String>, HandlerError> {
    matches
        .iter()
        .enumerate()
        .map(|(index, record)| {
            record
                .parameter(parameter)
                .map(|value| parameter_text(value).into_owned())
                .ok_or_else(|| HandlerError::MissingActor {
                    index,
                    parameter: parameter.to_string(),
                })
        })
        .collect()
}

/// Deletes every actor and reports each outcome on `topic_arn`.
///
/// Up to `concurrency` actors are in flight at once. Outcomes come back in input order, one per
/// actor, whatever happened to the others. Each outside call is bounded by `call_timeout`; a
/// deletion that does not answer in time becomes a failed outcome. Nothing is retried.
pub async fn remediate(
    identities: &dyn IdentityDirectory,
    notifier: &dyn Notifier,
    topic_arn: &str,
    actors: Vec<String>,
    concurrency: usize,
    call_timeout: Duration,
) -> Vec<RemediationOutcome> {
    stream::iter(actors)
        .map(|actor| remediate_actor(identities, notifier, topic_arn, actor, call_timeout))
        .buffered(concurrency.max(1))
        .collect::<Vec<_>>()
        .await
}

async fn remediate_actor(
    identities: &dyn IdentityDirectory,
    notifier: &dyn Notifier,
    topic_arn: &str,
    actor: String,
    call_timeout: Duration,
) -> RemediationOutcome {
    let deletion = tokio::time::timeout(call_timeout, identities.delete_identity(&actor))
        .await
        .unwrap_or_else(|_| Err(RemediationError::TimedOut(call_timeout.as_secs())));

    let outcome = match deletion {
        Ok(status) => RemediationOutcome::Deleted { actor, status },
        Err(error) => RemediationOutcome::Failed { actor, error },
    };

    let message = outcome.message();
    if outcome.is_deleted() {
        tracing::info!("{}", message);
    } else {
        tracing::error!("{}", message);
    }

    publish_or_log(notifier, topic_arn, &message, call_timeout).await;
    outcome
}
