//! In-memory stand-ins for S3, SNS and IAM.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{HandlerError, RemediationError};
use crate::notify::Notifier;
use crate::remediation::IdentityDirectory;
use crate::storage::ObjectStore;

#[derive(Default)]
pub struct FakeStore {
    objects: HashMap<(String, String), Vec<u8>>,
    fetches: Mutex<Vec<String>>,
}

impl FakeStore {
    pub fn with_object(mut self, bucket: &str, key: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.objects
            .insert((bucket.to_string(), key.to_string()), bytes.into());
        self
    }

    pub fn fetches(&self) -> Vec<String> {
        self.fetches.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn fetch(&self, bucket: &str, key: &str) -> Result<Vec<u8>, HandlerError> {
        self.fetches.lock().unwrap().push(format!("{bucket}/{key}"));
        self.objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| HandlerError::Retrieval {
                bucket: bucket.to_string(),
                key: key.to_string(),
                reason: "NoSuchKey".to_string(),
            })
    }
}

type MessagePredicate = Box<dyn Fn(&str) -> bool + Send + Sync>;

/// Records every delivered message; messages matching the failure predicate are rejected.
#[derive(Default)]
pub struct RecordingNotifier {
    delivered: Mutex<Vec<(String, String)>>,
    fail_when: Option<MessagePredicate>,
}

impl RecordingNotifier {
    pub fn failing_on(predicate: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        RecordingNotifier {
            delivered: Mutex::default(),
            fail_when: Some(Box::new(predicate)),
        }
    }

    pub fn messages(&self) -> Vec<(String, String)> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, topic_arn: &str, message: &str) -> Result<(), String> {
        if self.fail_when.as_ref().is_some_and(|fail| fail(message)) {
            return Err("AuthorizationError: not allowed to publish".to_string());
        }
        self.delivered
            .lock()
            .unwrap()
            .push((topic_arn.to_string(), message.to_string()));
        Ok(())
    }
}

/// A user directory where deleting removes the user, so a second delete fails.
#[derive(Default)]
pub struct FakeDirectory {
    users: Mutex<HashSet<String>>,
    unreachable: HashSet<String>,
    stalled: HashSet<String>,
    attempts: Mutex<Vec<String>>,
}

impl FakeDirectory {
    pub fn with_users(names: &[&str]) -> Self {
        FakeDirectory {
            users: Mutex::new(names.iter().map(|name| name.to_string()).collect()),
            ..FakeDirectory::default()
        }
    }

    /// Deletes for these users fail as if the request never reached the service.
    pub fn unreachable_for(mut self, names: &[&str]) -> Self {
        self.unreachable = names.iter().map(|name| name.to_string()).collect();
        self
    }

    /// Deletes for these users never answer.
    pub fn stalled_for(mut self, names: &[&str]) -> Self {
        self.stalled = names.iter().map(|name| name.to_string()).collect();
        self
    }

    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl IdentityDirectory for FakeDirectory {
    async fn delete_identity(&self, user_name: &str) -> Result<u16, RemediationError> {
        self.attempts.lock().unwrap().push(user_name.to_string());

        if self.stalled.contains(user_name) {
            return std::future::pending().await;
        }

        if self.unreachable.contains(user_name) {
            return Err(RemediationError::Unexpected(
                "dispatch failure: connection reset".to_string(),
            ));
        }

        if self.users.lock().unwrap().remove(user_name) {
            Ok(200)
        } else {
            Err(RemediationError::AlreadyDeleted(format!(
                "NoSuchEntity: The user with name {user_name} cannot be found."
            )))
        }
    }
}
