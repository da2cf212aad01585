//! Narrow interfaces to the services the notifier drives.
//!
//! The polling loop only talks to these traits, so the Gmail client, the
//! speech endpoint and the robot can each be swapped for fakes in tests.

use async_trait::async_trait;
use shared_types::{MessageSummary, Tier};

use crate::error::NotifierResult;

#[async_trait]
pub trait MailQuery: Send + Sync {
    /// Unread messages in the primary inbox, newest first, at most `max_results`
    async fn query_unread(&self, max_results: u32) -> NotifierResult<Vec<MessageSummary>>;

    /// Subject line of the newest unread message, if any
    async fn latest_subject(&self) -> NotifierResult<Option<String>>;
}

#[async_trait]
pub trait Speaker: Send + Sync {
    async fn speak(&self, text: &str) -> NotifierResult<()>;
}

#[async_trait]
pub trait MotionController: Send + Sync {
    /// Play the motion routine bound to `tier` to completion
    async fn perform_gesture(&self, tier: Tier) -> NotifierResult<()>;
}
