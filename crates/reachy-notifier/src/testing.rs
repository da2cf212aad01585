//! In-memory collaborators used by unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use shared_types::{MessageSummary, Tier};

use crate::collaborators::{MailQuery, MotionController, Speaker};
use crate::error::{NotifierError, NotifierResult};

/// Mail query that replays scripted responses, one per call.
///
/// Once the script runs out it keeps answering with an empty inbox.
#[derive(Default)]
pub struct ScriptedMail {
    responses: Mutex<VecDeque<NotifierResult<Vec<MessageSummary>>>>,
    subject: Option<String>,
    subject_error: Option<String>,
    calls: Mutex<usize>,
}

impl ScriptedMail {
    pub fn new(responses: Vec<NotifierResult<Vec<MessageSummary>>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            subject: None,
            subject_error: None,
            calls: Mutex::new(0),
        }
    }

    pub fn with_subject(mut self, subject: &str) -> Self {
        self.subject = Some(subject.to_string());
        self
    }

    /// Make every subject lookup fail with a transient error.
    pub fn with_subject_error(mut self, message: &str) -> Self {
        self.subject_error = Some(message.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

pub fn page(ids: &[&str]) -> Vec<MessageSummary> {
    ids.iter().map(|id| MessageSummary::new(*id)).collect()
}

#[async_trait]
impl MailQuery for ScriptedMail {
    async fn query_unread(&self, max_results: u32) -> NotifierResult<Vec<MessageSummary>> {
        *self.calls.lock().unwrap() += 1;
        let next = self.responses.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(Vec::new())).map(|mut unread| {
            unread.truncate(max_results as usize);
            unread
        })
    }

    async fn latest_subject(&self) -> NotifierResult<Option<String>> {
        if let Some(message) = &self.subject_error {
            return Err(NotifierError::transient(message.clone()));
        }
        Ok(self.subject.clone())
    }
}

#[derive(Default)]
pub struct FakeSpeaker {
    spoken: Mutex<Vec<String>>,
    fail: bool,
}

impl FakeSpeaker {
    pub fn failing() -> Self {
        Self {
            spoken: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

#[async_trait]
impl Speaker for FakeSpeaker {
    async fn speak(&self, text: &str) -> NotifierResult<()> {
        if self.fail {
            return Err(NotifierError::Speech("speaker offline".into()));
        }
        self.spoken.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeMotion {
    performed: Mutex<Vec<Tier>>,
    fail: bool,
}

impl FakeMotion {
    pub fn failing() -> Self {
        Self {
            performed: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn performed(&self) -> Vec<Tier> {
        self.performed.lock().unwrap().clone()
    }
}

#[async_trait]
impl MotionController for FakeMotion {
    async fn perform_gesture(&self, tier: Tier) -> NotifierResult<()> {
        if self.fail {
            return Err(NotifierError::Motion("robot unreachable".into()));
        }
        self.performed.lock().unwrap().push(tier);
        Ok(())
    }
}
