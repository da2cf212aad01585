//! Speech collaborators.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use crate::collaborators::Speaker;
use crate::error::{NotifierError, NotifierResult};

/// Posts the phrase to a text-to-speech service that plays it on the robot.
pub struct HttpSpeaker {
    client: reqwest::Client,
    url: String,
}

#[derive(Debug, Serialize)]
struct SpeakRequest<'a> {
    text: &'a str,
}

impl HttpSpeaker {
    pub fn new(url: impl Into<String>, timeout: Duration) -> NotifierResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifierError::config(format!("Failed to build speech client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Speaker for HttpSpeaker {
    async fn speak(&self, text: &str) -> NotifierResult<()> {
        tracing::debug!("Speaking: {}", text);

        let response = self
            .client
            .post(&self.url)
            .json(&SpeakRequest { text })
            .send()
            .await
            .map_err(|e| NotifierError::Speech(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifierError::Speech(format!(
                "speech endpoint returned {}",
                status
            )));
        }

        Ok(())
    }
}

/// Speaker used when no speech endpoint is configured.
pub struct LogSpeaker;

#[async_trait]
impl Speaker for LogSpeaker {
    async fn speak(&self, text: &str) -> NotifierResult<()> {
        tracing::info!("[speech] {}", text);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(SpeakRequest { text: "hi" }).unwrap();
        assert_eq!(body, serde_json::json!({ "text": "hi" }));
    }

    #[tokio::test]
    async fn test_log_speaker_never_fails() {
        tokio_test::assert_ok!(LogSpeaker.speak("You have a new email!").await);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_a_speech_error() {
        // Port 9 (discard) on localhost is closed on any sane test host
        let speaker = HttpSpeaker::new("http://127.0.0.1:9/speak", Duration::from_secs(2)).unwrap();
        let err = tokio_test::assert_err!(speaker.speak("hello").await);
        assert!(matches!(err, NotifierError::Speech(_)));
    }
}
