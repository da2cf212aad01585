//! Gmail API client for listing unread inbox messages.

use anyhow::{Context, Result};
use async_trait::async_trait;
use google_gmail1::api::{ListMessagesResponse, Message, Scope};
use google_gmail1::hyper_rustls::HttpsConnector;
use google_gmail1::Gmail;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use shared_types::MessageSummary;
use std::future::Future;
use std::time::Duration;

use crate::collaborators::MailQuery;
use crate::config::NotifierConfig;
use crate::error::{NotifierError, NotifierResult};

/// Gmail search restricting results to unread mail in the primary inbox
const UNREAD_QUERY: &str = "is:unread category:primary";

/// Client for interacting with Gmail API
pub struct GmailClient {
    hub: Gmail<HttpsConnector<HttpConnector>>,
    timeout: Duration,
}

impl GmailClient {
    /// Build a client using the installed-app OAuth flow.
    ///
    /// A token is fetched before returning. On first run that prints the
    /// consent URL and waits for the browser redirect, then caches the token
    /// at `gmail_token_path`; later runs refresh from the cache.
    pub async fn connect(config: &NotifierConfig) -> Result<Self> {
        let secret = google_gmail1::yup_oauth2::read_application_secret(
            &config.gmail_credentials_path,
        )
        .await
        .with_context(|| {
            format!(
                "Failed to read OAuth credentials from {}",
                config.gmail_credentials_path.display()
            )
        })?;

        let auth = google_gmail1::yup_oauth2::InstalledFlowAuthenticator::builder(
            secret,
            google_gmail1::yup_oauth2::InstalledFlowReturnMethod::HTTPRedirect,
        )
        .persist_tokens_to_disk(&config.gmail_token_path)
        .build()
        .await
        .context("Failed to build authenticator")?;

        tracing::info!("Authorizing Gmail access (first run opens a consent page)");
        authorize(auth.token(&[Scope::Readonly.as_ref()])).await?;
        tracing::debug!(
            "Gmail token ready, cached at {}",
            config.gmail_token_path.display()
        );

        let connector = google_gmail1::hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()
            .context("Failed to load native TLS roots")?
            .https_or_http()
            .enable_http1()
            .build();

        let client = Client::builder(TokioExecutor::new()).build(connector);
        let hub = Gmail::new(client, auth);

        Ok(Self {
            hub,
            timeout: config.request_timeout(),
        })
    }

    async fn bounded<T, F>(&self, what: &str, call: F) -> NotifierResult<T>
    where
        F: Future<Output = google_gmail1::Result<T>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result.map_err(classify_error),
            Err(_) => Err(NotifierError::transient(format!(
                "{} timed out after {:?}",
                what, self.timeout
            ))),
        }
    }
}

#[async_trait]
impl MailQuery for GmailClient {
    async fn query_unread(&self, max_results: u32) -> NotifierResult<Vec<MessageSummary>> {
        let call = self
            .hub
            .users()
            .messages_list("me")
            .q(UNREAD_QUERY)
            .add_label_ids("INBOX")
            .max_results(max_results)
            .add_scope(Scope::Readonly)
            .doit();

        let (_, list_response) = self.bounded("List unread messages", call).await?;

        if let Some(estimate) = list_response.result_size_estimate {
            tracing::debug!("Gmail estimates {} unread messages", estimate);
        }

        summaries_from_list(list_response)
    }

    async fn latest_subject(&self) -> NotifierResult<Option<String>> {
        let mut newest = self.query_unread(1).await?;
        let Some(message) = newest.pop() else {
            return Ok(None);
        };

        let call = self
            .hub
            .users()
            .messages_get("me", &message.id)
            .format("metadata")
            .add_metadata_headers("Subject")
            .add_scope(Scope::Readonly)
            .doit();

        let (_, full) = self.bounded("Get message metadata", call).await?;
        Ok(subject_of(&full))
    }
}

/// Wait for the token request to finish.
///
/// Not bounded by the request timeout: the consent page waits on the user.
async fn authorize<F, T, E>(token: F) -> Result<T>
where
    F: Future<Output = std::result::Result<T, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    token.await.context("OAuth consent failed")
}

/// Convert a list response into summaries, keeping the provider's newest-first order.
fn summaries_from_list(response: ListMessagesResponse) -> NotifierResult<Vec<MessageSummary>> {
    response
        .messages
        .unwrap_or_default()
        .into_iter()
        .map(|message| match message.id {
            Some(id) if !id.is_empty() => Ok(MessageSummary {
                id,
                thread_id: message.thread_id,
            }),
            _ => Err(NotifierError::MalformedResponse(
                "message without an id in list response".to_string(),
            )),
        })
        .collect()
}

fn subject_of(message: &Message) -> Option<String> {
    message
        .payload
        .as_ref()?
        .headers
        .as_ref()?
        .iter()
        .find(|header| {
            header
                .name
                .as_deref()
                .is_some_and(|name| name.eq_ignore_ascii_case("subject"))
        })
        .and_then(|header| header.value.clone())
}

/// Map a Gmail API error onto the notifier's error taxonomy.
fn classify_error(error: google_gmail1::Error) -> NotifierError {
    match error {
        google_gmail1::Error::MissingToken(e) => NotifierError::Auth(e.to_string()),
        google_gmail1::Error::BadRequest(body) => {
            let code = body
                .get("error")
                .and_then(|e| e.get("code"))
                .and_then(|c| c.as_u64());
            let message = body
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .unwrap_or("bad request")
                .to_string();
            match code {
                Some(401) | Some(403) => NotifierError::Auth(message),
                Some(429) | Some(500..=599) => NotifierError::Transient(message),
                _ => NotifierError::MalformedResponse(message),
            }
        }
        google_gmail1::Error::Failure(response) => {
            let status = response.status();
            match status.as_u16() {
                401 | 403 => NotifierError::Auth(format!("Gmail returned {}", status)),
                _ => NotifierError::Transient(format!("Gmail returned {}", status)),
            }
        }
        google_gmail1::Error::JsonDecodeError(_, e) => {
            NotifierError::MalformedResponse(e.to_string())
        }
        other => NotifierError::Transient(other.to_string()),
    }
}
