//! The polling loop: query the inbox, detect new mail, notify, wait.

use std::sync::Arc;
use std::time::Duration;

use crate::collaborators::MailQuery;
use crate::config::NotifierConfig;
use crate::detector::{self, DetectorState};
use crate::dispatch::Dispatcher;
use crate::error::NotifierError;
use crate::shutdown::ShutdownListener;
use crate::state_store::StateStore;
use shared_types::Tier;

/// Configuration for the polling loop
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Pause between the end of one cycle and the start of the next
    pub check_interval: Duration,
    /// Page size of the unread query
    pub max_results: u32,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(60),
            max_results: 20,
        }
    }
}

impl From<&NotifierConfig> for PollerConfig {
    fn from(config: &NotifierConfig) -> Self {
        Self {
            check_interval: config.check_interval(),
            max_results: config.max_results,
        }
    }
}

/// What a single cycle did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The query failed; the detector state was left untouched
    QueryFailed,
    Checked {
        new_count: usize,
        tier: Option<Tier>,
    },
}

pub struct Poller {
    mail: Arc<dyn MailQuery>,
    dispatcher: Dispatcher,
    store: Option<StateStore>,
    state: DetectorState,
    config: PollerConfig,
}

impl Poller {
    pub fn new(mail: Arc<dyn MailQuery>, dispatcher: Dispatcher, config: PollerConfig) -> Self {
        Self {
            mail,
            dispatcher,
            store: None,
            state: DetectorState::new(),
            config,
        }
    }

    /// Persist the detector state to `store`, starting from what it holds.
    pub fn with_store(mut self, store: StateStore) -> Self {
        self.state = store.load_or_default();
        if let Some(id) = &self.state.last_seen_id {
            tracing::info!("Resuming from last seen message {}", id);
        }
        self.store = Some(store);
        self
    }

    pub fn with_state(mut self, state: DetectorState) -> Self {
        self.state = state;
        self
    }

    pub fn state(&self) -> &DetectorState {
        &self.state
    }

    /// Run cycles until the stop signal fires. Returns the final state.
    pub async fn run(mut self, mut shutdown: ShutdownListener) -> DetectorState {
        tracing::info!(
            "Email notifier running (interval: {:?}, page size: {})",
            self.config.check_interval,
            self.config.max_results
        );

        loop {
            if shutdown.is_triggered() {
                break;
            }

            tracing::debug!("Running mail check cycle");
            self.poll_once().await;

            if shutdown.wait_timeout(self.config.check_interval).await {
                break;
            }
        }

        tracing::info!("Email notifier stopped");
        self.state
    }

    /// Run one query → detect → dispatch cycle.
    pub async fn poll_once(&mut self) -> CycleOutcome {
        let new_count = match self.check().await {
            Ok(new_count) => new_count,
            Err(e) => {
                log_query_failure(&e);
                return CycleOutcome::QueryFailed;
            }
        };

        if new_count == 0 {
            return CycleOutcome::Checked {
                new_count,
                tier: None,
            };
        }

        tracing::info!("New email(s) detected! Count: {}", new_count);
        match self.mail.latest_subject().await {
            Ok(Some(subject)) => tracing::info!("Subject: {}", subject),
            Ok(None) => {}
            Err(e) => tracing::warn!("Failed to fetch latest subject: {}", e),
        }

        let tier = self.dispatcher.dispatch(new_count).await;
        CycleOutcome::Checked { new_count, tier }
    }

    /// Query and detect without notifying. The state only changes on success.
    pub async fn check(&mut self) -> Result<usize, NotifierError> {
        let unread = self.mail.query_unread(self.config.max_results).await?;

        let previous = self.state.last_seen_id.clone();
        let new_count = detector::detect(&unread, &mut self.state);

        if self.state.last_seen_id != previous {
            self.persist();
        }

        Ok(new_count)
    }

    fn persist(&self) {
        if let Some(store) = &self.store {
            if let Err(e) = store.save(&self.state) {
                tracing::warn!(
                    "Failed to save detector state to {}: {}",
                    store.path().display(),
                    e
                );
            }
        }
    }
}

fn log_query_failure(error: &NotifierError) {
    if error.is_auth() {
        tracing::error!(
            "Gmail authorization failed, will retry next cycle (re-authenticate if this persists): {}",
            error
        );
    } else {
        tracing::warn!("Mail check failed, will retry next cycle: {}", error);
    }
}
