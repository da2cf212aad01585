//! Turns a new-mail count into speech and a gesture.

use std::sync::Arc;

use shared_types::Tier;

use crate::collaborators::{MotionController, Speaker};

/// Pick the response tier for `new_count` newly arrived messages.
pub fn select_tier(new_count: usize) -> Option<Tier> {
    match new_count {
        0 => None,
        1 => Some(Tier::A),
        2..=3 => Some(Tier::B),
        _ => Some(Tier::C),
    }
}

/// Phrase spoken for `tier`. Tiers B and C mention the count.
pub fn phrase(tier: Tier, new_count: usize) -> String {
    match tier {
        Tier::A => "You have a new email!".to_string(),
        Tier::B => format!("You have {} new emails!", new_count),
        Tier::C => format!("Wow, {} new emails!", new_count),
    }
}

/// A count that falls in `tier`, for triggering a tier by hand.
pub fn sample_count(tier: Tier) -> usize {
    match tier {
        Tier::A => 1,
        Tier::B => 2,
        Tier::C => 4,
    }
}

/// Drives the speech and motion collaborators for one notification.
#[derive(Clone)]
pub struct Dispatcher {
    speaker: Arc<dyn Speaker>,
    motion: Arc<dyn MotionController>,
}

impl Dispatcher {
    pub fn new(speaker: Arc<dyn Speaker>, motion: Arc<dyn MotionController>) -> Self {
        Self { speaker, motion }
    }

    /// Announce `new_count` messages. Returns the tier that was performed.
    pub async fn dispatch(&self, new_count: usize) -> Option<Tier> {
        let tier = select_tier(new_count)?;
        self.perform(tier, new_count).await;
        Some(tier)
    }

    /// Speak then move. Failures of either are logged and never propagated.
    pub async fn perform(&self, tier: Tier, new_count: usize) {
        let text = phrase(tier, new_count);
        tracing::info!("Notifying tier {} for {} new email(s)", tier, new_count);

        if let Err(e) = self.speaker.speak(&text).await {
            tracing::warn!("Speech failed for tier {}: {}", tier, e);
        }

        if let Err(e) = self.motion.perform_gesture(tier).await {
            tracing::warn!("Gesture failed for tier {}: {}", tier, e);
        }
    }
}
