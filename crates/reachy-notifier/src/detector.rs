//! New-mail detection anchored on the id of the newest message seen so far.
//!
//! Counting unread messages is unreliable: the provider caps page sizes and
//! only estimates totals for large mailboxes, and the user can read or archive
//! older mail at any time. Instead we remember the newest unread id and count
//! how far the head of the inbox has moved past it.

use serde::{Deserialize, Serialize};
use shared_types::MessageSummary;

/// State carried from one check to the next.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectorState {
    /// Newest unread id observed at the last successful check
    pub last_seen_id: Option<String>,
}

impl DetectorState {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn anchored_at(id: impl Into<String>) -> Self {
        Self {
            last_seen_id: Some(id.into()),
        }
    }
}

/// Count the messages that arrived since the last check and advance the anchor.
///
/// `unread` must be ordered newest-first. The first non-empty check only sets
/// the anchor and reports zero, so a restart does not announce the existing
/// backlog. If the anchor is no longer in the page (more mail arrived than
/// fits, or it was read), every entry in the page counts as new.
pub fn detect(unread: &[MessageSummary], state: &mut DetectorState) -> usize {
    let Some(latest) = unread.first() else {
        return 0;
    };

    let new_count = match state.last_seen_id.as_deref() {
        None => 0,
        Some(last_seen) if last_seen == latest.id => return 0,
        Some(last_seen) => unread
            .iter()
            .take_while(|message| message.id != last_seen)
            .count(),
    };

    state.last_seen_id = Some(latest.id.clone());
    new_count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(ids: &[&str]) -> Vec<MessageSummary> {
        ids.iter().map(|id| MessageSummary::new(*id)).collect()
    }

    #[test]
    fn test_empty_page_on_fresh_state_keeps_state_empty() {
        let mut state = DetectorState::new();
        assert_eq!(detect(&[], &mut state), 0);
        assert_eq!(state.last_seen_id, None);
    }

    #[test]
    fn test_empty_page_keeps_existing_anchor() {
        let mut state = DetectorState::anchored_at("m5");
        assert_eq!(detect(&[], &mut state), 0);
        assert_eq!(state, DetectorState::anchored_at("m5"));
    }

    #[test]
    fn test_first_check_anchors_without_reporting_backlog() {
        let mut state = DetectorState::new();
        let count = detect(&page(&["m5", "m4", "m3"]), &mut state);

        assert_eq!(count, 0);
        assert_eq!(state.last_seen_id.as_deref(), Some("m5"));
    }

    #[test]
    fn test_counts_messages_ahead_of_anchor() {
        let mut state = DetectorState::anchored_at("m5");
        let count = detect(&page(&["m7", "m6", "m5", "m4"]), &mut state);

        assert_eq!(count, 2);
        assert_eq!(state.last_seen_id.as_deref(), Some("m7"));
    }

    #[test]
    fn test_unchanged_head_reports_nothing() {
        let mut state = DetectorState::anchored_at("m7");
        let count = detect(&page(&["m7", "m6"]), &mut state);

        assert_eq!(count, 0);
        assert_eq!(state, DetectorState::anchored_at("m7"));
    }

    #[test]
    fn test_missing_anchor_saturates_at_page_length() {
        let mut state = DetectorState::anchored_at("old");
        let count = detect(&page(&["m9", "m8", "m7", "m6", "m5"]), &mut state);

        assert_eq!(count, 5);
        assert_eq!(state.last_seen_id.as_deref(), Some("m9"));
    }

    #[test]
    fn test_same_head_with_trailing_messages_read() {
        let mut state = DetectorState::anchored_at("m7");
        assert_eq!(detect(&page(&["m7", "m6", "m5"]), &mut state), 0);
        // m6 and m5 were marked read in between
        assert_eq!(detect(&page(&["m7"]), &mut state), 0);
        assert_eq!(state, DetectorState::anchored_at("m7"));
    }

    #[test]
    fn test_second_identical_check_is_idempotent() {
        let unread = page(&["m3", "m2", "m1"]);
        let mut state = DetectorState::anchored_at("m1");

        assert_eq!(detect(&unread, &mut state), 2);
        assert_eq!(detect(&unread, &mut state), 0);
        assert_eq!(state.last_seen_id.as_deref(), Some("m3"));
    }

    #[test]
    fn test_anchor_always_follows_page_head() {
        let pages = [
            page(&["a"]),
            page(&["c", "b", "a"]),
            page(&["c"]),
            page(&["x", "y"]),
            page(&["z", "x"]),
        ];
        let mut state = DetectorState::new();

        for unread in &pages {
            detect(unread, &mut state);
            assert_eq!(state.last_seen_id.as_deref(), Some(unread[0].id.as_str()));
        }
    }

    #[test]
    fn test_state_serializes_for_persistence() {
        let state = DetectorState::anchored_at("18c2f");
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(json, r#"{"last_seen_id":"18c2f"}"#);
        assert_eq!(serde_json::from_str::<DetectorState>(&json).unwrap(), state);
    }
}
