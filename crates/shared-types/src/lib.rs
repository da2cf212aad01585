use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One unread inbox message as reported by the mail provider.
///
/// Providers return these newest-first; the order of a `Vec<MessageSummary>`
/// is therefore meaningful and must be preserved by callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSummary {
    /// Opaque provider-assigned id, stable and unique within the account
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
}

impl MessageSummary {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            thread_id: None,
        }
    }
}

/// Response class chosen from the number of newly arrived messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Exactly one new message
    A,
    /// Two or three new messages
    B,
    /// Four or more new messages
    C,
}

impl Tier {
    pub fn as_str(&self) -> &str {
        match self {
            Tier::A => "a",
            Tier::B => "b",
            Tier::C => "c",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a" => Ok(Tier::A),
            "b" => Ok(Tier::B),
            "c" => Ok(Tier::C),
            other => Err(format!("unknown tier '{}', expected one of a, b, c", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_parse_is_case_insensitive() {
        assert_eq!("a".parse::<Tier>(), Ok(Tier::A));
        assert_eq!(" B ".parse::<Tier>(), Ok(Tier::B));
        assert_eq!("C".parse::<Tier>(), Ok(Tier::C));
        assert!("d".parse::<Tier>().is_err());
    }

    #[test]
    fn test_tier_display_round_trips_through_from_str() {
        for tier in [Tier::A, Tier::B, Tier::C] {
            assert_eq!(tier.to_string().parse::<Tier>(), Ok(tier));
        }
    }

    #[test]
    fn test_message_summary_omits_missing_thread_id() {
        let summary = MessageSummary::new("m1");
        let json = serde_json::to_string(&summary).unwrap();
        assert_eq!(json, r#"{"id":"m1"}"#);

        let parsed: MessageSummary = serde_json::from_str(r#"{"id":"m2","thread_id":"t9"}"#).unwrap();
        assert_eq!(parsed.id, "m2");
        assert_eq!(parsed.thread_id.as_deref(), Some("t9"));
    }
}
