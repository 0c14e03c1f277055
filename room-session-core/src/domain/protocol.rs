use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::PlayerId;

/// Canonical form used for every comparison against protocol content.
///
/// Lowercases and drops everything that is not a letter or digit in any
/// script, so whitespace, punctuation and markup re-encoding on the way back
/// from the server do not change the key.
pub fn normalize(text: &str) -> String {
    text.chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// Kind of an inbound protocol line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LineKind {
    /// Plain chat text
    Text,
    /// Echo of a rendered HTML box
    Html,
    /// Echo of a named, replaceable UI block
    NamedUpdate,
}

impl fmt::Display for LineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineKind::Text => write!(f, "text"),
            LineKind::Html => write!(f, "html"),
            LineKind::NamedUpdate => write!(f, "uhtml"),
        }
    }
}

/// One inbound line, already split from the wire by the platform boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InboundLine {
    Text { content: String },
    Html { content: String },
    NamedUpdate { name: String, content: String },
}

impl InboundLine {
    pub fn text(content: impl Into<String>) -> Self {
        InboundLine::Text {
            content: content.into(),
        }
    }

    pub fn html(content: impl Into<String>) -> Self {
        InboundLine::Html {
            content: content.into(),
        }
    }

    pub fn named_update(name: impl Into<String>, content: impl Into<String>) -> Self {
        InboundLine::NamedUpdate {
            name: name.into(),
            content: content.into(),
        }
    }

    pub fn kind(&self) -> LineKind {
        match self {
            InboundLine::Text { .. } => LineKind::Text,
            InboundLine::Html { .. } => LineKind::Html,
            InboundLine::NamedUpdate { .. } => LineKind::NamedUpdate,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            InboundLine::Text { content }
            | InboundLine::Html { content }
            | InboundLine::NamedUpdate { content, .. } => content,
        }
    }
}

/// Channel-level side effects requested from the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModerationChange {
    /// Restrict who may talk in the channel
    Modchat { level: String },
    /// Temporarily grant speaking rights
    Voice { target: PlayerId },
    /// Revoke a previously granted rank
    Deauth { target: PlayerId },
}

impl fmt::Display for ModerationChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModerationChange::Modchat { level } => write!(f, "/modchat {}", level),
            ModerationChange::Voice { target } => write!(f, "/roomvoice {}", target),
            ModerationChange::Deauth { target } => write!(f, "/roomdeauth {}", target),
        }
    }
}

/// Fire-and-forget output handed to the platform boundary.
///
/// Rate limiting, filtering and retries of the actual send belong to the
/// boundary, not to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outbound {
    Text { content: String },
    NamedUpdate { name: String, content: String },
    Private { to: PlayerId, content: String },
    Moderation { change: ModerationChange },
}

impl Outbound {
    /// The inbound line the server is expected to echo back, if any
    pub fn expected_echo(&self) -> Option<InboundLine> {
        match self {
            Outbound::Text { content } => Some(InboundLine::text(content.clone())),
            Outbound::NamedUpdate { name, content } => {
                Some(InboundLine::named_update(name.clone(), content.clone()))
            }
            Outbound::Private { .. } | Outbound::Moderation { .. } => None,
        }
    }
}

impl fmt::Display for Outbound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outbound::Text { content } => write!(f, "{}", content),
            Outbound::NamedUpdate { name, content } => write!(f, "/adduhtml {}, {}", name, content),
            Outbound::Private { to, content } => write!(f, "/pm {}, {}", to, content),
            Outbound::Moderation { change } => write!(f, "{}", change),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_case_and_punctuation() {
        assert_eq!(normalize("Round 3!"), "round3");
        assert_eq!(normalize("  <b>Hello</b>, World "), "bhellobworld");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_normalize_keeps_non_latin_letters() {
        assert_eq!(normalize("第一回合！"), "第一回合");
        assert_ne!(normalize("第一回合"), normalize("第二回合"));
        assert_eq!(normalize("Straße 🎲"), "straße");
        assert_eq!(normalize("ÉQUIPE Rouge"), normalize("équipe rouge"));
        assert_eq!(normalize("İstanbul"), normalize(&normalize("İstanbul")));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize("Alice challenges Bob!");
        assert_eq!(normalize(&once), once);
    }

    #[test]
    fn test_inbound_kind_and_content() {
        let line = InboundLine::named_update("game-round", "<div>Round 1</div>");
        assert_eq!(line.kind(), LineKind::NamedUpdate);
        assert_eq!(line.content(), "<div>Round 1</div>");
    }

    #[test]
    fn test_expected_echo() {
        let text = Outbound::Text {
            content: "hi".to_string(),
        };
        assert_eq!(text.expected_echo(), Some(InboundLine::text("hi")));

        let moderation = Outbound::Moderation {
            change: ModerationChange::Modchat {
                level: "+".to_string(),
            },
        };
        assert_eq!(moderation.expected_echo(), None);
    }

    #[test]
    fn test_outbound_serialization_is_tagged() {
        let out = Outbound::NamedUpdate {
            name: "board".to_string(),
            content: "x".to_string(),
        };
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["kind"], "named_update");
        assert_eq!(json["name"], "board");
    }
}
