//! Shared mention-token parsing.
//!
//! Entity-list scanners accept either bare numeric ids or platform-style
//! bracketed mention tokens with a type prefix: `<@123>` / `<@!123>` for
//! users, `<@&123>` for roles, `<#123>` for channels.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// How an entity was referenced in text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MentionKind {
    /// `<@id>` or `<@!id>`.
    User,
    /// `<@&id>`.
    Role,
    /// `<#id>`.
    Channel,
    /// A bare numeric id with no markup.
    Bare,
}

/// One referenced entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityRef {
    /// How the entity was written.
    pub kind: MentionKind,
    /// The platform id.
    pub id: u64,
}

impl EntityRef {
    /// Shorthand constructor.
    #[must_use]
    pub const fn new(kind: MentionKind, id: u64) -> Self {
        Self { kind, id }
    }
}

/// Parser for single mention tokens.
pub struct MentionParser {
    re: Regex,
}

impl std::fmt::Debug for MentionParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MentionParser").finish_non_exhaustive()
    }
}

impl Default for MentionParser {
    fn default() -> Self {
        Self::new()
    }
}

impl MentionParser {
    /// Create a parser. The pattern is a literal and cannot fail.
    #[must_use]
    pub fn new() -> Self {
        #[allow(clippy::expect_used)]
        Self {
            re: Regex::new(r"^<(@&|@!|@|#)(\d+)>$").expect("mention pattern"),
        }
    }

    /// Parse one whitespace-trimmed token. `None` when the token is
    /// neither a bare id nor a well-formed mention.
    #[must_use]
    pub fn parse_token(&self, token: &str) -> Option<EntityRef> {
        let token = token.trim();
        if token.is_empty() {
            return None;
        }
        if token.bytes().all(|b| b.is_ascii_digit()) {
            return token.parse().ok().map(|id| EntityRef::new(MentionKind::Bare, id));
        }
        let caps = self.re.captures(token)?;
        let kind = match &caps[1] {
            "#" => MentionKind::Channel,
            "@&" => MentionKind::Role,
            _ => MentionKind::User,
        };
        caps[2].parse().ok().map(|id| EntityRef::new(kind, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_id() {
        let parser = MentionParser::new();
        assert_eq!(
            parser.parse_token("123456"),
            Some(EntityRef::new(MentionKind::Bare, 123_456))
        );
    }

    #[test]
    fn test_mention_kinds() {
        let parser = MentionParser::new();
        assert_eq!(
            parser.parse_token("<@42>"),
            Some(EntityRef::new(MentionKind::User, 42))
        );
        assert_eq!(
            parser.parse_token("<@!42>"),
            Some(EntityRef::new(MentionKind::User, 42))
        );
        assert_eq!(
            parser.parse_token("<@&7>"),
            Some(EntityRef::new(MentionKind::Role, 7))
        );
        assert_eq!(
            parser.parse_token("<#99>"),
            Some(EntityRef::new(MentionKind::Channel, 99))
        );
    }

    #[test]
    fn test_rejects_garbage() {
        let parser = MentionParser::new();
        assert_eq!(parser.parse_token("bill"), None);
        assert_eq!(parser.parse_token("<@abc>"), None);
        assert_eq!(parser.parse_token("<&12>"), None);
        assert_eq!(parser.parse_token(""), None);
    }
}
