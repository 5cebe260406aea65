use std::fmt;

use crate::{errors::Error, Result};

/// Telegram user id of the operator driving the bot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OperatorId(pub i64);

impl fmt::Display for OperatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Telegram chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// Telegram message id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub i32);

/// A stable reference to a sent message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// Raw reference to the broadcast channel: `@username` or a numeric chat id.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ChannelRef(String);

impl ChannelRef {
    /// Trims the operator's input; empty input is rejected.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::Validation(
                "channel reference must not be empty".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric references address the chat directly; anything else is a username.
    pub fn as_chat_id(&self) -> Option<ChatId> {
        self.0.parse::<i64>().ok().map(ChatId)
    }
}

impl fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Photo,
    Video,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Photo => "photo",
            MediaKind::Video => "video",
        }
    }

    /// Unknown or missing kinds read back as photos (rows written before the
    /// kind column existed).
    pub fn from_db(raw: Option<&str>) -> Self {
        match raw {
            Some("video") => MediaKind::Video,
            _ => MediaKind::Photo,
        }
    }
}

/// Transport-level file id of an attached photo or video.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaRef {
    pub kind: MediaKind,
    pub file_id: String,
}

impl MediaRef {
    pub fn photo(file_id: impl Into<String>) -> Self {
        Self {
            kind: MediaKind::Photo,
            file_id: file_id.into(),
        }
    }

    pub fn video(file_id: impl Into<String>) -> Self {
        Self {
            kind: MediaKind::Video,
            file_id: file_id.into(),
        }
    }
}

/// Call-to-action button attached under a post. Label and target always travel together.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ButtonLink {
    pub label: String,
    pub target: String,
}

impl ButtonLink {
    /// Rebuilds a button from nullable storage columns; a half-filled pair yields no button.
    pub fn from_parts(label: Option<String>, target: Option<String>) -> Option<Self> {
        match (label, target) {
            (Some(label), Some(target)) if !label.is_empty() && !target.is_empty() => {
                Some(Self { label, target })
            }
            _ => None,
        }
    }
}

/// The single in-progress or most recently composed post of an operator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostDraft {
    pub operator_id: OperatorId,
    pub text: String,
    pub media: Option<MediaRef>,
    pub button: Option<ButtonLink>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_ref_is_trimmed() {
        let c = ChannelRef::parse("  @mychannel \n").unwrap();
        assert_eq!(c.as_str(), "@mychannel");
        assert_eq!(c.as_chat_id(), None);
    }

    #[test]
    fn channel_ref_rejects_blank_input() {
        assert!(matches!(
            ChannelRef::parse("   "),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn numeric_channel_ref_is_a_chat_id() {
        let c = ChannelRef::parse("-1001234567890").unwrap();
        assert_eq!(c.as_chat_id(), Some(ChatId(-1001234567890)));
    }

    #[test]
    fn button_requires_both_halves() {
        assert_eq!(
            ButtonLink::from_parts(Some("Buy".into()), None),
            None
        );
        assert_eq!(
            ButtonLink::from_parts(None, Some("https://example.com".into())),
            None
        );
        assert!(ButtonLink::from_parts(Some("Buy".into()), Some("https://x.y".into())).is_some());
    }

    #[test]
    fn media_kind_defaults_to_photo() {
        assert_eq!(MediaKind::from_db(None), MediaKind::Photo);
        assert_eq!(MediaKind::from_db(Some("video")), MediaKind::Video);
        assert_eq!(MediaKind::from_db(Some("gif")), MediaKind::Photo);
    }
}
