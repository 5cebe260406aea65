//! Renders a draft and delivers it to the linked channel (or, as a preview, to the operator).

use std::sync::Arc;

use crate::{
    domain::{ChannelRef, ChatId, MediaRef, MessageRef, PostDraft},
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{InlineKeyboard, Target},
    },
    Result,
};

/// A draft turned into exactly one outbound message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedPost {
    /// Message text, or the caption when media is present.
    pub body: String,
    pub media: Option<MediaRef>,
    pub keyboard: Option<InlineKeyboard>,
}

pub fn render_post(draft: &PostDraft) -> RenderedPost {
    RenderedPost {
        body: draft.text.clone(),
        media: draft.media.clone(),
        keyboard: draft
            .button
            .as_ref()
            .map(|b| InlineKeyboard::url_button(&b.label, &b.target)),
    }
}

pub struct Publisher {
    messenger: Arc<dyn MessagingPort>,
}

impl Publisher {
    pub fn new(messenger: Arc<dyn MessagingPort>) -> Self {
        Self { messenger }
    }

    /// Send the post to the channel once. No retry; any transport failure
    /// comes back as [`Error::Publish`] carrying the transport's reason.
    pub async fn publish(&self, draft: &PostDraft, channel: &ChannelRef) -> Result<MessageRef> {
        let target = Target::Channel(channel.clone());
        self.deliver(&target, &render_post(draft))
            .await
            .map_err(|e| Error::Publish(cause_text(e)))
    }

    /// Show the operator exactly what the channel will receive.
    pub async fn preview(&self, draft: &PostDraft, chat: ChatId) -> Result<MessageRef> {
        self.deliver(&Target::Chat(chat), &render_post(draft)).await
    }

    async fn deliver(&self, target: &Target, post: &RenderedPost) -> Result<MessageRef> {
        match &post.media {
            Some(media) => {
                self.messenger
                    .send_media(target, media, &post.body, post.keyboard.as_ref())
                    .await
            }
            None => {
                self.messenger
                    .send_text(target, &post.body, post.keyboard.as_ref())
                    .await
            }
        }
    }
}

/// Human-readable failure reason without our own error-kind prefixes.
pub fn cause_text(e: Error) -> String {
    match e {
        Error::External(s) | Error::Publish(s) => s,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ButtonLink, OperatorId};
    use crate::messaging::types::ButtonAction;

    fn draft(media: Option<MediaRef>, button: Option<ButtonLink>) -> PostDraft {
        PostDraft {
            operator_id: OperatorId(1),
            text: "Hello".to_string(),
            media,
            button,
        }
    }

    #[test]
    fn renders_text_only_post_without_keyboard() {
        let r = render_post(&draft(None, None));
        assert_eq!(r.body, "Hello");
        assert!(r.media.is_none());
        assert!(r.keyboard.is_none());
    }

    #[test]
    fn renders_button_as_single_url_element() {
        let r = render_post(&draft(
            Some(MediaRef::photo("p")),
            Some(ButtonLink {
                label: "Buy".to_string(),
                target: "https://example.com".to_string(),
            }),
        ));
        let kb = r.keyboard.unwrap();
        assert_eq!(kb.rows.len(), 1);
        assert_eq!(kb.rows[0].len(), 1);
        assert_eq!(kb.rows[0][0].label, "Buy");
        assert_eq!(
            kb.rows[0][0].action,
            ButtonAction::Url("https://example.com".to_string())
        );
        assert_eq!(r.media, Some(MediaRef::photo("p")));
    }

    #[test]
    fn cause_text_strips_kind_prefix() {
        assert_eq!(
            cause_text(Error::External("Bad Request: chat not found".into())),
            "Bad Request: chat not found"
        );
    }
}
