use async_trait::async_trait;

use crate::{
    domain::{MediaRef, MessageRef},
    messaging::types::{InlineKeyboard, MessagingCapabilities, Target},
    Result,
};

/// Outbound messaging port.
///
/// Telegram is the only implementation; prompts are addressed to the operator's
/// chat and finished posts to the linked channel, both through this interface.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    fn capabilities(&self) -> MessagingCapabilities;

    async fn send_text(
        &self,
        target: &Target,
        html: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<MessageRef>;

    async fn send_media(
        &self,
        target: &Target,
        media: &MediaRef,
        caption_html: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<MessageRef>;

    async fn answer_callback_query(&self, callback_id: &str, text: Option<&str>) -> Result<()>;
}
