//! Telegram adapter (teloxide).
//!
//! This crate implements the `cpb-core` MessagingPort over the Telegram Bot API
//! and turns Telegram updates into dialogue events.

use async_trait::async_trait;

use teloxide::{
    prelude::*,
    types::{InlineKeyboardButton, InlineKeyboardMarkup, InputFile, ParseMode, Recipient},
};

use tokio::time::sleep;

pub mod handlers;
pub mod router;

use cpb_core::{
    domain::{ChatId, MediaKind, MediaRef, MessageId, MessageRef},
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{ButtonAction, InlineKeyboard, MessagingCapabilities, Target},
    },
    Result,
};

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    fn recipient(target: &Target) -> Recipient {
        match target {
            Target::Chat(chat) => Recipient::Id(teloxide::types::ChatId(chat.0)),
            Target::Channel(channel) => match channel.as_chat_id() {
                Some(chat) => Recipient::Id(teloxide::types::ChatId(chat.0)),
                None => Recipient::ChannelUsername(channel.as_str().to_string()),
            },
        }
    }

    fn markup(keyboard: &InlineKeyboard) -> Result<InlineKeyboardMarkup> {
        let mut rows: Vec<Vec<InlineKeyboardButton>> = Vec::with_capacity(keyboard.rows.len());
        for row in &keyboard.rows {
            let mut out = Vec::with_capacity(row.len());
            for b in row {
                let button = match &b.action {
                    ButtonAction::Callback(data) => {
                        InlineKeyboardButton::callback(b.label.clone(), data.clone())
                    }
                    ButtonAction::Url(raw) => {
                        let url = reqwest::Url::parse(raw).map_err(|e| {
                            Error::External(format!("invalid button URL {raw:?}: {e}"))
                        })?;
                        InlineKeyboardButton::url(b.label.clone(), url)
                    }
                };
                out.push(button);
            }
            rows.push(out);
        }
        Ok(InlineKeyboardMarkup::new(rows))
    }

    fn message_ref(msg: &Message) -> MessageRef {
        MessageRef {
            chat_id: ChatId(msg.chat.id.0),
            message_id: MessageId(msg.id.0),
        }
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::External(format!("telegram error: {e}"))
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    teloxide::RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        tracing::warn!(retry_after = ?d, "telegram flood control, retrying");
                        sleep(d.duration()).await;
                        continue;
                    }
                    other => return Err(Self::map_err(other)),
                },
            }
        }
    }
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            max_message_len: 4096,
            max_caption_len: 1024,
        }
    }

    async fn send_text(
        &self,
        target: &Target,
        html: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<MessageRef> {
        let recipient = Self::recipient(target);
        let markup = keyboard.map(Self::markup).transpose()?;

        let msg = self
            .with_retry(|| {
                let req = self
                    .bot
                    .send_message(recipient.clone(), html.to_string())
                    .parse_mode(ParseMode::Html);
                match &markup {
                    Some(m) => req.reply_markup(m.clone()),
                    None => req,
                }
            })
            .await?;

        Ok(Self::message_ref(&msg))
    }

    async fn send_media(
        &self,
        target: &Target,
        media: &MediaRef,
        caption_html: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<MessageRef> {
        let recipient = Self::recipient(target);
        let markup = keyboard.map(Self::markup).transpose()?;

        let msg = match media.kind {
            MediaKind::Photo => {
                self.with_retry(|| {
                    let req = self
                        .bot
                        .send_photo(recipient.clone(), InputFile::file_id(media.file_id.clone()))
                        .caption(caption_html.to_string())
                        .parse_mode(ParseMode::Html);
                    match &markup {
                        Some(m) => req.reply_markup(m.clone()),
                        None => req,
                    }
                })
                .await?
            }
            MediaKind::Video => {
                self.with_retry(|| {
                    let req = self
                        .bot
                        .send_video(recipient.clone(), InputFile::file_id(media.file_id.clone()))
                        .caption(caption_html.to_string())
                        .parse_mode(ParseMode::Html);
                    match &markup {
                        Some(m) => req.reply_markup(m.clone()),
                        None => req,
                    }
                })
                .await?
            }
        };

        Ok(Self::message_ref(&msg))
    }

    async fn answer_callback_query(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
        self.with_retry(|| {
            let mut req = self.bot.answer_callback_query(callback_id.to_string());
            if let Some(t) = text {
                req = req.text(t.to_string());
            }
            req
        })
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpb_core::domain::ChannelRef;

    #[test]
    fn numeric_channel_is_addressed_by_id() {
        let target = Target::Channel(ChannelRef::parse("-1001234567890").unwrap());
        assert_eq!(
            TelegramMessenger::recipient(&target),
            Recipient::Id(teloxide::types::ChatId(-1001234567890))
        );
    }

    #[test]
    fn named_channel_is_addressed_by_username() {
        let target = Target::Channel(ChannelRef::parse("@mychannel").unwrap());
        assert_eq!(
            TelegramMessenger::recipient(&target),
            Recipient::ChannelUsername("@mychannel".to_string())
        );
    }

    #[test]
    fn url_button_becomes_url_markup() {
        let kb = InlineKeyboard::url_button("Buy", "https://example.com/item");
        let markup = TelegramMessenger::markup(&kb).unwrap();
        assert_eq!(markup.inline_keyboard.len(), 1);
        assert_eq!(markup.inline_keyboard[0][0].text, "Buy");
    }

    #[test]
    fn unparsable_button_url_is_rejected() {
        let kb = InlineKeyboard::url_button("Buy", "not a url");
        assert!(matches!(
            TelegramMessenger::markup(&kb),
            Err(Error::External(_))
        ));
    }
}
