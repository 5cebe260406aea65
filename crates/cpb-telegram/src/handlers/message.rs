use std::sync::Arc;

use teloxide::{prelude::*, utils::render::RenderMessageTextHelper};

use cpb_core::{
    domain::{ChatId, MediaRef, OperatorId},
    messaging::types::{Command, EventKind},
};

use crate::router::AppState;

use super::dispatch;

/// Slash commands the bot knows; anything else is passed on as a reply.
/// `html` is the message rendered with its formatting entities, when available.
pub fn text_event(text: &str, html: Option<String>) -> EventKind {
    if text.starts_with('/') {
        if let Some(cmd) = Command::parse(text) {
            return EventKind::Command(cmd);
        }
    }
    match html {
        Some(html) => EventKind::Text {
            plain: text.to_string(),
            html,
        },
        None => EventKind::text(text),
    }
}

/// Photo wins over video when a message somehow carries both.
pub fn media_event(photo_file_id: Option<&str>, video_file_id: Option<&str>) -> Option<EventKind> {
    if let Some(id) = photo_file_id {
        return Some(EventKind::Media(MediaRef::photo(id)));
    }
    video_file_id.map(|id| EventKind::Media(MediaRef::video(id)))
}

pub fn message_event(msg: &Message) -> EventKind {
    if let Some(text) = msg.text() {
        return text_event(text, msg.html_text());
    }

    // Photo sizes are ordered smallest to largest.
    let photo = msg.photo().and_then(|sizes| sizes.last()).map(|p| p.file.id.as_str());
    let video = msg.video().map(|v| v.file.id.as_str());
    media_event(photo, video).unwrap_or(EventKind::Unsupported)
}

pub async fn handle_message(_bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let operator = OperatorId(user.id.0 as i64);
    let chat = ChatId(msg.chat.id.0);

    dispatch(&state, operator, chat, message_event(&msg)).await;
    Ok(())
}
