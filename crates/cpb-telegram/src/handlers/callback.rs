use std::sync::Arc;

use teloxide::prelude::*;

use cpb_core::{
    domain::{ChatId, OperatorId},
    messaging::types::{EventKind, MenuAction},
};

use crate::router::AppState;

use super::dispatch;

/// Only the bot's own menu buttons produce events.
pub fn callback_event(callback_id: &str, data: &str) -> Option<EventKind> {
    MenuAction::from_callback_data(data).map(|action| EventKind::Action {
        callback_id: callback_id.to_string(),
        action,
    })
}

pub async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    let chat = q.message.as_ref().map(|m| ChatId(m.chat().id.0));
    let data = q.data.clone().unwrap_or_default();

    let (Some(chat), Some(kind)) = (chat, callback_event(&q.id, &data)) else {
        // Always answer, even for stale or foreign buttons.
        if let Err(e) = bot.answer_callback_query(q.id.clone()).await {
            tracing::warn!(error = %e, "failed to answer callback query");
        }
        return Ok(());
    };

    let operator = OperatorId(q.from.id.0 as i64);
    dispatch(&state, operator, chat, kind).await;
    Ok(())
}
