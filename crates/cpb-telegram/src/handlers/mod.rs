//! Telegram update handlers.
//!
//! Each handler only translates the teloxide update into an [`InboundEvent`]
//! and hands it to the composer while holding the operator's lock, so events
//! of one operator are processed strictly one after another.

use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{CallbackQuery, Message},
};

use cpb_core::{
    domain::{ChatId, OperatorId},
    messaging::types::{EventKind, InboundEvent},
};

use crate::router::AppState;

mod callback;
mod message;

pub use callback::callback_event;
pub use message::{media_event, message_event, text_event};

pub async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    callback::handle_callback(bot, q, state).await
}

pub async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    message::handle_message(bot, msg, state).await
}

async fn dispatch(state: &AppState, operator: OperatorId, chat: ChatId, kind: EventKind) {
    let guard = state.operator_locks.lock_operator(operator).await;
    let next = state
        .composer
        .handle(InboundEvent {
            operator,
            chat,
            kind,
        })
        .await;
    tracing::debug!(operator_id = %operator, state = next.as_str(), "event handled");
    drop(guard);
    state.operator_locks.release(operator).await;
}
