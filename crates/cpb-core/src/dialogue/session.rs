use std::collections::HashMap;

use tokio::sync::Mutex;

use crate::domain::{MediaRef, OperatorId};

/// Which question the bot asked the operator last.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DialogueState {
    #[default]
    Idle,
    AwaitingChannel,
    AwaitingText,
    AwaitingMedia,
    AwaitingButton,
    AwaitingConfirmation,
}

impl DialogueState {
    pub fn as_str(self) -> &'static str {
        match self {
            DialogueState::Idle => "idle",
            DialogueState::AwaitingChannel => "awaiting_channel",
            DialogueState::AwaitingText => "awaiting_text",
            DialogueState::AwaitingMedia => "awaiting_media",
            DialogueState::AwaitingButton => "awaiting_button",
            DialogueState::AwaitingConfirmation => "awaiting_confirmation",
        }
    }
}

/// Fields gathered so far in the current composition, before they are flushed to the draft store.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DialogueSession {
    pub state: DialogueState,
    /// Post body as HTML.
    pub text: Option<String>,
    /// Visible characters of the body, which is what Telegram's limits count.
    pub text_len: usize,
    pub media: Option<MediaRef>,
}

impl DialogueSession {
    pub fn at(state: DialogueState) -> Self {
        Self {
            state,
            ..Self::default()
        }
    }
}

/// Process-wide dialogue sessions keyed by operator.
///
/// An entry exists only while the operator is mid-dialogue; returning to
/// `Idle` removes it. Entries never expire on their own.
#[derive(Default)]
pub struct SessionRegistry {
    inner: Mutex<HashMap<OperatorId, DialogueSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, operator: OperatorId) -> DialogueSession {
        self.inner
            .lock()
            .await
            .get(&operator)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn state(&self, operator: OperatorId) -> DialogueState {
        self.get(operator).await.state
    }

    pub async fn put(&self, operator: OperatorId, session: DialogueSession) {
        let mut map = self.inner.lock().await;
        if session.state == DialogueState::Idle {
            map.remove(&operator);
        } else {
            map.insert(operator, session);
        }
    }

    pub async fn clear(&self, operator: OperatorId) {
        self.inner.lock().await.remove(&operator);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn active(reg: &SessionRegistry) -> usize {
        reg.inner.lock().await.len()
    }

    #[tokio::test]
    async fn unknown_operator_is_idle() {
        let reg = SessionRegistry::new();
        assert_eq!(reg.state(OperatorId(1)).await, DialogueState::Idle);
        assert_eq!(active(&reg).await, 0);
    }

    #[tokio::test]
    async fn idle_sessions_are_dropped() {
        let reg = SessionRegistry::new();
        let op = OperatorId(1);
        reg.put(
            op,
            DialogueSession {
                state: DialogueState::AwaitingMedia,
                text: Some("Hello".to_string()),
                text_len: 5,
                media: None,
            },
        )
        .await;
        assert_eq!(active(&reg).await, 1);
        assert_eq!(reg.get(op).await.text.as_deref(), Some("Hello"));

        reg.put(op, DialogueSession::at(DialogueState::Idle)).await;
        assert_eq!(active(&reg).await, 0);
        assert_eq!(reg.get(op).await, DialogueSession::default());
    }

    #[tokio::test]
    async fn sessions_are_per_operator() {
        let reg = SessionRegistry::new();
        reg.put(OperatorId(1), DialogueSession::at(DialogueState::AwaitingText))
            .await;
        reg.put(OperatorId(2), DialogueSession::at(DialogueState::AwaitingChannel))
            .await;
        reg.clear(OperatorId(1)).await;
        assert_eq!(reg.state(OperatorId(1)).await, DialogueState::Idle);
        assert_eq!(
            reg.state(OperatorId(2)).await,
            DialogueState::AwaitingChannel
        );
    }
}
