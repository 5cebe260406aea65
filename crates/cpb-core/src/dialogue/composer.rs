use std::sync::Arc;

use crate::{
    audit::{AuditEvent, AuditLogger},
    dialogue::{
        button::{parse_button_spec, ButtonSpec},
        is_skip,
        session::{DialogueSession, DialogueState, SessionRegistry},
    },
    domain::{ButtonLink, ChannelRef, ChatId, MediaRef, OperatorId, PostDraft},
    errors::Error,
    formatting::escape_html,
    messaging::{
        port::MessagingPort,
        types::{Command, EventKind, InboundEvent, InlineKeyboard, MenuAction, Target},
    },
    publisher::{cause_text, Publisher},
    store::{ChannelRegistry, DraftStore},
};

const MSG_GREETING: &str = "Hi! 👋\nChoose an action:";
const MSG_ASK_CHANNEL: &str = "Send the channel @username or ID:";
const MSG_NEED_CHANNEL: &str = "❌ Link a channel first with the '📌 Link channel' button.";
const MSG_ASK_TEXT: &str = "Send the post text:";
const MSG_ASK_MEDIA: &str = "Send a photo/video or type 'none':";
const MSG_ASK_BUTTON: &str = "Want a button? Send: Label | https://link or type 'none'";
const MSG_BAD_BUTTON: &str = "Invalid format. Try again or type 'none'.";
const MSG_ASK_CONFIRM: &str = "Publish to the channel?";
const MSG_PUBLISHED: &str = "✅ Post published!";
const MSG_CANCELLED: &str = "❌ Publishing cancelled.";
const MSG_NOTHING_TO_PUBLISH: &str =
    "❌ Nothing to publish: the draft or the linked channel is missing. Start a new post.";
const MSG_STORAGE_FAILURE: &str = "⚠️ Something went wrong while saving. Please try again.";

/// Handler selected for a `(state, event)` pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    ShowMenu,
    BeginLink,
    BeginPost,
    ReceiveChannel,
    ReceiveText,
    ReceiveMedia,
    ReceiveButton,
    Confirm,
    Cancel,
    /// Input that does not answer the current question; repeat the question.
    Clarify,
}

/// Transition table. Starting a link or a post is accepted in every state and
/// discards whatever the operator had in progress.
pub fn route(state: DialogueState, kind: &EventKind) -> Route {
    use DialogueState as S;

    match (state, kind) {
        (_, EventKind::Command(Command::Start | Command::Help)) => Route::ShowMenu,
        (_, EventKind::Command(Command::LinkChannel))
        | (
            _,
            EventKind::Action {
                action: MenuAction::LinkChannel,
                ..
            },
        ) => Route::BeginLink,
        (_, EventKind::Command(Command::NewPost))
        | (
            _,
            EventKind::Action {
                action: MenuAction::NewPost,
                ..
            },
        ) => Route::BeginPost,

        (S::AwaitingChannel, EventKind::Text { .. }) => Route::ReceiveChannel,
        (S::AwaitingText, EventKind::Text { .. }) => Route::ReceiveText,
        (S::AwaitingMedia, EventKind::Text { .. } | EventKind::Media(_)) => Route::ReceiveMedia,
        (S::AwaitingButton, EventKind::Text { .. }) => Route::ReceiveButton,
        (
            S::AwaitingConfirmation,
            EventKind::Action {
                action: MenuAction::Confirm,
                ..
            },
        ) => Route::Confirm,
        (
            S::AwaitingConfirmation,
            EventKind::Action {
                action: MenuAction::Cancel,
                ..
            },
        ) => Route::Cancel,

        (
            S::Idle
            | S::AwaitingChannel
            | S::AwaitingText
            | S::AwaitingMedia
            | S::AwaitingButton
            | S::AwaitingConfirmation,
            EventKind::Text { .. }
            | EventKind::Media(_)
            | EventKind::Unsupported
            | EventKind::Action {
                action: MenuAction::Confirm | MenuAction::Cancel,
                ..
            },
        ) => Route::Clarify,
    }
}

/// The composition state machine.
///
/// Each event for an operator must be handled to completion before the next
/// one for the same operator starts; the transport serializes per operator.
pub struct Composer {
    channels: Arc<dyn ChannelRegistry>,
    drafts: Arc<dyn DraftStore>,
    messenger: Arc<dyn MessagingPort>,
    publisher: Publisher,
    sessions: SessionRegistry,
    audit: AuditLogger,
}

impl Composer {
    pub fn new(
        channels: Arc<dyn ChannelRegistry>,
        drafts: Arc<dyn DraftStore>,
        messenger: Arc<dyn MessagingPort>,
        audit: AuditLogger,
    ) -> Self {
        Self {
            channels,
            drafts,
            publisher: Publisher::new(messenger.clone()),
            messenger,
            sessions: SessionRegistry::new(),
            audit,
        }
    }

    pub async fn state_of(&self, operator: OperatorId) -> DialogueState {
        self.sessions.state(operator).await
    }

    pub async fn session_of(&self, operator: OperatorId) -> DialogueSession {
        self.sessions.get(operator).await
    }

    /// Handle one inbound event and return the operator's resulting state.
    pub async fn handle(&self, event: InboundEvent) -> DialogueState {
        let op = event.operator;
        let chat = event.chat;
        let session = self.sessions.get(op).await;
        let before = session.state;

        if let EventKind::Action { callback_id, .. } = &event.kind {
            if let Err(e) = self.messenger.answer_callback_query(callback_id, None).await {
                tracing::warn!(operator_id = %op, error = %e, "failed to answer callback query");
            }
        }

        let step = route(before, &event.kind);
        match (step, event.kind) {
            (Route::ShowMenu, _) => {
                self.say_with(chat, MSG_GREETING, &InlineKeyboard::main_menu())
                    .await
            }
            (Route::BeginLink, _) => self.begin_link(op, chat).await,
            (Route::BeginPost, _) => self.begin_post(op, chat).await,
            (Route::ReceiveChannel, EventKind::Text { plain, .. }) => {
                self.receive_channel(op, chat, &plain).await
            }
            (Route::ReceiveText, EventKind::Text { plain, html }) => {
                self.receive_text(op, chat, session, &plain, html).await
            }
            (Route::ReceiveMedia, EventKind::Media(media)) => {
                self.receive_media(op, chat, session, Some(media)).await
            }
            (Route::ReceiveMedia, EventKind::Text { plain, .. }) if is_skip(&plain) => {
                self.receive_media(op, chat, session, None).await
            }
            (Route::ReceiveButton, EventKind::Text { plain, .. }) => {
                self.receive_button(op, chat, session, &plain).await
            }
            (Route::Confirm, _) => self.confirm(op, chat).await,
            (Route::Cancel, _) => self.cancel(op, chat).await,
            _ => self.clarify(chat, before).await,
        }

        let after = self.sessions.state(op).await;
        if after != before {
            tracing::info!(
                operator_id = %op,
                from = before.as_str(),
                to = after.as_str(),
                "dialogue transition"
            );
        }
        after
    }

    async fn begin_link(&self, op: OperatorId, chat: ChatId) {
        self.sessions
            .put(op, DialogueSession::at(DialogueState::AwaitingChannel))
            .await;
        self.say(chat, MSG_ASK_CHANNEL).await;
    }

    async fn begin_post(&self, op: OperatorId, chat: ChatId) {
        match self.channels.get_channel(op).await {
            Ok(Some(_)) => {
                self.sessions
                    .put(op, DialogueSession::at(DialogueState::AwaitingText))
                    .await;
                self.say(chat, MSG_ASK_TEXT).await;
            }
            Ok(None) => {
                let e = Error::MissingPrerequisite("no linked channel".to_string());
                self.missing_prerequisite(op, chat, e, MSG_NEED_CHANNEL, None)
                    .await;
            }
            Err(e) => self.storage_failure(op, chat, e).await,
        }
    }

    async fn receive_channel(&self, op: OperatorId, chat: ChatId, raw: &str) {
        let channel = match ChannelRef::parse(raw) {
            Ok(c) => c,
            Err(_) => {
                self.say(chat, MSG_ASK_CHANNEL).await;
                return;
            }
        };

        if let Err(e) = self.channels.set_channel(op, &channel).await {
            self.storage_failure(op, chat, e).await;
            return;
        }

        tracing::info!(operator_id = %op, channel = %channel, "channel linked");
        self.audit
            .record(AuditEvent::channel_linked(op, channel.as_str()));
        self.sessions.clear(op).await;
        let msg = format!("✅ Channel {} linked.", escape_html(channel.as_str()));
        self.say_with(chat, &msg, &InlineKeyboard::main_menu()).await;
    }

    async fn receive_text(
        &self,
        op: OperatorId,
        chat: ChatId,
        mut session: DialogueSession,
        plain: &str,
        html: String,
    ) {
        if plain.trim().is_empty() {
            self.say(chat, MSG_ASK_TEXT).await;
            return;
        }
        let text_len = plain.chars().count();
        let limit = self.messenger.capabilities().max_message_len;
        if text_len > limit {
            let msg = format!("Text is too long ({limit} characters max). {MSG_ASK_TEXT}");
            self.say(chat, &msg).await;
            return;
        }

        session.text = Some(html);
        session.text_len = text_len;
        session.state = DialogueState::AwaitingMedia;
        self.sessions.put(op, session).await;
        self.say(chat, MSG_ASK_MEDIA).await;
    }

    async fn receive_media(
        &self,
        op: OperatorId,
        chat: ChatId,
        mut session: DialogueSession,
        media: Option<MediaRef>,
    ) {
        let limit = self.messenger.capabilities().max_caption_len;
        if media.is_some() && session.text_len > limit {
            let msg = format!(
                "The text is too long for a media caption ({limit} characters max). Type 'none' to post it without media."
            );
            self.say(chat, &msg).await;
            return;
        }

        session.media = media;
        session.state = DialogueState::AwaitingButton;
        self.sessions.put(op, session).await;
        self.say(chat, MSG_ASK_BUTTON).await;
    }

    async fn receive_button(
        &self,
        op: OperatorId,
        chat: ChatId,
        mut session: DialogueSession,
        input: &str,
    ) {
        let button: Option<ButtonLink> = match parse_button_spec(input) {
            ButtonSpec::None => None,
            ButtonSpec::Parsed(b) => Some(b),
            ButtonSpec::Malformed => {
                self.say(chat, MSG_BAD_BUTTON).await;
                return;
            }
        };

        let Some(text) = session.text.clone() else {
            // Only reachable if the session was assembled out of order.
            self.sessions.clear(op).await;
            let e = Error::MissingPrerequisite("post text".to_string());
            let menu = InlineKeyboard::main_menu();
            self.missing_prerequisite(op, chat, e, MSG_NOTHING_TO_PUBLISH, Some(&menu))
                .await;
            return;
        };

        if let Err(e) = self
            .drafts
            .replace_draft(op, &text, session.media.as_ref(), button.as_ref())
            .await
        {
            self.storage_failure(op, chat, e).await;
            return;
        }
        tracing::info!(
            operator_id = %op,
            has_media = session.media.is_some(),
            has_button = button.is_some(),
            "draft saved"
        );
        self.audit.record(AuditEvent::draft_saved(op, &text));

        let draft = PostDraft {
            operator_id: op,
            text,
            media: session.media.clone(),
            button,
        };

        session.state = DialogueState::AwaitingConfirmation;
        self.sessions.put(op, session).await;

        if let Err(e) = self.publisher.preview(&draft, chat).await {
            tracing::warn!(operator_id = %op, error = %e, "preview failed");
            let msg = format!("⚠️ Preview failed: {}", escape_html(&cause_text(e)));
            self.say(chat, &msg).await;
        }
        self.say_with(chat, MSG_ASK_CONFIRM, &InlineKeyboard::confirm_menu())
            .await;
    }

    async fn confirm(&self, op: OperatorId, chat: ChatId) {
        let draft = match self.drafts.get_draft(op).await {
            Ok(d) => d,
            Err(e) => return self.storage_failure(op, chat, e).await,
        };
        let channel = match self.channels.get_channel(op).await {
            Ok(c) => c,
            Err(e) => return self.storage_failure(op, chat, e).await,
        };

        let (draft, channel) = match (draft, channel) {
            (Some(d), Some(c)) => (d, c),
            (d, _) => {
                let missing = if d.is_none() { "saved draft" } else { "linked channel" };
                self.sessions.clear(op).await;
                let e = Error::MissingPrerequisite(missing.to_string());
                let menu = InlineKeyboard::main_menu();
                self.missing_prerequisite(op, chat, e, MSG_NOTHING_TO_PUBLISH, Some(&menu))
                    .await;
                return;
            }
        };

        let outcome = self.publisher.publish(&draft, &channel).await;
        self.sessions.clear(op).await;

        match outcome {
            Ok(_) => {
                tracing::info!(operator_id = %op, channel = %channel, "post published");
                self.audit
                    .record(AuditEvent::published(op, channel.as_str()));
                self.say_with(chat, MSG_PUBLISHED, &InlineKeyboard::main_menu())
                    .await;
            }
            Err(e) => {
                let cause = cause_text(e);
                tracing::warn!(operator_id = %op, channel = %channel, error = %cause, "publish failed");
                self.audit
                    .record(AuditEvent::publish_failed(op, channel.as_str(), &cause));
                let msg = format!("❌ Publish error: {}", escape_html(&cause));
                self.say_with(chat, &msg, &InlineKeyboard::main_menu()).await;
            }
        }
    }

    async fn cancel(&self, op: OperatorId, chat: ChatId) {
        self.sessions.clear(op).await;
        self.audit.record(AuditEvent::cancelled(op));
        self.say_with(chat, MSG_CANCELLED, &InlineKeyboard::main_menu())
            .await;
    }

    /// Repeat the question belonging to `state`; the state itself is untouched.
    async fn clarify(&self, chat: ChatId, state: DialogueState) {
        match state {
            DialogueState::Idle => {
                self.say_with(chat, MSG_GREETING, &InlineKeyboard::main_menu())
                    .await
            }
            DialogueState::AwaitingChannel => self.say(chat, MSG_ASK_CHANNEL).await,
            DialogueState::AwaitingText => self.say(chat, MSG_ASK_TEXT).await,
            DialogueState::AwaitingMedia => self.say(chat, MSG_ASK_MEDIA).await,
            DialogueState::AwaitingButton => self.say(chat, MSG_ASK_BUTTON).await,
            DialogueState::AwaitingConfirmation => {
                self.say_with(chat, MSG_ASK_CONFIRM, &InlineKeyboard::confirm_menu())
                    .await
            }
        }
    }

    async fn missing_prerequisite(
        &self,
        op: OperatorId,
        chat: ChatId,
        e: Error,
        guidance: &str,
        keyboard: Option<&InlineKeyboard>,
    ) {
        tracing::info!(operator_id = %op, error = %e, "step refused");
        self.audit.record(AuditEvent::error(op, &e.to_string()));
        match keyboard {
            Some(kb) => self.say_with(chat, guidance, kb).await,
            None => self.say(chat, guidance).await,
        }
    }

    /// Storage is unreachable: report generically and leave the session as it was.
    async fn storage_failure(&self, op: OperatorId, chat: ChatId, e: Error) {
        tracing::error!(operator_id = %op, error = %e, "storage failure");
        self.audit.record(AuditEvent::error(op, &e.to_string()));
        self.say(chat, MSG_STORAGE_FAILURE).await;
    }

    async fn say(&self, chat: ChatId, html: &str) {
        if let Err(e) = self.messenger.send_text(&Target::Chat(chat), html, None).await {
            tracing::warn!(chat_id = chat.0, error = %e, "failed to send prompt");
        }
    }

    async fn say_with(&self, chat: ChatId, html: &str, keyboard: &InlineKeyboard) {
        if let Err(e) = self
            .messenger
            .send_text(&Target::Chat(chat), html, Some(keyboard))
            .await
        {
            tracing::warn!(chat_id = chat.0, error = %e, "failed to send prompt");
        }
    }
}
