use crate::{
    domain::{ChannelRef, ChatId, MediaRef, OperatorId},
    formatting::escape_html,
};

/// Inbound update, already stripped of transport details.
#[derive(Clone, Debug)]
pub struct InboundEvent {
    pub operator: OperatorId,
    pub chat: ChatId,
    pub kind: EventKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventKind {
    Command(Command),
    /// Inline keyboard press. The callback id must be answered.
    Action {
        callback_id: String,
        action: MenuAction,
    },
    /// Free-text reply. `html` is the same text rendered for Telegram HTML
    /// parse mode with the sender's formatting; `plain` is used for commands,
    /// keywords and length limits.
    Text { plain: String, html: String },
    Media(MediaRef),
    /// Stickers, documents, voice notes and other payloads the dialogue never accepts.
    Unsupported,
}

impl EventKind {
    /// Text reply without formatting; the HTML form is the escaped plain text.
    pub fn text(plain: impl Into<String>) -> Self {
        let plain = plain.into();
        let html = escape_html(&plain);
        EventKind::Text { plain, html }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    LinkChannel,
    NewPost,
}

impl Command {
    /// Parses `/cmd` or `/cmd@botname`, ignoring trailing arguments.
    pub fn parse(text: &str) -> Option<Self> {
        let first = text.trim().split_whitespace().next()?;
        let name = first.strip_prefix('/')?.split('@').next()?.to_lowercase();
        match name.as_str() {
            "start" => Some(Command::Start),
            "help" => Some(Command::Help),
            "link" | "setchannel" => Some(Command::LinkChannel),
            "newpost" | "post" => Some(Command::NewPost),
            _ => None,
        }
    }
}

/// Buttons of the bot's own menus.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MenuAction {
    LinkChannel,
    NewPost,
    Confirm,
    Cancel,
}

impl MenuAction {
    pub fn callback_data(self) -> &'static str {
        match self {
            MenuAction::LinkChannel => "set_channel",
            MenuAction::NewPost => "new_post",
            MenuAction::Confirm => "confirm_yes",
            MenuAction::Cancel => "confirm_no",
        }
    }

    pub fn from_callback_data(data: &str) -> Option<Self> {
        match data {
            "set_channel" => Some(MenuAction::LinkChannel),
            "new_post" => Some(MenuAction::NewPost),
            "confirm_yes" => Some(MenuAction::Confirm),
            "confirm_no" => Some(MenuAction::Cancel),
            _ => None,
        }
    }
}

/// Where an outbound message goes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    /// The operator's private chat (prompts, previews).
    Chat(ChatId),
    /// The linked broadcast channel (final publish).
    Channel(ChannelRef),
}

/// Inline keyboard; each inner vec is one row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineKeyboard {
    pub rows: Vec<Vec<InlineButton>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineButton {
    pub label: String,
    pub action: ButtonAction,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ButtonAction {
    Callback(String),
    Url(String),
}

impl InlineKeyboard {
    fn menu(items: &[(&str, MenuAction)]) -> Self {
        let rows = items
            .iter()
            .map(|(label, action)| {
                vec![InlineButton {
                    label: label.to_string(),
                    action: ButtonAction::Callback(action.callback_data().to_string()),
                }]
            })
            .collect();
        Self { rows }
    }

    pub fn main_menu() -> Self {
        Self::menu(&[
            ("📌 Link channel", MenuAction::LinkChannel),
            ("✏ New post", MenuAction::NewPost),
        ])
    }

    pub fn confirm_menu() -> Self {
        Self::menu(&[
            ("✅ Publish", MenuAction::Confirm),
            ("❌ Cancel", MenuAction::Cancel),
        ])
    }

    /// Single call-to-action button opening `url`.
    pub fn url_button(label: &str, url: &str) -> Self {
        Self {
            rows: vec![vec![InlineButton {
                label: label.to_string(),
                action: ButtonAction::Url(url.to_string()),
            }]],
        }
    }
}

/// Length limits of a messenger implementation, in visible characters.
#[derive(Clone, Copy, Debug)]
pub struct MessagingCapabilities {
    pub max_message_len: usize,
    pub max_caption_len: usize,
}
