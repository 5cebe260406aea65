//! Post composition dialogue: per-operator session state and the state machine driving it.

pub mod button;
pub mod composer;
pub mod session;

pub use button::{parse_button_spec, ButtonSpec};
pub use composer::{route, Composer, Route};
pub use session::{DialogueSession, DialogueState, SessionRegistry};

/// Literal reply meaning "skip this step" at the media and button steps.
pub const SKIP_KEYWORD: &str = "none";

pub fn is_skip(input: &str) -> bool {
    input.trim().eq_ignore_ascii_case(SKIP_KEYWORD)
}
