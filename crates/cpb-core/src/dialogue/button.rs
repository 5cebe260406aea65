use crate::{dialogue::is_skip, domain::ButtonLink};

/// Delimiter between label and URL. URLs containing it are not supported;
/// everything after the first occurrence belongs to the URL.
pub const BUTTON_DELIMITER: char = '|';

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ButtonSpec {
    /// The operator declined a button.
    None,
    Parsed(ButtonLink),
    Malformed,
}

/// Parse the button step reply: `none`, or `Label | https://target`.
pub fn parse_button_spec(input: &str) -> ButtonSpec {
    if is_skip(input) {
        return ButtonSpec::None;
    }

    let Some((label, target)) = input.split_once(BUTTON_DELIMITER) else {
        return ButtonSpec::Malformed;
    };

    let (label, target) = (label.trim(), target.trim());
    if label.is_empty() || target.is_empty() {
        return ButtonSpec::Malformed;
    }

    ButtonSpec::Parsed(ButtonLink {
        label: label.to_string(),
        target: target.to_string(),
    })
}
