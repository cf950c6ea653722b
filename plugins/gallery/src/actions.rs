//! Buttons on a gallery card

use lectern_core::LecternError;
use std::str::FromStr;

/// What a card button asks for, from its `data-action` attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardAction {
    Copy,
    Delete,
}

impl FromStr for CardAction {
    type Err = LecternError;

    fn from_str(action: &str) -> Result<Self, Self::Err> {
        match action {
            "copy" => Ok(CardAction::Copy),
            "delete" => Ok(CardAction::Delete),
            other => Err(LecternError::validation(format!(
                "Unknown card action: {}",
                other
            ))),
        }
    }
}

/// How a dispatched card action ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The snippet went to the clipboard
    Copied(String),
    /// No clipboard; the snippet was placed in the code field instead
    Placed(String),
    Deleted,
    /// The user declined the delete confirmation
    Declined,
}

/// Question asked before an image is deleted
pub fn delete_prompt(filename: &str) -> String {
    format!(
        "Delete image \"{}\"?\n\nThis cannot be undone.",
        filename
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_actions() {
        assert_eq!("copy".parse::<CardAction>().unwrap(), CardAction::Copy);
        assert_eq!("delete".parse::<CardAction>().unwrap(), CardAction::Delete);
        assert!(matches!(
            "rename".parse::<CardAction>(),
            Err(LecternError::Validation(_))
        ));
    }

    #[test]
    fn test_prompt_names_file() {
        assert!(delete_prompt("a.png").starts_with("Delete image \"a.png\"?"));
    }
}
