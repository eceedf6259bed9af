//! Cancellation intents get absolute priority over code synthesis: the check
//! runs before any model call on every turn.

pub const UNDO_APPLIED_MSG: &str = "Last action undone.";
pub const NOTHING_TO_UNDO_MSG: &str = "There is no previous action to undo.";

const CANCEL_PHRASES: &[&str] = &["undo", "annule", "reviens", "revenir", "retour", "revient"];

/// Case-insensitive substring match against the fixed phrase set.
pub fn is_cancellation(instruction: &str) -> bool {
    let lowered = instruction.to_lowercase();
    CANCEL_PHRASES.iter().any(|phrase| lowered.contains(phrase))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_cancellation_phrases() {
        assert!(is_cancellation("undo"));
        assert!(is_cancellation("Undo that please"));
        assert!(is_cancellation("annule la dernière action"));
        assert!(is_cancellation("on peut REVENIR en arrière ?"));
    }

    #[test]
    fn ignores_ordinary_instructions() {
        assert!(!is_cancellation("remove duplicate rows"));
        assert!(!is_cancellation("capitalize the name column"));
        assert!(!is_cancellation(""));
    }
}
