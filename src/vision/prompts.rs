//! Prompt builders for the vision model and validation of its answers.

use crate::vision::types::NavigationHint;

pub fn visibility_question(element: &str) -> String {
    format!("Is the {element} visible on this screen? Answer only 'yes' or 'no'.")
}

pub fn validation_question(expectation: &str) -> String {
    format!("Looking at this screen: {expectation}? Answer only 'yes' or 'no'.")
}

pub fn navigation_question(goal: &str) -> String {
    format!(
        "I'm trying to find '{goal}' but it's not visible.\n\
         \n\
         Looking at this screen, what single action should I take?\n\
         Respond with ONLY ONE action from these options:\n\
         - \"scroll down\"\n\
         - \"scroll up\"\n\
         - \"press back\"\n\
         - \"click [specific element name]\"\n\
         - \"not possible\"\n\
         \n\
         Answer with just the action, nothing else."
    )
}

pub fn is_affirmative(answer: &str) -> bool {
    answer.to_lowercase().contains("yes")
}

/// Validate a navigation answer against the allowed action vocabulary.
/// Anything outside it is discarded.
pub fn parse_navigation_answer(answer: &str) -> Option<NavigationHint> {
    let action = answer.trim().trim_matches('"').to_lowercase();
    if action.is_empty() {
        return None;
    }
    if action.contains("not possible") {
        return Some(NavigationHint::NotPossible);
    }
    if ["scroll", "click", "press", "swipe"]
        .iter()
        .any(|cmd| action.contains(cmd))
    {
        return Some(NavigationHint::Action(action));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yes_answers_are_affirmative() {
        assert!(is_affirmative("Yes"));
        assert!(is_affirmative("yes, it is in the top bar"));
        assert!(!is_affirmative("No."));
    }

    #[test]
    fn scroll_suggestion_is_accepted() {
        assert_eq!(
            parse_navigation_answer("scroll down"),
            Some(NavigationHint::Action("scroll down".into()))
        );
    }

    #[test]
    fn quoted_click_suggestion_is_accepted() {
        assert_eq!(
            parse_navigation_answer("\"click settings icon\""),
            Some(NavigationHint::Action("click settings icon".into()))
        );
    }

    #[test]
    fn not_possible_is_recognized() {
        assert_eq!(
            parse_navigation_answer("Not possible from this screen"),
            Some(NavigationHint::NotPossible)
        );
    }

    #[test]
    fn prose_outside_vocabulary_is_discarded() {
        assert_eq!(parse_navigation_answer("open the settings app first"), None);
        assert_eq!(parse_navigation_answer(""), None);
    }
}
