//! Canned replies for when the completion service is unavailable.
//!
//! Selection is a fixed keyword rule table over the prompt text, first match
//! wins. This path must never fail; it is the floor under every completion
//! error.

const TASK_FALLBACK: &str = "I'd love to help with your tasks! It looks like the \
assistant service is unreachable right now, but you can still manage your tasks \
from the main interface.";

const SCHEDULE_FALLBACK: &str = "I can help you stay organized! While the assistant \
service is temporarily unavailable, your calendar is still right there in the main \
interface.";

const DIARY_FALLBACK: &str = "Reflection is important! Even though the assistant is \
temporarily unavailable, you can still write in your diary to track your thoughts \
and mood.";

const GREETING_FALLBACK: &str = "Hello! I'm your assistant. The language model is \
temporarily unavailable, but I'm still here to help you navigate the app!";

const GENERIC_FALLBACK: &str = "I'm here to help! The assistant service is \
temporarily unavailable, but all app features still work. Try asking me again in a \
moment!";

pub fn fallback_reply(prompt: &str) -> &'static str {
    let lowered = prompt.to_lowercase();
    let contains_any = |words: &[&str]| words.iter().any(|w| lowered.contains(w));

    if contains_any(&["task", "todo", "work"]) {
        TASK_FALLBACK
    } else if contains_any(&["calendar", "schedule", "event"]) {
        SCHEDULE_FALLBACK
    } else if contains_any(&["diary", "mood", "feel"]) {
        DIARY_FALLBACK
    } else if contains_any(&["hello", "hi", "hey"]) {
        GREETING_FALLBACK
    } else {
        GENERIC_FALLBACK
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_rule_table() {
        assert_eq!(fallback_reply("what tasks are left?"), TASK_FALLBACK);
        assert_eq!(fallback_reply("show my CALENDAR please"), SCHEDULE_FALLBACK);
        assert_eq!(fallback_reply("I feel a bit down"), DIARY_FALLBACK);
        assert_eq!(fallback_reply("hello there"), GREETING_FALLBACK);
        assert_eq!(fallback_reply("tell me a joke"), GENERIC_FALLBACK);
    }

    #[test]
    fn test_fallback_never_empty() {
        assert!(!fallback_reply("").is_empty());
    }
}
