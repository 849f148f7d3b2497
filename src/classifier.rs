//! Keyword classifier deciding between a canned reply and an AI reply.

const GREETINGS: &[&str] = &["hello", "hi", "hey", "sup", "whatsup"];
const GOODBYES: &[&str] = &["bye", "goodbye", "see you", "cya"];

pub const GREETING_REPLY: &str = "Hey! How can I help you today? 👋";
pub const GOODBYE_REPLY: &str = "Goodbye! Have a great day! 👋";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Greeting,
    Goodbye,
    NeedsAi,
}

impl Classification {
    /// Fixed reply for this class, or `None` when the text must go to the model.
    pub fn canned_reply(self) -> Option<&'static str> {
        match self {
            Classification::Greeting => Some(GREETING_REPLY),
            Classification::Goodbye => Some(GOODBYE_REPLY),
            Classification::NeedsAi => None,
        }
    }
}

/// Classify a message by case-insensitive substring match.
///
/// Greetings win over goodbyes. Matching is not word-bounded, so "cyan"
/// counts as a goodbye and "this" as a greeting.
pub fn classify(text: &str) -> Classification {
    let text = text.to_lowercase();

    if GREETINGS.iter().any(|w| text.contains(w)) {
        Classification::Greeting
    } else if GOODBYES.iter().any(|w| text.contains(w)) {
        Classification::Goodbye
    } else {
        Classification::NeedsAi
    }
}
