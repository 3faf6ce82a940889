//! Keyword-driven intent analysis for incoming chat messages.
//!
//! The classifier is a pure function of the message text: no I/O, no clock,
//! no shared state. Keyword tables are immutable configuration injected at
//! construction so behavior is fixed for the lifetime of the classifier.

use regex::Regex;

/// Per-message signals derived from the raw text. Ephemeral, never persisted.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IntentSignals {
    pub wants_tasks: bool,
    pub wants_schedule: bool,
    pub wants_reflection: bool,
    pub wants_search: bool,
    pub wants_temporal: bool,
    pub wants_status: bool,
    pub wants_patterns: bool,
    /// Short or generic messages get the broad default context.
    pub general_query: bool,
    /// Lower-cased content words, in order of appearance.
    pub search_terms: Vec<String>,
    /// Literal temporal phrases as they matched, e.g. "yesterday", "3 days ago".
    pub time_references: Vec<String>,
}

impl IntentSignals {
    /// Data categories the message is specifically about, used to narrow
    /// search queries. Empty means no category was detected and all
    /// categories should be searched.
    pub fn detected_categories(&self) -> Vec<Category> {
        let mut out = Vec::new();
        if self.wants_tasks {
            out.push(Category::Tasks);
        }
        if self.wants_schedule {
            out.push(Category::Events);
        }
        if self.wants_reflection {
            out.push(Category::Diary);
        }
        out
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Category {
    Tasks,
    Events,
    Diary,
    Chat,
}

/// Immutable keyword tables. `Default` carries the production sets; tests can
/// inject trimmed-down ones.
#[derive(Clone, Debug)]
pub struct KeywordConfig {
    pub task_keywords: Vec<&'static str>,
    pub schedule_keywords: Vec<&'static str>,
    pub reflection_keywords: Vec<&'static str>,
    pub search_keywords: Vec<&'static str>,
    pub status_keywords: Vec<&'static str>,
    pub pattern_keywords: Vec<&'static str>,
    pub generic_keywords: Vec<&'static str>,
    pub stop_words: Vec<&'static str>,
}

impl Default for KeywordConfig {
    fn default() -> Self {
        KeywordConfig {
            task_keywords: vec![
                "task", "todo", "complete", "pending", "work", "finish", "done", "deadline",
            ],
            schedule_keywords: vec![
                "schedule", "calendar", "event", "meeting", "appointment", "when",
            ],
            reflection_keywords: vec![
                "diary", "mood", "feel", "think", "reflect", "journal", "emotion",
            ],
            search_keywords: vec![
                "find", "search", "look up", "lookup", "locate", "show me", "did i",
            ],
            status_keywords: vec!["current", "now", "today", "status", "so far"],
            pattern_keywords: vec![
                "how often", "usually", "pattern", "trend", "habit", "typically",
            ],
            generic_keywords: vec!["how", "what", "help", "status", "summary", "overview"],
            stop_words: vec![
                "a", "an", "the", "i", "me", "my", "mine", "you", "your", "we", "our", "us",
                "it", "its", "is", "are", "was", "were", "be", "been", "do", "does", "did",
                "can", "could", "will", "would", "should", "what", "when", "where", "which",
                "who", "why", "how", "to", "of", "in", "on", "at", "for", "from", "with",
                "about", "and", "or", "but", "please", "tell", "give", "this", "that",
                "these", "those", "have", "has", "had",
            ],
        }
    }
}

pub struct IntentClassifier {
    keywords: KeywordConfig,
    temporal_patterns: Vec<Regex>,
}

impl IntentClassifier {
    pub fn new(keywords: KeywordConfig) -> Self {
        // Matched against the lower-cased message; literal match text is kept
        // as the time reference.
        let temporal_patterns = [
            r"\d+ days? ago",
            r"\byesterday\b",
            r"\btoday\b",
            r"\blast week\b",
            r"\bthis week\b",
            r"\blast month\b",
            r"\bsince \w+",
        ]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect();

        Self {
            keywords,
            temporal_patterns,
        }
    }

    pub fn analyze(&self, message: &str) -> IntentSignals {
        let lowered = message.to_lowercase();
        let word_count = lowered.split_whitespace().count();

        let contains_any = |keywords: &[&str]| keywords.iter().any(|k| lowered.contains(k));

        let wants_tasks = contains_any(&self.keywords.task_keywords);
        let wants_schedule = contains_any(&self.keywords.schedule_keywords);
        let wants_reflection = contains_any(&self.keywords.reflection_keywords);
        let wants_search = contains_any(&self.keywords.search_keywords);
        let wants_status = contains_any(&self.keywords.status_keywords);
        let wants_patterns = contains_any(&self.keywords.pattern_keywords);
        let general_query = word_count <= 3 || contains_any(&self.keywords.generic_keywords);

        let time_references: Vec<String> = self
            .temporal_patterns
            .iter()
            .flat_map(|re| re.find_iter(&lowered))
            .map(|m| m.as_str().to_string())
            .collect();
        let wants_temporal = !time_references.is_empty();

        let search_terms = if wants_search {
            self.extract_search_terms(message)
        } else {
            Vec::new()
        };

        IntentSignals {
            wants_tasks,
            wants_schedule,
            wants_reflection,
            wants_search,
            wants_temporal,
            wants_status,
            wants_patterns,
            general_query,
            search_terms,
            time_references,
        }
    }

    /// Lower-cased word tokens of the message, with short tokens and stop
    /// words removed. Order of appearance is preserved.
    pub fn extract_search_terms(&self, message: &str) -> Vec<String> {
        message
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(|t| t.to_lowercase())
            .filter(|t| t.len() > 2 && !self.keywords.stop_words.contains(&t.as_str()))
            .collect()
    }
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new(KeywordConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_keywords_set_wants_tasks() {
        let classifier = IntentClassifier::default();
        assert!(classifier.analyze("show my tasks please and thanks").wants_tasks);
        assert!(classifier.analyze("anything on the TODO list for friday?").wants_tasks);
        assert!(!classifier.analyze("sing me a song about mountains").wants_tasks);
    }

    #[test]
    fn test_keyword_substring_match_is_accepted() {
        let classifier = IntentClassifier::default();
        // "multitasking" contains "task"; substring matching is intentional
        assert!(classifier.analyze("I hate multitasking every single morning").wants_tasks);
    }

    #[test]
    fn test_short_messages_are_general_queries() {
        let classifier = IntentClassifier::default();
        assert!(classifier.analyze("ok").general_query);
        assert!(classifier.analyze("good morning friend").general_query);
        assert!(!classifier.analyze("remind me again about the garden plan").general_query);
    }

    #[test]
    fn test_generic_keyword_triggers_general_query() {
        let classifier = IntentClassifier::default();
        assert!(classifier.analyze("give me a summary of recent writing").general_query);
    }

    #[test]
    fn test_search_term_extraction_drops_stop_words() {
        let classifier = IntentClassifier::default();
        let signals = classifier.analyze("Can you find my project deadline?");
        assert!(signals.wants_search);
        assert_eq!(signals.search_terms, vec!["find", "project", "deadline"]);
    }

    #[test]
    fn test_search_terms_keep_order_without_dedup() {
        let classifier = IntentClassifier::default();
        let terms = classifier.extract_search_terms("find garden notes, garden plans");
        assert_eq!(terms, vec!["find", "garden", "notes", "garden", "plans"]);
    }

    #[test]
    fn test_temporal_phrases_are_collected() {
        let classifier = IntentClassifier::default();
        let signals = classifier.analyze("What did I finish 3 days ago and last week?");
        assert!(signals.wants_temporal);
        assert_eq!(signals.time_references, vec!["3 days ago", "last week"]);
    }

    #[test]
    fn test_status_and_pattern_signals() {
        let classifier = IntentClassifier::default();
        assert!(classifier.analyze("where do things stand right now").wants_status);
        assert!(classifier.analyze("how often do I actually exercise").wants_patterns);
    }

    #[test]
    fn test_empty_message_only_general() {
        let classifier = IntentClassifier::default();
        let signals = classifier.analyze("");
        assert!(signals.general_query);
        assert!(!signals.wants_tasks);
        assert!(!signals.wants_schedule);
        assert!(!signals.wants_reflection);
        assert!(!signals.wants_search);
        assert!(!signals.wants_temporal);
        assert!(signals.search_terms.is_empty());
    }

    #[test]
    fn test_no_match_long_message_all_false() {
        let classifier = IntentClassifier::default();
        let signals = classifier.analyze("the quick brown fox jumps over a lazy dog");
        assert!(!signals.wants_tasks);
        assert!(!signals.wants_schedule);
        assert!(!signals.wants_reflection);
        assert!(!signals.wants_search);
        assert!(!signals.wants_temporal);
        assert!(!signals.wants_status);
        assert!(!signals.wants_patterns);
        assert!(!signals.general_query);
    }

    #[test]
    fn test_detected_categories_narrow_search() {
        let classifier = IntentClassifier::default();
        let signals = classifier.analyze("find my task about the report");
        assert_eq!(signals.detected_categories(), vec![Category::Tasks]);

        let signals = classifier.analyze("find anything about the river trip");
        assert!(signals.detected_categories().is_empty());
    }
}
