//! Context assembly for LLM conversations.
//!
//! Inspects the user's message, decides which personal-data categories are
//! relevant, queries each through the data access layer, and renders a
//! bounded natural-language context string for the completion prompt.

use chrono::{Datelike, Duration, Local, NaiveDate};
use thiserror::Error;

use crate::config::Config;
use crate::db::{ChatMessage, Database, DiaryEntry, Event, Task};
use crate::intent::{Category, IntentClassifier, IntentSignals};

const SNIPPET_CHARS: usize = 100;
const DIARY_SNIPPET_CHARS: usize = 150;
const PENDING_TASK_LINES: usize = 5;
const DONE_TASK_LINES: usize = 3;
const REFLECTION_LINES: usize = 3;
const PATTERN_WINDOW_DAYS: i64 = 30;
const RECENT_ACTIVITY_DAYS: i64 = 3;
const RECENT_ACTIVITY_CAP: usize = 5;

const WEEKDAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Caller contract violations. Everything environmental degrades to a smaller
/// context instead of erroring.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("user id must not be empty")]
    MissingUserId,
    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
}

pub struct ContextBuilder {
    db: Database,
    classifier: IntentClassifier,
    chat_context_messages: usize,
    diary_lookback_days: i64,
}

impl ContextBuilder {
    pub fn new(db: Database, classifier: IntentClassifier, config: &Config) -> Self {
        Self {
            db,
            classifier,
            chat_context_messages: config.chat_context_messages,
            diary_lookback_days: config.diary_lookback_days,
        }
    }

    /// Builds the full context string for one request. `date` defaults to the
    /// current local date; given identical inputs and unchanged store
    /// contents the output is byte-identical.
    pub fn build_context(
        &self,
        user_id: &str,
        message: &str,
        date: Option<&str>,
    ) -> Result<String, ContextError> {
        if user_id.trim().is_empty() {
            return Err(ContextError::MissingUserId);
        }
        let today = match date {
            Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|_| ContextError::InvalidDate(raw.to_string()))?,
            None => Local::now().date_naive(),
        };

        let signals = self.classifier.analyze(message);
        let mut sections = vec![format!(
            "User ID: {}\nCurrent Date: {}\nUser Message: {}",
            user_id, today, message
        )];

        if signals.wants_tasks || signals.general_query {
            sections.extend(self.tasks_today_section(user_id, today));
        }
        if signals.wants_schedule || signals.general_query {
            sections.extend(self.schedule_section(user_id, today));
        }
        if signals.wants_reflection || signals.general_query {
            sections.extend(self.reflections_section(user_id, today));
        }
        if signals.wants_search {
            sections.extend(self.search_sections(user_id, &signals));
        }
        if signals.wants_temporal {
            sections.extend(self.temporal_section(user_id, today, &signals));
        }
        if signals.wants_status || signals.general_query {
            sections.push(self.status_section(user_id, today));
        }
        if signals.wants_patterns {
            sections.extend(self.patterns_section(user_id, today));
        }
        sections.extend(self.conversation_section(user_id));
        sections.extend(self.recent_activity_section(user_id, today));

        Ok(sections.join("\n\n"))
    }

    fn tasks_today_section(&self, user_id: &str, today: NaiveDate) -> Option<String> {
        let tasks = self.db.tasks_for_date(user_id, today);
        if tasks.is_empty() {
            return None;
        }

        let pending: Vec<&Task> = tasks.iter().filter(|t| !t.completed && !t.failed).collect();
        let completed: Vec<&Task> = tasks.iter().filter(|t| t.completed).collect();
        let failed: Vec<&Task> = tasks.iter().filter(|t| t.failed).collect();

        let mut lines = vec![format!("=== TODAY'S TASKS ({}) ===", today)];
        if !pending.is_empty() {
            lines.push(format!("📋 PENDING ({}):", pending.len()));
            for task in pending.iter().take(PENDING_TASK_LINES) {
                let urgency = if task.urgency_level.unwrap_or(0) >= 3 {
                    "🔥"
                } else {
                    ""
                };
                let time = task
                    .time
                    .as_deref()
                    .filter(|t| !t.is_empty())
                    .map(|t| format!(" at {}", t))
                    .unwrap_or_default();
                lines.push(format!("  • {}{}{}", urgency, task.title, time));
            }
        }
        if !completed.is_empty() {
            lines.push(format!("✅ COMPLETED ({}):", completed.len()));
            for task in completed.iter().take(DONE_TASK_LINES) {
                lines.push(format!("  • {}", task.title));
            }
        }
        if !failed.is_empty() {
            lines.push(format!("❌ FAILED ({}):", failed.len()));
            for task in failed.iter().take(DONE_TASK_LINES) {
                lines.push(format!("  • {}", task.title));
            }
        }
        Some(lines.join("\n"))
    }

    fn schedule_section(&self, user_id: &str, today: NaiveDate) -> Option<String> {
        let events = self.db.events_for_date(user_id, today);
        if events.is_empty() {
            return None;
        }

        let mut lines = vec![format!("=== TODAY'S SCHEDULE ({}) ===", today)];
        for event in &events {
            lines.push(format!("📅 {}", format_event_line(event, false)));
            if let Some(description) = event.description.as_deref().filter(|d| !d.is_empty()) {
                lines.push(format!("    📝 {}", snippet(description, SNIPPET_CHARS)));
            }
        }
        Some(lines.join("\n"))
    }

    fn reflections_section(&self, user_id: &str, today: NaiveDate) -> Option<String> {
        let since = today - Duration::days(self.diary_lookback_days);
        let entries = self.db.diary_recent(user_id, since);
        if entries.is_empty() {
            return None;
        }

        let mut lines = vec!["=== RECENT REFLECTIONS ===".to_string()];
        for entry in entries.iter().take(REFLECTION_LINES) {
            let title = entry.title.as_deref().unwrap_or("(untitled)");
            lines.push(format!(
                "{} {}: {}",
                mood_emoji(entry.mood.as_deref()),
                entry.date,
                title
            ));
            if !entry.content.is_empty() {
                lines.push(format!(
                    "    \"{}\"",
                    snippet(&entry.content, DIARY_SNIPPET_CHARS)
                ));
            }
        }
        Some(lines.join("\n"))
    }

    /// One labeled section per non-empty category. When the analyzer detected
    /// specific categories, only those are searched; otherwise all four are.
    fn search_sections(&self, user_id: &str, signals: &IntentSignals) -> Vec<String> {
        let terms = &signals.search_terms;
        if terms.is_empty() {
            return Vec::new();
        }
        let mut categories = signals.detected_categories();
        if categories.is_empty() {
            categories = vec![Category::Tasks, Category::Events, Category::Diary, Category::Chat];
        }

        let mut sections = Vec::new();
        for category in categories {
            match category {
                Category::Tasks => {
                    let tasks = self.db.tasks_matching(user_id, terms);
                    if !tasks.is_empty() {
                        let mut lines = vec!["=== MATCHING TASKS ===".to_string()];
                        for task in &tasks {
                            lines.push(format!("  • {}", format_task_line(task)));
                        }
                        sections.push(lines.join("\n"));
                    }
                }
                Category::Events => {
                    let events = self.db.events_matching(user_id, terms);
                    if !events.is_empty() {
                        let mut lines = vec!["=== MATCHING EVENTS ===".to_string()];
                        for event in &events {
                            lines.push(format!("  • {}", format_event_line(event, true)));
                        }
                        sections.push(lines.join("\n"));
                    }
                }
                Category::Diary => {
                    let entries = self.db.diary_matching(user_id, terms);
                    if !entries.is_empty() {
                        let mut lines = vec!["=== MATCHING DIARY ENTRIES ===".to_string()];
                        for entry in &entries {
                            let title = entry.title.as_deref().unwrap_or("(untitled)");
                            lines.push(format!(
                                "  • {}: {} — {}",
                                entry.date,
                                title,
                                snippet(&entry.content, SNIPPET_CHARS)
                            ));
                        }
                        sections.push(lines.join("\n"));
                    }
                }
                Category::Chat => {
                    let messages = self.db.chat_matching(user_id, terms);
                    if !messages.is_empty() {
                        let mut lines = vec!["=== MATCHING CONVERSATIONS ===".to_string()];
                        for message in &messages {
                            lines.push(format!("  • {}", format_chat_line(message)));
                        }
                        sections.push(lines.join("\n"));
                    }
                }
            }
        }
        sections
    }

    fn temporal_section(
        &self,
        user_id: &str,
        today: NaiveDate,
        signals: &IntentSignals,
    ) -> Option<String> {
        let mut lines = vec!["=== LOOKING BACK ===".to_string()];
        let mut any = false;

        for phrase in &signals.time_references {
            let Some((start, end)) = resolve_time_reference(phrase, today) else {
                continue;
            };
            let tasks = self.db.tasks_in_range(user_id, start, end);
            let events = self.db.events_in_range(user_id, start, end);
            if tasks.is_empty() && events.is_empty() {
                continue;
            }
            any = true;
            if start == end {
                lines.push(format!("For \"{}\" ({}):", phrase, start));
            } else {
                lines.push(format!("For \"{}\" ({} to {}):", phrase, start, end));
            }
            for task in &tasks {
                lines.push(format!("  • task: {}", format_task_line(task)));
            }
            for event in &events {
                lines.push(format!("  • event: {}", format_event_line(event, true)));
            }
        }

        any.then(|| lines.join("\n"))
    }

    /// Same-day aggregates. Unlike the data sections this one may render a
    /// "none" placeholder, so a status question always gets an answer.
    fn status_section(&self, user_id: &str, today: NaiveDate) -> String {
        let tasks = self.db.tasks_for_date(user_id, today);
        let events = self.db.events_for_date(user_id, today);
        let since = today - Duration::days(PATTERN_WINDOW_DAYS);
        let latest_mood = self
            .db
            .diary_recent(user_id, since)
            .into_iter()
            .find_map(|e| e.mood);

        let mut parts = Vec::new();
        if !tasks.is_empty() {
            let done = tasks.iter().filter(|t| t.completed).count();
            let failed = tasks.iter().filter(|t| t.failed).count();
            let pending = tasks.len() - done - failed;
            parts.push(format!(
                "{} tasks today ({} done, {} pending, {} failed)",
                tasks.len(),
                done,
                pending,
                failed
            ));
        }
        if !events.is_empty() {
            parts.push(format!("{} events on the calendar", events.len()));
        }
        if let Some(mood) = latest_mood {
            parts.push(format!("latest diary mood: {}", mood));
        }

        let summary = if parts.is_empty() {
            "nothing recorded yet today".to_string()
        } else {
            parts.join("; ")
        };
        format!("=== CURRENT STATUS ({}) ===\n{}.", today, summary)
    }

    fn patterns_section(&self, user_id: &str, today: NaiveDate) -> Option<String> {
        let since = today - Duration::days(PATTERN_WINDOW_DAYS);
        let tasks = self.db.tasks_in_range(user_id, since, today);
        let entries = self.db.diary_recent(user_id, since);

        let mut lines = vec!["=== HABITS & PATTERNS (last 30 days) ===".to_string()];
        let mut any = false;

        if let Some((weekday, done, total)) = best_completion_day(&tasks) {
            any = true;
            lines.push(format!(
                "Most productive day: {} ({} of {} tasks completed)",
                WEEKDAY_NAMES[weekday], done, total
            ));
        }
        if let Some((mood, count, total)) = dominant_mood(&entries) {
            any = true;
            lines.push(format!(
                "Most frequent mood: {} ({} of {} entries)",
                mood, count, total
            ));
        }

        any.then(|| lines.join("\n"))
    }

    fn conversation_section(&self, user_id: &str) -> Option<String> {
        let messages = self.db.chat_recent(user_id, self.chat_context_messages);
        if messages.is_empty() {
            return None;
        }

        let mut lines = vec!["=== RECENT CONVERSATION ===".to_string()];
        for message in &messages {
            lines.push(format_chat_line(message));
        }
        Some(lines.join("\n"))
    }

    fn recent_activity_section(&self, user_id: &str, today: NaiveDate) -> Option<String> {
        let start = today - Duration::days(RECENT_ACTIVITY_DAYS);
        let tasks = self.db.tasks_in_range(user_id, start, today);
        let events = self.db.events_in_range(user_id, start, today);
        if tasks.is_empty() && events.is_empty() {
            return None;
        }

        let mut entries: Vec<(NaiveDate, String)> = tasks
            .iter()
            .map(|t| (t.date, format!("task: {}", format_task_line(t))))
            .chain(
                events
                    .iter()
                    .map(|e| (e.date, format!("event: {}", format_event_line(e, true)))),
            )
            .collect();
        entries.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        entries.truncate(RECENT_ACTIVITY_CAP);

        let mut lines = vec!["=== RECENT ACTIVITY (last 3 days) ===".to_string()];
        for (_, line) in entries {
            lines.push(format!("  • {}", line));
        }
        Some(lines.join("\n"))
    }
}

fn format_task_line(task: &Task) -> String {
    let status = if task.completed {
        "done"
    } else if task.failed {
        "failed"
    } else {
        "pending"
    };
    let time = task
        .time
        .as_deref()
        .filter(|t| !t.is_empty())
        .map(|t| format!(" at {}", t))
        .unwrap_or_default();
    format!("{} ({}{}) [{}]", task.title, task.date, time, status)
}

fn format_event_line(event: &Event, with_date: bool) -> String {
    let mut out = String::new();
    if with_date {
        out.push_str(&format!("{} ", event.date));
    }
    if let Some(time) = event.time.as_deref().filter(|t| !t.is_empty()) {
        out.push_str(&format!("{} - ", time));
    }
    if let Some(kind) = event.kind.as_deref().filter(|k| !k.is_empty()) {
        out.push_str(&format!("[{}] ", kind));
    }
    out.push_str(&event.title);
    out
}

fn format_chat_line(message: &ChatMessage) -> String {
    let speaker = if message.is_ai { "Assistant" } else { "You" };
    format!("{}: {}", speaker, snippet(&message.text, SNIPPET_CHARS))
}

/// Translates a matched temporal phrase into a concrete inclusive date range.
/// Unrecognized phrases resolve to `None` and are dropped by the caller.
fn resolve_time_reference(phrase: &str, today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    match phrase {
        "yesterday" => {
            let day = today - Duration::days(1);
            Some((day, day))
        }
        "today" => Some((today, today)),
        "last week" | "this week" => Some((today - Duration::days(7), today)),
        "last month" => Some((today - Duration::days(30), today)),
        _ => {
            let days: i64 = phrase.strip_suffix(" days ago")
                .or_else(|| phrase.strip_suffix(" day ago"))
                .and_then(|n| n.parse().ok())?;
            let day = today - Duration::days(days);
            Some((day, day))
        }
    }
}

/// Weekday (0 = Monday) with the highest completion ratio among days that
/// have tasks. Earlier weekdays win ties.
fn best_completion_day(tasks: &[Task]) -> Option<(usize, usize, usize)> {
    let mut done = [0usize; 7];
    let mut total = [0usize; 7];
    for task in tasks {
        let idx = task.date.weekday().num_days_from_monday() as usize;
        total[idx] += 1;
        if task.completed {
            done[idx] += 1;
        }
    }

    let mut best: Option<(usize, usize, usize)> = None;
    for idx in 0..7 {
        if total[idx] == 0 {
            continue;
        }
        let better = match best {
            // Compare ratios via cross-multiplication
            Some((_, best_done, best_total)) => done[idx] * best_total > best_done * total[idx],
            None => true,
        };
        if better {
            best = Some((idx, done[idx], total[idx]));
        }
    }
    best
}

/// Most frequent mood among entries that carry one; first-seen wins ties.
fn dominant_mood(entries: &[DiaryEntry]) -> Option<(String, usize, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    let mut total = 0;
    for entry in entries {
        let Some(mood) = entry.mood.as_deref().filter(|m| !m.is_empty()) else {
            continue;
        };
        total += 1;
        match counts.iter_mut().find(|(m, _)| m == mood) {
            Some((_, count)) => *count += 1,
            None => counts.push((mood.to_string(), 1)),
        }
    }
    let mut best: Option<(String, usize)> = None;
    for (mood, count) in counts {
        if best.as_ref().map_or(true, |(_, c)| count > *c) {
            best = Some((mood, count));
        }
    }
    best.map(|(mood, count)| (mood, count, total))
}

fn mood_emoji(mood: Option<&str>) -> &'static str {
    match mood {
        Some("happy") => "😊",
        Some("sad") => "😢",
        Some("neutral") => "😐",
        Some("excited") => "🤩",
        Some("anxious") => "😰",
        _ => "💭",
    }
}

/// Single-line snippet, character-bounded with a trailing ellipsis.
fn snippet(text: &str, max_chars: usize) -> String {
    let flattened = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut out: String = flattened.chars().take(max_chars).collect();
    if flattened.chars().count() > max_chars {
        out.push_str("...");
    }
    out
}
