use chrono::NaiveDate;
use rusqlite::{Connection, ToSql};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use crate::config::Config;

pub mod records;
pub use records::{ChatMessage, DiaryEntry, Event, Task};

const TASK_COLUMNS: &str = "id, user_id, title, task_date, task_time, completed, failed, urgency_level";
const EVENT_COLUMNS: &str = "id, user_id, title, event_date, event_time, type, description";
const DIARY_COLUMNS: &str = "id, user_id, entry_date, title, content, mood";
const CHAT_COLUMNS: &str = "id, user_id, message, is_ai, timestamp";

/// Search result caps; matching queries never return more rows than this.
const TASK_SEARCH_CAP: usize = 10;
const EVENT_SEARCH_CAP: usize = 10;
const DIARY_SEARCH_CAP: usize = 5;
const CHAT_SEARCH_CAP: usize = 5;

#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn new(config: &Config) -> rusqlite::Result<Self> {
        let conn = Connection::open(&config.database_url)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn execute_init(&self) -> anyhow::Result<()> {
        info!("Database: Initializing schema...");
        let sql = "
            CREATE TABLE IF NOT EXISTS tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                title TEXT NOT NULL,
                task_date TEXT NOT NULL,
                task_time TEXT,
                completed BOOLEAN DEFAULT FALSE,
                failed BOOLEAN DEFAULT FALSE,
                urgency_level INTEGER
            );
            CREATE INDEX IF NOT EXISTS idx_tasks_user_date ON tasks (user_id, task_date);

            CREATE TABLE IF NOT EXISTS calendar_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                title TEXT NOT NULL,
                event_date TEXT NOT NULL,
                event_time TEXT,
                type TEXT,
                description TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_events_user_date ON calendar_events (user_id, event_date);

            CREATE TABLE IF NOT EXISTS diary_entries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                entry_date TEXT NOT NULL,
                title TEXT,
                content TEXT NOT NULL,
                mood TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_diary_user_date ON diary_entries (user_id, entry_date);

            CREATE TABLE IF NOT EXISTS chat_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                message TEXT NOT NULL,
                is_ai BOOLEAN DEFAULT FALSE,
                timestamp INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_chat_user_time ON chat_history (user_id, timestamp);
        ";
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(sql)?;
        debug!("Database: Schema initialized successfully");
        Ok(())
    }

    // --- Writes (route layer / driver) ---

    pub fn insert_task(
        &self,
        user_id: &str,
        title: &str,
        date: NaiveDate,
        time: Option<&str>,
        completed: bool,
        failed: bool,
        urgency_level: Option<i64>,
    ) -> anyhow::Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO tasks (user_id, title, task_date, task_time, completed, failed, urgency_level)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            (
                user_id,
                title,
                date.format("%Y-%m-%d").to_string(),
                time,
                completed,
                failed,
                urgency_level,
            ),
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn insert_event(
        &self,
        user_id: &str,
        title: &str,
        date: NaiveDate,
        time: Option<&str>,
        kind: Option<&str>,
        description: Option<&str>,
    ) -> anyhow::Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO calendar_events (user_id, title, event_date, event_time, type, description)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            (
                user_id,
                title,
                date.format("%Y-%m-%d").to_string(),
                time,
                kind,
                description,
            ),
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn insert_diary_entry(
        &self,
        user_id: &str,
        date: NaiveDate,
        title: Option<&str>,
        content: &str,
        mood: Option<&str>,
    ) -> anyhow::Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO diary_entries (user_id, entry_date, title, content, mood)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            (
                user_id,
                date.format("%Y-%m-%d").to_string(),
                title,
                content,
                mood,
            ),
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn save_chat_message(
        &self,
        user_id: &str,
        text: &str,
        is_ai: bool,
        timestamp: i64,
    ) -> anyhow::Result<i64> {
        debug!("Database: Saving chat message for user {}", user_id);
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO chat_history (user_id, message, is_ai, timestamp)
             VALUES (?1, ?2, ?3, ?4)",
            (user_id, text, is_ai, timestamp),
        )?;
        Ok(conn.last_insert_rowid())
    }

    // --- Reads (context assembly shim) ---
    //
    // Read failures are absorbed here: the caller gets an empty result set and
    // the error is logged, so a broken table degrades one context section
    // instead of the whole request.

    pub fn tasks_for_date(&self, user_id: &str, date: NaiveDate) -> Vec<Task> {
        self.try_tasks_for_date(user_id, date).unwrap_or_else(|e| {
            warn!("Database: tasks_for_date failed for user {}: {}", user_id, e);
            Vec::new()
        })
    }

    fn try_tasks_for_date(&self, user_id: &str, date: NaiveDate) -> rusqlite::Result<Vec<Task>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE user_id = ?1 AND task_date = ?2
             ORDER BY
                 CASE WHEN task_time IS NULL OR task_time = '' THEN 1 ELSE 0 END,
                 task_time ASC"
        ))?;
        let rows = stmt.query_map(
            (user_id, date.format("%Y-%m-%d").to_string()),
            Task::from_row,
        )?;
        rows.collect()
    }

    pub fn tasks_in_range(&self, user_id: &str, start: NaiveDate, end: NaiveDate) -> Vec<Task> {
        self.try_tasks_in_range(user_id, start, end)
            .unwrap_or_else(|e| {
                warn!("Database: tasks_in_range failed for user {}: {}", user_id, e);
                Vec::new()
            })
    }

    fn try_tasks_in_range(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> rusqlite::Result<Vec<Task>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE user_id = ?1 AND task_date >= ?2 AND task_date <= ?3
             ORDER BY task_date DESC,
                 CASE WHEN task_time IS NULL OR task_time = '' THEN 1 ELSE 0 END,
                 task_time ASC"
        ))?;
        let rows = stmt.query_map(
            (
                user_id,
                start.format("%Y-%m-%d").to_string(),
                end.format("%Y-%m-%d").to_string(),
            ),
            Task::from_row,
        )?;
        rows.collect()
    }

    pub fn tasks_matching(&self, user_id: &str, terms: &[String]) -> Vec<Task> {
        self.try_tasks_matching(user_id, terms).unwrap_or_else(|e| {
            warn!("Database: tasks_matching failed for user {}: {}", user_id, e);
            Vec::new()
        })
    }

    fn try_tasks_matching(&self, user_id: &str, terms: &[String]) -> rusqlite::Result<Vec<Task>> {
        if terms.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.conn.lock().unwrap();
        let mut sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = ? AND (");
        let mut params: Vec<Box<dyn ToSql>> = vec![Box::new(user_id.to_string())];
        for (i, term) in terms.iter().enumerate() {
            if i > 0 {
                sql.push_str(" OR ");
            }
            sql.push_str("title LIKE ?");
            params.push(Box::new(format!("%{}%", term)));
        }
        sql.push_str(") ORDER BY task_date DESC, urgency_level DESC LIMIT ?");
        params.push(Box::new(TASK_SEARCH_CAP));

        let params_slice: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(&params_slice[..], Task::from_row)?;
        rows.collect()
    }

    pub fn events_for_date(&self, user_id: &str, date: NaiveDate) -> Vec<Event> {
        self.try_events_for_date(user_id, date).unwrap_or_else(|e| {
            warn!("Database: events_for_date failed for user {}: {}", user_id, e);
            Vec::new()
        })
    }

    fn try_events_for_date(&self, user_id: &str, date: NaiveDate) -> rusqlite::Result<Vec<Event>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {EVENT_COLUMNS} FROM calendar_events
             WHERE user_id = ?1 AND event_date = ?2
             ORDER BY event_time ASC"
        ))?;
        let rows = stmt.query_map(
            (user_id, date.format("%Y-%m-%d").to_string()),
            Event::from_row,
        )?;
        rows.collect()
    }

    pub fn events_in_range(&self, user_id: &str, start: NaiveDate, end: NaiveDate) -> Vec<Event> {
        self.try_events_in_range(user_id, start, end)
            .unwrap_or_else(|e| {
                warn!("Database: events_in_range failed for user {}: {}", user_id, e);
                Vec::new()
            })
    }

    fn try_events_in_range(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> rusqlite::Result<Vec<Event>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {EVENT_COLUMNS} FROM calendar_events
             WHERE user_id = ?1 AND event_date >= ?2 AND event_date <= ?3
             ORDER BY event_date DESC, event_time ASC"
        ))?;
        let rows = stmt.query_map(
            (
                user_id,
                start.format("%Y-%m-%d").to_string(),
                end.format("%Y-%m-%d").to_string(),
            ),
            Event::from_row,
        )?;
        rows.collect()
    }

    pub fn events_matching(&self, user_id: &str, terms: &[String]) -> Vec<Event> {
        self.try_events_matching(user_id, terms).unwrap_or_else(|e| {
            warn!("Database: events_matching failed for user {}: {}", user_id, e);
            Vec::new()
        })
    }

    fn try_events_matching(&self, user_id: &str, terms: &[String]) -> rusqlite::Result<Vec<Event>> {
        if terms.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.conn.lock().unwrap();
        let mut sql =
            format!("SELECT {EVENT_COLUMNS} FROM calendar_events WHERE user_id = ? AND (");
        let mut params: Vec<Box<dyn ToSql>> = vec![Box::new(user_id.to_string())];
        for (i, term) in terms.iter().enumerate() {
            if i > 0 {
                sql.push_str(" OR ");
            }
            sql.push_str("(title LIKE ? OR description LIKE ?)");
            let pattern = format!("%{}%", term);
            params.push(Box::new(pattern.clone()));
            params.push(Box::new(pattern));
        }
        sql.push_str(") ORDER BY event_date DESC LIMIT ?");
        params.push(Box::new(EVENT_SEARCH_CAP));

        let params_slice: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(&params_slice[..], Event::from_row)?;
        rows.collect()
    }

    /// Entries dated `since` or later, newest first.
    pub fn diary_recent(&self, user_id: &str, since: NaiveDate) -> Vec<DiaryEntry> {
        self.try_diary_recent(user_id, since).unwrap_or_else(|e| {
            warn!("Database: diary_recent failed for user {}: {}", user_id, e);
            Vec::new()
        })
    }

    fn try_diary_recent(&self, user_id: &str, since: NaiveDate) -> rusqlite::Result<Vec<DiaryEntry>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {DIARY_COLUMNS} FROM diary_entries
             WHERE user_id = ?1 AND entry_date >= ?2
             ORDER BY entry_date DESC, id DESC"
        ))?;
        let rows = stmt.query_map(
            (user_id, since.format("%Y-%m-%d").to_string()),
            DiaryEntry::from_row,
        )?;
        rows.collect()
    }

    pub fn diary_matching(&self, user_id: &str, terms: &[String]) -> Vec<DiaryEntry> {
        self.try_diary_matching(user_id, terms).unwrap_or_else(|e| {
            warn!("Database: diary_matching failed for user {}: {}", user_id, e);
            Vec::new()
        })
    }

    fn try_diary_matching(
        &self,
        user_id: &str,
        terms: &[String],
    ) -> rusqlite::Result<Vec<DiaryEntry>> {
        if terms.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.conn.lock().unwrap();
        let mut sql = format!("SELECT {DIARY_COLUMNS} FROM diary_entries WHERE user_id = ? AND (");
        let mut params: Vec<Box<dyn ToSql>> = vec![Box::new(user_id.to_string())];
        for (i, term) in terms.iter().enumerate() {
            if i > 0 {
                sql.push_str(" OR ");
            }
            sql.push_str("(title LIKE ? OR content LIKE ?)");
            let pattern = format!("%{}%", term);
            params.push(Box::new(pattern.clone()));
            params.push(Box::new(pattern));
        }
        sql.push_str(") ORDER BY entry_date DESC LIMIT ?");
        params.push(Box::new(DIARY_SEARCH_CAP));

        let params_slice: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(&params_slice[..], DiaryEntry::from_row)?;
        rows.collect()
    }

    /// The most recent `limit` messages, returned oldest first for replay.
    pub fn chat_recent(&self, user_id: &str, limit: usize) -> Vec<ChatMessage> {
        self.try_chat_recent(user_id, limit).unwrap_or_else(|e| {
            warn!("Database: chat_recent failed for user {}: {}", user_id, e);
            Vec::new()
        })
    }

    fn try_chat_recent(&self, user_id: &str, limit: usize) -> rusqlite::Result<Vec<ChatMessage>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {CHAT_COLUMNS} FROM chat_history
             WHERE user_id = ?1
             ORDER BY timestamp DESC, id DESC
             LIMIT ?2"
        ))?;
        let rows = stmt.query_map((user_id, limit), ChatMessage::from_row)?;
        let mut messages: Vec<ChatMessage> = rows.collect::<rusqlite::Result<_>>()?;
        messages.reverse();
        Ok(messages)
    }

    pub fn chat_matching(&self, user_id: &str, terms: &[String]) -> Vec<ChatMessage> {
        self.try_chat_matching(user_id, terms).unwrap_or_else(|e| {
            warn!("Database: chat_matching failed for user {}: {}", user_id, e);
            Vec::new()
        })
    }

    fn try_chat_matching(
        &self,
        user_id: &str,
        terms: &[String],
    ) -> rusqlite::Result<Vec<ChatMessage>> {
        if terms.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.conn.lock().unwrap();
        let mut sql = format!("SELECT {CHAT_COLUMNS} FROM chat_history WHERE user_id = ? AND (");
        let mut params: Vec<Box<dyn ToSql>> = vec![Box::new(user_id.to_string())];
        for (i, term) in terms.iter().enumerate() {
            if i > 0 {
                sql.push_str(" OR ");
            }
            sql.push_str("message LIKE ?");
            params.push(Box::new(format!("%{}%", term)));
        }
        sql.push_str(") ORDER BY timestamp DESC, id DESC LIMIT ?");
        params.push(Box::new(CHAT_SEARCH_CAP));

        let params_slice: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(&params_slice[..], ChatMessage::from_row)?;
        rows.collect()
    }

    #[cfg(test)]
    pub(crate) fn raw(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn test_config() -> Config {
        Config {
            ollama_url: "test".to_string(),
            default_model: None,
            database_url: ":memory:".to_string(),
            chat_context_messages: 10,
            diary_lookback_days: 7,
            llm_timeout_secs: 60,
            model_pull_timeout_secs: 300,
        }
    }

    fn test_db() -> Database {
        let db = Database::new(&test_config()).unwrap();
        db.execute_init().unwrap();
        db
    }

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_chat_round_trip_preserves_order_and_fields() {
        let db = test_db();
        db.save_chat_message("u1", "first", false, 1000).unwrap();
        db.save_chat_message("u1", "second", true, 2000).unwrap();
        db.save_chat_message("u1", "third", false, 3000).unwrap();

        let messages = db.chat_recent("u1", 10);
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].text, "first");
        assert!(!messages[0].is_ai);
        assert_eq!(messages[1].text, "second");
        assert!(messages[1].is_ai);
        assert_eq!(messages[2].text, "third");
    }

    #[test]
    fn test_chat_recent_limit_keeps_newest() {
        let db = test_db();
        for i in 0..5 {
            db.save_chat_message("u1", &format!("msg {}", i), false, 1000 + i)
                .unwrap();
        }

        let messages = db.chat_recent("u1", 2);
        assert_eq!(messages.len(), 2);
        // Newest two, still oldest-first
        assert_eq!(messages[0].text, "msg 3");
        assert_eq!(messages[1].text, "msg 4");
    }

    #[test]
    fn test_tasks_for_date_sorts_untimed_last() {
        let db = test_db();
        let date = d("2025-06-01");
        db.insert_task("u1", "untimed", date, None, false, false, None)
            .unwrap();
        db.insert_task("u1", "evening", date, Some("18:00"), false, false, None)
            .unwrap();
        db.insert_task("u1", "morning", date, Some("09:00"), false, false, None)
            .unwrap();

        let tasks = db.tasks_for_date("u1", date);
        let titles: Vec<_> = tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["morning", "evening", "untimed"]);
    }

    #[test]
    fn test_tasks_for_date_scoped_by_user() {
        let db = test_db();
        let date = d("2025-06-01");
        db.insert_task("u1", "mine", date, None, false, false, None)
            .unwrap();
        db.insert_task("u2", "theirs", date, None, false, false, None)
            .unwrap();

        let tasks = db.tasks_for_date("u1", date);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "mine");
    }

    #[test]
    fn test_tasks_matching_or_across_terms() {
        let db = test_db();
        let date = d("2025-06-01");
        db.insert_task("u1", "Write report", date, None, false, false, None)
            .unwrap();
        db.insert_task("u1", "Buy groceries", date, None, false, false, None)
            .unwrap();
        db.insert_task("u1", "Clean desk", date, None, false, false, None)
            .unwrap();

        let terms = vec!["report".to_string(), "groceries".to_string()];
        let tasks = db.tasks_matching("u1", &terms);
        assert_eq!(tasks.len(), 2);

        // Case-insensitive substring
        let tasks = db.tasks_matching("u1", &["REPORT".to_string()]);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "Write report");
    }

    #[test]
    fn test_tasks_matching_cap_and_empty_terms() {
        let db = test_db();
        for i in 0..15 {
            db.insert_task(
                "u1",
                &format!("project step {}", i),
                d("2025-06-01"),
                None,
                false,
                false,
                None,
            )
            .unwrap();
        }

        assert_eq!(db.tasks_matching("u1", &["project".to_string()]).len(), 10);
        assert!(db.tasks_matching("u1", &[]).is_empty());
    }

    #[test]
    fn test_events_matching_title_or_description() {
        let db = test_db();
        let date = d("2025-06-01");
        db.insert_event("u1", "Standup", date, Some("10:00"), None, None)
            .unwrap();
        db.insert_event(
            "u1",
            "Review",
            date,
            Some("11:00"),
            None,
            Some("quarterly planning session"),
        )
        .unwrap();

        let events = db.events_matching("u1", &["planning".to_string()]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "Review");
    }

    #[test]
    fn test_events_for_date_ordered_by_time() {
        let db = test_db();
        let date = d("2025-06-01");
        db.insert_event("u1", "lunch", date, Some("12:00"), None, None)
            .unwrap();
        db.insert_event("u1", "standup", date, Some("09:30"), None, None)
            .unwrap();

        let events = db.events_for_date("u1", date);
        assert_eq!(events[0].title, "standup");
        assert_eq!(events[1].title, "lunch");
    }

    #[test]
    fn test_diary_recent_window_and_order() {
        let db = test_db();
        db.insert_diary_entry("u1", d("2025-05-20"), None, "old entry", None)
            .unwrap();
        db.insert_diary_entry("u1", d("2025-05-30"), None, "recent entry", Some("happy"))
            .unwrap();
        db.insert_diary_entry("u1", d("2025-06-01"), None, "today entry", Some("calm"))
            .unwrap();

        let entries = db.diary_recent("u1", d("2025-05-25"));
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].content, "today entry");
        assert_eq!(entries[1].content, "recent entry");
    }

    #[test]
    fn test_diary_matching_cap() {
        let db = test_db();
        for i in 0..8 {
            db.insert_diary_entry(
                "u1",
                d("2025-06-01"),
                None,
                &format!("thinking about the garden {}", i),
                None,
            )
            .unwrap();
        }

        assert_eq!(db.diary_matching("u1", &["garden".to_string()]).len(), 5);
    }

    #[test]
    fn test_chat_matching_newest_first() {
        let db = test_db();
        db.save_chat_message("u1", "about rust", false, 1000).unwrap();
        db.save_chat_message("u1", "more rust talk", true, 2000)
            .unwrap();
        db.save_chat_message("u1", "unrelated", false, 3000).unwrap();

        let messages = db.chat_matching("u1", &["rust".to_string()]);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].text, "more rust talk");
        assert_eq!(messages[1].text, "about rust");
    }

    #[test]
    fn test_ranges_inclusive() {
        let db = test_db();
        db.insert_task("u1", "before", d("2025-05-28"), None, false, false, None)
            .unwrap();
        db.insert_task("u1", "start", d("2025-05-29"), None, false, false, None)
            .unwrap();
        db.insert_task("u1", "end", d("2025-06-01"), None, false, false, None)
            .unwrap();
        db.insert_event("u1", "inside", d("2025-05-30"), None, None, None)
            .unwrap();

        let tasks = db.tasks_in_range("u1", d("2025-05-29"), d("2025-06-01"));
        let titles: Vec<_> = tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["end", "start"]);

        let events = db.events_in_range("u1", d("2025-05-29"), d("2025-06-01"));
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_read_failure_returns_empty() {
        let db = test_db();
        db.insert_diary_entry("u1", d("2025-06-01"), None, "entry", None)
            .unwrap();
        db.raw().execute("DROP TABLE diary_entries", []).unwrap();

        assert!(db.diary_recent("u1", d("2025-05-01")).is_empty());
        assert!(db.diary_matching("u1", &["entry".to_string()]).is_empty());
    }

    #[test]
    fn test_matching_with_special_chars() {
        let db = test_db();
        db.insert_task("u1", "normal task", d("2025-06-01"), None, false, false, None)
            .unwrap();

        // Injection attempt rides through as a plain parameter
        let tasks = db.tasks_matching("u1", &["'; DROP TABLE tasks; --".to_string()]);
        assert!(tasks.is_empty());
        assert_eq!(db.tasks_matching("u1", &["normal".to_string()]).len(), 1);
    }
}
