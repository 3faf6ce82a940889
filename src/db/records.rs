//! Canonical record shapes returned by the data access layer.
//!
//! Storage tables keep the legacy column names (`task_date`, `event_time`,
//! `entry_date`, `message`); the translation to these canonical field names
//! happens only in the `from_row` constructors below. Nothing above the
//! database layer sees a storage column name.

use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::Row;
use serde::Serialize;

#[derive(Clone, Debug, Serialize)]
pub struct Task {
    pub id: i64,
    pub user_id: String,
    pub title: String,
    pub date: NaiveDate,
    pub time: Option<String>,
    pub completed: bool,
    pub failed: bool,
    pub urgency_level: Option<i64>,
}

#[derive(Clone, Debug, Serialize)]
pub struct Event {
    pub id: i64,
    pub user_id: String,
    pub title: String,
    pub date: NaiveDate,
    pub time: Option<String>,
    pub kind: Option<String>,
    pub description: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct DiaryEntry {
    pub id: i64,
    pub user_id: String,
    pub date: NaiveDate,
    pub title: Option<String>,
    pub content: String,
    pub mood: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ChatMessage {
    pub id: i64,
    pub user_id: String,
    pub text: String,
    pub is_ai: bool,
    pub timestamp: i64,
}

fn date_column(row: &Row, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

impl Task {
    /// Column order: id, user_id, title, task_date, task_time, completed,
    /// failed, urgency_level.
    pub(crate) fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Task {
            id: row.get(0)?,
            user_id: row.get(1)?,
            title: row.get(2)?,
            date: date_column(row, 3)?,
            time: row.get(4)?,
            completed: row.get(5)?,
            failed: row.get(6)?,
            urgency_level: row.get(7)?,
        })
    }
}

impl Event {
    /// Column order: id, user_id, title, event_date, event_time, type,
    /// description.
    pub(crate) fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Event {
            id: row.get(0)?,
            user_id: row.get(1)?,
            title: row.get(2)?,
            date: date_column(row, 3)?,
            time: row.get(4)?,
            kind: row.get(5)?,
            description: row.get(6)?,
        })
    }
}

impl DiaryEntry {
    /// Column order: id, user_id, entry_date, title, content, mood.
    pub(crate) fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(DiaryEntry {
            id: row.get(0)?,
            user_id: row.get(1)?,
            date: date_column(row, 2)?,
            title: row.get(3)?,
            content: row.get(4)?,
            mood: row.get(5)?,
        })
    }
}

impl ChatMessage {
    /// Column order: id, user_id, message, is_ai, timestamp.
    pub(crate) fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(ChatMessage {
            id: row.get(0)?,
            user_id: row.get(1)?,
            text: row.get(2)?,
            is_ai: row.get(3)?,
            timestamp: row.get(4)?,
        })
    }
}
