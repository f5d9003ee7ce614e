use chrono::{DateTime, Local, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Todo completion status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TodoStatus {
    #[default]
    Pending,
    Completed,
}

/// A one-shot or daily recurring todo.
///
/// Recurring items reset to pending once per calendar day and only become due
/// after their scheduled local time of day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_recurring: bool,
    /// Local time of day, "HH:MM". Required for recurring items.
    #[serde(default, with = "hh_mm", skip_serializing_if = "Option::is_none")]
    pub scheduled_time: Option<NaiveTime>,
    #[serde(default)]
    pub status: TodoStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Local>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reset_date: Option<NaiveDate>,
    pub created_at: DateTime<Local>,
}

impl TodoItem {
    /// One-shot todo, due as soon as it exists.
    pub fn new(title: impl Into<String>) -> Result<Self, ValidationError> {
        let title = validate_title(title.into())?;
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            title,
            description: String::new(),
            is_recurring: false,
            scheduled_time: None,
            status: TodoStatus::Pending,
            completed_at: None,
            last_reset_date: None,
            created_at: Local::now(),
        })
    }

    /// Daily todo, due every day from `scheduled_time` on.
    pub fn recurring(
        title: impl Into<String>,
        scheduled_time: NaiveTime,
    ) -> Result<Self, ValidationError> {
        let mut item = Self::new(title)?;
        item.is_recurring = true;
        item.scheduled_time = Some(scheduled_time);
        Ok(item)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn is_pending(&self) -> bool {
        self.status == TodoStatus::Pending
    }

    /// Pending, and either one-shot or past its scheduled time today.
    pub fn is_due(&self, now: DateTime<Local>) -> bool {
        if !self.is_pending() {
            return false;
        }
        match (self.is_recurring, self.scheduled_time) {
            (true, Some(scheduled)) => now.time() >= scheduled,
            _ => true,
        }
    }

    /// Recurring and not yet reset for `today`.
    pub fn needs_reset(&self, today: NaiveDate) -> bool {
        self.is_recurring && self.last_reset_date != Some(today)
    }

    pub fn reset_for_new_day(&mut self, today: NaiveDate) {
        self.status = TodoStatus::Pending;
        self.completed_at = None;
        self.last_reset_date = Some(today);
    }

    pub fn mark_completed(&mut self, now: DateTime<Local>) {
        self.status = TodoStatus::Completed;
        self.completed_at = Some(now);
    }
}

fn validate_title(title: String) -> Result<String, ValidationError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    Ok(trimmed.to_string())
}

/// Parse a "HH:MM" time of day.
pub fn parse_scheduled_time(raw: &str) -> Result<NaiveTime, ValidationError> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|_| ValidationError::InvalidScheduledTime(raw.to_string()))
}

/// Serde adapter for `Option<NaiveTime>` as "HH:MM".
mod hh_mm {
    use chrono::NaiveTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &Option<NaiveTime>, s: S) -> Result<S::Ok, S::Error> {
        match time {
            Some(t) => s.serialize_str(&t.format("%H:%M").to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveTime>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        raw.map(|s| super::parse_scheduled_time(&s).map_err(de::Error::custom))
            .transpose()
    }
}
