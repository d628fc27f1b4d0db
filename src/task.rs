//! Task record types and input validation.
//!
//! A task is immutable once created: the only mutation paths are the
//! explicit update operations, and none are exposed. Validation bounds
//! match the public API contract (title required and at most 100
//! characters, description at most 500, priority one of low/medium/high).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Maximum accepted title length, in characters.
pub const MAX_TITLE_LEN: usize = 100;
/// Maximum accepted description length, in characters.
pub const MAX_DESCRIPTION_LEN: usize = 500;

/// Priority of a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    /// Parse a priority from its wire representation.
    ///
    /// Matching is case-insensitive; anything outside the allowed set is
    /// rejected so the caller can surface a validation error rather than a
    /// deserialization failure.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Completed,
    Failed,
}

/// A stored task record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Construct a validated task with a fresh id and timestamps.
    ///
    /// Inputs are trimmed before validation. All violations are collected
    /// so the caller can report them in one response.
    pub fn new(
        title: &str,
        description: &str,
        priority: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let title = title.trim();
        let description = description.trim();

        let mut errors = Vec::new();

        if title.is_empty() {
            errors.push("Title is required".to_string());
        } else if title.chars().count() > MAX_TITLE_LEN {
            errors.push(format!("Title must be {MAX_TITLE_LEN} characters or less"));
        }

        if description.chars().count() > MAX_DESCRIPTION_LEN {
            errors.push(format!(
                "Description must be {MAX_DESCRIPTION_LEN} characters or less"
            ));
        }

        let priority = match priority {
            None => Some(Priority::default()),
            Some(raw) => {
                let parsed = Priority::parse(raw);
                if parsed.is_none() {
                    errors.push("Priority must be low, medium, or high".to_string());
                }
                parsed
            }
        };

        if !errors.is_empty() {
            return Err(ValidationError { errors });
        }

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: description.to_string(),
            // Validation above guarantees the parse succeeded
            priority: priority.unwrap_or_default(),
            status: TaskStatus::Pending,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Rejected task input. Never retried; reported straight back to the caller.
#[derive(Debug, Error)]
#[error("Validation failed: {}", errors.join("; "))]
pub struct ValidationError {
    /// Individual violations, one message each.
    pub errors: Vec<String>,
}
