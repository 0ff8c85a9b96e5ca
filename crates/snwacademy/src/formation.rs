//! Formation records.
//!
//! A formation is a course offered by the academy. Records are created by
//! the admin, read by the listing and footer, and deleted by the admin;
//! they are never edited in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A stored formation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Formation {
    /// Store-assigned identifier, immutable once created.
    pub id: String,
    /// Display name.
    pub title: String,
    /// Free-text description.
    pub description: String,
    /// Length of the programme, e.g. "12".
    pub duration: Option<String>,
    /// Seats available.
    pub students: Option<String>,
    /// Number of modules.
    pub modules: Option<String>,
    /// Store-assigned creation time; listings are ordered by it.
    pub created_at: DateTime<Utc>,
}

impl Formation {
    /// Whether any of the optional metadata fields is set.
    #[must_use]
    pub fn has_stats(&self) -> bool {
        self.duration.is_some() || self.students.is_some() || self.modules.is_some()
    }
}

/// Columns that can be requested in a projected read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormationField {
    /// `title`
    Title,
    /// `description`
    Description,
    /// `duration`
    Duration,
    /// `students`
    Students,
    /// `modules`
    Modules,
    /// `created_at`
    CreatedAt,
}

impl FormationField {
    /// Column name in the `formations` table.
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Description => "description",
            Self::Duration => "duration",
            Self::Students => "students",
            Self::Modules => "modules",
            Self::CreatedAt => "created_at",
        }
    }
}

impl std::fmt::Display for FormationField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.column())
    }
}

/// A formation read with only some columns populated. `id` is always present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialFormation {
    /// Identifier.
    pub id: String,
    /// Title, if requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Description, if requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Duration, if requested and set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    /// Students, if requested and set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub students: Option<String>,
    /// Modules, if requested and set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modules: Option<String>,
    /// Creation time, if requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// The `{id, title}` projection used for navigation links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormationLink {
    /// Identifier.
    pub id: String,
    /// Title shown as the link label.
    pub title: String,
}

/// Raw admin form input, exactly as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormationForm {
    /// Title input.
    pub title: String,
    /// Description input.
    pub description: String,
    /// Duration input.
    pub duration: String,
    /// Students input.
    pub students: String,
    /// Modules input.
    pub modules: String,
}

impl FormationForm {
    /// Form with only the required fields filled in.
    #[must_use]
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            ..Self::default()
        }
    }

    /// Validate the form into an insert payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if `title` or `description` is blank.
    pub fn validate(&self) -> Result<NewFormation> {
        NewFormation::new(
            &self.title,
            &self.description,
            Some(self.duration.as_str()),
            Some(self.students.as_str()),
            Some(self.modules.as_str()),
        )
    }
}

/// A validated insert payload.
///
/// Required fields are trimmed and non-empty; blank optional fields are
/// `None` so they are stored as NULL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFormation {
    title: String,
    description: String,
    duration: Option<String>,
    students: Option<String>,
    modules: Option<String>,
}

impl NewFormation {
    /// Build a payload from loose input.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if `title` or `description` is blank.
    pub fn new(
        title: &str,
        description: &str,
        duration: Option<&str>,
        students: Option<&str>,
        modules: Option<&str>,
    ) -> Result<Self> {
        let title = required("title", title)?;
        let description = required("description", description)?;
        Ok(Self {
            title,
            description,
            duration: optional(duration),
            students: optional(students),
            modules: optional(modules),
        })
    }

    /// Title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Duration, `None` when left blank.
    #[must_use]
    pub fn duration(&self) -> Option<&str> {
        self.duration.as_deref()
    }

    /// Students, `None` when left blank.
    #[must_use]
    pub fn students(&self) -> Option<&str> {
        self.students.as_deref()
    }

    /// Modules, `None` when left blank.
    #[must_use]
    pub fn modules(&self) -> Option<&str> {
        self.modules.as_deref()
    }
}

fn required(field: &'static str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(Error::Validation { field })
    } else {
        Ok(trimmed.to_string())
    }
}

fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
