//! One-way import of the old browser-stored formations list.
//!
//! Before the database existed the admin page kept formations as a JSON
//! array in local storage. Exported, that array can be loaded into the
//! store here. Entries are inserted in array order, so the listing order
//! is preserved; legacy ids are discarded.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::auth::AdminSession;
use crate::error::{Error, Result};
use crate::formation::NewFormation;
use crate::storage::FormationStore;

/// One element of the legacy array. Every field was a string, but hand
/// edited exports sometimes carry numbers.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct LegacyFormation {
    id: Option<serde_json::Value>,
    title: Option<serde_json::Value>,
    description: Option<serde_json::Value>,
    duration: Option<serde_json::Value>,
    students: Option<serde_json::Value>,
    modules: Option<serde_json::Value>,
}

fn text(value: Option<&serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl LegacyFormation {
    fn to_new(&self) -> Result<NewFormation> {
        let title = text(self.title.as_ref()).unwrap_or_default();
        let description = text(self.description.as_ref()).unwrap_or_default();
        NewFormation::new(
            &title,
            &description,
            text(self.duration.as_ref()).as_deref(),
            text(self.students.as_ref()).as_deref(),
            text(self.modules.as_ref()).as_deref(),
        )
    }
}

/// An entry that was not imported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedEntry {
    /// Position in the source array.
    pub index: usize,
    /// The legacy id, if it had one.
    pub legacy_id: Option<String>,
    /// Why it was skipped.
    pub reason: String,
}

/// Summary of an import run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    /// Ids of the newly created rows, in insertion order.
    pub imported: Vec<String>,
    /// Entries left out.
    pub skipped: Vec<SkippedEntry>,
}

impl ImportReport {
    /// Number of entries inserted.
    #[must_use]
    pub fn imported_count(&self) -> usize {
        self.imported.len()
    }

    /// Number of entries skipped.
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
}

/// Insert every valid entry of the legacy JSON array `json`.
///
/// Invalid entries are skipped and listed in the report.
///
/// # Errors
///
/// Returns [`Error::Json`] if `json` is not an array, or [`Error::Auth`] if
/// the session dies during the run. Rows inserted before that stay.
pub async fn import_legacy(
    store: &dyn FormationStore,
    session: &AdminSession,
    json: &str,
) -> Result<ImportReport> {
    let entries: Vec<LegacyFormation> = serde_json::from_str(json)?;
    debug!("Importing {} legacy formations", entries.len());

    let mut report = ImportReport::default();
    for (index, entry) in entries.iter().enumerate() {
        let legacy_id = text(entry.id.as_ref());
        let outcome = match entry.to_new() {
            Ok(new) => store.insert(session, new).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(formation) => report.imported.push(formation.id),
            Err(e @ Error::Auth { .. }) => return Err(e),
            Err(e) => {
                warn!("Skipping legacy formation #{}: {}", index, e);
                report.skipped.push(SkippedEntry {
                    index,
                    legacy_id,
                    reason: e.to_string(),
                });
            }
        }
    }

    info!(
        "Legacy import finished: {} imported, {} skipped",
        report.imported_count(),
        report.skipped_count()
    );
    Ok(report)
}

/// Read `path` and import it with [`import_legacy`].
///
/// # Errors
///
/// Returns [`Error::Io`] if the file cannot be read, otherwise as
/// [`import_legacy`].
pub async fn import_legacy_file(
    store: &dyn FormationStore,
    session: &AdminSession,
    path: &Path,
) -> Result<ImportReport> {
    let json = tokio::fs::read_to_string(path).await?;
    import_legacy(store, session, &json).await
}
