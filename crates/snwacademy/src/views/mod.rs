//! View models for the landing page and admin page.
//!
//! Each view attaches to the shared [`FormationsCache`](crate::cache::FormationsCache)
//! when mounted and detaches when dropped. Rendering produces maud markup.

pub mod admin;
pub mod footer;
pub mod listing;

pub use admin::{ActionOutcome, AdminEntry, AdminView, Notification, NotificationLevel};
pub use footer::{FooterLink, FooterLinksView};
pub use listing::ListingView;

/// Load state shared by the data-backed views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// No fetch has completed yet.
    Loading,
    /// Rows are available (possibly none).
    Ready,
    /// The last fetch failed; the list is empty.
    Failed,
}

impl<T> From<&crate::cache::Snapshot<T>> for LoadState {
    fn from(snapshot: &crate::cache::Snapshot<T>) -> Self {
        match snapshot {
            crate::cache::Snapshot::Loading => Self::Loading,
            crate::cache::Snapshot::Ready(_) => Self::Ready,
            crate::cache::Snapshot::Failed(_) => Self::Failed,
        }
    }
}
