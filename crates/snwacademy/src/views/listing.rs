//! Public formations listing.

use maud::{html, Markup};
use tokio::sync::watch;
use tracing::debug;

use super::LoadState;
use crate::cache::{CacheAttachment, FormationsCache, Snapshot};
use crate::formation::Formation;
use crate::site::anchors;

/// Shown in place of the cards when the fetch failed.
pub const FETCH_ERROR_MESSAGE: &str = "Impossible de charger les formations pour le moment.";

/// Shown when there are no formations.
pub const EMPTY_MESSAGE: &str = "Aucune formation disponible pour le moment.";

/// Button label while collapsed.
pub const SHOW_ALL_LABEL: &str = "Voir toutes les formations";

/// Button label while expanded.
pub const SHOW_LESS_LABEL: &str = "Voir moins";

/// The formations catalog as seen by the landing page.
#[derive(Debug)]
pub struct ListingView {
    _attachment: CacheAttachment,
    catalog: watch::Receiver<Snapshot<Formation>>,
    preview_count: usize,
    show_all: bool,
}

impl ListingView {
    /// Attach to `cache` and perform the initial fetch.
    pub async fn mount(cache: &FormationsCache, preview_count: usize) -> Self {
        let attachment = cache.attach();
        let mut catalog = cache.watch_catalog();
        cache.refresh_catalog().await;
        catalog.borrow_and_update();
        debug!("Listing view mounted");

        Self {
            _attachment: attachment,
            catalog,
            preview_count,
            show_all: false,
        }
    }

    /// Current load state.
    #[must_use]
    pub fn state(&self) -> LoadState {
        LoadState::from(&*self.catalog.borrow())
    }

    /// Error message of the last failed fetch.
    #[must_use]
    pub fn error(&self) -> Option<String> {
        match &*self.catalog.borrow() {
            Snapshot::Failed(message) => Some(message.clone()),
            Snapshot::Loading | Snapshot::Ready(_) => None,
        }
    }

    /// Every formation, in creation order.
    #[must_use]
    pub fn formations(&self) -> Vec<Formation> {
        self.catalog.borrow().items().to_vec()
    }

    /// The formations currently shown.
    #[must_use]
    pub fn visible(&self) -> Vec<Formation> {
        let snapshot = self.catalog.borrow();
        let items = snapshot.items();
        if self.show_all {
            items.to_vec()
        } else {
            items.iter().take(self.preview_count).cloned().collect()
        }
    }

    /// Whether the expand toggle is offered.
    #[must_use]
    pub fn has_toggle(&self) -> bool {
        self.catalog.borrow().items().len() > self.preview_count
    }

    /// Whether the full list is shown.
    #[must_use]
    pub fn show_all(&self) -> bool {
        self.show_all
    }

    /// Flip between the preview and the full list. Returns the new state.
    ///
    /// Does nothing while the toggle is absent.
    pub fn toggle_show_all(&mut self) -> bool {
        if self.has_toggle() {
            self.show_all = !self.show_all;
        }
        self.show_all
    }

    /// Wait for the cache to publish a new catalog.
    ///
    /// Returns `false` once the cache is gone.
    pub async fn changed(&mut self) -> bool {
        let changed = self.catalog.changed().await.is_ok();
        if changed {
            self.catalog.borrow_and_update();
        }
        changed
    }

    /// Render the `#formations` section.
    #[must_use]
    pub fn render(&self) -> Markup {
        let state = self.state();
        let visible = self.visible();
        html! {
            section id=(anchors::FORMATIONS) class="formations" {
                span class="eyebrow" { "Nos Formations" }
                h2 { "Des Programmes Adaptés à " span class="text-gradient-gold" { "Vos Ambitions" } }
                @if state == LoadState::Loading {
                    p class="status" { "Chargement des formations..." }
                } @else if state == LoadState::Failed {
                    p class="status error" { (FETCH_ERROR_MESSAGE) }
                } @else if visible.is_empty() {
                    p class="status" { (EMPTY_MESSAGE) }
                } @else {
                    div class="cards" {
                        @for formation in &visible {
                            (card(formation))
                        }
                    }
                }
                @if self.has_toggle() {
                    button type="button" class="toggle" aria-expanded=(if self.show_all { "true" } else { "false" }) {
                        @if self.show_all { (SHOW_LESS_LABEL) } @else { (SHOW_ALL_LABEL) }
                    }
                }
            }
        }
    }
}

fn card(formation: &Formation) -> Markup {
    html! {
        article class="card" data-id=(formation.id) {
            h3 { (formation.title) }
            p { (formation.description) }
            @if formation.has_stats() {
                ul class="stats" {
                    @if let Some(duration) = &formation.duration {
                        li { (duration) " mois" }
                    }
                    @if let Some(students) = &formation.students {
                        li { (students) " places" }
                    }
                    @if let Some(modules) = &formation.modules {
                        li { (modules) " modules" }
                    }
                }
            }
        }
    }
}
