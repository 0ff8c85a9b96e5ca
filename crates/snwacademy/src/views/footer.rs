//! Footer with formation navigation links.

use chrono::{Datelike, Utc};
use maud::{html, Markup};
use tokio::sync::watch;
use tracing::{debug, warn};

use super::LoadState;
use crate::cache::{CacheAttachment, FormationsCache, Snapshot};
use crate::config::SiteConfig;
use crate::formation::FormationLink;
use crate::site::{anchors, routes};

/// A navigation link to the formations section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FooterLink {
    /// Formation identifier.
    pub id: String,
    /// Link text, the formation's title.
    pub label: String,
    /// Link target.
    pub href: String,
}

impl From<&FormationLink> for FooterLink {
    fn from(link: &FormationLink) -> Self {
        Self {
            id: link.id.clone(),
            label: link.title.clone(),
            href: format!("#{}", anchors::FORMATIONS),
        }
    }
}

/// Footer links view over the `{id, title}` projection.
#[derive(Debug)]
pub struct FooterLinksView {
    _attachment: CacheAttachment,
    links: watch::Receiver<Snapshot<FormationLink>>,
}

impl FooterLinksView {
    /// Attach to `cache` and fetch the links.
    pub async fn mount(cache: &FormationsCache) -> Self {
        let attachment = cache.attach();
        let mut links = cache.watch_links();
        if let Snapshot::Failed(message) = cache.refresh_links().await {
            warn!("Footer links unavailable: {}", message);
        }
        links.borrow_and_update();
        debug!("Footer links view mounted");

        Self {
            _attachment: attachment,
            links,
        }
    }

    /// Current load state.
    #[must_use]
    pub fn state(&self) -> LoadState {
        LoadState::from(&*self.links.borrow())
    }

    /// Navigation links, in creation order. Empty after a failed fetch.
    #[must_use]
    pub fn links(&self) -> Vec<FooterLink> {
        self.links.borrow().items().iter().map(FooterLink::from).collect()
    }

    /// Wait for the cache to publish new links.
    ///
    /// Returns `false` once the cache is gone.
    pub async fn changed(&mut self) -> bool {
        let changed = self.links.changed().await.is_ok();
        if changed {
            self.links.borrow_and_update();
        }
        changed
    }

    /// Render the page footer.
    #[must_use]
    pub fn render(&self, site: &SiteConfig) -> Markup {
        let links = self.links();
        let year = Utc::now().year();
        html! {
            footer class="footer" {
                div class="brand" {
                    a href=(routes::LANDING) { (site.academy_name) }
                    p {
                        "Centre de formation professionnelle spécialisé dans les "
                        "domaines de la santé et du social."
                    }
                }
                nav class="academy" {
                    h4 { "Académie" }
                    ul {
                        li { a href={ "#" (anchors::ABOUT) } { "À Propos" } }
                        li { a href={ "#" (anchors::WHY_US) } { "Pourquoi Nous" } }
                        li { a href={ "#" (anchors::CONTACT) } { "Contact" } }
                    }
                }
                nav class="formations" {
                    h4 { "Formations" }
                    ul {
                        @for link in &links {
                            li { a href=(link.href) data-id=(link.id) { (link.label) } }
                        }
                    }
                }
                div class="bottom" {
                    p { "© " (year) " " (site.academy_name) ". Tous droits réservés." }
                    a href=(site.facebook_url) target="_blank" rel="noopener noreferrer" { "Facebook" }
                }
            }
        }
    }
}
