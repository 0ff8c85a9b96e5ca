//! Landing page and static sections.
//!
//! All HTML is produced with maud, so every interpolated value is escaped.

mod sections;

use maud::{html, Markup, DOCTYPE};

use crate::config::SiteConfig;
use crate::views::{FooterLinksView, ListingView};

pub use sections::{about, contact, hero, navbar, why_us, Feature, NavItem, Reason, FEATURES, NAV_ITEMS, REASONS};

/// Client-visible routes.
pub mod routes {
    /// Public landing page.
    pub const LANDING: &str = "/";
    /// Admin login form.
    pub const LOGIN: &str = "/login";
    /// Session-gated admin page.
    pub const ADMIN: &str = "/admin";
}

/// In-page anchors of the landing page sections.
pub mod anchors {
    /// Hero section.
    pub const HOME: &str = "accueil";
    /// About section.
    pub const ABOUT: &str = "a-propos";
    /// Formations catalog.
    pub const FORMATIONS: &str = "formations";
    /// Why-us section.
    pub const WHY_US: &str = "pourquoi";
    /// Contact section.
    pub const CONTACT: &str = "contact";
}

/// Percent-encode `input` like JavaScript's `encodeURIComponent`.
#[must_use]
pub fn encode_uri_component(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'_'
            | b'.'
            | b'!'
            | b'~'
            | b'*'
            | b'\''
            | b'('
            | b')' => out.push(char::from(byte)),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

/// `wa.me` link opening a chat with the academy and a prefilled message.
#[must_use]
pub fn whatsapp_link(site: &SiteConfig) -> String {
    format!(
        "https://wa.me/{}?text={}",
        site.whatsapp_number,
        encode_uri_component(&site.whatsapp_message)
    )
}

/// Waze navigation link to the academy's address.
#[must_use]
pub fn waze_link(site: &SiteConfig) -> String {
    format!(
        "https://waze.com/ul?q={}&navigate=yes",
        encode_uri_component(&site.address)
    )
}

/// Google Maps search link for the academy's address.
#[must_use]
pub fn google_maps_link(site: &SiteConfig) -> String {
    format!(
        "https://www.google.com/maps/search/?api=1&query={}",
        encode_uri_component(&site.address)
    )
}

/// Wrap a page body in a full HTML document.
#[must_use]
pub fn document(title: &str, body: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="fr" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) }
            }
            body { (body) }
        }
    }
}

/// Render the public landing page from the mounted data views.
#[must_use]
pub fn landing_page(listing: &ListingView, footer: &FooterLinksView, site: &SiteConfig) -> String {
    let body = html! {
        (navbar(site))
        main {
            (hero())
            (about(site))
            (listing.render())
            (why_us(site))
            (contact(site))
        }
        (footer.render(site))
    };
    document(&format!("{} | Centre de Formation Professionnelle", site.academy_name), body)
        .into_string()
}

/// Render the admin login form.
#[must_use]
pub fn login_page(site: &SiteConfig, error: Option<&str>) -> String {
    let body = html! {
        main class="login" {
            h1 { (site.academy_name) " Admin" }
            @if let Some(error) = error {
                p class="error" role="alert" { (error) }
            }
            form method="post" action=(routes::LOGIN) {
                label for="email" { "Email" }
                input id="email" name="email" type="email" required;
                label for="password" { "Password" }
                input id="password" name="password" type="password" required;
                button type="submit" { "Login" }
            }
        }
    };
    document("Admin Login", body).into_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_uri_component() {
        assert_eq!(encode_uri_component("abc-_.!~*'()"), "abc-_.!~*'()");
        assert_eq!(encode_uri_component("Bonjour, je"), "Bonjour%2C%20je");
        assert_eq!(encode_uri_component("d'informations"), "d'informations");
        assert_eq!(encode_uri_component("é"), "%C3%A9");
        assert_eq!(encode_uri_component("a&b=c"), "a%26b%3Dc");
    }

    #[test]
    fn test_whatsapp_link() {
        let link = whatsapp_link(&SiteConfig::default());
        assert!(link.starts_with("https://wa.me/212704784731?text=Bonjour%2C%20je%20souhaite"));
    }

    #[test]
    fn test_map_links() {
        let site = SiteConfig::default();
        assert_eq!(
            waze_link(&site),
            "https://waze.com/ul?q=34%20el%20rahal%20meskinni%2C%20Casablanca%2C%20Morocco&navigate=yes"
        );
        assert!(google_maps_link(&site).ends_with("query=34%20el%20rahal%20meskinni%2C%20Casablanca%2C%20Morocco"));
    }

    #[test]
    fn test_login_page_shows_error_escaped() {
        let page = login_page(&SiteConfig::default(), Some("<bad>"));
        assert!(page.contains("&lt;bad&gt;"));
        assert!(page.contains(r#"action="/login""#));
    }
}
