//! Hardcoded landing page sections.

use maud::{html, Markup};

use super::{anchors, google_maps_link, waze_link, whatsapp_link};
use crate::config::SiteConfig;

/// A navbar entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavItem {
    /// Link text.
    pub label: &'static str,
    /// Target anchor, without `#`.
    pub anchor: &'static str,
}

/// An "about" feature card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Feature {
    /// Card heading.
    pub title: &'static str,
    /// Card body.
    pub description: &'static str,
}

/// A numbered "why us" reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reason {
    /// Display number, e.g. "01".
    pub number: &'static str,
    /// Heading.
    pub title: &'static str,
    /// Body.
    pub description: &'static str,
}

/// Navbar entries, in display order.
pub const NAV_ITEMS: &[NavItem] = &[
    NavItem { label: "Accueil", anchor: anchors::HOME },
    NavItem { label: "À Propos", anchor: anchors::ABOUT },
    NavItem { label: "Formations", anchor: anchors::FORMATIONS },
    NavItem { label: "Pourquoi Nous", anchor: anchors::WHY_US },
    NavItem { label: "Contact", anchor: anchors::CONTACT },
];

/// About section cards.
pub const FEATURES: &[Feature] = &[
    Feature {
        title: "Notre Mission",
        description: "Former des professionnels qualifiés dans les domaines de la santé et du social pour répondre aux besoins croissants du marché.",
    },
    Feature {
        title: "Accompagnement",
        description: "Un suivi personnalisé tout au long de votre parcours pour garantir votre réussite professionnelle.",
    },
    Feature {
        title: "Certifications",
        description: "Des formations reconnues et certifiées qui valorisent votre CV et ouvrent des portes sur le marché du travail.",
    },
    Feature {
        title: "Notre Vision",
        description: "Ensemble pour une vie professionnelle épanouie et une contribution positive à la société.",
    },
];

/// Why-us reasons.
pub const REASONS: &[Reason] = &[
    Reason {
        number: "01",
        title: "Formateurs Experts",
        description: "Une équipe de professionnels expérimentés et passionnés par la transmission de leur savoir.",
    },
    Reason {
        number: "02",
        title: "Stage Pratique",
        description: "Des périodes de stage en entreprise pour une immersion totale dans le monde professionnel.",
    },
    Reason {
        number: "03",
        title: "Certifications Reconnues",
        description: "Des diplômes et certifications valorisés par les employeurs du secteur.",
    },
    Reason {
        number: "04",
        title: "Accompagnement Personnalisé",
        description: "Un suivi individuel pour vous aider à atteindre vos objectifs professionnels.",
    },
];

/// Top navigation bar.
#[must_use]
pub fn navbar(site: &SiteConfig) -> Markup {
    html! {
        nav class="navbar" {
            a class="brand" href={ "#" (anchors::HOME) } { (site.academy_name) }
            ul {
                @for item in NAV_ITEMS {
                    li { a href={ "#" (item.anchor) } { (item.label) } }
                }
            }
        }
    }
}

/// Hero section.
#[must_use]
pub fn hero() -> Markup {
    html! {
        section id=(anchors::HOME) class="hero" {
            p class="tagline" { "Centre de Formation Professionnelle" }
            h1 { "Apprendre. Évoluer. " span class="text-gradient-gold" { "Réussir." } }
            p {
                "Formations certifiées dans le domaine de la santé et du social. "
                "Renforcez vos compétences et boostez votre carrière professionnelle."
            }
            div class="cta" {
                a class="button gold" href={ "#" (anchors::FORMATIONS) } { "Découvrir nos Formations" }
                a class="button hero" href={ "#" (anchors::CONTACT) } { "Nous Contacter" }
            }
            a class="scroll" href={ "#" (anchors::ABOUT) } { "Découvrir" }
        }
    }
}

/// About section.
#[must_use]
pub fn about(site: &SiteConfig) -> Markup {
    html! {
        section id=(anchors::ABOUT) class="about" {
            span class="eyebrow" { "À Propos" }
            h2 { "Votre Partenaire pour l'" span class="text-gradient-gold" { "Excellence" } }
            p {
                (site.academy_name)
                " est votre compagnon dans votre parcours de développement personnel et "
                "professionnel. Nous croyons en votre potentiel et nous engageons à vous "
                "accompagner vers la réussite."
            }
            div class="features" {
                @for feature in FEATURES {
                    article class="feature" {
                        h3 { (feature.title) }
                        p { (feature.description) }
                    }
                }
            }
        }
    }
}

/// Why-us section.
#[must_use]
pub fn why_us(site: &SiteConfig) -> Markup {
    html! {
        section id=(anchors::WHY_US) class="why-us" {
            span class="eyebrow" { "Pourquoi Nous Choisir" }
            h2 { "L'Excellence au Service de " span class="text-gradient-gold" { "Votre Avenir" } }
            p {
                "Découvrez ce qui fait de " (site.academy_name)
                " le choix idéal pour votre formation professionnelle."
            }
            ol class="reasons" {
                @for reason in REASONS {
                    li class="reason" {
                        span class="number" { (reason.number) }
                        h3 { (reason.title) }
                        p { (reason.description) }
                    }
                }
            }
        }
    }
}

/// Contact section.
#[must_use]
pub fn contact(site: &SiteConfig) -> Markup {
    html! {
        section id=(anchors::CONTACT) class="contact" {
            span class="eyebrow" { "Contact" }
            h2 { "Parlons de Votre " span class="text-gradient-gold" { "Avenir" } }
            p {
                "Vous avez des questions sur nos formations ? Contactez-nous "
                "directement sur WhatsApp pour une réponse rapide."
            }
            div class="whatsapp" {
                h3 { "Contactez-nous sur WhatsApp" }
                p { "Obtenez une réponse rapide à toutes vos questions sur nos formations certifiées." }
                a class="button gold" href=(whatsapp_link(site)) target="_blank" rel="noopener noreferrer" {
                    "Envoyer un message WhatsApp"
                }
                p class="hours" { "Disponible " (site.hours) }
            }
            dl class="contact-info" {
                dt { "Adresse" }
                dd {
                    p { (site.address) }
                    a href=(waze_link(site)) target="_blank" rel="noopener noreferrer" { "Ouvrir avec Waze" }
                    " "
                    a href=(google_maps_link(site)) target="_blank" rel="noopener noreferrer" { "Ouvrir avec Google Maps" }
                }
                dt { "Téléphone" }
                dd { (site.phone) }
                dt { "Email" }
                dd { (site.email) }
                dt { "Horaires" }
                dd { (site.hours) }
            }
            div class="social" {
                h4 { "Suivez-nous sur Facebook" }
                p { "Rejoignez notre communauté et restez informé de nos actualités." }
                a href=(site.facebook_url) target="_blank" rel="noopener noreferrer" {
                    (site.academy_name) " sur Facebook"
                }
                h4 { "Suivez-nous sur Instagram" }
                p { "Découvrez nos dernières actualités et moments forts." }
                a href=(site.instagram_url) target="_blank" rel="noopener noreferrer" {
                    (site.academy_name) " sur Instagram"
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navbar_links_every_section() {
        let html = navbar(&SiteConfig::default()).into_string();
        for item in NAV_ITEMS {
            assert!(html.contains(&format!("href=\"#{}\"", item.anchor)));
        }
    }

    #[test]
    fn test_about_renders_all_features() {
        let html = about(&SiteConfig::default()).into_string();
        assert_eq!(FEATURES.len(), 4);
        for feature in FEATURES {
            assert!(html.contains(feature.title));
        }
    }

    #[test]
    fn test_why_us_numbers_in_order() {
        let html = why_us(&SiteConfig::default()).into_string();
        let positions: Vec<usize> = REASONS
            .iter()
            .map(|r| html.find(r.number).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_contact_uses_configured_details() {
        let site = SiteConfig {
            phone: "0600-000000".to_string(),
            ..SiteConfig::default()
        };
        let html = contact(&site).into_string();
        assert!(html.contains("0600-000000"));
        assert!(html.contains("https://wa.me/212704784731?text="));
        assert!(html.contains("Ouvrir avec Waze"));
    }

    #[test]
    fn test_hero_ctas() {
        let html = hero().into_string();
        assert!(html.contains(r##"href="#formations""##));
        assert!(html.contains(r##"href="#contact""##));
    }
}
