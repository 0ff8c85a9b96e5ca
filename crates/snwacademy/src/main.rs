//! `snw` - CLI for snwacademy
//!
//! This binary renders the landing page, reads the formations catalog and
//! runs the admin actions against the local database.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::{debug, info, warn};

use snwacademy::auth::hash_password;
use snwacademy::cli::{
    AdminCommand, Cli, Command, ConfigCommand, FormationsCommand, RenderCommand, TokenArg,
    SESSION_TOKEN_ENV,
};
use snwacademy::import::import_legacy_file;
use snwacademy::site::landing_page;
use snwacademy::views::{ActionOutcome, AdminEntry, AdminView};
use snwacademy::{
    init_logging, Access, AuthGuard, Config, FooterLinksView, FormationStore, FormationsCache,
    ListingView, SqliteStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    match cli.command {
        // Config commands must work even when the configuration is broken
        Command::Config(config_cmd) => handle_config(cli.config, config_cmd),
        Command::Render(render_cmd) => {
            let (config, app) = open(cli.config)?;
            handle_render(&app, &config, render_cmd).await
        }
        Command::Formations(formations_cmd) => {
            let (config, app) = open(cli.config)?;
            handle_formations(&app, &config, formations_cmd).await
        }
        Command::Admin(admin_cmd) => {
            let (_, app) = open(cli.config)?;
            handle_admin(&app, admin_cmd).await
        }
        Command::Watch => {
            let (config, app) = open(cli.config)?;
            handle_watch(&app, &config).await
        }
    }
}

fn open(config_path: Option<PathBuf>) -> anyhow::Result<(Config, App)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    let app = App::open(&config)?;
    Ok((config, app))
}

/// The opened store and the services built on it.
#[derive(Debug)]
struct App {
    store: Arc<SqliteStore>,
    cache: FormationsCache,
    guard: AuthGuard,
}

impl App {
    fn open(config: &Config) -> anyhow::Result<Self> {
        let path = config.database_path();
        let store = Arc::new(
            SqliteStore::open(&path, config.feed.capacity)
                .with_context(|| format!("failed to open {}", path.display()))?,
        );
        debug!("Opened formations database at {}", path.display());

        Ok(Self {
            cache: FormationsCache::new(store.clone()),
            guard: AuthGuard::new(store.clone(), &config.admin),
            store,
        })
    }
}

async fn handle_render(app: &App, config: &Config, cmd: RenderCommand) -> anyhow::Result<()> {
    let mut listing = ListingView::mount(&app.cache, config.listing.preview_count).await;
    if cmd.all {
        listing.toggle_show_all();
    }
    let footer = FooterLinksView::mount(&app.cache).await;
    let page = landing_page(&listing, &footer, &config.site);

    match cmd.out {
        Some(path) => {
            tokio::fs::write(&path, page)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!("Landing page written to {}", path.display());
        }
        None => println!("{page}"),
    }
    Ok(())
}

async fn handle_formations(
    app: &App,
    config: &Config,
    cmd: FormationsCommand,
) -> anyhow::Result<()> {
    match cmd {
        FormationsCommand::List { all, json } => {
            let formations = app.store.list_all().await?;
            let shown = if all {
                &formations[..]
            } else {
                &formations[..formations.len().min(config.listing.preview_count)]
            };

            if json {
                println!("{}", serde_json::to_string_pretty(shown)?);
            } else if shown.is_empty() {
                println!("No formations.");
            } else {
                for formation in shown {
                    println!("{}  {}", formation.id, formation.title);
                    println!("    {}", formation.description);
                    let stats: Vec<String> = [
                        formation.duration.as_ref().map(|d| format!("{d} mois")),
                        formation.students.as_ref().map(|s| format!("{s} places")),
                        formation.modules.as_ref().map(|m| format!("{m} modules")),
                    ]
                    .into_iter()
                    .flatten()
                    .collect();
                    if !stats.is_empty() {
                        println!("    {}", stats.join(" | "));
                    }
                }
                if shown.len() < formations.len() {
                    println!(
                        "({} of {} shown, use --all for the rest)",
                        shown.len(),
                        formations.len()
                    );
                }
            }
        }
        FormationsCommand::Links { json } => {
            let links = app.store.list_links().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&links)?);
            } else {
                for link in links {
                    println!("{}  {}", link.id, link.title);
                }
            }
        }
    }
    Ok(())
}

async fn handle_admin(app: &App, cmd: AdminCommand) -> anyhow::Result<()> {
    match cmd {
        AdminCommand::Login { email, password } => {
            let session = app.guard.login(&email, &password).await?;
            println!("{}", session.token);
            eprintln!("Session valid until {}", session.expires_at.to_rfc3339());
            eprintln!("Pass it with --token or the {SESSION_TOKEN_ENV} environment variable.");
        }
        AdminCommand::Logout { token } => {
            let Access::Granted(session) = app.guard.check(token.token.as_deref()).await? else {
                println!("No active session.");
                return Ok(());
            };
            app.guard.logout(session).await?;
            println!("Logged out.");
        }
        AdminCommand::Add { token, fields } => {
            let mut view = enter_admin(app, &token).await?;
            let outcome = view.add(&fields.to_form()).await;
            report(outcome)?;
        }
        AdminCommand::Delete { token, id } => {
            let mut view = enter_admin(app, &token).await?;
            let outcome = view.remove(&id).await;
            report(outcome)?;
        }
        AdminCommand::Import { token, file } => {
            let Access::Granted(session) = app.guard.check(token.token.as_deref()).await? else {
                bail!("not logged in, run `snw admin login` first");
            };
            let summary = import_legacy_file(app.store.as_ref(), &session, &file)
                .await
                .with_context(|| format!("failed to import {}", file.display()))?;
            println!(
                "Imported {} formations, skipped {}.",
                summary.imported_count(),
                summary.skipped_count()
            );
            for skipped in &summary.skipped {
                println!("  #{}: {}", skipped.index, skipped.reason);
            }
        }
        AdminCommand::HashPassword { password } => {
            println!("{}", hash_password(&password));
        }
    }
    Ok(())
}

async fn enter_admin(app: &App, token: &TokenArg) -> anyhow::Result<AdminView> {
    match AdminView::enter(&app.guard, token.token.as_deref(), &app.cache).await? {
        AdminEntry::Ready(view) => Ok(view),
        AdminEntry::Redirect(redirect) => {
            bail!("not logged in (redirect to {}), run `snw admin login` first", redirect.to)
        }
    }
}

fn report(outcome: ActionOutcome) -> anyhow::Result<()> {
    match outcome {
        ActionOutcome::Notified(notification) if notification.is_success() => {
            println!("{}", notification.message);
            Ok(())
        }
        ActionOutcome::Notified(notification) => bail!(notification.message),
        ActionOutcome::Redirect(_) => bail!("session expired, run `snw admin login` again"),
    }
}

async fn handle_watch(app: &App, config: &Config) -> anyhow::Result<()> {
    let poller = config
        .poll_interval()
        .map(|interval| app.store.spawn_change_poller(interval));

    let mut listing = ListingView::mount(&app.cache, config.listing.preview_count).await;
    let mut footer = FooterLinksView::mount(&app.cache).await;
    info!(
        "Watching {} ({} formations), press Ctrl-C to stop",
        app.store.path().display(),
        listing.formations().len()
    );

    watch_until(&mut listing, &mut footer, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Cannot listen for Ctrl-C: {}", e);
        }
    })
    .await;

    if let Some(poller) = poller {
        poller.abort();
    }
    Ok(())
}

/// Log view refreshes until `shutdown` resolves or the cache goes away.
async fn watch_until(
    listing: &mut ListingView,
    footer: &mut FooterLinksView,
    shutdown: impl Future<Output = ()>,
) {
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            changed = listing.changed() => {
                if !changed {
                    break;
                }
                info!(
                    "Catalog refreshed: {} formations, {} shown",
                    listing.formations().len(),
                    listing.visible().len()
                );
            }
            changed = footer.changed() => {
                if !changed {
                    break;
                }
                info!("Footer links refreshed: {} links", footer.links().len());
            }
            () = &mut shutdown => {
                info!("Interrupted, stopping");
                break;
            }
        }
    }
}

fn handle_config(config_path: Option<PathBuf>, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = Config::load_from(config_path)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Listing]");
                println!("  Preview count:      {}", config.listing.preview_count);
                println!();
                println!("[Feed]");
                println!("  Capacity:           {}", config.feed.capacity);
                println!("  Poll interval (ms): {}", config.feed.poll_interval_ms);
                println!();
                println!("[Admin]");
                println!("  Email:              {}", config.admin.email);
                println!(
                    "  Password set:       {}",
                    config.admin.password_hash.is_some()
                );
                println!("  Session TTL (h):    {}", config.admin.session_ttl_hours);
                println!();
                println!("[Site]");
                println!("  Name:               {}", config.site.academy_name);
                println!("  Address:            {}", config.site.address);
                println!("  Phone:              {}", config.site.phone);
                println!("  WhatsApp:           {}", config.site.whatsapp_number);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.or(config_path).unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => bail!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use snwacademy::config::AdminConfig;
    use snwacademy::FormationForm;
    use tokio::sync::oneshot;

    use super::*;

    #[test]
    fn test_config_commands_bypass_broken_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[listing]\npreview_count = 0\n").unwrap();

        assert!(open(Some(path.clone())).is_err());
        assert!(handle_config(Some(path.clone()), ConfigCommand::Path).is_ok());
        assert!(handle_config(Some(path), ConfigCommand::Validate { file: None }).is_err());
    }

    #[tokio::test]
    async fn test_watch_stops_on_shutdown_sent_while_busy() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let admin = AdminConfig {
            password_hash: Some(hash_password("secret")),
            ..AdminConfig::default()
        };
        let guard = AuthGuard::new(store.clone(), &admin);
        let token = guard.login(&admin.email, "secret").await.unwrap().token;
        let Access::Granted(session) = guard.check(Some(&token)).await.unwrap() else {
            panic!("live session was redirected");
        };
        let cache = FormationsCache::new(store.clone());
        let mut listing = ListingView::mount(&cache, 3).await;
        let mut footer = FooterLinksView::mount(&cache).await;

        let (stop, stopped) = oneshot::channel::<()>();
        let writer = tokio::spawn(async move {
            for title in ["A", "B", "C"] {
                store
                    .insert(&session, FormationForm::new(title, "d").validate().unwrap())
                    .await
                    .unwrap();
            }
            stop.send(()).unwrap();
        });

        tokio::time::timeout(
            Duration::from_secs(2),
            watch_until(&mut listing, &mut footer, async {
                stopped.await.unwrap();
            }),
        )
        .await
        .expect("shutdown was not observed");
        writer.await.unwrap();
    }
}
