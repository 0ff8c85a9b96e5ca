//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::formation::FormationForm;

/// Environment variable that can carry the admin session token.
pub const SESSION_TOKEN_ENV: &str = "SNW_SESSION_TOKEN";

/// Render command arguments.
#[derive(Debug, Args)]
pub struct RenderCommand {
    /// Write the page to FILE instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub out: Option<PathBuf>,

    /// Render the formations section expanded
    #[arg(short, long)]
    pub all: bool,
}

/// Formation read commands.
#[derive(Debug, Subcommand)]
pub enum FormationsCommand {
    /// List formations in creation order
    List {
        /// Show every formation instead of the preview
        #[arg(short, long)]
        all: bool,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// List the footer navigation links
    Links {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

/// Session token, from `--token` or the environment.
#[derive(Debug, Args)]
pub struct TokenArg {
    /// Admin session token (from `admin login`)
    #[arg(short, long, env = SESSION_TOKEN_ENV, hide_env_values = true)]
    pub token: Option<String>,
}

/// Fields of a new formation.
#[derive(Debug, Args)]
pub struct AddArgs {
    /// Formation title
    #[arg(long)]
    pub title: String,

    /// Formation description
    #[arg(long)]
    pub description: String,

    /// Duration in months
    #[arg(long)]
    pub duration: Option<String>,

    /// Number of places
    #[arg(long)]
    pub students: Option<String>,

    /// Number of modules
    #[arg(long)]
    pub modules: Option<String>,
}

impl AddArgs {
    /// The admin form these arguments fill in.
    #[must_use]
    pub fn to_form(&self) -> FormationForm {
        FormationForm {
            title: self.title.clone(),
            description: self.description.clone(),
            duration: self.duration.clone().unwrap_or_default(),
            students: self.students.clone().unwrap_or_default(),
            modules: self.modules.clone().unwrap_or_default(),
        }
    }
}

/// Admin commands.
#[derive(Debug, Subcommand)]
pub enum AdminCommand {
    /// Open an admin session and print its token
    Login {
        /// Admin email
        #[arg(short, long)]
        email: String,

        /// Admin password
        #[arg(short, long)]
        password: String,
    },

    /// Close an admin session
    Logout {
        #[command(flatten)]
        token: TokenArg,
    },

    /// Add a formation
    Add {
        #[command(flatten)]
        token: TokenArg,

        #[command(flatten)]
        fields: AddArgs,
    },

    /// Delete a formation by id
    Delete {
        #[command(flatten)]
        token: TokenArg,

        /// Formation id
        id: String,
    },

    /// Import a formations list exported from the old admin page
    Import {
        #[command(flatten)]
        token: TokenArg,

        /// JSON file holding the exported array
        file: PathBuf,
    },

    /// Print the hash to put in `admin.password_hash`
    HashPassword {
        /// Password to hash
        password: String,
    },
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}
