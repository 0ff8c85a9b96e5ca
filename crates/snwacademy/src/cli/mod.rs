//! Command-line interface for snwacademy.
//!
//! This module provides the CLI structure and command handlers for the
//! `snw` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    AddArgs, AdminCommand, ConfigCommand, FormationsCommand, RenderCommand, TokenArg,
    SESSION_TOKEN_ENV,
};

/// snw - SNW Academy site and formations admin
///
/// Renders the academy's landing page from the formations database and
/// manages the formations catalog behind an admin login.
#[derive(Debug, Parser)]
#[command(name = "snw")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Render the landing page as HTML
    Render(RenderCommand),

    /// Read the formations catalog
    #[command(subcommand)]
    Formations(FormationsCommand),

    /// Log in and manage formations
    #[command(subcommand)]
    Admin(AdminCommand),

    /// Follow the catalog and log every refresh until interrupted
    Watch,

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}
