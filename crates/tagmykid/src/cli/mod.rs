//! Command-line interface for tagmykid.
//!
//! This module provides the CLI structure for the `tagmykid` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ConfigCommand, ContactCommand, FindCommand, LoginCommand, OutputFormat, QrFormatArg,
    SignupCommand, TagCommand,
};

/// tagmykid - Lost-and-found tags for school kids
///
/// Parents register tags for their children and print them as QR codes.
/// Whoever finds a tagged item scans it or types its code to reach the
/// parent.
#[derive(Debug, Parser)]
#[command(name = "tagmykid")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v info, -vv debug, -vvv trace)
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
    /// Create an account and sign in
    Signup(SignupCommand),

    /// Sign in
    Login(LoginCommand),

    /// Sign out
    Logout,

    /// Show who is signed in
    Whoami,

    /// Create, list and print tags
    #[command(subcommand)]
    Tag(TagCommand),

    /// Look up a found item's tag
    #[command(subcommand)]
    Find(FindCommand),

    /// Build a message link to a child's parent
    Contact(ContactCommand),

    /// View or check configuration
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
                2 => crate::logging::Verbosity::Debug,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}
