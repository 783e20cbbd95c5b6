//! CLI module - Command-line interface for Vitrine
//!
//! This module provides a structured CLI using clap for argument parsing.

mod commands;

use clap::{Parser, Subcommand};

/// Vitrine - a small product catalog with image uploads
#[derive(Parser)]
#[command(name = "vitrine")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web server (default)
    #[command(alias = "web")]
    Serve,

    /// Create default config file
    #[command(alias = "--init")]
    Init,

    /// Register a user account
    Register {
        /// Username, matched exactly at login
        username: String,
        /// Plaintext password, at least 8 characters
        #[arg(long)]
        password: String,
        /// Role to grant; repeat for several. Defaults to USER
        #[arg(long = "role")]
        roles: Vec<String>,
    },

    /// List catalog products, newest first
    #[command(alias = "ls")]
    Products {
        /// Only products whose title contains this text
        #[arg(long)]
        title: Option<String>,
    },
}

pub use commands::*;
