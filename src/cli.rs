use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Suggestion box and onboarding tools for PembleBox
#[derive(Parser)]
#[command(name = "pemblebox")]
#[command(about = "Manage PembleBox suggestions and invite requests", long_about = None)]
pub struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Override the local SQLite database URL
    #[arg(long, global = true, value_name = "URL")]
    pub database_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Work with the suggestion box
    Suggestions {
        #[command(subcommand)]
        action: SuggestionAction,
    },
    /// Send an invite request for a Plex username or email
    Invite {
        handle: String,
    },
    /// Print the onboarding steps
    Steps,
    /// Show a site page by name (home, get-started, suggest, donate)
    Page {
        name: String,
    },
}

#[derive(Subcommand)]
pub enum SuggestionAction {
    /// List suggestions, newest first
    List,
    /// Submit a new suggestion
    Add {
        /// Movies, "TV Shows", Audiobooks, Music or Other
        #[arg(short = 't', long = "type", value_name = "TYPE", default_value = "")]
        kind: String,
        #[arg(long)]
        title: String,
        #[arg(short, long, default_value = "")]
        details: String,
    },
    /// Flip a suggestion between pending and added
    Toggle {
        id: String,
    },
    /// Set a suggestion's status explicitly
    SetStatus {
        id: String,
        status: String,
    },
    /// Delete a suggestion
    Remove {
        id: String,
    },
    /// Print the list again whenever it changes
    Watch,
}
