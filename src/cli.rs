//! CLI argument parsing for tagmage.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "tagmage",
    about = "A personal file-tagging catalog",
    version = env!("GIT_DESCRIBE"),
    after_help = "Logs are written to: ~/.local/share/tagmage/logs/tagmage.log"
)]
pub struct Cli {
    /// Library directory (default: $TAGMAGE_HOME, then $XDG_DATA_HOME/tagmage)
    #[arg(short = 'f', long, global = true)]
    pub home: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Copy files into the library
    Add {
        /// Tags for every added file (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        tags: Vec<String>,

        /// Files to add
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Change the title of a file
    Edit {
        /// File ID
        id: i64,

        /// New title
        title: String,
    },

    /// List files matching every filter (tag, !tag, :tagged, :untagged)
    List {
        /// Print one JSON object per line
        #[arg(long)]
        json: bool,

        /// Filters; all must hold
        filters: Vec<String>,
    },

    /// Add tags to a file
    Tag {
        /// File ID
        id: i64,

        /// Tags to add
        #[arg(required = true)]
        tags: Vec<String>,
    },

    /// Remove tags from a file
    Untag {
        /// File ID
        id: i64,

        /// Tags to remove
        #[arg(required = true)]
        tags: Vec<String>,
    },

    /// List every tag, or the tags of one file
    Tags {
        /// File ID
        id: Option<i64>,
    },

    /// Print the library path, or the stored path of each file
    Path {
        /// File IDs
        ids: Vec<i64>,
    },

    /// Remove files from the library
    Rm {
        /// File IDs
        #[arg(required = true)]
        ids: Vec<i64>,
    },
}
