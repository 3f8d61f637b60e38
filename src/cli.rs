use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "anitracker",
    version,
    about = "Detect the anime episode on a streaming page and track watch progress"
)]
pub struct Cli {
    /// Raise the default log level to debug (RUST_LOG still wins).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Extract an observation from a page URL or a saved HTML file and record it.
    Detect {
        /// http(s) URL to fetch, or a path to a saved HTML document.
        source: String,
        /// Page URL to resolve relative links against when SOURCE is a file.
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        tab_id: Option<i64>,
        /// Print the observation without sending it to the tracker.
        #[arg(long)]
        dry_run: bool,
        /// Show which strategy produced each field.
        #[arg(long)]
        explain: bool,
    },
    /// Poll a page and report every new episode observed on it.
    Watch {
        url: String,
        #[arg(long)]
        interval_ms: Option<u64>,
        /// Stop after this many polls (runs until interrupted otherwise).
        #[arg(long)]
        max_polls: Option<u64>,
        /// Also read page events (JSON lines) from stdin between polls.
        #[arg(long)]
        events: bool,
    },
    /// Read JSON messages from stdin, one per line, and answer each on stdout.
    Ingest,
    /// Show the most recently detected anime.
    Current,
    /// Show the tracking list.
    List,
    /// Show or edit the watch history.
    History {
        #[command(subcommand)]
        action: Option<HistoryAction>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Edit the tracking list.
    Track {
        #[command(subcommand)]
        action: TrackAction,
    },
    /// Show or change settings.
    Settings {
        #[arg(long)]
        auto_update: Option<bool>,
        #[arg(long)]
        notifications: Option<bool>,
        #[arg(long)]
        max_history: Option<usize>,
    },
    /// Trim the watch history to the configured maximum.
    Cleanup,
    Tui,
}

#[derive(Debug, Subcommand)]
pub enum HistoryAction {
    Stats,
    Rm { id: String },
    Clear,
}

#[derive(Debug, Subcommand)]
pub enum TrackAction {
    /// Add the current anime, or a history entry, to the tracking list.
    Add {
        #[arg(long)]
        history_id: Option<String>,
    },
    Inc { id: String },
    Dec { id: String },
    /// Set the total episode count (a number, or `?` for unknown).
    Total { id: String, total: String },
    Rm { id: String },
    Clear,
}
