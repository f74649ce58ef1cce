use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory holding the persisted reading state (overrides LEARNSHELL_STATE_DIR).
    #[arg(long, global = true)]
    pub state_dir: Option<PathBuf>,

    /// Chapter table in YAML; the built-in tutorial is used when omitted.
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,

    /// Authorization code exchange endpoint (overrides LEARNSHELL_AUTH_ENDPOINT).
    #[arg(long, global = true)]
    pub auth_endpoint: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List chapters and subchapters in reading order.
    Catalog(CatalogArgs),
    /// Mount the shell at a route and print what it shows.
    Render(RenderArgs),
    /// Mark a subchapter as read.
    Read(ReadArgs),
    /// Continue without signing in.
    SkipAuth,
    /// Select a track, as a click on its chapter link would.
    SelectTrack(SelectTrackArgs),
    State {
        #[command(subcommand)]
        command: StateCommand,
    },
}

#[derive(Debug, Args)]
pub struct CatalogArgs {
    /// Print JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Location to open, e.g. `/tutorial-react/get-started?code=...`.
    #[arg(long, default_value = "/")]
    pub route: String,

    /// Print JSON instead of text.
    #[arg(long)]
    pub json: bool,

    #[arg(long, default_value_t = 0.0)]
    pub scroll_top: f64,

    #[arg(long, default_value_t = 0.0)]
    pub scroll_height: f64,

    #[arg(long, default_value_t = 0.0)]
    pub viewport_height: f64,

    /// Open the sidebar before rendering.
    #[arg(long)]
    pub toggle_sidebar: bool,

    /// Open the server overlay (needs a signed-in user).
    #[arg(long)]
    pub open_overlay: bool,
}

#[derive(Debug, Args)]
pub struct ReadArgs {
    pub alias: String,
}

#[derive(Debug, Args)]
pub struct SelectTrackArgs {
    pub alias: String,
}

#[derive(Debug, Subcommand)]
pub enum StateCommand {
    /// Print the persisted record.
    Show,
    /// Write a JSON value at a dotted path, e.g. `hasRead.react-01 true`.
    Set(StateSetArgs),
}

#[derive(Debug, Args)]
pub struct StateSetArgs {
    pub path: String,
    /// JSON value.
    pub value: String,
}
