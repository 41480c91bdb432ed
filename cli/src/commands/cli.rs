use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "dytomate", version, about = "Double-click in-place editing harness")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Save one text value through the save queue.
    Save(SaveArgs),
    /// Upload one file through the save queue.
    Upload(UploadArgs),
    /// Drive a controller over a page fixture with a timed event script.
    Replay(ReplayArgs),
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct TransportArgs {
    /// Answer every request locally instead of calling the configured endpoints.
    #[arg(long)]
    pub offline: bool,

    /// Simulated response latency for `--offline`.
    #[arg(long, default_value_t = 0)]
    pub latency_ms: u64,

    /// Keys the offline transport rejects. Can be specified multiple times.
    #[arg(long = "fail-key", action = clap::ArgAction::Append)]
    pub fail_keys: Vec<String>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct SaveArgs {
    #[arg(long)]
    pub key: String,

    #[arg(long)]
    pub value: String,

    /// Extra attributes sent with the value (NAME=VALUE). Can be specified multiple times.
    #[arg(long = "attr", action = clap::ArgAction::Append)]
    pub attrs: Vec<String>,

    #[command(flatten)]
    pub transport: TransportArgs,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct UploadArgs {
    #[arg(long)]
    pub key: String,

    #[arg(long)]
    pub file: String,

    /// Extra attributes sent with the file (NAME=VALUE). Can be specified multiple times.
    #[arg(long = "attr", action = clap::ArgAction::Append)]
    pub attrs: Vec<String>,

    #[command(flatten)]
    pub transport: TransportArgs,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ReplayArgs {
    /// Page tree as JSON.
    #[arg(long)]
    pub page: String,

    /// Timed UI events, one JSON object per line.
    #[arg(long)]
    pub script: String,

    /// `id` of the container element; defaults to the page root.
    #[arg(long)]
    pub container: Option<String>,

    /// Pretty-print the report.
    #[arg(long)]
    pub pretty: bool,

    #[command(flatten)]
    pub transport: TransportArgs,
}
