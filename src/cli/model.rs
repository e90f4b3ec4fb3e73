use clap::Parser;
use clap_derive::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Query calibration folders from the conditions database", long_about = None)]
pub struct Cli {
    /// RON config describing folders
    #[arg(short, long, default_value = "./calibdb.ron")]
    pub config: String,
    /// Query this url directly instead of looking the folder up in the config
    #[arg(long)]
    pub url: Option<String>,
    /// Folder tag, overrides the config
    #[arg(long)]
    pub tag: Option<String>,
    #[command(subcommand)]
    pub command: CliCommands,
}

impl Cli {
    pub fn parse_from_str(cmd_str: &str) -> Result<Self, clap::error::Error> {
        let cmd_str = "calibdb ".to_string() + cmd_str;
        Self::try_parse_from(cmd_str.split_whitespace())
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum CliCommands {
    /// Get one value for a channel
    Get(GetArgs),
    /// List channels in the folder
    #[command(alias = "ls")]
    Channels(FolderTimeArgs),
    /// Show the interval of validity and columns
    #[command(alias = "iov")]
    Interval(FolderTimeArgs),
    /// Show channel status
    Status(StatusArgs),
}

impl CliCommands {
    pub fn folder(&self) -> &str {
        match self {
            Self::Get(args) => &args.at.folder,
            Self::Channels(args) | Self::Interval(args) => &args.folder,
            Self::Status(args) => &args.at.folder,
        }
    }

    pub fn raw_time(&self) -> u64 {
        match self {
            Self::Get(args) => args.at.time,
            Self::Channels(args) | Self::Interval(args) => args.time,
            Self::Status(args) => args.at.time,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct FolderTimeArgs {
    /// folder name
    pub folder: String,
    /// ns since epoch (19 digits) or an RFC 3339 instant
    #[arg(value_parser = parse_time)]
    pub time: u64,
}

#[derive(Args, Debug, Clone)]
pub struct GetArgs {
    #[command(flatten)]
    pub at: FolderTimeArgs,
    pub channel: u64,
    pub column: String,
    #[arg(short, long, value_enum, default_value_t = ValueKind::Float)]
    pub kind: ValueKind,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[command(flatten)]
    pub at: FolderTimeArgs,
    /// only this channel, otherwise summarize the folder
    pub channel: Option<u64>,
    #[arg(long, default_value = "status")]
    pub column: String,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Int,
    Float,
    String,
}

pub fn parse_time(s: &str) -> Result<u64, String> {
    if s.bytes().all(|b| b.is_ascii_digit()) {
        return s.parse().map_err(|e| format!("bad raw timestamp `{s}`: {e}"));
    }

    let ts: jiff::Timestamp = s.parse().map_err(|e| format!("bad time `{s}`: {e}"))?;
    u64::try_from(ts.as_nanosecond()).map_err(|_| format!("time `{s}` is before the epoch"))
}
