use serde::Serialize;
use tracing::{Instrument, Level, info, span};

use calibdb::{
    config::{CalibConfig, FolderConfig},
    iov::{IovTimeStamp, decode_timestamp},
    provider::{ChannelStatus, ChannelStatusProvider},
    webdb::{DbFolder, WebError},
};

use super::{
    error::DispatchError,
    model::{Cli, CliCommands, ValueKind},
};

#[derive(Serialize)]
#[serde(untagged)]
enum FieldOutput {
    Int(i64),
    Float(f64),
    String(String),
}

#[derive(Serialize)]
struct GetResponse<'a> {
    folder: &'a str,
    channel: u64,
    column: &'a str,
    value: FieldOutput,
}

#[derive(Serialize)]
struct IntervalResponse<'a> {
    folder: &'a str,
    tag: Option<&'a str>,
    requested: IovTimeStamp,
    valid_from: IovTimeStamp,
    /// `None` when the interval is open ended
    valid_to: Option<IovTimeStamp>,
    valid_from_utc: Option<String>,
    columns: &'a [String],
    types: &'a [String],
    rows: usize,
}

#[derive(Serialize)]
struct StatusSummary {
    good: Vec<u64>,
    bad: Vec<u64>,
    noisy: Vec<u64>,
}

#[derive(Serialize)]
struct ChannelStatusResponse {
    channel: u64,
    status: ChannelStatus,
    code: i64,
}

impl Cli {
    fn folder_config(&self) -> Result<FolderConfig, DispatchError> {
        let name = self.command.folder();
        let mut cfg = match &self.url {
            Some(url) => FolderConfig::new(name, url),
            None => CalibConfig::from_file(&self.config)?.folder(name)?.clone(),
        };
        if let Some(tag) = &self.tag {
            cfg.tag = Some(tag.clone());
        }
        Ok(cfg)
    }

    /// Runs the command and returns its JSON output
    pub async fn dispatch(self) -> Result<String, DispatchError> {
        let cfg = self.folder_config()?;
        let span = span!(Level::INFO, "dispatch", folder = %cfg.name);
        self.run(cfg).instrument(span).await
    }

    async fn run(self, cfg: FolderConfig) -> Result<String, DispatchError> {
        let raw_time = self.command.raw_time();
        info!("t = {raw_time}");

        let mut folder = DbFolder::from_config(&cfg)?;

        Ok(match self.command {
            CliCommands::Get(args) => {
                folder.ensure_fresh(raw_time).await?;
                let value = match args.kind {
                    ValueKind::Int => FieldOutput::Int(folder.get_int(args.channel, &args.column)?),
                    ValueKind::Float => {
                        FieldOutput::Float(folder.get_float(args.channel, &args.column)?)
                    }
                    ValueKind::String => {
                        FieldOutput::String(folder.get_string(args.channel, &args.column)?)
                    }
                };
                serde_json::to_string(&GetResponse {
                    folder: &cfg.name,
                    channel: args.channel,
                    column: &args.column,
                    value,
                })?
            }
            CliCommands::Channels(_) => {
                folder.ensure_fresh(raw_time).await?;
                serde_json::to_string(&folder.list_channels()?)?
            }
            CliCommands::Interval(_) => {
                folder.ensure_fresh(raw_time).await?;
                let (valid_from, valid_to) = folder
                    .interval()
                    .ok_or(WebError::NoDataCached)?;
                serde_json::to_string(&IntervalResponse {
                    folder: folder.name(),
                    tag: folder.tag(),
                    requested: decode_timestamp(raw_time).map_err(WebError::from)?,
                    valid_from,
                    valid_to: Some(valid_to).filter(|t| !t.is_max()),
                    valid_from_utc: valid_from.to_jiff().map(|t| t.to_string()),
                    columns: folder.column_names(),
                    types: folder.column_types(),
                    rows: folder.row_count(),
                })?
            }
            CliCommands::Status(args) => {
                let mut provider = ChannelStatusProvider::new(folder).with_status_column(&args.column);
                provider.update(raw_time).await?;
                match args.channel {
                    Some(channel) => {
                        let status = provider.status(channel)?;
                        serde_json::to_string(&ChannelStatusResponse {
                            channel,
                            status,
                            code: status.code(),
                        })?
                    }
                    None => serde_json::to_string(&StatusSummary {
                        good: provider.good_channels()?,
                        bad: provider.bad_channels()?,
                        noisy: provider.noisy_channels()?,
                    })?,
                }
            }
        })
    }
}
