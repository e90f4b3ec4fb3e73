use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::webdb::{DataSource, DbFolder, WebError};

pub const DEFAULT_STATUS_COLUMN: &str = "status";

/// Readout channel condition, stored as an integer code in the database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelStatus {
    Disconnected = 0,
    Dead = 1,
    LowNoise = 2,
    Noisy = 3,
    Good = 4,
    Unknown = 5,
}

impl ChannelStatus {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Self::Disconnected,
            1 => Self::Dead,
            2 => Self::LowNoise,
            3 => Self::Noisy,
            4 => Self::Good,
            _ => Self::Unknown,
        }
    }

    pub fn code(self) -> i64 {
        self as i64
    }

    pub fn is_present(self) -> bool {
        self != Self::Disconnected
    }

    pub fn is_bad(self) -> bool {
        matches!(self, Self::Dead | Self::LowNoise)
    }

    pub fn is_noisy(self) -> bool {
        self == Self::Noisy
    }

    pub fn is_good(self) -> bool {
        self == Self::Good
    }
}

/// Channel status for a folder where all channels share one interval of
/// validity. Call [`ChannelStatusProvider::update`] once per event before
/// asking about channels.
pub struct ChannelStatusProvider<S> {
    folder: DbFolder<S>,
    status_column: String,
    /// channel -> status for the folder's current interval
    snapshot: Option<BTreeMap<u64, ChannelStatus>>,
}

impl<S: DataSource> ChannelStatusProvider<S> {
    pub fn new(folder: DbFolder<S>) -> Self {
        Self {
            folder,
            status_column: DEFAULT_STATUS_COLUMN.to_string(),
            snapshot: None,
        }
    }

    pub fn with_status_column(mut self, name: &str) -> Self {
        self.status_column = name.to_string();
        self
    }

    pub fn folder(&self) -> &DbFolder<S> {
        &self.folder
    }

    /// Returns whether the folder fetched new data
    pub async fn update(&mut self, raw_time: u64) -> Result<bool, WebError> {
        let refreshed = match self.folder.ensure_fresh(raw_time).await {
            Ok(r) => r,
            Err(e) => {
                self.snapshot = None;
                return Err(e);
            }
        };

        if refreshed || self.snapshot.is_none() {
            self.snapshot = None;
            let mut snapshot = BTreeMap::new();
            for channel in self.folder.list_channels()? {
                let code = self.folder.get_int(channel, &self.status_column)?;
                snapshot.insert(channel, ChannelStatus::from_code(code));
            }
            debug!(folder = %self.folder.name(), "{} channel statuses loaded", snapshot.len());
            self.snapshot = Some(snapshot);
        }

        Ok(refreshed)
    }

    fn snapshot(&self) -> Result<&BTreeMap<u64, ChannelStatus>, WebError> {
        self.snapshot.as_ref().ok_or(WebError::NoDataCached)
    }

    pub fn status(&self, channel: u64) -> Result<ChannelStatus, WebError> {
        self.snapshot()?
            .get(&channel)
            .copied()
            .ok_or(WebError::ChannelNotFound(channel))
    }

    pub fn is_present(&self, channel: u64) -> Result<bool, WebError> {
        Ok(self.status(channel)?.is_present())
    }

    pub fn is_bad(&self, channel: u64) -> Result<bool, WebError> {
        Ok(self.status(channel)?.is_bad())
    }

    pub fn is_noisy(&self, channel: u64) -> Result<bool, WebError> {
        Ok(self.status(channel)?.is_noisy())
    }

    pub fn is_good(&self, channel: u64) -> Result<bool, WebError> {
        Ok(self.status(channel)?.is_good())
    }

    fn channels_where(&self, pred: fn(ChannelStatus) -> bool) -> Result<Vec<u64>, WebError> {
        Ok(self
            .snapshot()?
            .iter()
            .filter(|(_, status)| pred(**status))
            .map(|(ch, _)| *ch)
            .collect())
    }

    pub fn good_channels(&self) -> Result<Vec<u64>, WebError> {
        self.channels_where(ChannelStatus::is_good)
    }

    pub fn bad_channels(&self) -> Result<Vec<u64>, WebError> {
        self.channels_where(ChannelStatus::is_bad)
    }

    pub fn noisy_channels(&self) -> Result<Vec<u64>, WebError> {
        self.channels_where(ChannelStatus::is_noisy)
    }
}
