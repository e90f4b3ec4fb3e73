use rand::{SeedableRng, rngs::StdRng};
use tracing::{Instrument, Level, debug, error, info, span, warn};

use super::{
    dataset::{Dataset, Tuple},
    error::{FieldError, WebError},
    retry::RetryPolicy,
    source::{DataRequest, DataSource, HttpSource},
};
use crate::{
    config::FolderConfig,
    iov::{IovTimeStamp, decode_timestamp},
};

/// Rows before the data: valid-from, valid-to, column names, column types
pub const HEADER_ROWS: usize = 4;
/// Every folder is keyed by channel id in its first column
pub const KEY_COLUMN: usize = 0;
/// valid-to value meaning the interval has no end yet
pub const OPEN_INTERVAL_MARKER: &str = "-";

/// Counters for observing how lookups and refreshes hit the data
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LookupStats {
    /// key column reads done by lookups
    pub row_reads: u64,
    /// lookups served by the one-row cache
    pub cache_hits: u64,
    /// lookups that needed a binary search
    pub searches: u64,
    pub fetch_attempts: u64,
    pub refreshes: u64,
}

struct CachedData {
    start: IovTimeStamp,
    end: IovTimeStamp,
    columns: Vec<String>,
    types: Vec<String>,
    dataset: Dataset,
    n_rows: usize,
}

#[derive(Debug, Default)]
struct RowCache {
    channel: u64,
    row: Option<usize>,
}

/// Decodes a typed value from one field of a tuple
pub trait FieldValue: Sized {
    fn decode(tuple: &Tuple, column: usize) -> Result<Self, FieldError>;
}

impl FieldValue for i64 {
    fn decode(tuple: &Tuple, column: usize) -> Result<Self, FieldError> {
        tuple.long_value(column)
    }
}

impl FieldValue for f64 {
    fn decode(tuple: &Tuple, column: usize) -> Result<Self, FieldError> {
        tuple.double_value(column)
    }
}

impl FieldValue for String {
    fn decode(tuple: &Tuple, column: usize) -> Result<Self, FieldError> {
        tuple.string_value(column)
    }
}

/// Caches one interval of validity worth of a conditions folder.
///
/// Call [`DbFolder::ensure_fresh`] with the time being processed before doing
/// lookups. It only goes to the database when that time falls outside the
/// cached `[valid_from, valid_to)`.
///
/// A folder has a single owner. Everything that touches the cache takes
/// `&mut self`, so sharing one between tasks means wrapping it in a mutex
/// (or keeping one folder per task).
pub struct DbFolder<S> {
    name: String,
    tag: Option<String>,
    source: S,
    policy: RetryPolicy,
    rng: StdRng,
    cached: Option<CachedData>,
    row_cache: RowCache,
    stats: LookupStats,
}

impl DbFolder<HttpSource> {
    pub fn from_config(cfg: &FolderConfig) -> Result<Self, WebError> {
        let source = match cfg.request_timeout() {
            Some(timeout) => HttpSource::with_timeout(&cfg.url, timeout)?,
            None => HttpSource::new(&cfg.url)?,
        };
        Ok(Self::with_source(
            &cfg.name,
            cfg.tag.as_deref(),
            source,
            cfg.retry.try_into()?,
            cfg.seed,
        ))
    }
}

impl<S: DataSource> DbFolder<S> {
    /// `seed` fixes the retry jitter, otherwise it's seeded from the OS
    pub fn with_source(
        name: &str,
        tag: Option<&str>,
        source: S,
        policy: RetryPolicy,
        seed: Option<u64>,
    ) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Self {
            name: name.to_string(),
            tag: tag.filter(|t| !t.is_empty()).map(str::to_string),
            source,
            policy,
            rng,
            cached: None,
            row_cache: RowCache::default(),
            stats: LookupStats::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn stats(&self) -> LookupStats {
        self.stats
    }

    /// `[valid_from, valid_to)` of the cached data
    pub fn interval(&self) -> Option<(IovTimeStamp, IovTimeStamp)> {
        self.cached.as_ref().map(|d| (d.start, d.end))
    }

    pub fn is_valid(&self, ts: &IovTimeStamp) -> bool {
        self.cached
            .as_ref()
            .is_some_and(|d| d.start <= *ts && *ts < d.end)
    }

    pub fn column_names(&self) -> &[String] {
        self.cached.as_ref().map(|d| d.columns.as_slice()).unwrap_or_default()
    }

    pub fn column_types(&self) -> &[String] {
        self.cached.as_ref().map(|d| d.types.as_slice()).unwrap_or_default()
    }

    pub fn row_count(&self) -> usize {
        self.cached.as_ref().map_or(0, |d| d.n_rows)
    }

    /// Makes sure the cached data covers `raw_time` (ns since epoch).
    /// Returns whether new data was fetched.
    pub async fn ensure_fresh(&mut self, raw_time: u64) -> Result<bool, WebError> {
        let ts = decode_timestamp(raw_time)?;

        if self.is_valid(&ts) {
            debug!(folder = %self.name, "{ts} in cached interval");
            return Ok(false);
        }

        let span = span!(Level::INFO, "DbFolder", folder = %self.name, t = %ts);
        self.refresh(ts).instrument(span).await?;
        Ok(true)
    }

    async fn refresh(&mut self, time: IovTimeStamp) -> Result<(), WebError> {
        // old data is useless for `time` either way
        self.cached = None;
        self.row_cache = RowCache::default();

        let request = DataRequest {
            folder: self.name.clone(),
            tag: self.tag.clone(),
            time,
        };
        let dataset = self.fetch_with_retry(&request).await?;
        let data = CachedData::from_dataset(dataset, time)?;

        if !(data.start <= time && time < data.end) {
            warn!("server returned [{}, {}) which does not cover {time}", data.start, data.end);
        }
        info!(
            rows = data.n_rows,
            "cached [{}, {})",
            data.start,
            if data.end.is_max() { "-".to_string() } else { data.end.db_stamp() }
        );

        self.cached = Some(data);
        self.stats.refreshes += 1;
        Ok(())
    }

    async fn fetch_with_retry(&mut self, request: &DataRequest) -> Result<Dataset, WebError> {
        let mut attempt = 0;
        loop {
            self.stats.fetch_attempts += 1;
            let failure = match self.source.fetch(request).await {
                Ok(dataset) => return Ok(dataset),
                Err(f) => f,
            };

            attempt += 1;
            if attempt >= self.policy.max_attempts {
                error!(
                    "giving up after {attempt} attempts, status {:?}: {}",
                    failure.status, failure.message
                );
                return Err(WebError::RemoteFetch {
                    status: failure.status,
                    message: failure.message,
                });
            }

            let delay = self.policy.delay(attempt - 1, &mut self.rng);
            warn!(
                "attempt {attempt} failed, status {:?}: {}. retrying in {delay:?}",
                failure.status, failure.message
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Finds the row holding `channel` and the index of column `name`
    pub fn lookup_column(&mut self, channel: u64, name: &str) -> Result<(usize, usize), WebError> {
        let row = self.find_row(channel)?;
        let data = self.cached.as_ref().ok_or(WebError::NoDataCached)?;
        Ok((row, data.column_index(name)?))
    }

    fn find_row(&mut self, channel: u64) -> Result<usize, WebError> {
        let data = self.cached.as_ref().ok_or(WebError::NoDataCached)?;
        let stats = &mut self.stats;

        // the cached row is only a hint, check it against the live data
        if let Some(row) = self.row_cache.row.filter(|_| self.row_cache.channel == channel) {
            if matches!(data.read_key(row, stats), Ok(c) if c == channel) {
                stats.cache_hits += 1;
                return Ok(row);
            }
        }

        stats.searches += 1;
        let (mut low, mut high) = (0i64, data.n_rows as i64 - 1);
        let mut mid = (low + high) / 2;
        while low <= high {
            let val = data.read_key(mid as usize, stats)?;
            if val == channel {
                break;
            }

            if val > channel {
                high = mid - 1;
            } else {
                low = mid + 1;
            }
            mid = (low + high) / 2;
        }

        // the loop also ends when the search space runs out, so the final
        // position has to be checked
        let row = usize::try_from(mid).map_err(|_| WebError::ChannelNotFound(channel))?;
        if data.read_key(row, stats)? != channel {
            return Err(WebError::ChannelNotFound(channel));
        }

        self.row_cache = RowCache {
            channel,
            row: Some(row),
        };
        Ok(row)
    }

    pub fn get_value<T: FieldValue>(&mut self, channel: u64, name: &str) -> Result<T, WebError> {
        let (row, col) = self.lookup_column(channel, name)?;
        let data = self.cached.as_ref().ok_or(WebError::NoDataCached)?;

        let decode_err = |source| WebError::FieldDecode {
            channel,
            column: name.to_string(),
            source,
        };
        let tuple = data.tuple(row).map_err(decode_err)?;
        T::decode(tuple, col).map_err(decode_err)
    }

    pub fn get_int(&mut self, channel: u64, name: &str) -> Result<i64, WebError> {
        self.get_value(channel, name)
    }

    pub fn get_float(&mut self, channel: u64, name: &str) -> Result<f64, WebError> {
        self.get_value(channel, name)
    }

    pub fn get_string(&mut self, channel: u64, name: &str) -> Result<String, WebError> {
        self.get_value(channel, name)
    }

    /// Every channel in the cached data, in row order
    pub fn list_channels(&self) -> Result<Vec<u64>, WebError> {
        let data = self.cached.as_ref().ok_or(WebError::NoDataCached)?;
        (0..data.n_rows)
            .map(|row| {
                data.tuple(row)
                    .and_then(|t| t.unsigned_value(KEY_COLUMN))
                    .map_err(|source| WebError::KeyDecode { row, source })
            })
            .collect()
    }
}

impl CachedData {
    fn from_dataset(dataset: Dataset, time: IovTimeStamp) -> Result<Self, WebError> {
        let n_rows = dataset.num_tuples().saturating_sub(HEADER_ROWS);
        if n_rows < 1 {
            return Err(WebError::EmptyDataset(time));
        }

        let start: IovTimeStamp = header_value(&dataset, 0)?.parse()?;
        let end_str = header_value(&dataset, 1)?;
        let end: IovTimeStamp = match end_str.trim() {
            OPEN_INTERVAL_MARKER => IovTimeStamp::MAX,
            s => s.parse()?,
        };

        let columns = header_row(&dataset, 2);
        let types = header_row(&dataset, 3);

        Ok(Self {
            start,
            end,
            columns,
            types,
            dataset,
            n_rows,
        })
    }

    /// Data row, header rows skipped
    fn tuple(&self, row: usize) -> Result<&Tuple, FieldError> {
        self.dataset
            .tuple(row + HEADER_ROWS)
            .ok_or(FieldError::RowOutOfRange(row))
    }

    fn read_key(&self, row: usize, stats: &mut LookupStats) -> Result<u64, WebError> {
        stats.row_reads += 1;
        self.tuple(row)
            .and_then(|t| t.unsigned_value(KEY_COLUMN))
            .map_err(|source| WebError::KeyDecode { row, source })
    }

    /// Names are matched exactly. The key column can't be looked up by name.
    fn column_index(&self, name: &str) -> Result<usize, WebError> {
        self.columns
            .iter()
            .enumerate()
            .skip(KEY_COLUMN + 1)
            .find(|(_, c)| *c == name)
            .map(|(i, _)| i)
            .ok_or_else(|| WebError::ColumnNotFound(name.to_string()))
    }
}

fn header_value(dataset: &Dataset, row: usize) -> Result<String, WebError> {
    dataset
        .tuple(row)
        .and_then(|t| t.string_value(0).ok())
        .ok_or_else(|| WebError::MalformedHeader(format!("header row {row} is empty")))
}

fn header_row(dataset: &Dataset, row: usize) -> Vec<String> {
    dataset
        .tuple(row)
        .map(|t| t.fields().to_vec())
        .unwrap_or_default()
}
