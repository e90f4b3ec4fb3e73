use std::{
    collections::VecDeque,
    future::{self, Future},
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use super::{
    dataset::{Dataset, Tuple},
    source::{DataRequest, DataSource, FetchFailure},
};

type Response = Result<Dataset, FetchFailure>;

/// Canned responses, counts every fetch
pub struct MockSource {
    queue: Mutex<VecDeque<Response>>,
    fallback: Response,
    calls: AtomicUsize,
    requests: Mutex<Vec<DataRequest>>,
}

impl MockSource {
    pub fn always(resp: Response) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            fallback: resp,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Plays `resps` in order, then fails with 500 forever
    pub fn sequence(resps: Vec<Response>) -> Self {
        let mut src = Self::always(Err(failure(Some(500), "Internal Server Error")));
        src.queue = Mutex::new(resps.into());
        src
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<DataRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl DataSource for MockSource {
    fn fetch(&self, request: &DataRequest) -> impl Future<Output = Response> + Send {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        let resp = self
            .queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        future::ready(resp)
    }
}

pub fn failure(status: Option<u16>, message: &str) -> FetchFailure {
    FetchFailure {
        status,
        message: message.to_string(),
    }
}

fn row(fields: &[&str]) -> Tuple {
    Tuple::new(fields.iter().map(|f| f.to_string()).collect())
}

/// Folder with columns `channel, status, gain, label`.
/// Every channel is status 4, gain `ch / 2`, label `ch{ch}`.
pub fn channels_dataset(start: &str, end: &str, channels: &[u64]) -> Dataset {
    let mut rows = vec![
        row(&[start]),
        row(&[end]),
        row(&["channel", "status", "gain", "label"]),
        row(&["bigint", "integer", "real", "text"]),
    ];
    rows.extend(channels.iter().map(|ch| {
        Tuple::new(vec![
            ch.to_string(),
            "4".to_string(),
            (*ch as f64 * 0.5).to_string(),
            format!("ch{ch}"),
        ])
    }));
    Dataset::new(rows)
}

/// Same layout as [`channels_dataset`] with explicit status codes
pub fn status_dataset(start: &str, end: &str, statuses: &[(u64, i64)]) -> Dataset {
    let mut rows = vec![
        row(&[start]),
        row(&[end]),
        row(&["channel", "status", "gain", "label"]),
        row(&["bigint", "integer", "real", "text"]),
    ];
    rows.extend(statuses.iter().map(|(ch, status)| {
        Tuple::new(vec![
            ch.to_string(),
            status.to_string(),
            "1".to_string(),
            format!("ch{ch}"),
        ])
    }));
    Dataset::new(rows)
}
