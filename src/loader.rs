use crate::data::boundaries::{BoundarySource, Municipality};
use crate::data::cases::{CaseRecord, CaseSource};
use crate::error::FetchError;
use crate::uf::StateCode;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Completion of one background fetch, tagged with the request that issued it
pub enum LoadEvent {
    Cases {
        generation: u64,
        state: StateCode,
        result: Result<Vec<CaseRecord>, FetchError>,
    },
    Boundaries {
        generation: u64,
        state: StateCode,
        result: Result<Vec<Municipality>, FetchError>,
    },
}

impl LoadEvent {
    pub fn generation(&self) -> u64 {
        match self {
            LoadEvent::Cases { generation, .. } | LoadEvent::Boundaries { generation, .. } => {
                *generation
            }
        }
    }

    pub fn state(&self) -> StateCode {
        match self {
            LoadEvent::Cases { state, .. } | LoadEvent::Boundaries { state, .. } => *state,
        }
    }
}

/// Runs case and boundary fetches off the UI thread.
///
/// Both fetches of a request run concurrently and report back over a
/// channel in whatever order they finish. Every request bumps the
/// generation so the receiver can drop results of superseded requests.
/// Jobs still queued when a newer request arrives are skipped; fetches
/// already running finish and are discarded by the receiver.
pub struct Loader {
    cases: Arc<dyn CaseSource>,
    boundaries: Arc<dyn BoundarySource>,
    pool: ThreadPool,
    tx: Sender<LoadEvent>,
    rx: Receiver<LoadEvent>,
    generation: u64,
    /// Latest generation, read by queued jobs before they start
    current: Arc<AtomicU64>,
}

impl Loader {
    const FETCH_THREADS: usize = 4;

    pub fn new(
        cases: Arc<dyn CaseSource>,
        boundaries: Arc<dyn BoundarySource>,
    ) -> Result<Self, ThreadPoolBuildError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(Self::FETCH_THREADS)
            .thread_name(|i| format!("fetch-{i}"))
            .build()?;
        let (tx, rx) = mpsc::channel();
        Ok(Self {
            cases,
            boundaries,
            pool,
            tx,
            rx,
            generation: 0,
            current: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Current request generation; 0 before the first request
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Issue both fetches for `state`. Returns the new generation.
    pub fn request(&mut self, state: StateCode) -> u64 {
        self.generation += 1;
        let generation = self.generation;
        self.current.store(generation, Ordering::SeqCst);
        debug!(%state, generation, "fetches issued");

        let cases = Arc::clone(&self.cases);
        self.spawn(state, generation, move || LoadEvent::Cases {
            generation,
            state,
            result: cases.fetch_latest(state),
        });

        let boundaries = Arc::clone(&self.boundaries);
        self.spawn(state, generation, move || LoadEvent::Boundaries {
            generation,
            state,
            result: boundaries.fetch(state),
        });

        generation
    }

    fn spawn<F>(&self, state: StateCode, generation: u64, job: F)
    where
        F: FnOnce() -> LoadEvent + Send + 'static,
    {
        let current = Arc::clone(&self.current);
        let tx = self.tx.clone();
        self.pool.spawn(move || {
            if current.load(Ordering::SeqCst) != generation {
                debug!(%state, generation, "superseded before start, skipped");
                return;
            }
            // Receiver gone means the app is shutting down.
            let _ = tx.send(job());
        });
    }

    /// Drain finished fetches without blocking
    pub fn poll(&self) -> Vec<LoadEvent> {
        self.rx.try_iter().collect()
    }

    /// Block until one fetch finishes or `timeout` elapses
    pub fn wait(&self, timeout: Duration) -> Option<LoadEvent> {
        self.rx.recv_timeout(timeout).ok()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::data::boundaries::{parse_boundaries, tests::GO_FIXTURE};

    /// In-memory case source
    pub(crate) struct FixedCases(pub Result<Vec<CaseRecord>, u16>);

    impl CaseSource for FixedCases {
        fn fetch_latest(&self, state: StateCode) -> Result<Vec<CaseRecord>, FetchError> {
            self.0.clone().map_err(|status| FetchError::Status {
                url: format!("memory://{state}"),
                status,
            })
        }
    }

    /// In-memory boundary source serving the GO fixture for every state
    pub(crate) struct FixtureBoundaries;

    impl BoundarySource for FixtureBoundaries {
        fn fetch(&self, _state: StateCode) -> Result<Vec<Municipality>, FetchError> {
            parse_boundaries(GO_FIXTURE, "fixture")
        }
    }

    #[test]
    fn test_request_delivers_both_events() {
        let mut loader = Loader::new(
            Arc::new(FixedCases(Ok(vec![CaseRecord::new("Goiânia", 150, 3)]))),
            Arc::new(FixtureBoundaries),
        )
        .unwrap();

        let generation = loader.request(StateCode::GO);
        assert_eq!(generation, 1);

        let mut seen = Vec::new();
        while seen.len() < 2 {
            let event = loader.wait(Duration::from_secs(5)).expect("fetch timed out");
            assert_eq!(event.generation(), 1);
            assert_eq!(event.state(), StateCode::GO);
            seen.push(matches!(event, LoadEvent::Cases { .. }));
        }
        seen.sort();
        assert_eq!(seen, vec![false, true]);
    }

    /// Source that takes a while, like a slow API
    struct SlowCases(Duration);

    impl CaseSource for SlowCases {
        fn fetch_latest(&self, _state: StateCode) -> Result<Vec<CaseRecord>, FetchError> {
            std::thread::sleep(self.0);
            Ok(Vec::new())
        }
    }

    struct SlowBoundaries(Duration);

    impl BoundarySource for SlowBoundaries {
        fn fetch(&self, _state: StateCode) -> Result<Vec<Municipality>, FetchError> {
            std::thread::sleep(self.0);
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_superseded_jobs_do_not_delay_latest_request() {
        let delay = Duration::from_millis(300);
        let mut loader =
            Loader::new(Arc::new(SlowCases(delay)), Arc::new(SlowBoundaries(delay))).unwrap();

        let start = std::time::Instant::now();
        for state in StateCode::ALL.iter().take(8) {
            loader.request(*state);
        }
        let latest = loader.request(StateCode::GO);

        let mut stale = 0;
        let mut fresh = 0;
        while fresh < 2 {
            let event = loader.wait(Duration::from_secs(5)).expect("fetch timed out");
            if event.generation() == latest {
                fresh += 1;
            } else {
                stale += 1;
            }
        }

        // Only the jobs already running when newer requests came in report back.
        assert!(stale <= Loader::FETCH_THREADS, "{stale} stale fetches ran");
        // Two rounds of the pool: the in-flight jobs, then the latest request.
        assert!(start.elapsed() < delay * 4, "took {:?}", start.elapsed());
    }

    #[test]
    fn test_generation_increments() {
        let mut loader =
            Loader::new(Arc::new(FixedCases(Err(503))), Arc::new(FixtureBoundaries)).unwrap();
        assert_eq!(loader.generation(), 0);
        loader.request(StateCode::GO);
        loader.request(StateCode::SP);
        assert_eq!(loader.generation(), 2);
    }
}
