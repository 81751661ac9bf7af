//! Scan/upload pipeline
//!
//! Runs one directory through the full workflow:
//!
//! - **Walking**: a blocking task walks the tree and pushes recognised paths
//!   onto the `paths` queue as it finds them
//! - **Draining**: the walk is over; the `paths` backlog is polled for
//!   progress reporting until it empties
//! - **Joining**: waits for the analysis threads, then for the upload task to
//!   work off the remaining results
//!
//! Analysis threads each own their engine sessions and never share state. An
//! analysis thread exits once it has waited `idle_timeout` for a path, or the
//! walk has finished and the queue is empty. The upload task is the only user
//! of the [`WavePlotClient`]; it uploads then links one result at a time and
//! exits when every analysis thread has dropped its `results` sender.
//!
//! Cancellation is cooperative: the token is checked between files and
//! between decode blocks, so every engine session is dropped normally.
//!
//! # Example
//! ```rust,ignore
//! let pipeline = Pipeline::new(PipelineConfig::default());
//! let stats = pipeline.run(root, engine, client, CancellationToken::new()).await?;
//! ```

use crate::engine::WaveformEngine;
use crate::error::AnalysisError;
use crate::models::{Metadata, WavePlotRecord};
use crate::services::{
    FileScanner, MetadataExtractor, ScanError, UploadOutcome, WaveformAnalyzer, WavePlotClient,
};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use waveplot_common::config::{
    DEFAULT_ANALYSIS_WORKERS, DEFAULT_EXTENSIONS, DEFAULT_IDLE_TIMEOUT_SECS,
    DEFAULT_RESULT_CAPACITY,
};

/// Longest a waiting analysis thread goes without looking at the cancel token
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Number of analysis threads
    pub workers: usize,
    /// How long a worker waits on an empty queue before exiting
    pub idle_timeout: Duration,
    /// Bound of the `results` queue
    pub result_capacity: usize,
    /// Recognised file extensions, with leading dot
    pub extensions: Vec<String>,
    /// Interval between progress reports while draining
    pub progress_interval: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_ANALYSIS_WORKERS,
            idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
            result_capacity: DEFAULT_RESULT_CAPACITY,
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            progress_interval: Duration::from_secs(1),
        }
    }
}

/// Pipeline lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Walking,
    Draining,
    Joining,
    Done,
    Cancelled,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Cancelled)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Idle => "idle",
            PipelineState::Walking => "walking",
            PipelineState::Draining => "draining",
            PipelineState::Joining => "joining",
            PipelineState::Done => "done",
            PipelineState::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Progress events for the CLI
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    StateChanged(PipelineState),
    /// Coarse progress from the `paths` backlog; advisory only
    Progress { processed: usize, total: usize },
    Uploaded { uuid: String, duplicate: bool },
}

/// One analyzed file on its way to the upload task
#[derive(Debug, Clone)]
pub struct AnalyzedFile {
    pub path: PathBuf,
    pub record: WavePlotRecord,
    pub metadata: Metadata,
}

/// Counts for a whole run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub files_queued: usize,
    pub files_analyzed: usize,
    /// Queued paths that were no longer regular files
    pub files_skipped: usize,
    pub analysis_failures: usize,
    /// Queued paths no worker picked up (idle exit or cancellation)
    pub files_abandoned: usize,
    pub uploaded: usize,
    pub duplicates: usize,
    pub upload_failures: usize,
    pub links: usize,
    pub link_failures: usize,
    pub walk_errors: usize,
}

impl fmt::Display for PipelineStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Files queued:      {}", self.files_queued)?;
        writeln!(f, "Files analyzed:    {}", self.files_analyzed)?;
        writeln!(f, "Files skipped:     {}", self.files_skipped)?;
        writeln!(f, "Analysis failures: {}", self.analysis_failures)?;
        writeln!(f, "Files abandoned:   {}", self.files_abandoned)?;
        writeln!(f, "Uploaded:          {}", self.uploaded)?;
        writeln!(f, "Duplicates:        {}", self.duplicates)?;
        writeln!(f, "Upload failures:   {}", self.upload_failures)?;
        writeln!(f, "Links:             {}", self.links)?;
        write!(f, "Link failures:     {}", self.link_failures)
    }
}

/// Pipeline-level failures (per-file failures are only counted)
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("Failed to spawn analysis worker: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Pipeline task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Invalid pipeline configuration: {0}")]
    InvalidConfig(String),
}

/// What one analysis thread did
#[derive(Debug, Default)]
struct AnalysisReport {
    analyzed: usize,
    skipped: usize,
    failed: usize,
}

/// What the upload task did
#[derive(Debug, Default)]
struct UploadReport {
    uploaded: usize,
    duplicates: usize,
    upload_failures: usize,
    links: usize,
    link_failures: usize,
}

/// Scan/upload pipeline
pub struct Pipeline {
    config: PipelineConfig,
    event_tx: Option<mpsc::Sender<PipelineEvent>>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            event_tx: None,
        }
    }

    /// Create pipeline with event channel for progress reporting
    pub fn with_events(config: PipelineConfig, event_tx: mpsc::Sender<PipelineEvent>) -> Self {
        Self {
            config,
            event_tx: Some(event_tx),
        }
    }

    /// Walk `root`, analyze every recognised file and upload the results
    pub async fn run(
        &self,
        root: &Path,
        engine: Arc<dyn WaveformEngine>,
        client: WavePlotClient,
        cancel: CancellationToken,
    ) -> Result<PipelineStats, PipelineError> {
        if self.config.workers == 0 {
            return Err(PipelineError::InvalidConfig(
                "at least one analysis worker is required".to_string(),
            ));
        }
        if !root.exists() {
            return Err(ScanError::PathNotFound(root.to_path_buf()).into());
        }
        if !root.is_dir() {
            return Err(ScanError::NotADirectory(root.to_path_buf()).into());
        }

        info!(
            root = %root.display(),
            workers = self.config.workers,
            "Starting scan"
        );

        let (paths_tx, paths_rx) = crossbeam_channel::unbounded::<PathBuf>();
        let (results_tx, results_rx) = mpsc::channel(self.config.result_capacity.max(1));

        let upload = tokio::spawn(upload_worker(
            client,
            results_rx,
            self.config.idle_timeout,
            cancel.clone(),
            self.event_tx.clone(),
        ));

        let analyzer = WaveformAnalyzer::new(engine);
        let mut workers = Vec::with_capacity(self.config.workers);
        for id in 0..self.config.workers {
            let analyzer = analyzer.clone();
            let paths = paths_rx.clone();
            let results = results_tx.clone();
            let worker_cancel = cancel.clone();
            let idle_timeout = self.config.idle_timeout;

            let handle = thread::Builder::new()
                .name(format!("analysis-{}", id))
                .spawn(move || {
                    analysis_worker(id, analyzer, paths, results, idle_timeout, worker_cancel)
                });

            match handle {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    // Already-running workers see the cancel and exit
                    cancel.cancel();
                    return Err(e.into());
                }
            }
        }
        // Upload task ends once every worker's sender is gone
        drop(results_tx);

        // Walking
        self.transition(PipelineState::Walking).await;
        let scanner = FileScanner::with_extensions(self.config.extensions.clone());
        let walk_root = root.to_path_buf();
        let walk_cancel = cancel.clone();
        let summary = tokio::task::spawn_blocking(move || {
            scanner.walk(&walk_root, |path| {
                !walk_cancel.is_cancelled() && paths_tx.send(path).is_ok()
            })
        })
        .await??;

        let total = summary.files_queued;
        info!(files = total, "Walk complete");

        // Draining
        if !cancel.is_cancelled() {
            self.transition(PipelineState::Draining).await;
            self.drain(&paths_rx, &workers, total, &cancel).await;
        }

        // Joining
        if !cancel.is_cancelled() {
            self.transition(PipelineState::Joining).await;
        }
        let reports = tokio::task::spawn_blocking(move || {
            workers
                .into_iter()
                .filter_map(|handle| match handle.join() {
                    Ok(report) => Some(report),
                    Err(_) => {
                        error!("Analysis worker panicked");
                        None
                    }
                })
                .collect::<Vec<_>>()
        })
        .await?;
        let upload_report = upload.await?;

        let mut stats = PipelineStats {
            files_queued: total,
            files_abandoned: paths_rx.try_iter().count(),
            walk_errors: summary.entry_errors,
            uploaded: upload_report.uploaded,
            duplicates: upload_report.duplicates,
            upload_failures: upload_report.upload_failures,
            links: upload_report.links,
            link_failures: upload_report.link_failures,
            ..Default::default()
        };
        for report in reports {
            stats.files_analyzed += report.analyzed;
            stats.files_skipped += report.skipped;
            stats.analysis_failures += report.failed;
        }

        if stats.files_abandoned > 0 {
            warn!(files = stats.files_abandoned, "Files left unanalyzed");
        }

        let final_state = if cancel.is_cancelled() {
            PipelineState::Cancelled
        } else {
            PipelineState::Done
        };
        self.transition(final_state).await;

        Ok(stats)
    }

    /// Report progress until the backlog is empty or no worker is left
    async fn drain(
        &self,
        paths: &Receiver<PathBuf>,
        workers: &[thread::JoinHandle<AnalysisReport>],
        total: usize,
        cancel: &CancellationToken,
    ) {
        let mut ticker = tokio::time::interval(self.config.progress_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // First tick is immediate
        ticker.tick().await;

        loop {
            let remaining = paths.len();
            self.emit_event(PipelineEvent::Progress {
                processed: total.saturating_sub(remaining),
                total,
            })
            .await;

            if remaining == 0 || workers.iter().all(|w| w.is_finished()) {
                return;
            }

            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = ticker.tick() => {}
            }
        }
    }

    async fn transition(&self, state: PipelineState) {
        info!(state = %state, "Pipeline state");
        self.emit_event(PipelineEvent::StateChanged(state)).await;
    }

    async fn emit_event(&self, event: PipelineEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event).await;
        }
    }
}

/// Wait up to `idle_timeout` for the next path
///
/// `None` when idle, when the walk is over and the queue is empty, or when
/// cancelled.
fn next_path(
    paths: &Receiver<PathBuf>,
    idle_timeout: Duration,
    cancel: &CancellationToken,
) -> Option<PathBuf> {
    let deadline = Instant::now() + idle_timeout;

    loop {
        if cancel.is_cancelled() {
            return None;
        }

        let now = Instant::now();
        if now >= deadline {
            return None;
        }

        match paths.recv_timeout((deadline - now).min(CANCEL_POLL_INTERVAL)) {
            Ok(path) => return Some(path),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => return None,
        }
    }
}

fn analysis_worker(
    id: usize,
    analyzer: WaveformAnalyzer,
    paths: Receiver<PathBuf>,
    results: mpsc::Sender<AnalyzedFile>,
    idle_timeout: Duration,
    cancel: CancellationToken,
) -> AnalysisReport {
    let extractor = MetadataExtractor::new();
    let mut report = AnalysisReport::default();

    debug!(worker = id, "Analysis worker started");

    while let Some(path) = next_path(&paths, idle_timeout, &cancel) {
        match analyzer.analyze_cancellable(&path, &cancel) {
            Ok(Some(record)) => {
                report.analyzed += 1;
                let metadata = extractor.extract_or_default(&path);
                debug!(worker = id, file = %path.display(), "Analyzed");

                let item = AnalyzedFile {
                    path,
                    record,
                    metadata,
                };
                if results.blocking_send(item).is_err() {
                    warn!(worker = id, "Upload worker gone, stopping");
                    break;
                }
            }
            Ok(None) => report.skipped += 1,
            Err(AnalysisError::Cancelled) => {
                debug!(worker = id, file = %path.display(), "Analysis cancelled");
                break;
            }
            Err(e) => {
                warn!(worker = id, file = %path.display(), "Analysis failed: {}", e);
                report.failed += 1;
            }
        }
    }

    debug!(
        worker = id,
        analyzed = report.analyzed,
        failed = report.failed,
        "Analysis worker finished"
    );

    report
}

async fn upload_worker(
    client: WavePlotClient,
    mut results: mpsc::Receiver<AnalyzedFile>,
    idle_timeout: Duration,
    cancel: CancellationToken,
    event_tx: Option<mpsc::Sender<PipelineEvent>>,
) -> UploadReport {
    let mut report = UploadReport::default();

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = tokio::time::timeout(idle_timeout, results.recv()) => next,
        };

        let AnalyzedFile {
            path,
            mut record,
            metadata,
        } = match next {
            Ok(Some(item)) => item,
            Ok(None) => break,
            Err(_) => {
                debug!("Upload worker idle");
                continue;
            }
        };

        match client.upload(&mut record).await {
            Ok(outcome) => {
                let duplicate = matches!(outcome, UploadOutcome::Duplicate(_));
                if duplicate {
                    report.duplicates += 1;
                } else {
                    report.uploaded += 1;
                }
                if let Some(tx) = &event_tx {
                    let _ = tx
                        .send(PipelineEvent::Uploaded {
                            uuid: outcome.uuid().to_string(),
                            duplicate,
                        })
                        .await;
                }
            }
            Err(e) => {
                warn!(file = %path.display(), "Upload failed: {}", e);
                report.upload_failures += 1;
            }
        }

        match client.link(&record, &metadata).await {
            Ok(()) => report.links += 1,
            Err(e) => {
                warn!(file = %path.display(), "Link failed: {}", e);
                report.link_failures += 1;
            }
        }
    }

    debug!(
        uploaded = report.uploaded,
        duplicates = report.duplicates,
        "Upload worker finished"
    );

    report
}
