// Progress and ETA estimation
//
// Maps pipeline position onto a fixed percent scale and derives the time
// remaining from the observed average per-chunk duration. The job store
// clamps updates, so percent observed by pollers never decreases within a
// run even if an estimate were to wobble.

use std::time::Instant;

/// Pipeline stage with its fixed percent band
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// 0-10%: decode, normalize, chunk
    Preprocessing,
    /// 10-20%: model/engine loading
    WarmUp,
    /// 20-80%: per-chunk processing, linear in completed chunks
    Chunks,
    /// 80-100%: transcript assembly and summarization
    Finalizing,
}

impl Stage {
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Preprocessing => "preprocessing",
            Stage::WarmUp => "warming up",
            Stage::Chunks => "transcribing",
            Stage::Finalizing => "finalizing",
        }
    }

    /// Percent at which the stage begins
    pub fn base_percent(&self) -> u32 {
        match self {
            Stage::Preprocessing => 0,
            Stage::WarmUp => 10,
            Stage::Chunks => 20,
            Stage::Finalizing => 80,
        }
    }
}

/// Progress snapshot pushed into the job store after every state change
#[derive(Debug, Clone)]
pub struct ProgressSnapshot {
    pub stage: Stage,
    pub percent: u32,
    pub current_chunk: u32,
    pub total_chunks: u32,
    pub eta_seconds: Option<u64>,
}

/// Tracks chunk completion for one job run
pub struct ProgressEstimator {
    total_chunks: u32,
    completed_chunks: u32,
    chunk_phase_started: Option<Instant>,
}

impl ProgressEstimator {
    pub fn new() -> Self {
        Self {
            total_chunks: 0,
            completed_chunks: 0,
            chunk_phase_started: None,
        }
    }

    /// Snapshot for a stage outside the chunk band
    pub fn stage_snapshot(&self, stage: Stage) -> ProgressSnapshot {
        ProgressSnapshot {
            stage,
            percent: stage.base_percent(),
            current_chunk: self.completed_chunks,
            total_chunks: self.total_chunks,
            eta_seconds: None,
        }
    }

    /// Enter the chunk-processing band. Starts the clock the ETA is
    /// derived from.
    pub fn begin_chunks(&mut self, total_chunks: u32) {
        self.total_chunks = total_chunks;
        self.completed_chunks = 0;
        self.chunk_phase_started = Some(Instant::now());
    }

    /// Record one finished chunk and produce the updated snapshot
    pub fn chunk_done(&mut self) -> ProgressSnapshot {
        self.completed_chunks += 1;

        let elapsed = self
            .chunk_phase_started
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0);

        ProgressSnapshot {
            stage: Stage::Chunks,
            percent: chunk_percent(self.completed_chunks, self.total_chunks),
            current_chunk: self.completed_chunks,
            total_chunks: self.total_chunks,
            eta_seconds: eta_seconds(elapsed, self.completed_chunks, self.total_chunks),
        }
    }
}

impl Default for ProgressEstimator {
    fn default() -> Self {
        Self::new()
    }
}

/// Linear interpolation of the 20-80% chunk band
fn chunk_percent(completed: u32, total: u32) -> u32 {
    if total == 0 {
        return Stage::Finalizing.base_percent();
    }
    let span = (Stage::Finalizing.base_percent() - Stage::Chunks.base_percent()) as f64;
    Stage::Chunks.base_percent() + (span * completed as f64 / total as f64) as u32
}

/// ETA = average observed chunk duration * chunks remaining
fn eta_seconds(elapsed_secs: f64, completed: u32, total: u32) -> Option<u64> {
    if completed == 0 || total < completed {
        return None;
    }
    let per_chunk = elapsed_secs / completed as f64;
    let remaining = (total - completed) as f64;
    Some((per_chunk * remaining).round() as u64)
}
