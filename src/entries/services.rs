use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use time::{Duration as TimeDuration, OffsetDateTime, Time};
use tracing::{error, info, instrument, warn};

use super::repo_types::ResolvedFoodEntry;
use crate::classifier::{ClassificationResult, ClassifyError, ImagePayload};
use crate::error::AppError;
use crate::nutrition::Resolution;
use crate::state::AppState;
use crate::summary::aggregate::{daily_totals, goal_met, local_day, DailyTotals};

/// Orders concurrent submissions.
///
/// A result is stale once a newer submission has been written or is still in
/// flight. A submission that fails drops its ticket and never makes an older
/// one stale.
#[derive(Debug, Default)]
pub struct SubmissionGate {
    inner: Mutex<GateState>,
}

#[derive(Debug, Default)]
struct GateState {
    next: u64,
    pending: BTreeSet<u64>,
    committed: u64,
}

/// Place in line for one submission. Dropping it without committing withdraws it.
#[derive(Debug)]
pub struct Ticket<'a> {
    gate: &'a SubmissionGate,
    id: u64,
    done: bool,
}

impl SubmissionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> Ticket<'_> {
        let mut s = self.lock();
        s.next += 1;
        let id = s.next;
        s.pending.insert(id);
        Ticket {
            gate: self,
            id,
            done: false,
        }
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Ticket<'_> {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Claim the right to write. False when a newer submission already wrote
    /// or is still running.
    pub fn commit(mut self) -> bool {
        let gate = self.gate;
        let mut s = gate.lock();
        s.pending.remove(&self.id);
        self.done = true;

        let current = s.committed < self.id && s.pending.range(self.id + 1..).next().is_none();
        if current {
            s.committed = self.id;
        }
        current
    }
}

impl Drop for Ticket<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.gate.lock().pending.remove(&self.id);
        }
    }
}

pub struct Analysis {
    pub classification: ClassificationResult,
    pub resolution: Resolution,
}

pub struct Submission {
    pub entry: ResolvedFoodEntry,
    pub totals: DailyTotals,
    pub goal_met: bool,
}

fn decode(raw_image: Option<&str>) -> Result<ImagePayload, ClassifyError> {
    let raw_image =
        raw_image.ok_or_else(|| ClassifyError::InvalidInput("No image provided".into()))?;
    ImagePayload::from_transport(raw_image)
}

/// Decode, classify under the configured timeout, then resolve.
#[instrument(skip(state, raw_image))]
pub async fn analyze(state: &AppState, raw_image: Option<&str>) -> Result<Analysis, AppError> {
    let image = decode(raw_image)?;
    analyze_image(state, &image).await
}

async fn analyze_image(state: &AppState, image: &ImagePayload) -> Result<Analysis, AppError> {
    let timeout = state.config.classifier.timeout;
    let classification = match tokio::time::timeout(timeout, state.classifier.classify(image)).await
    {
        Ok(Ok(c)) => c,
        Ok(Err(e)) => {
            error!(error = %e, classifier = state.classifier.name(), "classification failed");
            return Err(e.into());
        }
        Err(_) => {
            warn!(?timeout, classifier = state.classifier.name(), "classification timed out");
            return Err(ClassifyError::Timeout(timeout).into());
        }
    };
    info!(
        label = %classification.label,
        confidence = classification.confidence,
        "image classified"
    );

    let resolution = state
        .resolver
        .resolve_scored(&classification.label, classification.confidence);
    Ok(Analysis {
        classification,
        resolution,
    })
}

/// Full submission: analyze, then append to the entry log unless a newer
/// submission overtook this one. Rejected payloads never take a ticket.
#[instrument(skip(state, raw_image))]
pub async fn submit(state: &AppState, raw_image: Option<&str>) -> Result<Submission, AppError> {
    let image = decode(raw_image)?;
    let ticket = state.gate.begin();
    let ticket_id = ticket.id();
    let analysis = analyze_image(state, &image).await?;

    if !ticket.commit() {
        warn!(
            ticket = ticket_id,
            label = %analysis.classification.label,
            "dropping superseded result"
        );
        return Err(AppError::Superseded);
    }

    let entry = ResolvedFoodEntry::from_resolution(
        analysis.classification.label,
        &analysis.resolution,
        OffsetDateTime::now_utc(),
    );
    state.store.append(entry.clone()).await.map_err(|e| {
        error!(error = %e, "append entry failed");
        AppError::from(e)
    })?;

    let offset = state.config.utc_offset;
    let entries = state.store.list().await?;
    let goal = state.store.goal().await?;
    let totals = daily_totals(&entries, local_day(entry.timestamp, offset), offset);
    let goal_met = goal_met(&totals, &goal);

    info!(id = %entry.id, source = ?entry.source, calories = entry.calories, goal_met, "food tracked");
    Ok(Submission {
        entry,
        totals,
        goal_met,
    })
}

/// Start of the oldest local day still inside the retention window.
pub fn retention_cutoff(now: OffsetDateTime, offset: time::UtcOffset, days: u32) -> OffsetDateTime {
    let today = local_day(now, offset);
    let first_kept = today - TimeDuration::days(i64::from(days.saturating_sub(1)));
    first_kept.with_time(Time::MIDNIGHT).assume_offset(offset)
}

pub async fn prune_expired(state: &AppState) -> Result<usize, AppError> {
    let days = state.config.retention_days;
    if days == 0 {
        return Ok(0);
    }
    let cutoff = retention_cutoff(OffsetDateTime::now_utc(), state.config.utc_offset, days);
    let removed = state.store.prune_before(cutoff).await?;
    if removed > 0 {
        info!(removed, %cutoff, "expired entries pruned");
    }
    Ok(removed)
}

/// Periodically drop entries that fell out of the retention window.
pub fn spawn_retention_sweeper(state: AppState) -> Option<tokio::task::JoinHandle<()>> {
    if state.config.retention_days == 0 {
        info!("retention disabled");
        return None;
    }
    let period = state.config.prune_interval;
    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            if let Err(e) = prune_expired(&state).await {
                error!(error = %e, "retention sweep failed");
            }
        }
    }))
}
