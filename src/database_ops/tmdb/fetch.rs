//! Resumable, throttled download of TMDB detail + credits records.
//!
//! Progress lives in the output files themselves: every successful response
//! is appended and flushed immediately, and the next run rescans the files to
//! rebuild the per-kind done-sets. Killing the process at any point is safe.

use anyhow::{Context, Result};
use itertools::Itertools;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

use super::client::TmdbApi;
use super::models::{IdExportRecord, IdOnly};
use super::{MediaType, RawFiles, RecordKind};
use crate::error::PipelineError;
use crate::util::jsonl::{read_records, JsonlAppender};

/// A run stops once this many requests have failed.
pub const MAX_FAILURES: usize = 100;
const PROGRESS_EVERY: usize = 500;

/// Per-media outcome of a fetch pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSummary {
    pub media: MediaType,
    /// Ids handed to the pass.
    pub requested: usize,
    /// Ids already complete in both output files.
    pub skipped: usize,
    /// Ids that needed at least one request.
    pub fetched: usize,
    pub failures: usize,
    /// True when the pass stopped at [`MAX_FAILURES`].
    pub aborted: bool,
}

impl FetchSummary {
    fn new(media: MediaType, requested: usize) -> Self {
        Self {
            media,
            requested,
            skipped: 0,
            fetched: 0,
            failures: 0,
            aborted: false,
        }
    }
}

/// Top `limit` ids of a daily id export, most popular first.
///
/// Null popularity ranks as 0.0; ties keep file order.
pub fn load_top_ids(path: &Path, limit: usize) -> Result<Vec<i64>> {
    if !path.exists() {
        return Err(PipelineError::MissingInput(path.to_path_buf()).into());
    }
    let records: Vec<IdExportRecord> =
        read_records(path).with_context(|| format!("reading id export {}", path.display()))?;
    Ok(records
        .into_iter()
        .sorted_by(|a, b| {
            b.popularity
                .unwrap_or(0.0)
                .total_cmp(&a.popularity.unwrap_or(0.0))
        })
        .take(limit)
        .map(|r| r.id)
        .collect())
}

/// Ids already recorded in an output file; empty when the file is absent.
pub fn load_existing_ids(path: &Path) -> Result<HashSet<i64>> {
    if !path.exists() {
        return Ok(HashSet::new());
    }
    let rows: Vec<IdOnly> = read_records(path)?;
    Ok(rows.into_iter().map(|r| r.id).collect())
}

/// Downloads every id of one media type that is not already complete.
pub async fn fetch_media<A>(
    api: &A,
    media: MediaType,
    ids: &[i64],
    title_path: &Path,
    credits_path: &Path,
    delay: Duration,
) -> Result<FetchSummary>
where
    A: TmdbApi + ?Sized,
{
    let mut summary = FetchSummary::new(media, ids.len());
    let mut title_done = load_existing_ids(title_path)?;
    let mut credits_done = load_existing_ids(credits_path)?;
    info!(
        target = "fetch",
        %media,
        targets = ids.len(),
        titles_on_disk = title_done.len(),
        credits_on_disk = credits_done.len(),
        "resuming from existing output"
    );

    let mut title_out = JsonlAppender::open(title_path)?;
    let mut credits_out = JsonlAppender::open(credits_path)?;

    for &id in ids {
        if title_done.contains(&id) && credits_done.contains(&id) {
            summary.skipped += 1;
            continue;
        }

        summary.fetched += 1;
        if summary.fetched % PROGRESS_EVERY == 0 {
            info!(target = "fetch", %media, fetched = summary.fetched, "progress");
        }

        if !title_done.contains(&id) {
            fetch_one(
                api,
                media,
                RecordKind::Title,
                id,
                &mut title_out,
                &mut title_done,
                &mut summary,
            )
            .await?;
        }
        if !credits_done.contains(&id) {
            fetch_one(
                api,
                media,
                RecordKind::Credits,
                id,
                &mut credits_out,
                &mut credits_done,
                &mut summary,
            )
            .await?;
        }

        if summary.failures >= MAX_FAILURES {
            error!(target = "fetch", %media, failures = summary.failures, "too many errors, stopping");
            summary.aborted = true;
            break;
        }

        if !delay.is_zero() {
            sleep(delay).await;
        }
    }

    Ok(summary)
}

/// Network failures are counted and swallowed; local write failures are not.
async fn fetch_one<A>(
    api: &A,
    media: MediaType,
    kind: RecordKind,
    id: i64,
    out: &mut JsonlAppender,
    done: &mut HashSet<i64>,
    summary: &mut FetchSummary,
) -> Result<()>
where
    A: TmdbApi + ?Sized,
{
    match api.fetch(media, kind, id).await {
        Ok(record) => {
            out.append(&record)?;
            done.insert(id);
        }
        Err(err) => {
            summary.failures += 1;
            warn!(
                target = "fetch",
                endpoint = %kind.endpoint(media, id),
                error = %err,
                "request failed"
            );
        }
    }
    Ok(())
}

/// Fetch plan for a full run.
#[derive(Debug, Clone)]
pub struct FetchPlan {
    pub movie_ids: Vec<i64>,
    pub tv_ids: Vec<i64>,
    pub files: RawFiles,
    pub delay: Duration,
}

/// Movies first, then TV. A pass that hits the failure threshold ends the
/// whole run; whatever was written stays on disk for the next attempt.
///
/// Always returns one summary per media type. A pass skipped because an
/// earlier one aborted is reported with zero work and `aborted` set.
pub async fn run_plan<A>(api: &A, plan: &FetchPlan) -> Result<Vec<FetchSummary>>
where
    A: TmdbApi + ?Sized,
{
    let mut summaries = Vec::with_capacity(2);
    let mut stopped = false;
    for (media, ids) in [
        (MediaType::Movie, &plan.movie_ids),
        (MediaType::Tv, &plan.tv_ids),
    ] {
        if stopped {
            summaries.push(FetchSummary {
                aborted: true,
                ..FetchSummary::new(media, ids.len())
            });
            continue;
        }
        info!(target = "fetch", %media, "fetching");
        let (title_path, credits_path) = plan.files.pair(media);
        let summary = fetch_media(api, media, ids, title_path, credits_path, plan.delay).await?;
        if summary.aborted {
            warn!(target = "fetch", %media, "run aborted; remaining media types skipped");
            stopped = true;
        }
        summaries.push(summary);
    }

    let failures_of = |media: MediaType| {
        summaries
            .iter()
            .filter(|s| s.media == media)
            .map(|s| s.failures)
            .sum::<usize>()
    };
    info!(
        target = "fetch",
        movie_failures = failures_of(MediaType::Movie),
        tv_failures = failures_of(MediaType::Tv),
        "fetch finished"
    );
    Ok(summaries)
}
