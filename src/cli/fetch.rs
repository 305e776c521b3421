use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

use crate::database_ops::tmdb::client::{TmdbClient, TmdbClientConfig, DEFAULT_API_BASE};
use crate::database_ops::tmdb::fetch::{load_top_ids, run_plan, FetchPlan, FetchSummary};
use crate::database_ops::tmdb::RawFiles;
use crate::util::env as env_util;

pub const DEFAULT_MOVIE_LIMIT: usize = 100_000;
pub const DEFAULT_TV_LIMIT: usize = 20_000;
pub const DEFAULT_DELAY_SECS: f64 = 0.20;

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub movie_ids: PathBuf,
    pub tv_ids: PathBuf,
    pub movie_limit: usize,
    pub tv_limit: usize,
    pub output_dir: PathBuf,
    /// Seconds to wait after each processed id.
    pub delay_secs: f64,
    pub overwrite: bool,
    /// Falls back to `TMDB_API_KEY`.
    pub api_key: Option<String>,
    pub api_base: String,
    pub timeout: Duration,
}

impl FetchConfig {
    pub fn new(movie_ids: PathBuf, tv_ids: PathBuf) -> Self {
        Self {
            movie_ids,
            tv_ids,
            movie_limit: DEFAULT_MOVIE_LIMIT,
            tv_limit: DEFAULT_TV_LIMIT,
            output_dir: PathBuf::from("data"),
            delay_secs: DEFAULT_DELAY_SECS,
            overwrite: false,
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

pub async fn run(cfg: FetchConfig) -> Result<Vec<FetchSummary>> {
    env_util::preflight_snapshot("fetch", &["TMDB_API_KEY", "UMDB_OUTPUT_DIR"]);

    // credentials and id files are checked before anything touches the network
    let api_key = match cfg.api_key.clone().filter(|k| !k.trim().is_empty()) {
        Some(key) => key,
        None => env_util::env_req("TMDB_API_KEY")?,
    };
    let movie_ids = load_top_ids(&cfg.movie_ids, cfg.movie_limit)?;
    let tv_ids = load_top_ids(&cfg.tv_ids, cfg.tv_limit)?;
    info!(
        target = "fetch",
        movies = movie_ids.len(),
        tv = tv_ids.len(),
        "loaded top ids"
    );

    std::fs::create_dir_all(&cfg.output_dir)
        .with_context(|| format!("failed to create {}", cfg.output_dir.display()))?;
    let files = RawFiles::in_dir(&cfg.output_dir);
    if cfg.overwrite {
        for path in files.all() {
            if path.exists() {
                std::fs::remove_file(path)
                    .with_context(|| format!("failed to remove {}", path.display()))?;
                warn!(target = "fetch", path = %path.display(), "removed existing output");
            }
        }
    }

    let client = TmdbClient::new(TmdbClientConfig {
        base_url: cfg.api_base.clone(),
        timeout: cfg.timeout,
        ..TmdbClientConfig::new(api_key)
    })?;

    let plan = FetchPlan {
        movie_ids,
        tv_ids,
        files,
        delay: Duration::from_secs_f64(cfg.delay_secs.max(0.0)),
    };
    let summaries = run_plan(&client, &plan).await?;
    for s in &summaries {
        info!(
            target = "fetch",
            media = %s.media,
            requested = s.requested,
            skipped = s.skipped,
            fetched = s.fetched,
            failures = s.failures,
            aborted = s.aborted,
            "done"
        );
    }
    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{exit_code_for, PipelineError};
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_id_file_fails_before_any_request() {
        let tmp = TempDir::new().unwrap();
        let mut cfg = FetchConfig::new(tmp.path().join("nope.json"), tmp.path().join("tv.json"));
        cfg.api_key = Some("token".into());
        cfg.output_dir = tmp.path().join("out");
        let err = run(cfg).await.unwrap_err();
        assert_eq!(exit_code_for(&err), 2);
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::MissingInput(_))
        ));
        assert!(!tmp.path().join("out").exists());
    }
}
