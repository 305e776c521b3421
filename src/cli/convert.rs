use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::database_ops::tables::TableSet;
use crate::database_ops::tmdb::RawFiles;
use crate::embedding::{embed_titles, Embedder, HttpEmbedder, HttpEmbedderConfig, DEFAULT_BATCH_SIZE};
use crate::normalization::{build_tables, RawSources};
use crate::util::env as env_util;
use crate::util::jsonl::read_records;

#[derive(Debug, Clone)]
pub struct ConvertConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Titles released after this day are dropped; `None` means today.
    pub max_release_date: Option<NaiveDate>,
    pub embedder: HttpEmbedderConfig,
    pub batch_size: usize,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("data"),
            max_release_date: None,
            embedder: HttpEmbedderConfig::default(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

pub async fn run(cfg: ConvertConfig) -> Result<TableSet> {
    env_util::preflight_snapshot("convert", &["UMDB_EMBEDDING_URL", "UMDB_EMBEDDING_MODEL", "UMDB_EMBEDDING_API_KEY"]);
    let embedder = HttpEmbedder::new(cfg.embedder.clone())?;
    convert_with(&cfg, &embedder).await
}

/// Conversion against any embedder; `run` wires in the HTTP one.
pub async fn convert_with<E: Embedder + ?Sized>(cfg: &ConvertConfig, embedder: &E) -> Result<TableSet> {
    let sources = load_sources(&RawFiles::in_dir(&cfg.input_dir))?;
    let cutoff = cfg
        .max_release_date
        .unwrap_or_else(|| Local::now().date_naive());

    let (mut tables, stats) = build_tables(sources, Some(cutoff))?;
    info!(
        target = "convert",
        titles = tables.titles.len(),
        unnamed_dropped = stats.unnamed_dropped,
        future_dropped = stats.future_dropped,
        "normalized titles"
    );

    embed_titles(embedder, &mut tables.titles, cfg.batch_size, embedder.dimensions()).await?;

    tables.write_dir(&cfg.output_dir)?;
    info!(
        target = "convert",
        dir = %cfg.output_dir.display(),
        titles = tables.titles.len(),
        genres = tables.genres.len(),
        people = tables.people.len(),
        title_genres = tables.title_genres.len(),
        cast_members = tables.cast_members.len(),
        "wrote tables"
    );
    Ok(tables)
}

/// Title files are read when present; credits only alongside their titles.
pub fn load_sources(files: &RawFiles) -> Result<RawSources> {
    let movies = read_optional(&files.movies)?;
    let movie_credits = if movies.is_some() {
        read_optional(&files.movie_credits)?
    } else {
        None
    };
    let tv = read_optional(&files.tv)?;
    let tv_credits = if tv.is_some() {
        read_optional(&files.tv_credits)?
    } else {
        None
    };
    Ok(RawSources {
        movies,
        movie_credits,
        tv,
        tv_credits,
    })
}

fn read_optional<T: DeserializeOwned>(path: &Path) -> Result<Option<Vec<T>>> {
    if !path.exists() {
        return Ok(None);
    }
    let rows = read_records(path).with_context(|| format!("reading {}", path.display()))?;
    info!(target = "convert", path = %path.display(), rows = rows.len(), "loaded raw records");
    Ok(Some(rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database_ops::tables::{read_table, CsvTable, TitleRow};
    use crate::embedding::{parse_embedding, EMBEDDING_DIM};
    use crate::error::{exit_code_for, PipelineError};
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct ConstEmbedder;

    #[async_trait]
    impl Embedder for ConstEmbedder {
        fn dimensions(&self) -> usize {
            EMBEDDING_DIM
        }

        async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(inputs.iter().map(|_| vec![0.125; EMBEDDING_DIM + 128]).collect())
        }
    }

    fn config(dir: &Path) -> ConvertConfig {
        ConvertConfig {
            input_dir: dir.to_path_buf(),
            output_dir: dir.join("out"),
            max_release_date: NaiveDate::from_ymd_opt(2026, 10, 16),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn converts_movies_without_tv_files() {
        let tmp = TempDir::new().unwrap();
        let files = RawFiles::in_dir(tmp.path());
        std::fs::write(
            &files.movies,
            concat!(
                r#"{"id":603,"title":"The Matrix","overview":"Neo.","release_date":"1999-03-30","popularity":80.0,"genres":[{"id":28,"name":"Action"}]}"#,
                "\n",
                r#"{"id":999,"title":"Later","release_date":"2030-01-01"}"#,
                "\n"
            ),
        )
        .unwrap();
        std::fs::write(
            &files.movie_credits,
            r#"{"id":603,"cast":[{"id":6384,"name":"Keanu Reeves","character":"Neo","order":0,"profile_path":"/k.jpg"}]}"#,
        )
        .unwrap();

        let cfg = config(tmp.path());
        let tables = convert_with(&cfg, &ConstEmbedder).await.unwrap();
        assert_eq!(tables.titles.len(), 1);
        assert_eq!(tables.people.len(), 1);

        let rows: Vec<TitleRow> = read_table(&cfg.output_dir.join(TitleRow::FILE)).unwrap();
        assert_eq!(rows[0].id, 1);
        let raw = rows[0].embedding.as_deref().unwrap();
        assert_eq!(parse_embedding(raw, EMBEDDING_DIM).unwrap().len(), EMBEDDING_DIM);
        assert!(raw.starts_with("[0.12500000,"));
    }

    #[tokio::test]
    async fn credits_without_titles_are_ignored() {
        let tmp = TempDir::new().unwrap();
        let files = RawFiles::in_dir(tmp.path());
        std::fs::write(&files.tv_credits, r#"{"id":1,"cast":[]}"#).unwrap();
        let sources = load_sources(&files).unwrap();
        assert!(sources.tv_credits.is_none());

        let err = convert_with(&config(tmp.path()), &ConstEmbedder).await.unwrap_err();
        assert_eq!(exit_code_for(&err), 2);
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::NoUsableInput(_))
        ));
    }
}
