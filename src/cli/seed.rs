use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::info;

use crate::database_ops::seed::{build_seed, SeedLimits, SeedSummary};
use crate::database_ops::tables::TableSet;

#[derive(Debug, Clone)]
pub struct SeedConfig {
    pub input_dir: PathBuf,
    pub output: PathBuf,
    pub limits: SeedLimits,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("data"),
            output: PathBuf::from("backend/src/main/resources/data.sql"),
            limits: SeedLimits::default(),
        }
    }
}

pub fn run(cfg: SeedConfig) -> Result<SeedSummary> {
    let tables = TableSet::read_dir(&cfg.input_dir)?;
    info!(
        target = "seed",
        titles = tables.titles.len(),
        movie_limit = cfg.limits.movies,
        tv_limit = cfg.limits.tv,
        "loaded tables"
    );

    let seed = build_seed(&tables, cfg.limits);
    if let Some(parent) = cfg.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(&cfg.output, seed.to_seed_sql())
        .with_context(|| format!("failed to write {}", cfg.output.display()))?;

    let summary = seed.summary();
    println!("Wrote {}: {}", cfg.output.display(), summary);
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database_ops::tables::{CastMemberRow, GenreRow, PersonRow, TitleGenreRow, TitleRow};
    use crate::database_ops::tmdb::MediaType;
    use crate::error::exit_code_for;
    use tempfile::TempDir;

    fn tables() -> TableSet {
        let title = |id: i64, media: MediaType, popularity: f64| TitleRow {
            id,
            tmdb_id: Some(id),
            media,
            title: format!("Title {id}"),
            overview: Some("It's fine".into()),
            release_date: None,
            runtime_minutes: None,
            season_count: None,
            rating: None,
            rating_count: None,
            popularity: Some(popularity),
            poster_url: None,
            backdrop_url: None,
            embedding: Some("[0.50000000,0.25000000]".into()),
        };
        TableSet {
            titles: vec![
                title(1, MediaType::Movie, 10.0),
                title(2, MediaType::Movie, 30.0),
                title(3, MediaType::Tv, 5.0),
            ],
            genres: vec![GenreRow { id: 18, name: Some("Drama".into()) }],
            people: vec![PersonRow { id: 7, name: Some("A".into()), profile_url: None }],
            title_genres: vec![TitleGenreRow { title_id: 1, genre_id: 18 }],
            cast_members: vec![CastMemberRow {
                title_id: 1,
                person_id: 7,
                character_name: "Self".into(),
                billing_order: None,
            }],
        }
    }

    #[test]
    fn writes_bounded_idempotent_script() {
        let tmp = TempDir::new().unwrap();
        tables().write_dir(tmp.path()).unwrap();
        let cfg = SeedConfig {
            input_dir: tmp.path().to_path_buf(),
            output: tmp.path().join("nested/dir/data.sql"),
            limits: SeedLimits { movies: 1, tv: 5 },
        };
        let summary = run(cfg.clone()).unwrap();
        assert_eq!(summary.titles, 2);
        // title 1 is not in the top movie, so its genre and cast go too
        assert_eq!(summary.genres, 0);
        assert_eq!(summary.people, 0);

        let sql = std::fs::read_to_string(&cfg.output).unwrap();
        assert!(sql.contains("'It''s fine'"));
        assert!(sql.contains("'[0.50000000,0.25000000]'::vector"));
        assert!(sql.contains("-- genres: no rows"));
        assert_eq!(
            sql.matches("INSERT INTO").count(),
            sql.matches("ON CONFLICT DO NOTHING;").count()
        );
    }

    #[test]
    fn missing_csv_exits_with_two() {
        let tmp = TempDir::new().unwrap();
        let cfg = SeedConfig {
            input_dir: tmp.path().to_path_buf(),
            output: tmp.path().join("data.sql"),
            ..Default::default()
        };
        assert_eq!(exit_code_for(&run(cfg).unwrap_err()), 2);
    }
}
