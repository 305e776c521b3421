//! Raw TMDB payloads → normalized tables.

pub mod credits;
pub mod genre;
pub mod title;

use anyhow::Result;
use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::info;

use crate::database_ops::tables::TableSet;
use crate::database_ops::tmdb::models::{CreditsRecord, MovieDetail, TvDetail};
use crate::database_ops::tmdb::MediaType;
use crate::error::PipelineError;

pub const IMAGE_BASE: &str = "https://image.tmdb.org/t/p/";
pub const POSTER_SIZE: &str = "w500";
pub const BACKDROP_SIZE: &str = "w1280";
pub const PROFILE_SIZE: &str = "w185";

/// Absolute image URL for a TMDB file path, or `None` when there is no path.
pub fn image_url(size: &str, path: Option<&str>) -> Option<String> {
    match path {
        Some(p) if !p.trim().is_empty() => Some(format!("{IMAGE_BASE}{size}{p}")),
        _ => None,
    }
}

/// Raw records loaded for one conversion run.
#[derive(Debug, Clone, Default)]
pub struct RawSources {
    pub movies: Option<Vec<MovieDetail>>,
    pub movie_credits: Option<Vec<CreditsRecord>>,
    pub tv: Option<Vec<TvDetail>>,
    pub tv_credits: Option<Vec<CreditsRecord>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConvertStats {
    pub unnamed_dropped: usize,
    pub future_dropped: usize,
}

/// Builds all five tables except embeddings, which the caller fills in.
pub fn build_tables(sources: RawSources, cutoff: Option<NaiveDate>) -> Result<(TableSet, ConvertStats)> {
    let mut stats = ConvertStats::default();
    let mut titles = Vec::new();
    let mut credits: Vec<(MediaType, CreditsRecord)> = Vec::new();
    let mut have_titles = false;
    let mut have_credits = false;

    if let Some(movies) = sources.movies {
        have_titles = true;
        let total = movies.len();
        titles.extend(movies.into_iter().filter_map(title::normalize_movie));
        stats.unnamed_dropped += total - titles.len();
        if let Some(rows) = sources.movie_credits {
            have_credits = true;
            credits.extend(rows.into_iter().map(|c| (MediaType::Movie, c)));
        }
    }
    if let Some(shows) = sources.tv {
        have_titles = true;
        let before = titles.len();
        let total = shows.len();
        titles.extend(shows.into_iter().filter_map(title::normalize_tv));
        stats.unnamed_dropped += total - (titles.len() - before);
        if let Some(rows) = sources.tv_credits {
            have_credits = true;
            credits.extend(rows.into_iter().map(|c| (MediaType::Tv, c)));
        }
    }

    if !have_titles || !have_credits {
        return Err(PipelineError::NoUsableInput("input files missing".into()).into());
    }

    if let Some(cutoff) = cutoff {
        let (kept, dropped) = title::filter_released(titles, cutoff);
        info!(
            target = "convert",
            dropped,
            %cutoff,
            "filtered titles with release_date after cutoff"
        );
        stats.future_dropped = dropped;
        titles = kept;
    }

    let mut title_rows = Vec::with_capacity(titles.len());
    let mut title_genres_in = Vec::with_capacity(titles.len());
    let mut id_map: HashMap<(i64, MediaType), i64> = HashMap::with_capacity(titles.len());
    for (idx, normalized) in titles.into_iter().enumerate() {
        let id = idx as i64 + 1;
        id_map.entry((normalized.tmdb_id, normalized.media)).or_insert(id);
        let (row, genres) = normalized.into_row(id);
        title_genres_in.push((id, genres));
        title_rows.push(row);
    }

    let genre_tables = genre::explode_genres(&title_genres_in);
    let cast_tables = credits::build_cast(&credits, &id_map);

    Ok((
        TableSet {
            titles: title_rows,
            genres: genre_tables.genres,
            people: cast_tables.people,
            title_genres: genre_tables.title_genres,
            cast_members: cast_tables.cast_members,
        },
        stats,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn movie(v: serde_json::Value) -> MovieDetail {
        serde_json::from_value(v).unwrap()
    }

    fn tv(v: serde_json::Value) -> TvDetail {
        serde_json::from_value(v).unwrap()
    }

    fn credits(v: serde_json::Value) -> CreditsRecord {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn image_urls_join_size_and_path() {
        assert_eq!(
            image_url(POSTER_SIZE, Some("/abc.jpg")).as_deref(),
            Some("https://image.tmdb.org/t/p/w500/abc.jpg")
        );
        assert_eq!(image_url(PROFILE_SIZE, None), None);
    }

    #[test]
    fn ids_are_dense_movies_then_tv() {
        let sources = RawSources {
            movies: Some(vec![
                movie(json!({"id": 11, "title": "Star Wars", "genres": [{"id": 12, "name": "Adventure"}]})),
                movie(json!({"id": 12})),
                movie(json!({"id": 13, "original_title": "Amélie"})),
            ]),
            movie_credits: Some(vec![credits(json!({
                "id": 11,
                "cast": [{"id": 2, "name": "Mark Hamill", "character": "Luke Skywalker", "order": 0}]
            }))]),
            tv: Some(vec![tv(json!({"id": 11, "name": "Other Eleven", "genres": [{"id": 18, "name": "Drama"}]}))]),
            tv_credits: None,
        };

        let (tables, stats) = build_tables(sources, None).unwrap();
        let ids: Vec<(i64, Option<i64>, MediaType)> = tables
            .titles
            .iter()
            .map(|t| (t.id, t.tmdb_id, t.media))
            .collect();
        assert_eq!(
            ids,
            vec![
                (1, Some(11), MediaType::Movie),
                (2, Some(13), MediaType::Movie),
                (3, Some(11), MediaType::Tv),
            ]
        );
        assert_eq!(stats.unnamed_dropped, 1);
        assert_eq!(tables.cast_members.len(), 1);
        assert_eq!(tables.cast_members[0].title_id, 1);
        assert_eq!(tables.genres.iter().map(|g| g.id).collect::<Vec<_>>(), vec![12, 18]);
    }

    #[test]
    fn future_titles_are_filtered_before_ids() {
        let sources = RawSources {
            movies: Some(vec![
                movie(json!({"id": 1, "title": "Soon", "release_date": "2031-01-01"})),
                movie(json!({"id": 2, "title": "Old", "release_date": "1999-03-31"})),
                movie(json!({"id": 3, "title": "Undated", "release_date": ""})),
            ]),
            movie_credits: Some(Vec::new()),
            ..Default::default()
        };
        let cutoff = NaiveDate::from_ymd_opt(2026, 1, 1);
        let (tables, stats) = build_tables(sources, cutoff).unwrap();
        let names: Vec<&str> = tables.titles.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(names, vec!["Old", "Undated"]);
        assert_eq!(tables.titles[1].id, 2);
        assert_eq!(stats.future_dropped, 1);
    }

    #[test]
    fn missing_rating_gets_defaults() {
        let sources = RawSources {
            tv: Some(vec![tv(json!({"id": 5, "name": "Quiet Show"}))]),
            tv_credits: Some(Vec::new()),
            ..Default::default()
        };
        let (tables, _) = build_tables(sources, None).unwrap();
        assert_eq!(tables.titles[0].rating, Some(6.5));
        assert_eq!(tables.titles[0].rating_count, Some(0));
    }

    #[test]
    fn titles_without_credits_are_unusable() {
        let sources = RawSources {
            movies: Some(vec![movie(json!({"id": 1, "title": "Lonely"}))]),
            ..Default::default()
        };
        let err = build_tables(sources, None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::NoUsableInput(_))
        ));
    }
}
