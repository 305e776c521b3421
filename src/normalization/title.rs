use chrono::NaiveDate;
use tracing::warn;

use super::{image_url, BACKDROP_SIZE, POSTER_SIZE};
use crate::database_ops::tables::{TitleRow, DEFAULT_RATING, DEFAULT_RATING_COUNT};
use crate::database_ops::tmdb::models::{GenreEntry, MovieDetail, TvDetail};
use crate::database_ops::tmdb::MediaType;

/// A movie or TV record in the unified schema, before id assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTitle {
    pub tmdb_id: i64,
    pub media: MediaType,
    pub title: String,
    pub overview: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub runtime_minutes: Option<i64>,
    pub season_count: Option<i64>,
    pub rating: f64,
    pub rating_count: i64,
    pub popularity: f64,
    pub poster_url: Option<String>,
    pub backdrop_url: Option<String>,
    pub genres: Vec<GenreEntry>,
}

impl NormalizedTitle {
    pub fn into_row(self, id: i64) -> (TitleRow, Vec<GenreEntry>) {
        let row = TitleRow {
            id,
            tmdb_id: Some(self.tmdb_id),
            media: self.media,
            title: self.title,
            overview: self.overview,
            release_date: self.release_date,
            runtime_minutes: self.runtime_minutes,
            season_count: self.season_count,
            rating: Some(self.rating),
            rating_count: Some(self.rating_count),
            popularity: Some(self.popularity),
            poster_url: self.poster_url,
            backdrop_url: self.backdrop_url,
            embedding: None,
        };
        (row, self.genres)
    }
}

/// `None` when neither `title` nor `original_title` is present.
pub fn normalize_movie(raw: MovieDetail) -> Option<NormalizedTitle> {
    let title = coalesce_name(raw.title, raw.original_title)?;
    Some(NormalizedTitle {
        tmdb_id: raw.id,
        media: MediaType::Movie,
        release_date: parse_release_date(raw.id, raw.release_date.as_deref()),
        title,
        overview: raw.overview,
        runtime_minutes: raw.runtime,
        season_count: None,
        rating: raw.vote_average.unwrap_or(DEFAULT_RATING),
        rating_count: raw.vote_count.unwrap_or(DEFAULT_RATING_COUNT),
        popularity: raw.popularity.unwrap_or(0.0),
        poster_url: image_url(POSTER_SIZE, raw.poster_path.as_deref()),
        backdrop_url: image_url(BACKDROP_SIZE, raw.backdrop_path.as_deref()),
        genres: raw.genres.unwrap_or_default(),
    })
}

/// `None` when neither `name` nor `original_name` is present.
pub fn normalize_tv(raw: TvDetail) -> Option<NormalizedTitle> {
    let title = coalesce_name(raw.name, raw.original_name)?;
    let runtime = raw
        .episode_run_time
        .as_ref()
        .and_then(|runs| runs.first().copied().flatten());
    Some(NormalizedTitle {
        tmdb_id: raw.id,
        media: MediaType::Tv,
        release_date: parse_release_date(raw.id, raw.first_air_date.as_deref()),
        title,
        overview: raw.overview,
        runtime_minutes: runtime,
        season_count: raw.number_of_seasons,
        rating: raw.vote_average.unwrap_or(DEFAULT_RATING),
        rating_count: raw.vote_count.unwrap_or(DEFAULT_RATING_COUNT),
        popularity: raw.popularity.unwrap_or(0.0),
        poster_url: image_url(POSTER_SIZE, raw.poster_path.as_deref()),
        backdrop_url: image_url(BACKDROP_SIZE, raw.backdrop_path.as_deref()),
        genres: raw.genres.unwrap_or_default(),
    })
}

/// Drops titles released after `cutoff`; undated titles are kept.
pub fn filter_released(
    titles: Vec<NormalizedTitle>,
    cutoff: NaiveDate,
) -> (Vec<NormalizedTitle>, usize) {
    let before = titles.len();
    let kept: Vec<NormalizedTitle> = titles
        .into_iter()
        .filter(|t| t.release_date.map_or(true, |d| d <= cutoff))
        .collect();
    let dropped = before - kept.len();
    (kept, dropped)
}

// Primary name wins even when empty, matching coalesce semantics.
fn coalesce_name(primary: Option<String>, fallback: Option<String>) -> Option<String> {
    primary.or(fallback)
}

fn parse_release_date(tmdb_id: i64, raw: Option<&str>) -> Option<NaiveDate> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(err) => {
            warn!(target = "convert", tmdb_id, raw, error = %err, "unparseable release date");
            None
        }
    }
}
