pub mod client;
pub mod fetch;
pub mod models;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Which TMDB catalogue a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MediaType {
    Movie,
    Tv,
}

impl MediaType {
    /// Path segment used by the REST API (`/movie/..`, `/tv/..`).
    pub fn path_segment(self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Tv => "tv",
        }
    }

    /// Label stored in the `type` column of `titles.csv`.
    pub fn label(self) -> &'static str {
        match self {
            MediaType::Movie => "MOVIE",
            MediaType::Tv => "TV",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "MOVIE" => Some(MediaType::Movie),
            "TV" => Some(MediaType::Tv),
            _ => None,
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}

/// The two records fetched per id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Title,
    Credits,
}

impl RecordKind {
    /// Endpoint path for `id`, relative to the API base.
    pub fn endpoint(self, media: MediaType, id: i64) -> String {
        match self {
            RecordKind::Title => format!("{}/{}", media.path_segment(), id),
            RecordKind::Credits => format!("{}/{}/credits", media.path_segment(), id),
        }
    }
}

/// Locations of the four raw JSONL files inside a data directory.
#[derive(Debug, Clone)]
pub struct RawFiles {
    pub movies: PathBuf,
    pub movie_credits: PathBuf,
    pub tv: PathBuf,
    pub tv_credits: PathBuf,
}

impl RawFiles {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            movies: dir.join("tmdb_movies.jsonl"),
            movie_credits: dir.join("tmdb_movie_credits.jsonl"),
            tv: dir.join("tmdb_tv.jsonl"),
            tv_credits: dir.join("tmdb_tv_credits.jsonl"),
        }
    }

    /// (title file, credits file) for one media type.
    pub fn pair(&self, media: MediaType) -> (&Path, &Path) {
        match media {
            MediaType::Movie => (&self.movies, &self.movie_credits),
            MediaType::Tv => (&self.tv, &self.tv_credits),
        }
    }

    pub fn all(&self) -> [&Path; 4] {
        [&self.movies, &self.movie_credits, &self.tv, &self.tv_credits]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_match_rest_layout() {
        assert_eq!(RecordKind::Title.endpoint(MediaType::Movie, 603), "movie/603");
        assert_eq!(
            RecordKind::Credits.endpoint(MediaType::Tv, 1399),
            "tv/1399/credits"
        );
    }

    #[test]
    fn labels_round_trip() {
        for media in [MediaType::Movie, MediaType::Tv] {
            assert_eq!(MediaType::from_label(media.label()), Some(media));
        }
        assert_eq!(MediaType::from_label("PODCAST"), None);
    }
}
