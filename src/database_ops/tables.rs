//! Row types for the five normalized CSV tables and their read/write helpers.
//!
//! Nulls are empty CSV fields. Headers are written explicitly so an empty
//! table still produces a file the seeder can read.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::tmdb::MediaType;
use crate::error::PipelineError;

/// Rating stored when the source has none.
pub const DEFAULT_RATING: f64 = 6.5;
/// Rating count stored when the source has none.
pub const DEFAULT_RATING_COUNT: i64 = 0;

pub trait CsvTable: Serialize + DeserializeOwned {
    const FILE: &'static str;
    const HEADERS: &'static [&'static str];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitleRow {
    pub id: i64,
    #[serde(default)]
    pub tmdb_id: Option<i64>,
    #[serde(rename = "type")]
    pub media: MediaType,
    pub title: String,
    pub overview: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub runtime_minutes: Option<i64>,
    pub season_count: Option<i64>,
    pub rating: Option<f64>,
    pub rating_count: Option<i64>,
    pub popularity: Option<f64>,
    pub poster_url: Option<String>,
    pub backdrop_url: Option<String>,
    #[serde(default)]
    pub embedding: Option<String>,
}

impl TitleRow {
    /// Popularity used for ranking; a missing score ranks as 0.
    pub fn popularity_score(&self) -> f64 {
        self.popularity.unwrap_or(0.0)
    }

    /// Replaces null rating fields with the persisted defaults.
    pub fn fill_rating_defaults(&mut self) {
        self.rating.get_or_insert(DEFAULT_RATING);
        self.rating_count.get_or_insert(DEFAULT_RATING_COUNT);
    }
}

impl CsvTable for TitleRow {
    const FILE: &'static str = "titles.csv";
    const HEADERS: &'static [&'static str] = &[
        "id",
        "tmdb_id",
        "type",
        "title",
        "overview",
        "release_date",
        "runtime_minutes",
        "season_count",
        "rating",
        "rating_count",
        "popularity",
        "poster_url",
        "backdrop_url",
        "embedding",
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenreRow {
    pub id: i64,
    pub name: Option<String>,
}

impl CsvTable for GenreRow {
    const FILE: &'static str = "genres.csv";
    const HEADERS: &'static [&'static str] = &["id", "name"];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonRow {
    pub id: i64,
    pub name: Option<String>,
    pub profile_url: Option<String>,
}

impl CsvTable for PersonRow {
    const FILE: &'static str = "people.csv";
    const HEADERS: &'static [&'static str] = &["id", "name", "profile_url"];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TitleGenreRow {
    pub title_id: i64,
    pub genre_id: i64,
}

impl CsvTable for TitleGenreRow {
    const FILE: &'static str = "title_genres.csv";
    const HEADERS: &'static [&'static str] = &["title_id", "genre_id"];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastMemberRow {
    pub title_id: i64,
    pub person_id: i64,
    pub character_name: String,
    pub billing_order: Option<i64>,
}

impl CsvTable for CastMemberRow {
    const FILE: &'static str = "cast_members.csv";
    const HEADERS: &'static [&'static str] =
        &["title_id", "person_id", "character_name", "billing_order"];
}

/// All five tables of one conversion run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableSet {
    pub titles: Vec<TitleRow>,
    pub genres: Vec<GenreRow>,
    pub people: Vec<PersonRow>,
    pub title_genres: Vec<TitleGenreRow>,
    pub cast_members: Vec<CastMemberRow>,
}

impl TableSet {
    pub fn write_dir(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
        write_table(&dir.join(TitleRow::FILE), &self.titles)?;
        write_table(&dir.join(GenreRow::FILE), &self.genres)?;
        write_table(&dir.join(PersonRow::FILE), &self.people)?;
        write_table(&dir.join(TitleGenreRow::FILE), &self.title_genres)?;
        write_table(&dir.join(CastMemberRow::FILE), &self.cast_members)?;
        Ok(())
    }

    /// Reads all five CSVs; any missing file is a [`PipelineError::MissingInput`].
    pub fn read_dir(dir: &Path) -> Result<Self> {
        Ok(Self {
            titles: read_table(&dir.join(TitleRow::FILE))?,
            genres: read_table(&dir.join(GenreRow::FILE))?,
            people: read_table(&dir.join(PersonRow::FILE))?,
            title_genres: read_table(&dir.join(TitleGenreRow::FILE))?,
            cast_members: read_table(&dir.join(CastMemberRow::FILE))?,
        })
    }
}

pub fn write_table<T: CsvTable>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    wtr.write_record(T::HEADERS)?;
    for row in rows {
        wtr.serialize(row)
            .with_context(|| format!("failed to write row to {}", path.display()))?;
    }
    wtr.flush()
        .with_context(|| format!("failed to flush {}", path.display()))?;
    Ok(())
}

pub fn read_table<T: CsvTable>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Err(PipelineError::MissingInput(path.to_path_buf()).into());
    }
    let mut rdr = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<T>().enumerate() {
        // +2: 1-based and the header line
        let row = rec.with_context(|| format!("invalid row {} in {}", idx + 2, path.display()))?;
        rows.push(row);
    }
    Ok(rows)
}
