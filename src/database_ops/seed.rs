//! Bounded subset selection for the seed script.

use itertools::Itertools;
use std::collections::HashSet;
use std::fmt;

use super::seed_sql::{render_script, SeedTables};
use super::tables::{TableSet, TitleRow};
use super::tmdb::MediaType;

pub const DEFAULT_MOVIE_LIMIT: usize = 100;
pub const DEFAULT_TV_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedLimits {
    pub movies: usize,
    pub tv: usize,
}

impl Default for SeedLimits {
    fn default() -> Self {
        Self {
            movies: DEFAULT_MOVIE_LIMIT,
            tv: DEFAULT_TV_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub titles: usize,
    pub genres: usize,
    pub people: usize,
    pub title_genres: usize,
    pub cast_members: usize,
}

impl fmt::Display for SeedSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} titles, {} genres, {} people, {} title genres, {} cast members",
            self.titles, self.genres, self.people, self.title_genres, self.cast_members
        )
    }
}

/// Top `limit` titles of one type by popularity, ties in input order.
pub fn select_top(titles: &[TitleRow], media: MediaType, limit: usize) -> Vec<TitleRow> {
    titles
        .iter()
        .filter(|t| t.media == media)
        .sorted_by(|a, b| b.popularity_score().total_cmp(&a.popularity_score()))
        .take(limit)
        .cloned()
        .collect()
}

/// Selects top movies then top TV and keeps only rows they reference.
///
/// Join tables are restricted to the selected titles first; genres and
/// people are then restricted to the ids those joins still mention.
pub fn build_seed(tables: &TableSet, limits: SeedLimits) -> TableSet {
    let mut titles = select_top(&tables.titles, MediaType::Movie, limits.movies);
    titles.extend(select_top(&tables.titles, MediaType::Tv, limits.tv));
    for t in &mut titles {
        t.fill_rating_defaults();
    }

    let title_ids: HashSet<i64> = titles.iter().map(|t| t.id).collect();

    let title_genres: Vec<_> = tables
        .title_genres
        .iter()
        .filter(|r| title_ids.contains(&r.title_id))
        .copied()
        .collect();
    let genre_ids: HashSet<i64> = title_genres.iter().map(|r| r.genre_id).collect();
    let genres = tables
        .genres
        .iter()
        .filter(|g| genre_ids.contains(&g.id))
        .cloned()
        .collect();

    let cast_members: Vec<_> = tables
        .cast_members
        .iter()
        .filter(|c| title_ids.contains(&c.title_id))
        .cloned()
        .collect();
    let person_ids: HashSet<i64> = cast_members.iter().map(|c| c.person_id).collect();
    let people = tables
        .people
        .iter()
        .filter(|p| person_ids.contains(&p.id))
        .cloned()
        .collect();

    TableSet {
        titles,
        genres,
        people,
        title_genres,
        cast_members,
    }
}

impl TableSet {
    pub fn summary(&self) -> SeedSummary {
        SeedSummary {
            titles: self.titles.len(),
            genres: self.genres.len(),
            people: self.people.len(),
            title_genres: self.title_genres.len(),
            cast_members: self.cast_members.len(),
        }
    }

    pub fn to_seed_sql(&self) -> String {
        render_script(SeedTables {
            genres: &self.genres,
            titles: &self.titles,
            people: &self.people,
            title_genres: &self.title_genres,
            cast_members: &self.cast_members,
        })
    }
}
