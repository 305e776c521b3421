use indexmap::{IndexMap, IndexSet};

use crate::database_ops::tables::{GenreRow, TitleGenreRow};
use crate::database_ops::tmdb::models::GenreEntry;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenreTables {
    pub title_genres: Vec<TitleGenreRow>,
    pub genres: Vec<GenreRow>,
}

/// Expands per-title genre lists into the join table and the genre table.
///
/// Join rows are unique and keep first-seen order; genres are unique by id,
/// keep the first name seen and are sorted by id.
pub fn explode_genres(titles: &[(i64, Vec<GenreEntry>)]) -> GenreTables {
    let mut pairs: IndexSet<TitleGenreRow> = IndexSet::new();
    let mut genres: IndexMap<i64, Option<String>> = IndexMap::new();

    for (title_id, entries) in titles {
        for entry in entries {
            pairs.insert(TitleGenreRow {
                title_id: *title_id,
                genre_id: entry.id,
            });
            genres.entry(entry.id).or_insert_with(|| entry.name.clone());
        }
    }

    genres.sort_keys();
    GenreTables {
        title_genres: pairs.into_iter().collect(),
        genres: genres
            .into_iter()
            .map(|(id, name)| GenreRow { id, name })
            .collect(),
    }
}
