//! PostgreSQL text rendering for the seed script.

use std::fmt::{self, Write as _};

use super::tables::{CastMemberRow, GenreRow, PersonRow, TitleGenreRow, TitleRow};

pub const SCRIPT_HEADER: &str = "-- Auto-generated seed data. Do not edit.\n\n";

/// Tables whose `id` is backed by a serial sequence, in reset order.
pub const SEQUENCE_TABLES: [&str; 4] = ["titles", "genres", "people", "cast_members"];

/// One SQL literal.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Bracketed vector text, emitted with a `::vector` cast.
    Vector(String),
    Text(String),
}

impl SqlValue {
    pub fn text(s: &str) -> Self {
        SqlValue::Text(s.to_string())
    }

    /// Embedding column value: bracket-delimited text becomes a vector
    /// literal, anything else stays plain text.
    pub fn vector(s: &str) -> Self {
        if s.starts_with('[') && s.ends_with(']') {
            SqlValue::Vector(s.to_string())
        } else {
            SqlValue::Text(s.to_string())
        }
    }

    fn opt_text(s: Option<&str>) -> Self {
        s.map_or(SqlValue::Null, SqlValue::text)
    }

    fn opt_int(v: Option<i64>) -> Self {
        v.map_or(SqlValue::Null, SqlValue::Int)
    }

    fn opt_float(v: Option<f64>) -> Self {
        v.map_or(SqlValue::Null, SqlValue::Float)
    }
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => f.write_str("NULL"),
            SqlValue::Bool(true) => f.write_str("TRUE"),
            SqlValue::Bool(false) => f.write_str("FALSE"),
            SqlValue::Int(v) => write!(f, "{v}"),
            SqlValue::Float(v) if v.is_finite() => write!(f, "{v}"),
            SqlValue::Float(_) => f.write_str("NULL"),
            SqlValue::Vector(s) => write!(f, "{}::vector", quote(s)),
            SqlValue::Text(s) => f.write_str(&quote(s)),
        }
    }
}

/// A table as it is inserted: name, column list and one value row per record.
pub trait SeedTable {
    const TABLE: &'static str;
    const COLUMNS: &'static [&'static str];
    fn values(&self) -> Vec<SqlValue>;
}

impl SeedTable for GenreRow {
    const TABLE: &'static str = "genres";
    const COLUMNS: &'static [&'static str] = &["id", "name"];
    fn values(&self) -> Vec<SqlValue> {
        vec![SqlValue::Int(self.id), SqlValue::opt_text(self.name.as_deref())]
    }
}

// `tmdb_id` stays in the CSV only.
impl SeedTable for TitleRow {
    const TABLE: &'static str = "titles";
    const COLUMNS: &'static [&'static str] = &[
        "id",
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
    fn values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::Int(self.id),
            SqlValue::Text(self.media.label().to_string()),
            SqlValue::text(&self.title),
            SqlValue::opt_text(self.overview.as_deref()),
            self.release_date
                .map_or(SqlValue::Null, |d| SqlValue::Text(d.format("%Y-%m-%d").to_string())),
            SqlValue::opt_int(self.runtime_minutes),
            SqlValue::opt_int(self.season_count),
            SqlValue::opt_float(self.rating),
            SqlValue::opt_int(self.rating_count),
            SqlValue::opt_float(self.popularity),
            SqlValue::opt_text(self.poster_url.as_deref()),
            SqlValue::opt_text(self.backdrop_url.as_deref()),
            self.embedding
                .as_deref()
                .map_or(SqlValue::Null, SqlValue::vector),
        ]
    }
}

impl SeedTable for PersonRow {
    const TABLE: &'static str = "people";
    const COLUMNS: &'static [&'static str] = &["id", "name", "profile_url"];
    fn values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::Int(self.id),
            SqlValue::opt_text(self.name.as_deref()),
            SqlValue::opt_text(self.profile_url.as_deref()),
        ]
    }
}

impl SeedTable for TitleGenreRow {
    const TABLE: &'static str = "title_genres";
    const COLUMNS: &'static [&'static str] = &["title_id", "genre_id"];
    fn values(&self) -> Vec<SqlValue> {
        vec![SqlValue::Int(self.title_id), SqlValue::Int(self.genre_id)]
    }
}

impl SeedTable for CastMemberRow {
    const TABLE: &'static str = "cast_members";
    const COLUMNS: &'static [&'static str] =
        &["title_id", "person_id", "character_name", "billing_order"];
    fn values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::Int(self.title_id),
            SqlValue::Int(self.person_id),
            SqlValue::text(&self.character_name),
            SqlValue::opt_int(self.billing_order),
        ]
    }
}

/// One multi-row insert that skips rows already present.
///
/// An empty table yields a comment, since `VALUES` with no rows is invalid.
pub fn insert_statement<T: SeedTable>(rows: &[T]) -> String {
    if rows.is_empty() {
        return format!("-- {}: no rows\n", T::TABLE);
    }
    let tuples: Vec<String> = rows
        .iter()
        .map(|row| {
            let vals: Vec<String> = row.values().iter().map(ToString::to_string).collect();
            format!("    ({})", vals.join(", "))
        })
        .collect();
    format!(
        "INSERT INTO {} ({}) VALUES\n{}\nON CONFLICT DO NOTHING;\n",
        T::TABLE,
        T::COLUMNS.join(", "),
        tuples.join(",\n")
    )
}

/// Statements that move each serial sequence to the table's max id (or 1).
pub fn sequence_resets() -> String {
    let mut out = String::new();
    for table in SEQUENCE_TABLES {
        let _ = writeln!(
            out,
            "SELECT setval(pg_get_serial_sequence('{table}', 'id'), COALESCE((SELECT MAX(id) FROM {table}), 1));"
        );
    }
    out
}

/// Borrowed view of the tables that go into one script.
#[derive(Debug, Clone, Copy)]
pub struct SeedTables<'a> {
    pub genres: &'a [GenreRow],
    pub titles: &'a [TitleRow],
    pub people: &'a [PersonRow],
    pub title_genres: &'a [TitleGenreRow],
    pub cast_members: &'a [CastMemberRow],
}

/// Full script: header, inserts in dependency order, then sequence resets.
pub fn render_script(tables: SeedTables<'_>) -> String {
    let parts = [
        insert_statement(tables.genres),
        insert_statement(tables.titles),
        insert_statement(tables.people),
        insert_statement(tables.title_genres),
        insert_statement(tables.cast_members),
        sequence_resets(),
    ];
    let mut out = String::from(SCRIPT_HEADER);
    out.push_str(&parts.join("\n"));
    out
}
