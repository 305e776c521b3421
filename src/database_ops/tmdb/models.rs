//! Payload shapes for the TMDB detail/credits responses and the daily id exports.
//!
//! Only the fields the pipeline reads are modelled; the fetcher stores the
//! untouched response body, so unknown fields survive in the raw files.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// One line of a TMDB daily id export (`movie_ids_MM_DD_YYYY.json`).
#[derive(Debug, Clone, Deserialize)]
pub struct IdExportRecord {
    pub id: i64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub popularity: Option<f64>,
}

/// Minimal view used to scan which ids an output file already holds.
#[derive(Debug, Clone, Deserialize)]
pub struct IdOnly {
    pub id: i64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GenreEntry {
    pub id: i64,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MovieDetail {
    pub id: i64,
    pub title: Option<String>,
    pub original_title: Option<String>,
    pub overview: Option<String>,
    pub release_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub runtime: Option<i64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub vote_average: Option<f64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub vote_count: Option<i64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub popularity: Option<f64>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub genres: Option<Vec<GenreEntry>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TvDetail {
    pub id: i64,
    pub name: Option<String>,
    pub original_name: Option<String>,
    pub overview: Option<String>,
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub episode_run_time: Option<Vec<Option<i64>>>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub number_of_seasons: Option<i64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub vote_average: Option<f64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub vote_count: Option<i64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub popularity: Option<f64>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub genres: Option<Vec<GenreEntry>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreditsRecord {
    pub id: i64,
    #[serde(default)]
    pub cast: Option<Vec<Option<CastEntry>>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CastEntry {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub id: Option<i64>,
    pub name: Option<String>,
    pub original_name: Option<String>,
    pub character: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub order: Option<i64>,
    pub profile_path: Option<String>,
}

/// Accepts a JSON number, a numeric string, or null. Anything else maps to
/// `None` instead of failing the whole record.
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::Number(n)) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0)
                .map(|f| f as i64)
        }),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tolerates_odd_numeric_fields() {
        let movie: MovieDetail = serde_json::from_str(
            r#"{"id": 7, "title": "Se7en", "vote_average": "8.4", "vote_count": null,
                "runtime": 127.0, "popularity": 55.2, "genres": null}"#,
        )
        .unwrap();
        assert_eq!(movie.vote_average, Some(8.4));
        assert_eq!(movie.vote_count, None);
        assert_eq!(movie.runtime, Some(127));
        assert!(movie.genres.is_none());
    }

    #[test]
    fn missing_fields_default_to_none() {
        let tv: TvDetail = serde_json::from_str(r#"{"id": 1399}"#).unwrap();
        assert!(tv.name.is_none());
        assert!(tv.episode_run_time.is_none());
        assert!(tv.vote_average.is_none());
    }

    #[test]
    fn id_export_ignores_extra_columns() {
        let rec: IdExportRecord = serde_json::from_str(
            r#"{"adult":false,"id":550,"original_title":"Fight Club","popularity":61.4,"video":false}"#,
        )
        .unwrap();
        assert_eq!(rec.id, 550);
        assert_eq!(rec.popularity, Some(61.4));
    }
}
