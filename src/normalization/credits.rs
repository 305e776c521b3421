use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};

use super::{image_url, PROFILE_SIZE};
use crate::database_ops::tables::{CastMemberRow, PersonRow};
use crate::database_ops::tmdb::models::CreditsRecord;
use crate::database_ops::tmdb::MediaType;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CastTables {
    pub cast_members: Vec<CastMemberRow>,
    pub people: Vec<PersonRow>,
}

#[derive(Debug, Clone)]
struct Candidate {
    title_id: i64,
    person_id: i64,
    name: Option<String>,
    character: String,
    billing_order: Option<i64>,
    profile_path: Option<String>,
}

/// Joins credits to assigned title ids and derives cast and people tables.
///
/// Credits whose (tmdb id, media) has no surviving title are dropped, as are
/// entries without a person id or with a blank character. Cast is ordered by
/// (title id, billing order) with unnumbered entries first, and only the first
/// entry per (title, person) is kept. People come from that deduplicated cast,
/// first occurrence per person, sorted by id.
pub fn build_cast(
    credits: &[(MediaType, CreditsRecord)],
    id_map: &HashMap<(i64, MediaType), i64>,
) -> CastTables {
    let mut candidates: Vec<Candidate> = Vec::new();
    for (media, record) in credits {
        let Some(&title_id) = id_map.get(&(record.id, *media)) else {
            continue;
        };
        let Some(cast) = record.cast.as_ref() else {
            continue;
        };
        for entry in cast.iter().flatten() {
            let Some(person_id) = entry.id else {
                continue;
            };
            let character = match entry.character.as_deref() {
                Some(c) if !c.is_empty() => c.to_string(),
                _ => continue,
            };
            candidates.push(Candidate {
                title_id,
                person_id,
                name: entry.name.clone().or_else(|| entry.original_name.clone()),
                character,
                billing_order: entry.order,
                profile_path: entry.profile_path.clone(),
            });
        }
    }

    // unnumbered entries sort ahead of numbered ones
    candidates.sort_by_key(|c| (c.title_id, c.billing_order.is_some(), c.billing_order));

    let mut seen: HashSet<(i64, i64)> = HashSet::new();
    let mut people: IndexMap<i64, PersonRow> = IndexMap::new();
    let mut cast_members = Vec::with_capacity(candidates.len());
    for c in candidates {
        if !seen.insert((c.title_id, c.person_id)) {
            continue;
        }
        people.entry(c.person_id).or_insert_with(|| PersonRow {
            id: c.person_id,
            name: c.name.clone(),
            profile_url: image_url(PROFILE_SIZE, c.profile_path.as_deref()),
        });
        cast_members.push(CastMemberRow {
            title_id: c.title_id,
            person_id: c.person_id,
            character_name: c.character,
            billing_order: c.billing_order,
        });
    }

    people.sort_keys();
    CastTables {
        cast_members,
        people: people.into_values().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(v: serde_json::Value) -> CreditsRecord {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn keeps_lowest_billing_per_person_and_filters_blanks() {
        let credits = vec![(
            MediaType::Movie,
            record(json!({
                "id": 100,
                "cast": [
                    {"id": 7, "name": "Peter Sellers", "character": "President Muffley", "order": 2, "profile_path": "/ps.jpg"},
                    {"id": 7, "name": "Peter Sellers", "character": "Dr. Strangelove", "order": 0},
                    {"id": 8, "name": "Extra", "character": "", "order": 1},
                    {"id": null, "name": "Nobody", "character": "Ghost", "order": 3},
                    null,
                    {"id": 9, "original_name": "George C. Scott", "character": "Gen. Turgidson", "order": null}
                ]
            })),
        )];
        let id_map = HashMap::from([((100, MediaType::Movie), 1)]);
        let out = build_cast(&credits, &id_map);

        let cast: Vec<(i64, &str, Option<i64>)> = out
            .cast_members
            .iter()
            .map(|c| (c.person_id, c.character_name.as_str(), c.billing_order))
            .collect();
        assert_eq!(
            cast,
            vec![(9, "Gen. Turgidson", None), (7, "Dr. Strangelove", Some(0))]
        );

        assert_eq!(out.people.len(), 2);
        assert_eq!(out.people[0].id, 7);
        // profile comes from the kept (lowest billing) entry, which has none
        assert_eq!(out.people[0].profile_url, None);
        assert_eq!(out.people[1].name.as_deref(), Some("George C. Scott"));
    }

    #[test]
    fn joins_on_tmdb_id_and_media() {
        let credits = vec![
            (
                MediaType::Tv,
                record(json!({"id": 5, "cast": [{"id": 1, "name": "A", "character": "Host", "order": 0}]})),
            ),
            (
                MediaType::Movie,
                record(json!({"id": 5, "cast": [{"id": 2, "name": "B", "character": "Lead", "order": 0}]})),
            ),
            (
                MediaType::Movie,
                record(json!({"id": 404, "cast": [{"id": 3, "name": "C", "character": "Lost", "order": 0}]})),
            ),
        ];
        let id_map = HashMap::from([((5, MediaType::Movie), 1), ((5, MediaType::Tv), 2)]);
        let out = build_cast(&credits, &id_map);

        let pairs: Vec<(i64, i64)> = out
            .cast_members
            .iter()
            .map(|c| (c.title_id, c.person_id))
            .collect();
        assert_eq!(pairs, vec![(1, 2), (2, 1)]);
        assert_eq!(out.people.iter().map(|p| p.id).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn unnumbered_entry_wins_over_numbered_one() {
        let credits = vec![(
            MediaType::Tv,
            record(json!({
                "id": 3,
                "cast": [
                    {"id": 11, "name": "Numbered", "character": "Host", "order": 3, "profile_path": "/n.jpg"},
                    {"id": 11, "name": "Unnumbered", "character": "Guest", "order": null}
                ]
            })),
        )];
        let out = build_cast(&credits, &HashMap::from([((3, MediaType::Tv), 1)]));
        assert_eq!(out.cast_members.len(), 1);
        assert_eq!(out.cast_members[0].character_name, "Guest");
        assert_eq!(out.cast_members[0].billing_order, None);
        assert_eq!(out.people[0].name.as_deref(), Some("Unnumbered"));
        assert_eq!(out.people[0].profile_url, None);
    }

    #[test]
    fn person_profile_url_uses_small_size() {
        let credits = vec![(
            MediaType::Movie,
            record(json!({"id": 1, "cast": [{"id": 4, "name": "D", "character": "E", "order": 0, "profile_path": "/d.jpg"}]})),
        )];
        let out = build_cast(&credits, &HashMap::from([((1, MediaType::Movie), 1)]));
        assert_eq!(
            out.people[0].profile_url.as_deref(),
            Some("https://image.tmdb.org/t/p/w185/d.jpg")
        );
    }
}
