//! Pure join and merge steps. Keys are compared as exact text; an unmatched
//! key leaves the right-hand value missing.

use crate::constants::MIN_VISITORS;
use crate::types::{CityRecord, MuseumRecord, ReconciledRecord};
use std::collections::{HashMap, HashSet};

/// A museum together with the population found for its city so far
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinedMuseum {
    pub museum: MuseumRecord,
    pub population: Option<i64>,
}

/// Left join museums with cities on city name. Duplicate city names keep their first row.
pub fn join_cities(museums: &[MuseumRecord], cities: &[CityRecord]) -> Vec<JoinedMuseum> {
    let mut by_name: HashMap<&str, Option<i64>> = HashMap::new();
    for city in cities {
        by_name.entry(city.city_name.as_str()).or_insert(city.population);
    }

    museums
        .iter()
        .map(|m| JoinedMuseum {
            museum: m.clone(),
            population: by_name.get(m.city.as_str()).copied().flatten(),
        })
        .collect()
}

/// Distinct `(city, city_link)` pairs whose population is missing or zero, in first-seen order.
pub fn missing_cities(joined: &[JoinedMuseum]) -> Vec<(String, String)> {
    let mut seen = HashSet::new();
    joined
        .iter()
        .filter(|j| matches!(j.population, None | Some(0)))
        .map(|j| (j.museum.city.clone(), j.museum.city_link.clone()))
        .filter(|pair| seen.insert(pair.clone()))
        .collect()
}

/// Coalesce backfilled populations over the joined ones.
pub fn merge_backfill(joined: Vec<JoinedMuseum>, backfill: &HashMap<String, i64>) -> Vec<JoinedMuseum> {
    joined
        .into_iter()
        .map(|mut j| {
            if let Some(population) = backfill.get(&j.museum.city) {
                j.population = Some(*population);
            }
            j
        })
        .collect()
}

/// Attach characteristics by museum name and keep museums above the visitor threshold.
pub fn project_and_filter(
    joined: Vec<JoinedMuseum>,
    characteristics: &HashMap<String, String>,
) -> Vec<ReconciledRecord> {
    joined
        .into_iter()
        .filter_map(|j| {
            let visitors = j.museum.visitors_per_year.filter(|v| *v > MIN_VISITORS)?;
            Some(ReconciledRecord {
                characteristics: characteristics.get(&j.museum.name).cloned(),
                name: j.museum.name,
                wikilink: j.museum.wiki_link,
                city: j.museum.city,
                visitors,
                city_population: j.population,
            })
        })
        .collect()
}
