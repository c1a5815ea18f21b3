use crate::error::Result;
use serde::{Deserialize, Serialize};

/// One row of the most-visited museums list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MuseumRecord {
    pub name: String,
    pub wiki_link: String,
    pub city: String,
    pub city_link: String,
    pub visitors_per_year: Option<i64>,
    pub year_reported: Option<i64>,
}

/// One row of the largest cities list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CityRecord {
    pub city_name: String,
    pub population: Option<i64>,
}

/// Label/value rows scraped from an infobox, first cell being the label
pub type Facts = Vec<Vec<String>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacteristicsRecord {
    pub museum_name: String,
    pub facts: Facts,
}

impl CharacteristicsRecord {
    /// Serialize the fact table as a JSON array of arrays.
    pub fn serialize_facts(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.facts)?)
    }

    pub fn parse_facts(serialized: &str) -> Result<Facts> {
        Ok(serde_json::from_str(serialized)?)
    }
}

/// Final denormalized row handed to the sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciledRecord {
    pub name: String,
    pub wikilink: String,
    pub city: String,
    pub visitors: i64,
    pub characteristics: Option<String>,
    pub city_population: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_facts_round_trip() {
        let record = CharacteristicsRecord {
            museum_name: "Musée du Louvre".to_string(),
            facts: vec![
                vec!["Established".to_string(), "10 August 1793".to_string()],
                vec!["Location".to_string(), "Rue de Rivoli, 75001 Paris, France".to_string()],
                vec!["Visitors".to_string(), "8900000".to_string()],
                vec!["Director".to_string(), "Laurence des Cars".to_string(), "(since 2021)".to_string()],
            ],
        };

        let serialized = record.serialize_facts().unwrap();
        assert_eq!(CharacteristicsRecord::parse_facts(&serialized).unwrap(), record.facts);
    }

    #[test]
    fn test_facts_keep_non_ascii_text() {
        let record = CharacteristicsRecord {
            museum_name: "故宫博物院".to_string(),
            facts: vec![vec!["Location".to_string(), "北京".to_string()]],
        };
        let serialized = record.serialize_facts().unwrap();
        assert!(serialized.contains("北京"));
    }
}
