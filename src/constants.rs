/// Default sources, selectors and thresholds used across the pipeline

pub const SITE_ORIGIN: &str = "https://en.wikipedia.org";

pub const MUSEUMS_URL: &str = "https://en.wikipedia.org/wiki/List_of_most-visited_museums";
pub const MUSEUMS_TABLE_CLASS: &str = "wikitable sortable";

pub const CITIES_URL: &str = "https://en.wikipedia.org/wiki/List_of_largest_cities";
pub const CITIES_TABLE_CLASS: &str = "sortable wikitable mw-datatable";

// Class tokens carried by infobox-like fact tables on museum and city pages
pub const INFOBOX_TOKENS: [&str; 3] = ["infobox", "geography", "vcard"];

pub const POPULATION_HEADER: &str = "Population";

// Placeholders used by the city mapper for empty cells
pub const UNKNOWN_CITY_NAME: &str = "n/a";
pub const UNKNOWN_POPULATION: i64 = 0;

/// Records at or below this yearly visitor count are dropped from the output
pub const MIN_VISITORS: i64 = 2_000_000;

pub const USER_AGENT: &str = concat!("museum_etl/", env!("CARGO_PKG_VERSION"));

/// Get the class tokens used to find infobox-like tables
pub fn infobox_tokens() -> Vec<String> {
    INFOBOX_TOKENS.iter().map(|t| t.to_string()).collect()
}
