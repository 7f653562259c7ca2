use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::AvifloraError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Bird,
    Plant,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Bird, Category::Plant];

    pub fn species_table(&self) -> &'static str {
        match self {
            Category::Bird => "birds",
            Category::Plant => "plants",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Bird => "bird",
            Category::Plant => "plant",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Category {
    type Err = AvifloraError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "bird" | "birds" => Ok(Category::Bird),
            "plant" | "plants" => Ok(Category::Plant),
            _ => Err(AvifloraError::InvalidCategory(value.to_string())),
        }
    }
}

/// Outcome of a single remote lookup. Providers never raise; transport and
/// parse failures surface as `Failed` so callers can tell them apart from a
/// genuine miss.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
    Failed(String),
}

impl<T> Lookup<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::NotFound | Lookup::Failed(_) => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }
}

/// One catalog entry as loaded from the initial CSV sources. Identity and
/// classification only; category-specific flags stay in the table and are
/// read by the serving layer.
#[derive(Debug, Clone, Serialize)]
pub struct SpeciesRecord {
    pub id: i64,
    pub category: Category,
    pub seq: Option<i64>,
    pub taxon_order: Option<String>,
    pub family: Option<String>,
    pub scientific_name: String,
    pub common_name: Option<String>,
}

/// Persisted result of enriching one species: summary, rank chain, countries
/// of occurrence, local image reference and the raw merged payload.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichmentRecord {
    pub id: i64,
    pub category: Category,
    pub scientific_name: String,
    pub common_name: Option<String>,
    pub summary: Option<String>,
    pub kingdom: Option<String>,
    pub phylum: Option<String>,
    pub class: Option<String>,
    pub taxon_order: Option<String>,
    pub family: Option<String>,
    pub genus: Option<String>,
    pub countries: Vec<String>,
    pub image_local: Option<String>,
    pub raw: serde_json::Value,
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_category() {
        let bird: Category = "bird".parse().unwrap();
        assert_eq!(bird, Category::Bird);
        let plant: Category = " Plants ".parse().unwrap();
        assert_eq!(plant, Category::Plant);
    }

    #[test]
    fn parse_category_invalid() {
        let err = "fungus".parse::<Category>().unwrap_err();
        assert_matches!(err, AvifloraError::InvalidCategory(_));
    }

    #[test]
    fn category_tables() {
        assert_eq!(Category::Bird.species_table(), "birds");
        assert_eq!(Category::Plant.species_table(), "plants");
    }

    #[test]
    fn lookup_into_option() {
        assert_eq!(Lookup::Found(1).into_option(), Some(1));
        assert_eq!(Lookup::<u32>::NotFound.into_option(), None);
        assert_eq!(Lookup::<u32>::Failed("timeout".to_string()).into_option(), None);
    }
}
