use std::fs::File;

use camino::Utf8Path;
use serde::{Deserialize, Serialize};

use crate::domain::Category;
use crate::enrich::SpeciesProfile;
use crate::error::AvifloraError;

/// One line of the enriched export. Field order is the contract: category,
/// scientific_name, common_name, summary, kingdom, phylum, class, order,
/// family, genus, countries, image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRow {
    pub category: String,
    pub scientific_name: String,
    pub common_name: Option<String>,
    pub summary: Option<String>,
    pub kingdom: Option<String>,
    pub phylum: Option<String>,
    pub class: Option<String>,
    #[serde(rename = "order")]
    pub taxon_order: Option<String>,
    pub family: Option<String>,
    pub genus: Option<String>,
    pub countries: String,
    pub image: Option<String>,
}

impl ExportRow {
    pub fn from_profile(
        category: Category,
        common_name: Option<&str>,
        profile: &SpeciesProfile,
    ) -> Self {
        Self {
            category: category.as_str().to_string(),
            scientific_name: profile.scientific_name.clone(),
            common_name: common_name.map(str::to_string),
            summary: profile.summary().map(str::to_string),
            kingdom: profile.kingdom().map(str::to_string),
            phylum: profile.phylum().map(str::to_string),
            class: profile.class().map(str::to_string),
            taxon_order: profile.taxon_order().map(str::to_string),
            family: profile.family().map(str::to_string),
            genus: profile.genus().map(str::to_string),
            countries: profile.countries().join(", "),
            image: profile.image_local().map(str::to_string),
        }
    }
}

/// Remediation line: the corrected name starts out equal to the original and
/// is meant to be edited by hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapRow {
    pub category: String,
    pub original_name: String,
    pub corrected_name: String,
}

pub const EXPORT_COLUMNS: [&str; 12] = [
    "category",
    "scientific_name",
    "common_name",
    "summary",
    "kingdom",
    "phylum",
    "class",
    "order",
    "family",
    "genus",
    "countries",
    "image",
];

const GAP_COLUMNS: [&str; 3] = ["category", "original_name", "corrected_name"];

/// Open the export file and write the header up front, so an empty batch
/// still produces a well-formed file.
pub fn writer(path: &Utf8Path) -> Result<csv::Writer<File>, AvifloraError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path.as_std_path())
        .map_err(|err| AvifloraError::Csv(err.to_string()))?;
    writer
        .write_record(EXPORT_COLUMNS)
        .map_err(|err| AvifloraError::Csv(err.to_string()))?;
    Ok(writer)
}

pub fn read_rows(path: &Utf8Path) -> Result<Vec<ExportRow>, AvifloraError> {
    if !path.as_std_path().exists() {
        return Err(AvifloraError::ExportMissing(
            path.as_std_path().to_path_buf(),
        ));
    }
    let mut reader = csv::Reader::from_path(path.as_std_path())
        .map_err(|err| AvifloraError::Csv(err.to_string()))?;
    reader
        .deserialize()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| AvifloraError::Csv(err.to_string()))
}

/// A row needs manual follow-up when any of image, summary or kingdom is
/// missing or whitespace-only.
pub fn needs_attention(row: &ExportRow) -> bool {
    blank(row.image.as_deref()) || blank(row.summary.as_deref()) || blank(row.kingdom.as_deref())
}

fn blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

/// Pure pass over the export rows; one gap row per flagged species.
pub fn detect_gaps(rows: &[ExportRow]) -> Vec<GapRow> {
    rows.iter()
        .filter(|row| needs_attention(row))
        .map(|row| GapRow {
            category: row.category.clone(),
            original_name: row.scientific_name.clone(),
            corrected_name: row.scientific_name.clone(),
        })
        .collect()
}

pub fn write_gaps(path: &Utf8Path, gaps: &[GapRow]) -> Result<(), AvifloraError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path.as_std_path())
        .map_err(|err| AvifloraError::Csv(err.to_string()))?;
    writer
        .write_record(GAP_COLUMNS)
        .map_err(|err| AvifloraError::Csv(err.to_string()))?;
    for gap in gaps {
        writer
            .serialize(gap)
            .map_err(|err| AvifloraError::Csv(err.to_string()))?;
    }
    writer
        .flush()
        .map_err(|err| AvifloraError::Csv(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_row() -> ExportRow {
        ExportRow {
            category: "bird".to_string(),
            scientific_name: "Turdus merula".to_string(),
            common_name: Some("Common Blackbird".to_string()),
            summary: Some("A thrush.".to_string()),
            kingdom: Some("Animalia".to_string()),
            phylum: Some("Chordata".to_string()),
            class: Some("Aves".to_string()),
            taxon_order: Some("Passeriformes".to_string()),
            family: Some("Turdidae".to_string()),
            genus: Some("Turdus".to_string()),
            countries: "Spain, Portugal".to_string(),
            image: Some("/media/turdus_merula/image.jpg".to_string()),
        }
    }

    #[test]
    fn complete_row_is_not_flagged() {
        assert!(!needs_attention(&full_row()));
    }

    #[test]
    fn any_blank_key_field_is_flagged() {
        let mut row = full_row();
        row.image = None;
        assert!(needs_attention(&row));

        let mut row = full_row();
        row.summary = Some("   ".to_string());
        assert!(needs_attention(&row));

        let mut row = full_row();
        row.kingdom = Some(String::new());
        assert!(needs_attention(&row));
    }

    #[test]
    fn corrected_name_starts_as_original() {
        let mut row = full_row();
        row.kingdom = None;
        let gaps = detect_gaps(&[row]);
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].original_name, gaps[0].corrected_name);
        assert_eq!(gaps[0].category, "bird");
    }

    #[test]
    fn missing_countries_alone_is_not_a_gap() {
        let mut row = full_row();
        row.countries = String::new();
        row.common_name = None;
        assert!(!needs_attention(&row));
    }
}
