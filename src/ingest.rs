use std::io::Read;

use camino::Utf8Path;
use serde::Deserialize;

use crate::db::{Database, NewBird, NewPlant};
use crate::error::AvifloraError;

#[derive(Debug, Deserialize)]
struct BirdCsvRow {
    seq: Option<i64>,
    #[serde(rename = "order")]
    taxon_order: Option<String>,
    family: Option<String>,
    scientific_name: Option<String>,
    common_name: Option<String>,
    #[serde(default)]
    resident: Option<i64>,
    #[serde(default)]
    breeding: Option<i64>,
    #[serde(default)]
    migratory: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct PlantCsvRow {
    family: Option<String>,
    scientific_name: Option<String>,
    common_name: Option<String>,
    #[serde(default)]
    usage: Option<String>,
    #[serde(default)]
    physiognomy: Option<String>,
    #[serde(default)]
    august_state: Option<String>,
    #[serde(default)]
    october_state: Option<String>,
}

/// Replace the birds table with the contents of one CSV source.
pub fn load_birds(db: &mut Database, path: &Utf8Path) -> Result<usize, AvifloraError> {
    let reader = csv::Reader::from_path(path.as_std_path())
        .map_err(|err| AvifloraError::Csv(format!("{path}: {err}")))?;
    let rows = birds_from_reader(reader)?;
    db.replace_birds(&rows)
}

/// Replace the plants table with the contents of one CSV source.
pub fn load_plants(db: &mut Database, path: &Utf8Path) -> Result<usize, AvifloraError> {
    let reader = csv::Reader::from_path(path.as_std_path())
        .map_err(|err| AvifloraError::Csv(format!("{path}: {err}")))?;
    let rows = plants_from_reader(reader)?;
    db.replace_plants(&rows)
}

fn birds_from_reader<R: Read>(mut reader: csv::Reader<R>) -> Result<Vec<NewBird>, AvifloraError> {
    let mut rows = Vec::new();
    for record in reader.deserialize::<BirdCsvRow>() {
        let record = record.map_err(|err| AvifloraError::Csv(err.to_string()))?;
        rows.push(NewBird {
            seq: record.seq,
            taxon_order: record.taxon_order,
            family: record.family,
            scientific_name: record.scientific_name.unwrap_or_default(),
            common_name: record.common_name,
            resident: record.resident.unwrap_or(0),
            breeding: record.breeding.unwrap_or(0),
            migratory: record.migratory.unwrap_or(0),
        });
    }
    Ok(rows)
}

fn plants_from_reader<R: Read>(mut reader: csv::Reader<R>) -> Result<Vec<NewPlant>, AvifloraError> {
    let mut rows = Vec::new();
    for record in reader.deserialize::<PlantCsvRow>() {
        let record = record.map_err(|err| AvifloraError::Csv(err.to_string()))?;
        rows.push(NewPlant {
            family: record.family,
            scientific_name: record.scientific_name.unwrap_or_default(),
            common_name: record.common_name,
            usage: record.usage,
            physiognomy: record.physiognomy,
            august_state: record.august_state,
            october_state: record.october_state,
        });
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_birds_with_blank_flags() {
        let data = "seq,order,family,scientific_name,common_name,resident,breeding,migratory\n\
                    1,Passeriformes,Turdidae,Turdus merula,Common Blackbird,1,,1\n\
                    2,,,,,,,\n";
        let rows = birds_from_reader(csv::Reader::from_reader(data.as_bytes())).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].scientific_name, "Turdus merula");
        assert_eq!(rows[0].breeding, 0);
        assert_eq!(rows[0].migratory, 1);
        assert_eq!(rows[1].scientific_name, "");
        assert_eq!(rows[1].seq, Some(2));
    }

    #[test]
    fn parse_plants_without_optional_columns() {
        let data = "family,scientific_name,common_name\n\
                    Fagaceae,Quercus robur,Pedunculate Oak\n";
        let rows = plants_from_reader(csv::Reader::from_reader(data.as_bytes())).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].scientific_name, "Quercus robur");
        assert_eq!(rows[0].usage, None);
    }
}
