use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::db::Database;
use crate::domain::{Category, Lookup};
use crate::error::AvifloraError;
use crate::export::{self, ExportRow};
use crate::gbif::{GbifClient, GbifRecord};
use crate::image::ImageFetcher;
use crate::inat::{InatClient, InatRecord};
use crate::store::{CacheEntry, Store};

/// Merged enrichment result for one species; exactly what is written to the
/// cache entry. A source that missed or failed is null, so the shape is the
/// same for every species.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesProfile {
    pub scientific_name: String,
    pub inat: Option<InatRecord>,
    pub gbif: Option<GbifRecord>,
}

impl SpeciesProfile {
    pub fn summary(&self) -> Option<&str> {
        self.inat.as_ref().and_then(|r| r.summary.as_deref())
    }

    pub fn kingdom(&self) -> Option<&str> {
        self.gbif.as_ref().and_then(|r| r.kingdom.as_deref())
    }

    pub fn phylum(&self) -> Option<&str> {
        self.gbif.as_ref().and_then(|r| r.phylum.as_deref())
    }

    pub fn class(&self) -> Option<&str> {
        self.gbif.as_ref().and_then(|r| r.class.as_deref())
    }

    pub fn taxon_order(&self) -> Option<&str> {
        self.gbif.as_ref().and_then(|r| r.order.as_deref())
    }

    pub fn family(&self) -> Option<&str> {
        self.gbif.as_ref().and_then(|r| r.family.as_deref())
    }

    pub fn genus(&self) -> Option<&str> {
        self.gbif.as_ref().and_then(|r| r.genus.as_deref())
    }

    pub fn countries(&self) -> &[String] {
        self.gbif.as_ref().map(|r| r.countries.as_slice()).unwrap_or(&[])
    }

    pub fn image_local(&self) -> Option<&str> {
        self.inat.as_ref().and_then(|r| r.image_local.as_deref())
    }

    /// First remote photo URL across both sources. GBIF's species endpoints
    /// carry no media, so in practice this comes from iNaturalist.
    pub fn first_remote_image(&self) -> Option<&str> {
        self.inat
            .as_ref()
            .and_then(|r| r.images_remote.first().map(String::as_str))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchFailure {
    pub category: Category,
    pub scientific_name: String,
    pub reason: String,
}

/// Outcome of one batch run. Failures are per-species and never abort the
/// remaining work.
#[derive(Debug, Default, Clone, Serialize)]
pub struct BatchReport {
    pub processed: usize,
    pub skipped: usize,
    pub failures: Vec<BatchFailure>,
}

/// Cache-first enrichment over the two remote sources and the image host.
/// Generic over the client traits so tests inject mocks.
pub struct Enricher<I, G, F> {
    store: Store,
    inat: I,
    gbif: G,
    images: F,
}

impl<I: InatClient, G: GbifClient, F: ImageFetcher> Enricher<I, G, F> {
    pub fn new(store: Store, inat: I, gbif: G, images: F) -> Self {
        Self {
            store,
            inat,
            gbif,
            images,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Return the merged record for one species: the cache entry verbatim if
    /// it is valid, otherwise the result of querying both sources, which is
    /// then cached. A corrupt entry is logged and treated as absent.
    pub fn species_profile(&self, scientific_name: &str) -> Result<SpeciesProfile, AvifloraError> {
        let cache_path = self.store.profile_cache_path(scientific_name);
        match self.store.read_json_cache::<SpeciesProfile>(&cache_path) {
            CacheEntry::Valid(profile) => return Ok(profile),
            CacheEntry::Corrupt => {
                warn!(species = scientific_name, path = %cache_path, "corrupt cache entry, refetching");
            }
            CacheEntry::Absent => {}
        }

        let inat = match self.inat.lookup(scientific_name) {
            Lookup::Found(record) => Some(record),
            Lookup::NotFound => None,
            Lookup::Failed(reason) => {
                warn!(species = scientific_name, reason = %reason, "iNaturalist lookup failed");
                None
            }
        };
        let gbif = match self.gbif.lookup(scientific_name) {
            Lookup::Found(record) => Some(record),
            Lookup::NotFound => None,
            Lookup::Failed(reason) => {
                warn!(species = scientific_name, reason = %reason, "GBIF lookup failed");
                None
            }
        };

        let mut profile = SpeciesProfile {
            scientific_name: scientific_name.to_string(),
            inat,
            gbif,
        };
        if let Some(url) = profile.first_remote_image().map(str::to_string) {
            let image_local = self.materialize_image(&url, scientific_name);
            if let Some(inat) = profile.inat.as_mut() {
                inat.image_local = image_local;
            }
        }

        self.store.write_json_atomic(&cache_path, &profile)?;
        Ok(profile)
    }

    /// Download and persist one representative image. Any failure, including
    /// persisting, degrades to "no image".
    fn materialize_image(&self, url: &str, scientific_name: &str) -> Option<String> {
        let bytes = match self.images.fetch(url) {
            Lookup::Found(bytes) => bytes,
            Lookup::NotFound => {
                warn!(species = scientific_name, url, "image not found");
                return None;
            }
            Lookup::Failed(reason) => {
                warn!(species = scientific_name, url, reason = %reason, "image download failed");
                return None;
            }
        };
        match self.store.write_species_image(scientific_name, &bytes) {
            Ok(reference) => Some(reference),
            Err(err) => {
                warn!(species = scientific_name, reason = %err, "failed to persist image");
                None
            }
        }
    }

    /// Enrich every species of both categories sequentially. Species without
    /// a scientific name are skipped; a failure for one species is recorded
    /// and the loop continues. Each success INSERTs an enrichment row and
    /// appends one export row.
    pub fn run_batch(
        &self,
        db: &Database,
        export_path: &Utf8Path,
    ) -> Result<BatchReport, AvifloraError> {
        self.store.ensure_roots()?;
        let mut writer = export::writer(export_path)?;
        let mut report = BatchReport::default();

        for category in Category::ALL {
            for record in db.search_species(category, None)? {
                let name = record.scientific_name.trim().to_string();
                if name.is_empty() {
                    report.skipped += 1;
                    continue;
                }
                info!(category = %category, species = %name, "enriching");
                match self.enrich_one(db, category, &name, record.common_name.as_deref()) {
                    Ok(row) => {
                        writer
                            .serialize(&row)
                            .map_err(|err| AvifloraError::Csv(err.to_string()))?;
                        report.processed += 1;
                    }
                    Err(err) => {
                        warn!(category = %category, species = %name, reason = %err, "enrichment failed");
                        report.failures.push(BatchFailure {
                            category,
                            scientific_name: name,
                            reason: err.to_string(),
                        });
                    }
                }
            }
        }

        writer
            .flush()
            .map_err(|err| AvifloraError::Csv(err.to_string()))?;
        Ok(report)
    }

    fn enrich_one(
        &self,
        db: &Database,
        category: Category,
        scientific_name: &str,
        common_name: Option<&str>,
    ) -> Result<ExportRow, AvifloraError> {
        let profile = self.species_profile(scientific_name)?;
        db.insert_profile(category, common_name, &profile)?;
        Ok(ExportRow::from_profile(category, common_name, &profile))
    }
}
