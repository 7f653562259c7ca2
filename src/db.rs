use camino::Utf8Path;
use rusqlite::{Connection, OptionalExtension, params};

use crate::domain::{Category, EnrichmentRecord, SpeciesRecord};
use crate::enrich::SpeciesProfile;
use crate::error::AvifloraError;

/// SQLite-backed catalog: the two species tables loaded from CSV and the
/// accumulated enrichment rows.
pub struct Database {
    conn: Connection,
}

/// Seed row for the birds table, produced by the CSV loader.
#[derive(Debug, Clone)]
pub struct NewBird {
    pub seq: Option<i64>,
    pub taxon_order: Option<String>,
    pub family: Option<String>,
    pub scientific_name: String,
    pub common_name: Option<String>,
    pub resident: i64,
    pub breeding: i64,
    pub migratory: i64,
}

/// Seed row for the plants table.
#[derive(Debug, Clone)]
pub struct NewPlant {
    pub family: Option<String>,
    pub scientific_name: String,
    pub common_name: Option<String>,
    pub usage: Option<String>,
    pub physiognomy: Option<String>,
    pub august_state: Option<String>,
    pub october_state: Option<String>,
}

impl Database {
    pub fn open(path: &Utf8Path) -> Result<Self, AvifloraError> {
        let conn = Connection::open(path.as_std_path())
            .map_err(|err| AvifloraError::Database(err.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn in_memory() -> Result<Self, AvifloraError> {
        let conn = Connection::open_in_memory()
            .map_err(|err| AvifloraError::Database(err.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), AvifloraError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS birds (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                seq INTEGER,
                taxon_order TEXT,
                family TEXT,
                scientific_name TEXT,
                common_name TEXT,
                resident INTEGER NOT NULL DEFAULT 0,
                breeding INTEGER NOT NULL DEFAULT 0,
                migratory INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS plants (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                family TEXT,
                scientific_name TEXT,
                common_name TEXT,
                usage TEXT,
                physiognomy TEXT,
                august_state TEXT,
                october_state TEXT
            );

            -- Enrichment rows accumulate: no uniqueness on (category, name),
            -- reruns INSERT and readers take the latest row.
            CREATE TABLE IF NOT EXISTS species_profiles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                category TEXT NOT NULL,
                scientific_name TEXT NOT NULL,
                common_name TEXT,
                summary TEXT,
                kingdom TEXT,
                phylum TEXT,
                class TEXT,
                taxon_order TEXT,
                family TEXT,
                genus TEXT,
                countries TEXT,
                image_local TEXT,
                raw_json TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_species_profiles_name
                ON species_profiles(category, scientific_name);
            "#,
        )
        .map_err(|err| AvifloraError::Database(err.to_string()))
    }

    /// Full replace of the birds table: truncate plus reload in a single
    /// transaction, never incremental.
    pub fn replace_birds(&mut self, rows: &[NewBird]) -> Result<usize, AvifloraError> {
        let tx = self
            .conn
            .transaction()
            .map_err(|err| AvifloraError::Database(err.to_string()))?;
        tx.execute("DELETE FROM birds", [])
            .map_err(|err| AvifloraError::Database(err.to_string()))?;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO birds (seq, taxon_order, family, scientific_name, common_name,
                                        resident, breeding, migratory)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                )
                .map_err(|err| AvifloraError::Database(err.to_string()))?;
            for row in rows {
                stmt.execute(params![
                    row.seq,
                    row.taxon_order,
                    row.family,
                    row.scientific_name,
                    row.common_name,
                    row.resident,
                    row.breeding,
                    row.migratory,
                ])
                .map_err(|err| AvifloraError::Database(err.to_string()))?;
            }
        }
        tx.commit()
            .map_err(|err| AvifloraError::Database(err.to_string()))?;
        Ok(rows.len())
    }

    /// Full replace of the plants table, same contract as `replace_birds`.
    pub fn replace_plants(&mut self, rows: &[NewPlant]) -> Result<usize, AvifloraError> {
        let tx = self
            .conn
            .transaction()
            .map_err(|err| AvifloraError::Database(err.to_string()))?;
        tx.execute("DELETE FROM plants", [])
            .map_err(|err| AvifloraError::Database(err.to_string()))?;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO plants (family, scientific_name, common_name, usage,
                                         physiognomy, august_state, october_state)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                )
                .map_err(|err| AvifloraError::Database(err.to_string()))?;
            for row in rows {
                stmt.execute(params![
                    row.family,
                    row.scientific_name,
                    row.common_name,
                    row.usage,
                    row.physiognomy,
                    row.august_state,
                    row.october_state,
                ])
                .map_err(|err| AvifloraError::Database(err.to_string()))?;
            }
        }
        tx.commit()
            .map_err(|err| AvifloraError::Database(err.to_string()))?;
        Ok(rows.len())
    }

    /// All species of one category, in catalog order (birds by checklist
    /// sequence, plants by scientific name). Pass a query for a free-text
    /// LIKE filter across name, common name, family (and order for birds).
    pub fn search_species(
        &self,
        category: Category,
        query: Option<&str>,
    ) -> Result<Vec<SpeciesRecord>, AvifloraError> {
        let filter = query.map(str::trim).filter(|q| !q.is_empty());
        let sql = species_query(category, filter.is_some());
        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|err| AvifloraError::Database(err.to_string()))?;

        let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<SpeciesRecord> {
            Ok(SpeciesRecord {
                id: row.get(0)?,
                category,
                seq: row.get(1)?,
                taxon_order: row.get(2)?,
                family: row.get(3)?,
                scientific_name: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                common_name: row.get(5)?,
            })
        };

        let rows = match filter {
            Some(q) => stmt
                .query_map(params![format!("%{q}%")], map_row)
                .map_err(|err| AvifloraError::Database(err.to_string()))?
                .collect::<rusqlite::Result<Vec<_>>>(),
            None => stmt
                .query_map([], map_row)
                .map_err(|err| AvifloraError::Database(err.to_string()))?
                .collect::<rusqlite::Result<Vec<_>>>(),
        };
        rows.map_err(|err| AvifloraError::Database(err.to_string()))
    }

    pub fn species_by_id(
        &self,
        category: Category,
        id: i64,
    ) -> Result<Option<SpeciesRecord>, AvifloraError> {
        let sql = format!(
            "{} WHERE id = ?1",
            species_select(category)
        );
        self.conn
            .query_row(&sql, params![id], |row| {
                Ok(SpeciesRecord {
                    id: row.get(0)?,
                    category,
                    seq: row.get(1)?,
                    taxon_order: row.get(2)?,
                    family: row.get(3)?,
                    scientific_name: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                    common_name: row.get(5)?,
                })
            })
            .optional()
            .map_err(|err| AvifloraError::Database(err.to_string()))
    }

    pub fn species_by_name(
        &self,
        category: Category,
        scientific_name: &str,
    ) -> Result<Option<SpeciesRecord>, AvifloraError> {
        let sql = format!("{} WHERE scientific_name = ?1", species_select(category));
        self.conn
            .query_row(&sql, params![scientific_name], |row| {
                Ok(SpeciesRecord {
                    id: row.get(0)?,
                    category,
                    seq: row.get(1)?,
                    taxon_order: row.get(2)?,
                    family: row.get(3)?,
                    scientific_name: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                    common_name: row.get(5)?,
                })
            })
            .optional()
            .map_err(|err| AvifloraError::Database(err.to_string()))
    }

    /// Persist one enrichment result. Always an INSERT; duplicates accumulate
    /// across reruns and `latest_profile` disambiguates.
    pub fn insert_profile(
        &self,
        category: Category,
        common_name: Option<&str>,
        profile: &SpeciesProfile,
    ) -> Result<i64, AvifloraError> {
        let raw_json = serde_json::to_string(profile)
            .map_err(|err| AvifloraError::CacheEncode(err.to_string()))?;
        let countries = profile.countries().join(", ");
        self.conn
            .execute(
                "INSERT INTO species_profiles (category, scientific_name, common_name, summary,
                                               kingdom, phylum, class, taxon_order, family, genus,
                                               countries, image_local, raw_json, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                params![
                    category.as_str(),
                    profile.scientific_name,
                    common_name,
                    profile.summary(),
                    profile.kingdom(),
                    profile.phylum(),
                    profile.class(),
                    profile.taxon_order(),
                    profile.family(),
                    profile.genus(),
                    countries,
                    profile.image_local(),
                    raw_json,
                    chrono::Utc::now().to_rfc3339(),
                ],
            )
            .map_err(|err| AvifloraError::Database(err.to_string()))?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Latest enrichment row for a species, or None if it was never enriched.
    pub fn latest_profile(
        &self,
        category: Category,
        scientific_name: &str,
    ) -> Result<Option<EnrichmentRecord>, AvifloraError> {
        self.conn
            .query_row(
                "SELECT id, scientific_name, common_name, summary, kingdom, phylum, class,
                        taxon_order, family, genus, countries, image_local, raw_json, created_at
                 FROM species_profiles
                 WHERE category = ?1 AND scientific_name = ?2
                 ORDER BY id DESC LIMIT 1",
                params![category.as_str(), scientific_name],
                |row| {
                    let countries: Option<String> = row.get(10)?;
                    let raw_json: String = row.get(12)?;
                    Ok(EnrichmentRecord {
                        id: row.get(0)?,
                        category,
                        scientific_name: row.get(1)?,
                        common_name: row.get(2)?,
                        summary: row.get(3)?,
                        kingdom: row.get(4)?,
                        phylum: row.get(5)?,
                        class: row.get(6)?,
                        taxon_order: row.get(7)?,
                        family: row.get(8)?,
                        genus: row.get(9)?,
                        countries: split_countries(countries.as_deref()),
                        image_local: row.get(11)?,
                        raw: parse_raw(&raw_json),
                        created_at: row.get(13)?,
                    })
                },
            )
            .optional()
            .map_err(|err| AvifloraError::Database(err.to_string()))
    }

    pub fn profile_count(&self, category: Category) -> Result<i64, AvifloraError> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM species_profiles WHERE category = ?1",
                params![category.as_str()],
                |row| row.get(0),
            )
            .map_err(|err| AvifloraError::Database(err.to_string()))
    }
}

fn species_select(category: Category) -> &'static str {
    match category {
        Category::Bird => {
            "SELECT id, seq, taxon_order, family, scientific_name, common_name FROM birds"
        }
        Category::Plant => {
            "SELECT id, NULL, NULL, family, scientific_name, common_name FROM plants"
        }
    }
}

fn species_query(category: Category, filtered: bool) -> String {
    let mut sql = species_select(category).to_string();
    if filtered {
        match category {
            Category::Bird => sql.push_str(
                " WHERE scientific_name LIKE ?1 OR common_name LIKE ?1
                   OR family LIKE ?1 OR taxon_order LIKE ?1",
            ),
            Category::Plant => sql.push_str(
                " WHERE scientific_name LIKE ?1 OR common_name LIKE ?1 OR family LIKE ?1",
            ),
        }
    }
    match category {
        Category::Bird => sql.push_str(" ORDER BY seq"),
        Category::Plant => sql.push_str(" ORDER BY scientific_name"),
    }
    sql
}

fn split_countries(countries: Option<&str>) -> Vec<String> {
    match countries {
        Some(joined) if !joined.is_empty() => {
            joined.split(", ").map(|c| c.to_string()).collect()
        }
        _ => Vec::new(),
    }
}

/// The raw payload is kept for audit only; an unparseable blob degrades to
/// null rather than failing the lookup.
fn parse_raw(raw_json: &str) -> serde_json::Value {
    match serde_json::from_str(raw_json) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(reason = %err, "stored raw payload is not valid JSON");
            serde_json::Value::Null
        }
    }
}
