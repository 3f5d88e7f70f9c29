//! Reference dataset registry.
//!
//! Loads the country specs (`"iban"`) and the bank directory (`"bank"`) from a
//! [`DataSource`], merges their fragments, runs the one-time enrichment pass
//! that compiles each country's BBAN grammar, and derives the lookup indices
//! (`"bic"`, `"bank_code"`, `"country"`). After [`Registry::load`] returns the
//! registry is never mutated again; [`Registry::ensure_loaded`] shares one
//! instance per process.

use crate::error::{RegistryError, ValidationError};
use crate::source::{BundledSource, DataSource, DirectorySource, Fragment};
use crate::spec::CountrySpec;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Overrides the bundled dataset with a directory of fragments.
pub const DATA_DIR_ENV: &str = "IBANBIC_DATA_DIR";

static GLOBAL: OnceCell<Registry> = OnceCell::new();

/// A bank directory record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankEntry {
    pub country_code: String,
    pub bank_code: String,
    #[serde(default)]
    pub branch_code: Option<String>,
    #[serde(default)]
    pub bic: String,
    pub name: String,
    #[serde(default)]
    pub short_name: String,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub checksum_algo: Option<String>,
}

/// Fields of [`BankEntry`] usable as index keys and predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BankField {
    CountryCode,
    BankCode,
    BranchCode,
    Bic,
    Name,
    ShortName,
    Primary,
    ChecksumAlgo,
}

impl BankEntry {
    /// Field value as text; absent or false values are the empty string.
    pub fn field(&self, field: BankField) -> &str {
        match field {
            BankField::CountryCode => &self.country_code,
            BankField::BankCode => &self.bank_code,
            BankField::BranchCode => self.branch_code.as_deref().unwrap_or(""),
            BankField::Bic => &self.bic,
            BankField::Name => &self.name,
            BankField::ShortName => &self.short_name,
            BankField::Primary => {
                if self.primary {
                    "true"
                } else {
                    ""
                }
            }
            BankField::ChecksumAlgo => self.checksum_algo.as_deref().unwrap_or(""),
        }
    }
}

pub type IndexKey = Vec<String>;
pub type BankIndex = BTreeMap<IndexKey, Vec<BankEntry>>;

/// Read-only view of one named dataset.
#[derive(Debug, Clone, Copy)]
pub enum Dataset<'a> {
    Countries(&'a BTreeMap<String, CountrySpec>),
    Banks(&'a [BankEntry]),
    Index(&'a BankIndex),
}

/// Mutable handle passed to [`Registry::manipulate`] callbacks.
pub enum Record<'a> {
    Country(&'a str, &'a mut CountrySpec),
    Bank(&'a mut BankEntry),
}

#[derive(Debug)]
pub struct Registry {
    countries: BTreeMap<String, CountrySpec>,
    banks: Vec<BankEntry>,
    indices: BTreeMap<String, BankIndex>,
}

impl Registry {
    /// Process-wide registry, loaded on first call. Later calls return the
    /// same instance; a failed load is retried on the next call.
    pub fn ensure_loaded() -> Result<&'static Registry, RegistryError> {
        GLOBAL.get_or_try_init(|| match std::env::var(DATA_DIR_ENV) {
            Ok(dir) if !dir.trim().is_empty() => {
                log::info!("loading reference data from {}", dir);
                Registry::load(&DirectorySource::new(dir))
            }
            _ => Registry::load(&BundledSource),
        })
    }

    pub fn bundled() -> Result<Registry, RegistryError> {
        Registry::load(&BundledSource)
    }

    pub fn load(source: &dyn DataSource) -> Result<Registry, RegistryError> {
        let countries: BTreeMap<String, CountrySpec> =
            serde_json::from_value(load_value(source, "iban")?).map_err(|err| {
                RegistryError::Parse {
                    name: "iban".to_string(),
                    message: err.to_string(),
                }
            })?;
        let banks = match load_value(source, "bank")? {
            value @ Value::Array(_) => {
                serde_json::from_value::<Vec<BankEntry>>(value).map_err(|err| {
                    RegistryError::Parse {
                        name: "bank".to_string(),
                        message: err.to_string(),
                    }
                })?
            }
            _ => return Err(RegistryError::NotAList("bank".to_string())),
        };

        let mut registry = Registry {
            countries,
            banks,
            indices: BTreeMap::new(),
        };
        registry.manipulate("iban", |record| match record {
            Record::Country(code, spec) => spec.compile(code),
            Record::Bank(_) => Ok(()),
        })?;
        registry.build_index("bank", "bic", &[BankField::Bic], true, &[])?;
        registry.build_index(
            "bank",
            "bank_code",
            &[BankField::CountryCode, BankField::BankCode],
            true,
            &[],
        )?;
        registry.build_index("bank", "country", &[BankField::CountryCode], true, &[])?;

        log::info!(
            "registry loaded: {} country specs, {} bank entries",
            registry.countries.len(),
            registry.banks.len()
        );
        Ok(registry)
    }

    pub fn get(&self, name: &str) -> Result<Dataset<'_>, RegistryError> {
        match name {
            "iban" => Ok(Dataset::Countries(&self.countries)),
            "bank" => Ok(Dataset::Banks(&self.banks)),
            _ => self
                .indices
                .get(name)
                .map(Dataset::Index)
                .ok_or_else(|| RegistryError::UnknownDataset(name.to_string())),
        }
    }

    /// Derive a named index from a list dataset. See [`build_index`].
    pub fn build_index(
        &mut self,
        base: &str,
        index_name: &str,
        key: &[BankField],
        accumulate: bool,
        predicate: &[(BankField, &str)],
    ) -> Result<(), RegistryError> {
        let entries = match self.get(base)? {
            Dataset::Banks(entries) => entries,
            _ => return Err(RegistryError::NotAList(base.to_string())),
        };
        let index = build_index(entries, key, accumulate, predicate);
        log::debug!(
            "built index {} from {} with {} keys",
            index_name,
            base,
            index.len()
        );
        self.indices.insert(index_name.to_string(), index);
        Ok(())
    }

    /// Apply `func` to every record of a base dataset, in place.
    pub fn manipulate<F>(&mut self, name: &str, mut func: F) -> Result<(), RegistryError>
    where
        F: FnMut(Record<'_>) -> Result<(), RegistryError>,
    {
        match name {
            "iban" => {
                for (code, spec) in self.countries.iter_mut() {
                    func(Record::Country(code, spec))?;
                }
            }
            "bank" => {
                for entry in self.banks.iter_mut() {
                    func(Record::Bank(entry))?;
                }
            }
            _ => return Err(RegistryError::UnknownDataset(name.to_string())),
        }
        Ok(())
    }

    pub fn country_spec(&self, country_code: &str) -> Option<&CountrySpec> {
        self.countries.get(country_code)
    }

    /// Like [`Registry::country_spec`] but unknown codes are a validation error.
    pub fn spec(&self, country_code: &str) -> Result<&CountrySpec, ValidationError> {
        self.country_spec(country_code).ok_or_else(|| {
            ValidationError::InvalidCountryCode(format!("Unknown country-code '{country_code}'"))
        })
    }

    pub fn countries(&self) -> impl Iterator<Item = (&str, &CountrySpec)> {
        self.countries
            .iter()
            .map(|(code, spec)| (code.as_str(), spec))
    }

    pub fn banks(&self) -> &[BankEntry] {
        &self.banks
    }

    fn index_lookup(&self, index: &str, key: &[String]) -> Option<&[BankEntry]> {
        self.indices
            .get(index)
            .and_then(|index| index.get(key))
            .map(|entries| entries.as_slice())
    }

    pub fn banks_by_bank_code(&self, country_code: &str, bank_code: &str) -> Option<&[BankEntry]> {
        self.index_lookup(
            "bank_code",
            &[country_code.to_string(), bank_code.to_string()],
        )
    }

    pub fn banks_by_bic(&self, bic: &str) -> &[BankEntry] {
        self.index_lookup("bic", &[bic.to_string()]).unwrap_or(&[])
    }

    pub fn banks_by_country(&self, country_code: &str) -> Option<&[BankEntry]> {
        self.index_lookup("country", &[country_code.to_string()])
    }

    /// Countries that have at least one bank directory entry.
    pub fn bank_countries(&self) -> Vec<&str> {
        self.indices
            .get("country")
            .map(|index| {
                index
                    .keys()
                    .filter_map(|key| key.first().map(String::as_str))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Group `entries` by `key`.
///
/// Entries not matching every `(field, value)` predicate are skipped, as are
/// entries whose key has an empty component. With `accumulate` each key maps
/// to all its entries in source order; without it the last entry wins.
pub fn build_index(
    entries: &[BankEntry],
    key: &[BankField],
    accumulate: bool,
    predicate: &[(BankField, &str)],
) -> BankIndex {
    let mut index = BankIndex::new();
    for entry in entries {
        if !predicate
            .iter()
            .all(|(field, value)| entry.field(*field) == *value)
        {
            continue;
        }
        let index_key: IndexKey = key
            .iter()
            .map(|field| entry.field(*field).to_string())
            .collect();
        if index_key.is_empty() || index_key.iter().any(|part| part.is_empty()) {
            continue;
        }
        if accumulate {
            index.entry(index_key).or_default().push(entry.clone());
        } else {
            index.insert(index_key, vec![entry.clone()]);
        }
    }
    index
}

/// Merge two fragments of the same dataset: lists concatenate, mappings
/// merge key-wise with the right side winning on leaf conflicts.
pub fn merge_values(name: &str, left: Value, right: Value) -> Result<Value, RegistryError> {
    match (left, right) {
        (Value::Array(mut left), Value::Array(right)) => {
            left.extend(right);
            Ok(Value::Array(left))
        }
        (Value::Object(left), Value::Object(right)) => Ok(Value::Object(merge_maps(left, right))),
        _ => Err(RegistryError::UnsupportedFragment(name.to_string())),
    }
}

pub fn merge_maps(mut left: Map<String, Value>, right: Map<String, Value>) -> Map<String, Value> {
    for (key, right_value) in right {
        let merged = match (left.remove(&key), right_value) {
            (Some(Value::Object(left_map)), Value::Object(right_map)) => {
                Value::Object(merge_maps(left_map, right_map))
            }
            (_, right_value) => right_value,
        };
        left.insert(key, merged);
    }
    left
}

fn parse_fragment(name: &str, fragment: &Fragment) -> Result<Value, RegistryError> {
    let parse_err = |message: String| RegistryError::Parse {
        name: name.to_string(),
        message,
    };
    match fragment {
        Fragment::Json(body) => serde_json::from_str(body).map_err(|err| parse_err(err.to_string())),
        Fragment::Csv(body) if name == "bank" => {
            let mut reader = csv::Reader::from_reader(body.as_bytes());
            let mut entries: Vec<BankEntry> = Vec::new();
            for result in reader.deserialize() {
                entries.push(result.map_err(|err| parse_err(err.to_string()))?);
            }
            serde_json::to_value(entries).map_err(|err| parse_err(err.to_string()))
        }
        Fragment::Csv(_) => Err(RegistryError::UnsupportedFragment(name.to_string())),
    }
}

fn load_value(source: &dyn DataSource, name: &str) -> Result<Value, RegistryError> {
    let mut data: Option<Value> = None;
    for fragment in source.fragments(name)? {
        let chunk = parse_fragment(name, &fragment)?;
        data = Some(match data {
            None => chunk,
            Some(existing) => merge_values(name, existing, chunk)?,
        });
    }
    data.ok_or_else(|| RegistryError::MissingDataset(name.to_string()))
}
