use crate::error::RegistryError;
use std::borrow::Cow;
use std::path::{Path, PathBuf};

/// One file's worth of a dataset.
#[derive(Debug, Clone)]
pub enum Fragment {
    Json(Cow<'static, str>),
    Csv(Cow<'static, str>),
}

/// Where the registry gets its raw datasets from. Fragments are applied in
/// the order returned.
pub trait DataSource {
    fn fragments(&self, name: &str) -> Result<Vec<Fragment>, RegistryError>;
}

/// Reference data compiled into the binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct BundledSource;

impl DataSource for BundledSource {
    fn fragments(&self, name: &str) -> Result<Vec<Fragment>, RegistryError> {
        match name {
            "iban" => Ok(vec![
                Fragment::Json(Cow::Borrowed(include_str!(
                    "../data/iban_registry/generated.json"
                ))),
                Fragment::Json(Cow::Borrowed(include_str!(
                    "../data/iban_registry/overwrite.json"
                ))),
            ]),
            "bank" => Ok(vec![
                Fragment::Csv(Cow::Borrowed(include_str!("../data/bank_registry/de.csv"))),
                Fragment::Csv(Cow::Borrowed(include_str!("../data/bank_registry/fr.csv"))),
                Fragment::Csv(Cow::Borrowed(include_str!(
                    "../data/bank_registry/misc.csv"
                ))),
            ]),
            _ => Err(RegistryError::UnknownDataset(name.to_string())),
        }
    }
}

/// Reads `<root>/<name>_registry/*.json` and `*.csv`, sorted by file name.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl DataSource for DirectorySource {
    fn fragments(&self, name: &str) -> Result<Vec<Fragment>, RegistryError> {
        let dir = self.root.join(format!("{name}_registry"));
        let io_err = |path: &Path, err: std::io::Error| RegistryError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        };
        if !dir.is_dir() {
            return Err(RegistryError::UnknownDataset(name.to_string()));
        }

        let mut paths: Vec<PathBuf> = Vec::new();
        for entry in std::fs::read_dir(&dir).map_err(|err| io_err(&dir, err))? {
            let path = entry.map_err(|err| io_err(&dir, err))?.path();
            if path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();

        let mut fragments = Vec::new();
        for path in paths {
            let extension = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.to_ascii_lowercase());
            let fragment: fn(Cow<'static, str>) -> Fragment = match extension.as_deref() {
                Some("json") => Fragment::Json,
                Some("csv") => Fragment::Csv,
                _ => continue,
            };
            let body = std::fs::read_to_string(&path).map_err(|err| io_err(&path, err))?;
            log::debug!("dataset {} fragment {}", name, path.display());
            fragments.push(fragment(Cow::Owned(body)));
        }
        Ok(fragments)
    }
}

/// In-memory fragments keyed by dataset name.
#[derive(Debug, Default, Clone)]
pub struct StaticSource {
    datasets: Vec<(String, Vec<Fragment>)>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, fragment: Fragment) -> Self {
        match self.datasets.iter_mut().find(|(key, _)| key == name) {
            Some((_, fragments)) => fragments.push(fragment),
            None => self.datasets.push((name.to_string(), vec![fragment])),
        }
        self
    }
}

impl DataSource for StaticSource {
    fn fragments(&self, name: &str) -> Result<Vec<Fragment>, RegistryError> {
        self.datasets
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, fragments)| fragments.clone())
            .ok_or_else(|| RegistryError::UnknownDataset(name.to_string()))
    }
}
