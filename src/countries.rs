//! File-backed country lookups. Simple key/value reads over the mock data
//! files; not-found is absent, never an error.

use std::collections::BTreeMap;
use std::path::PathBuf;

const CAPITALS_FILE: &str = "countries.json";
const FLAGS_FILE: &str = "flags.json";

/// Lookup handle over the mock data directory.
#[derive(Debug, Clone)]
pub struct CountryData {
    base_dir: PathBuf,
}

impl CountryData {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Capital city for a country, or `None` if unknown.
    pub async fn capital(&self, country: &str) -> Option<String> {
        self.lookup(CAPITALS_FILE, country).await
    }

    /// Flag emoji for a country, or `None` if unknown.
    pub async fn flag(&self, country: &str) -> Option<String> {
        self.lookup(FLAGS_FILE, country).await
    }

    /// Country names the data files know about (union of both maps).
    pub async fn known_countries(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for file in [CAPITALS_FILE, FLAGS_FILE] {
            if let Some(map) = self.read_map(file).await {
                for name in map.keys() {
                    if !names.iter().any(|existing| existing == name) {
                        names.push(name.clone());
                    }
                }
            }
        }
        names
    }

    async fn lookup(&self, file: &str, country: &str) -> Option<String> {
        let normalized = country.trim().to_lowercase();
        let map = self.read_map(file).await?;
        map.get(&normalized).cloned()
    }

    async fn read_map(&self, file: &str) -> Option<BTreeMap<String, String>> {
        let path = self.base_dir.join(file);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(error) => {
                tracing::error!(path = %path.display(), %error, "country data file unreadable");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(map) => Some(map),
            Err(error) => {
                tracing::error!(path = %path.display(), %error, "country data file is not valid JSON");
                None
            }
        }
    }
}
