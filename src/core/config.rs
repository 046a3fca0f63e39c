use anyhow::{Context, Result, bail};
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use std::fmt;
use std::marker::PhantomData;
use std::{fs, path::Path};
use tracing::debug;

pub const DEFAULT_FOLLOW_LIST: &str = "follow_list.json";
pub const DEFAULT_ALPHA_VANTAGE_URL: &str = "https://www.alphavantage.co";

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct TrackedStock {
    pub code: String,
    pub name: String,
}

impl fmt::Display for TrackedStock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code, self.name)
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct TrackedConversion {
    pub from_currency: String,
    pub to_currency: String,
}

impl fmt::Display for TrackedConversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.from_currency, self.to_currency)
    }
}

/// Keyed entries in the order they appear in the document.
///
/// The keys carry no meaning beyond identifying an entry in logs and
/// summaries. A key that appears twice keeps its first position and its
/// last value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entries<T>(Vec<(String, T)>);

impl<T> Entries<T> {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.0.iter().map(|(key, entry)| (key.as_str(), entry))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn insert(&mut self, key: String, entry: T) {
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = entry,
            None => self.0.push((key, entry)),
        }
    }
}

impl<T> Default for Entries<T> {
    fn default() -> Self {
        Entries(Vec::new())
    }
}

impl<K: Into<String>, T> FromIterator<(K, T)> for Entries<T> {
    fn from_iter<I: IntoIterator<Item = (K, T)>>(iter: I) -> Self {
        let mut entries = Entries::default();
        for (key, entry) in iter {
            entries.insert(key.into(), entry);
        }
        entries
    }
}

struct EntriesVisitor<T>(PhantomData<T>);

impl<'de, T: Deserialize<'de>> Visitor<'de> for EntriesVisitor<T> {
    type Value = Entries<T>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of keys to entries")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut entries = Entries::default();
        while let Some((key, entry)) = map.next_entry::<String, T>()? {
            entries.insert(key, entry);
        }
        Ok(entries)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Entries<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(EntriesVisitor(PhantomData))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AlphaVantageProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProvidersConfig {
    pub alpha_vantage: Option<AlphaVantageProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            alpha_vantage: Some(AlphaVantageProviderConfig {
                base_url: DEFAULT_ALPHA_VANTAGE_URL.to_string(),
            }),
        }
    }
}

impl ProvidersConfig {
    pub fn alpha_vantage_url(&self) -> &str {
        self.alpha_vantage
            .as_ref()
            .map_or(DEFAULT_ALPHA_VANTAGE_URL, |p| &p.base_url)
    }
}

fn default_report_offset() -> i32 {
    -3
}

#[derive(Debug, Deserialize, Clone)]
pub struct FollowList {
    pub stocks: Entries<TrackedStock>,
    pub conversions: Entries<TrackedConversion>,
    #[serde(default)]
    pub providers: ProvidersConfig,
    /// Offset from UTC, in hours, used for exchange rate timestamps.
    #[serde(default = "default_report_offset")]
    pub report_utc_offset_hours: i32,
}

impl FollowList {
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read follow list: {}", path.display()))?;

        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

        let follow_list: Self = if is_yaml {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse follow list: {}", path.display()))?
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse follow list: {}", path.display()))?
        };

        debug!(
            stocks = follow_list.stocks.len(),
            conversions = follow_list.conversions.len(),
            "Successfully loaded follow list"
        );
        Ok(follow_list)
    }
}

/// Provider secret. Never printed.
#[derive(Clone)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        if key.trim().is_empty() {
            bail!("API key is empty");
        }
        Ok(ApiKey(key.trim().to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_follow_list_deserialization() {
        let json_str = r#"{
            "stocks": {
                "pepsi": {"code": "PEP", "name": "PepsiCo Inc"},
                "att": {"code": "T", "name": "AT&T Inc"}
            },
            "conversions": {
                "eur_usd": {"from_currency": "EUR", "to_currency": "USD"}
            }
        }"#;

        let config: FollowList = serde_json::from_str(json_str).expect("Failed to deserialize");
        assert_eq!(config.stocks.len(), 2);
        let stocks: Vec<_> = config.stocks.iter().collect();
        assert_eq!(stocks[0].0, "pepsi");
        assert_eq!(stocks[0].1.code, "PEP");
        assert_eq!(stocks[0].1.name, "PepsiCo Inc");
        assert_eq!(stocks[1].1.code, "T");

        let conversions: Vec<_> = config.conversions.iter().collect();
        assert_eq!(conversions.len(), 1);
        assert_eq!(conversions[0].1.from_currency, "EUR");
        assert_eq!(conversions[0].1.to_currency, "USD");

        assert_eq!(config.providers.alpha_vantage_url(), DEFAULT_ALPHA_VANTAGE_URL);
        assert_eq!(config.report_utc_offset_hours, -3);
    }

    #[test]
    fn test_entries_keep_document_order() {
        let json_str = r#"{"z": {"code": "Z", "name": "Zed"}, "a": {"code": "A", "name": "Ay"},
            "m": {"code": "M", "name": "Em"}}"#;
        let entries: Entries<TrackedStock> = serde_json::from_str(json_str).unwrap();
        let keys: Vec<_> = entries.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_entries_repeated_key_replaces_in_place() {
        let json_str = r#"{"a": {"code": "A1", "name": "First"}, "b": {"code": "B", "name": "Bee"},
            "a": {"code": "A2", "name": "Second"}}"#;
        let entries: Entries<TrackedStock> = serde_json::from_str(json_str).unwrap();
        let codes: Vec<_> = entries.iter().map(|(_, s)| s.code.as_str()).collect();
        assert_eq!(codes, vec!["A2", "B"]);
    }

    #[test]
    fn test_provider_override_and_offset() {
        let json_str = r#"{
            "stocks": {},
            "conversions": {},
            "providers": {"alpha_vantage": {"base_url": "http://localhost:9999"}},
            "report_utc_offset_hours": 2
        }"#;
        let config: FollowList = serde_json::from_str(json_str).unwrap();
        assert_eq!(config.providers.alpha_vantage_url(), "http://localhost:9999");
        assert_eq!(config.report_utc_offset_hours, 2);
        assert!(config.stocks.is_empty());
    }

    #[test]
    fn test_missing_collection_is_an_error() {
        let json_str = r#"{"stocks": {}}"#;
        assert!(serde_json::from_str::<FollowList>(json_str).is_err());
    }

    #[test]
    fn test_load_yaml_follow_list() -> Result<()> {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile()?;
        write!(
            file,
            r#"
stocks:
  pepsi:
    code: PEP
    name: PepsiCo Inc
conversions:
  brl_usd:
    from_currency: BRL
    to_currency: USD
"#
        )?;

        let config = FollowList::load_from_path(file.path())?;
        assert_eq!(config.stocks.len(), 1);
        assert_eq!(config.conversions.iter().next().unwrap().1.from_currency, "BRL");
        Ok(())
    }

    #[test]
    fn test_load_missing_file_names_path() {
        let err = FollowList::load_from_path("/nonexistent/follow_list.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/follow_list.json"));
    }

    #[test]
    fn test_load_malformed_file() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(file, "{{ not json")?;
        let err = FollowList::load_from_path(file.path()).unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse follow list"));
        Ok(())
    }

    #[test]
    fn test_api_key_is_redacted() {
        let key = ApiKey::new("secret-123").unwrap();
        assert_eq!(key.expose(), "secret-123");
        assert_eq!(format!("{key:?}"), "ApiKey(***)");
        assert!(ApiKey::new("  ").is_err());
    }
}
