//! Layered key/value settings store.
//!
//! The [`ConfigStore`] is a flat, read-only map of dotted keys
//! (`server.tls.enabled`) to raw strings, built once from an ordered list of
//! sources. Later sources win:
//!
//! 1. Defaults registered with [`ConfigStoreBuilder::set_default`]
//! 2. Configuration files (INI by default, TOML/JSON/YAML by extension)
//! 3. Environment variables (`server.tls.enabled` ⇒ `SERVER_TLS_ENABLED`)
//! 4. Explicit overrides registered with [`ConfigStoreBuilder::set`]
//!
//! # Example
//!
//! ```
//! use ballast_config::ConfigStore;
//!
//! let store = ConfigStore::builder()
//!     .set_default("server.port", "8080")
//!     .with_env_vars([("SERVER_PORT", "9000")])
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(store.string_value("server.port"), "9000");
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use config::{FileFormat, Value, ValueKind};

use crate::ConfigError;

/// File name looked up by [`ConfigStoreBuilder::with_search_paths`].
pub const DEFAULT_FILE_NAME: &str = "config.ini";

/// Read-only, source-backed key/value store with typed accessors.
///
/// Keys are case-insensitive and stored lower-case.
#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    defaults: BTreeMap<String, String>,
    file: BTreeMap<String, String>,
    env: BTreeMap<String, String>,
    env_prefix: Option<String>,
    overrides: BTreeMap<String, String>,
}

impl ConfigStore {
    /// Create a new store builder.
    #[must_use]
    pub fn builder() -> ConfigStoreBuilder {
        ConfigStoreBuilder::new()
    }

    /// Raw value for `key`, honouring source precedence.
    pub fn get(&self, key: &str) -> Option<&str> {
        let key = normalize_key(key);
        self.overrides
            .get(&key)
            .or_else(|| self.env.get(&self.env_var_name(&key)))
            .or_else(|| self.file.get(&key))
            .or_else(|| self.defaults.get(&key))
            .map(String::as_str)
    }

    /// Raw value for `key`, or `default` when no source provides it.
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// Whether any source (defaults included) provides `key`.
    pub fn is_set(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// String value, empty when absent.
    pub fn string_value(&self, key: &str) -> String {
        self.get(key).unwrap_or_default().to_string()
    }

    /// Boolean value, `false` when absent.
    ///
    /// Accepts `true/false`, `1/0`, `yes/no` and `on/off` in any case.
    pub fn bool_value(&self, key: &str) -> Result<bool, ConfigError> {
        self.coerce(key, "bool", parse_bool)
    }

    /// Signed integer value, `0` when absent.
    pub fn int_value(&self, key: &str) -> Result<i64, ConfigError> {
        self.coerce(key, "integer", |v| v.parse().ok())
    }

    /// Unsigned integer value, `0` when absent.
    pub fn uint_value(&self, key: &str) -> Result<u64, ConfigError> {
        self.coerce(key, "unsigned integer", |v| v.parse().ok())
    }

    /// Duration value, zero when absent.
    ///
    /// A bare number is a count of seconds; `ms`, `s`, `m` and `h` suffixes
    /// are also accepted.
    pub fn duration_value(&self, key: &str) -> Result<Duration, ConfigError> {
        self.coerce(key, "duration", parse_duration)
    }

    /// Timestamp value (UTC), the Unix epoch when absent.
    ///
    /// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS` and `YYYY-MM-DD`.
    pub fn time_value(&self, key: &str) -> Result<DateTime<Utc>, ConfigError> {
        self.coerce(key, "timestamp", parse_time)
    }

    /// Every key under `prefix.`, with the prefix stripped.
    ///
    /// Environment variables named `[PREFIX_]<SECTION>_<FIELD>` contribute
    /// `field` (lower-cased, underscores kept) unless a known key already maps
    /// to that variable.
    pub fn section(&self, prefix: &str) -> BTreeMap<String, String> {
        let prefix = normalize_key(prefix);
        let dotted = format!("{prefix}.");
        let mut out = BTreeMap::new();

        for key in self
            .defaults
            .keys()
            .chain(self.file.keys())
            .chain(self.overrides.keys())
        {
            if let Some(rest) = key.strip_prefix(&dotted) {
                if let Some(value) = self.get(key) {
                    out.insert(rest.to_string(), value.to_string());
                }
            }
        }

        let env_section = self.env_var_name(&dotted);
        for (name, value) in &self.env {
            let Some(rest) = name.strip_prefix(&env_section) else {
                continue;
            };
            if rest.is_empty() {
                continue;
            }
            let known = out
                .keys()
                .any(|k| self.env_var_name(&format!("{dotted}{k}")) == *name);
            if !known {
                out.insert(rest.to_lowercase(), value.clone());
            }
        }

        out
    }

    /// Name of the environment variable consulted for `key`.
    pub fn env_var_name(&self, key: &str) -> String {
        let name: String = key
            .chars()
            .map(|c| match c {
                '.' | '-' => '_',
                c => c.to_ascii_uppercase(),
            })
            .collect();
        match &self.env_prefix {
            Some(prefix) => format!("{prefix}_{name}"),
            None => name,
        }
    }

    fn coerce<T: Default>(
        &self,
        key: &str,
        expected: &'static str,
        parse: impl Fn(&str) -> Option<T>,
    ) -> Result<T, ConfigError> {
        match self.get(key) {
            None => Ok(T::default()),
            Some(raw) => {
                parse(raw.trim()).ok_or_else(|| ConfigError::coercion(key, expected, raw))
            }
        }
    }
}

/// Builder for [`ConfigStore`].
///
/// Sources can be registered in any order; precedence is fixed
/// (defaults < files < environment < overrides). Among files, the one added
/// last wins.
#[derive(Debug, Default)]
pub struct ConfigStoreBuilder {
    store: ConfigStore,
}

impl ConfigStoreBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fallback for `key`, consulted only when no source provides it.
    #[must_use]
    pub fn set_default(mut self, key: &str, value: impl ToString) -> Self {
        self.store.defaults.insert(normalize_key(key), value.to_string());
        self
    }

    /// Force `key` to `value`, regardless of any other source.
    #[must_use]
    pub fn set(mut self, key: &str, value: impl ToString) -> Self {
        self.store.overrides.insert(normalize_key(key), value.to_string());
        self
    }

    /// Load an explicitly named configuration file.
    ///
    /// The format is taken from the extension (`ini`, `toml`, `json`, `yaml`);
    /// files without an extension are read as INI.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file does not exist, cannot be read, or
    /// cannot be parsed.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let format = file_format(path)?;
        let content =
            fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;

        let entries = parse_source(&content, format)?;
        tracing::debug!(path = %path.display(), keys = entries.len(), "loaded configuration file");
        self.store.file.extend(entries);

        Ok(self)
    }

    /// Load a configuration file if it exists; a missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be read or parsed.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            tracing::debug!(path = %path.as_ref().display(), "optional configuration file not found");
            Ok(self)
        }
    }

    /// Look for [`DEFAULT_FILE_NAME`] in `/etc/{app}/`, `$HOME/.{app}/` and
    /// the working directory, loading the first one found.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file found cannot be read or parsed.
    pub fn with_search_paths(self, app_name: &str) -> Result<Self, ConfigError> {
        match search_paths(app_name).into_iter().find(|p| p.exists()) {
            Some(path) => self.with_file(path),
            None => {
                tracing::debug!(app = app_name, "no configuration file found, using defaults");
                Ok(self)
            }
        }
    }

    /// Parse configuration content directly.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if parsing fails.
    pub fn with_string(mut self, content: &str, format: FileFormat) -> Result<Self, ConfigError> {
        let entries = parse_source(content, format)?;
        self.store.file.extend(entries);
        Ok(self)
    }

    /// Snapshot the process environment.
    #[must_use]
    pub fn with_environment(self) -> Self {
        self.with_env_vars(std::env::vars())
    }

    /// Add an explicit set of environment variables, replacing any already
    /// captured under the same name.
    #[must_use]
    pub fn with_env_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (name, value) in vars {
            self.store.env.insert(name.into(), value.into());
        }
        self
    }

    /// Prefix environment lookups, e.g. `MYAPP` ⇒ `MYAPP_SERVER_PORT`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        let prefix = prefix.trim_end_matches('_').to_uppercase();
        self.store.env_prefix = (!prefix.is_empty()).then_some(prefix);
        self
    }

    /// Read a `.env` file from the working directory into the environment
    /// layer. Variables already captured take precedence; the process
    /// environment is not modified.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but is malformed.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        self.with_dotenv_file(".env")
    }

    /// Like [`with_dotenv`](Self::with_dotenv) for an explicit path.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but is malformed.
    pub fn with_dotenv_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let iter = match dotenvy::from_path_iter(path) {
            Ok(iter) => iter,
            Err(e) if e.not_found() => return Ok(self),
            Err(e) => return Err(dotenv_error(path, e)),
        };

        for item in iter {
            let (name, value) = item.map_err(|e| dotenv_error(path, e))?;
            self.store.env.entry(name).or_insert(value);
        }

        Ok(self)
    }

    /// Finish construction.
    ///
    /// # Errors
    ///
    /// Currently infallible; kept fallible so sources can validate lazily.
    pub fn build(self) -> Result<ConfigStore, ConfigError> {
        tracing::debug!(
            defaults = self.store.defaults.len(),
            file_keys = self.store.file.len(),
            env_vars = self.store.env.len(),
            overrides = self.store.overrides.len(),
            "configuration store built"
        );
        Ok(self.store)
    }
}

fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase()
}

fn search_paths(app_name: &str) -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(format!("/etc/{app_name}")).join(DEFAULT_FILE_NAME)];
    if let Some(home) = std::env::var_os("HOME") {
        paths.push(PathBuf::from(home).join(format!(".{app_name}")).join(DEFAULT_FILE_NAME));
    }
    paths.push(PathBuf::from(DEFAULT_FILE_NAME));
    paths
}

fn file_format(path: &Path) -> Result<FileFormat, ConfigError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase);

    match extension.as_deref() {
        None | Some("ini" | "conf" | "cfg") => Ok(FileFormat::Ini),
        Some("toml") => Ok(FileFormat::Toml),
        Some("json") => Ok(FileFormat::Json),
        Some("yaml" | "yml") => Ok(FileFormat::Yaml),
        Some(_) => Err(ConfigError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}

fn parse_source(content: &str, format: FileFormat) -> Result<BTreeMap<String, String>, ConfigError> {
    let tree = config::Config::builder()
        .add_source(config::File::from_str(content, format))
        .build()?
        .try_deserialize::<BTreeMap<String, Value>>()?;

    let mut out = BTreeMap::new();
    for (key, value) in tree {
        flatten(&normalize_key(&key), value, &mut out);
    }
    Ok(out)
}

// Sections and nested tables become dotted prefixes.
fn flatten(prefix: &str, value: Value, out: &mut BTreeMap<String, String>) {
    match value.kind {
        ValueKind::Nil => {}
        ValueKind::Table(table) => {
            for (key, value) in table {
                flatten(&format!("{prefix}.{}", normalize_key(&key)), value, out);
            }
        }
        ValueKind::Array(items) => {
            let joined = items
                .into_iter()
                .map(|v| v.kind.to_string())
                .collect::<Vec<_>>()
                .join(",");
            out.insert(prefix.to_string(), joined);
        }
        scalar => {
            out.insert(prefix.to_string(), scalar.to_string());
        }
    }
}

fn dotenv_error(path: &Path, error: dotenvy::Error) -> ConfigError {
    ConfigError::read_error(path, std::io::Error::other(error.to_string()))
}

/// Parse a boolean from a string.
pub(crate) fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_duration(s: &str) -> Option<Duration> {
    if let Ok(secs) = s.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }

    let split = s.find(|c: char| !c.is_ascii_digit())?;
    let (number, unit) = s.split_at(split);
    let number: u64 = number.parse().ok()?;

    match unit.trim() {
        "ms" => Some(Duration::from_millis(number)),
        "s" => Some(Duration::from_secs(number)),
        "m" => number.checked_mul(60).map(Duration::from_secs),
        "h" => number.checked_mul(3600).map(Duration::from_secs),
        _ => None,
    }
}

fn parse_time(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}
