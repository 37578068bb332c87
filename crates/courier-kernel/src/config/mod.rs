//! Configuration loading
//!
//! Typed configuration files in any format supported by the `config` crate:
//! YAML, TOML, JSON, INI, RON, JSON5.
//!
//! ## Features
//!
//! - Format detected from the file extension
//! - Environment variable substitution (`${VAR}` and `$VAR` syntax) for typed
//!   configuration; property files keep their placeholders for the resolver
//! - Layering of several sources, later sources win
//! - Flattening into dotted property keys for the property resolver

use config::{Config as Cfg, Environment, File, FileFormat};
use regex::{Captures, Regex};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

pub use config::FileFormat as Format;

static BRACED_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid regex"));
static BARE_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$([A-Za-z_][A-Za-z0-9_]*)\b").expect("valid regex"));

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parsing error: {0}")]
    Parse(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Detect the format from a file extension.
///
/// | Extension | Format |
/// |---|---|
/// | `.yaml`, `.yml` | YAML |
/// | `.toml` | TOML |
/// | `.json` | JSON |
/// | `.ini` | INI |
/// | `.ron` | RON |
/// | `.json5` | JSON5 |
pub fn detect_format(path: &str) -> ConfigResult<FileFormat> {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| ConfigError::UnsupportedFormat(format!("no file extension in '{path}'")))?;

    match ext.to_lowercase().as_str() {
        "yaml" | "yml" => Ok(FileFormat::Yaml),
        "toml" => Ok(FileFormat::Toml),
        "json" => Ok(FileFormat::Json),
        "ini" => Ok(FileFormat::Ini),
        "ron" => Ok(FileFormat::Ron),
        "json5" => Ok(FileFormat::Json5),
        _ => Err(ConfigError::UnsupportedFormat(ext.to_string())),
    }
}

/// Replace `${VAR}` and `$VAR` with the process environment.
///
/// Unknown variables are left as written.
///
/// ```rust,ignore
/// use courier_kernel::config::substitute_env_vars;
///
/// std::env::set_var("SMTP_HOST", "mail.example.com");
/// assert_eq!(substitute_env_vars("host: ${SMTP_HOST}"), "host: mail.example.com");
/// ```
pub fn substitute_env_vars(content: &str) -> String {
    fn lookup(caps: &Captures<'_>) -> String {
        std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
    }

    let braced = BRACED_VAR.replace_all(content, lookup);
    BARE_VAR.replace_all(&braced, lookup).into_owned()
}

fn build(sources: impl IntoIterator<Item = (String, FileFormat)>, env_prefix: Option<&str>) -> ConfigResult<Cfg> {
    let expanded = sources
        .into_iter()
        .map(|(content, format)| (substitute_env_vars(&content), format));
    assemble(expanded, env_prefix)
}

fn assemble(sources: impl IntoIterator<Item = (String, FileFormat)>, env_prefix: Option<&str>) -> ConfigResult<Cfg> {
    let mut builder = Cfg::builder();
    for (content, format) in sources {
        builder = builder.add_source(File::from_str(&content, format));
    }
    if let Some(prefix) = env_prefix {
        builder = builder.add_source(
            Environment::with_prefix(prefix)
                .prefix_separator("_")
                .separator("__"),
        );
    }
    builder.build().map_err(|e| ConfigError::Parse(e.to_string()))
}

fn read(path: &str) -> ConfigResult<(String, FileFormat)> {
    let format = detect_format(path)?;
    Ok((std::fs::read_to_string(path)?, format))
}

fn deserialize<T: DeserializeOwned>(config: Cfg) -> ConfigResult<T> {
    config
        .try_deserialize()
        .map_err(|e| ConfigError::Serialization(e.to_string()))
}

/// Load a typed configuration file.
///
/// ```rust,ignore
/// use courier_kernel::config::load_config;
/// use courier_kernel::Requirements;
///
/// let requirements: Requirements = load_config("smtp-requirements.yaml")?;
/// ```
pub fn load_config<T: DeserializeOwned>(path: &str) -> ConfigResult<T> {
    deserialize(build([read(path)?], None)?)
}

/// Parse configuration text in an explicit format.
pub fn from_str<T: DeserializeOwned>(content: &str, format: FileFormat) -> ConfigResult<T> {
    deserialize(build([(content.to_string(), format)], None)?)
}

/// Merge configuration texts; later sources override earlier ones.
pub fn merge_configs<T: DeserializeOwned>(sources: &[(&str, FileFormat)]) -> ConfigResult<T> {
    let owned = sources.iter().map(|(content, format)| (content.to_string(), *format));
    deserialize(build(owned, None)?)
}

/// Load several files, later files overriding earlier ones.
pub fn load_merged<T: DeserializeOwned>(paths: &[&str]) -> ConfigResult<T> {
    let sources = paths.iter().map(|p| read(p)).collect::<ConfigResult<Vec<_>>>()?;
    deserialize(build(sources, None)?)
}

/// Load a file, then apply `PREFIX_A__B` environment overrides.
///
/// `APP_MAIL__SMTP__HOST` overrides `mail.smtp.host` for prefix `APP`.
pub fn load_with_env<T: DeserializeOwned>(path: &str, env_prefix: &str) -> ConfigResult<T> {
    deserialize(build([read(path)?], Some(env_prefix))?)
}

/// Load a file as flat dotted properties.
///
/// Nested tables become `a.b.c` keys, arrays become `a.b[0]` keys, scalars
/// are rendered as strings and nulls are skipped. `${...}` placeholders are
/// left as written: the property resolver evaluates them, so a sibling
/// property or a layered source decides their value, not the process
/// environment.
pub fn load_properties(path: &str) -> ConfigResult<BTreeMap<String, String>> {
    let tree: Value = deserialize(assemble([read(path)?], None)?)?;
    Ok(flatten(&tree))
}

/// [`load_properties`] for in-memory text.
pub fn properties_from_str(content: &str, format: FileFormat) -> ConfigResult<BTreeMap<String, String>> {
    let tree: Value = deserialize(assemble([(content.to_string(), format)], None)?)?;
    Ok(flatten(&tree))
}

/// Flatten a JSON tree into dotted keys.
pub fn flatten(tree: &Value) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    flatten_into(tree, String::new(), &mut out);
    out
}

fn flatten_into(value: &Value, prefix: String, out: &mut BTreeMap<String, String>) {
    match value {
        Value::Null => {}
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_into(child, path, out);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                flatten_into(child, format!("{prefix}[{index}]"), out);
            }
        }
        Value::String(s) => {
            out.insert(prefix, s.clone());
        }
        other => {
            out.insert(prefix, other.to_string());
        }
    }
}
