//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use ini::Ini;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use super::defaults::MAX_TEXTURE_SIDE;
use super::file::ConfigFileError;
use super::settings::ConfigFile;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [benchmark] section
    if let Some(section) = ini.section(Some("benchmark")) {
        if let Some(v) = section.get("size") {
            config.benchmark.size = parse_at_least("benchmark", "size", v, 0)?;
        }
        if let Some(v) = section.get("iterations") {
            config.benchmark.iterations = parse_at_least("benchmark", "iterations", v, 0)?;
        }
        if let Some(v) = section.get("partitions") {
            config.benchmark.partitions = parse_at_least("benchmark", "partitions", v, 1)?;
        }
        if let Some(v) = section.get("texture_side") {
            let side = parse_at_least("benchmark", "texture_side", v, 1)?;
            if side > MAX_TEXTURE_SIDE {
                return Err(invalid(
                    "benchmark",
                    "texture_side",
                    v,
                    format!("must be at most {}", MAX_TEXTURE_SIDE),
                ));
            }
            config.benchmark.texture_side = side;
        }
    }

    // [machine] section
    if let Some(section) = ini.section(Some("machine")) {
        if let Some(v) = section.get("nodes") {
            config.machine.nodes = parse_at_least("machine", "nodes", v, 1)?;
        }
        if let Some(v) = section.get("cpus_per_node") {
            config.machine.cpus_per_node = parse_at_least("machine", "cpus_per_node", v, 1)?;
        }
        if let Some(v) = section.get("system_memories_per_node") {
            config.machine.system_memories_per_node =
                parse_at_least("machine", "system_memories_per_node", v, 0)?;
        }
        if let Some(v) = section.get("processor_slots") {
            config.machine.processor_slots = parse_at_least("machine", "processor_slots", v, 1)?;
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = expand_tilde(v);
            }
        }
    }

    Ok(config)
}

fn invalid(section: &str, key: &str, value: &str, reason: String) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason,
    }
}

/// Parses an integer no smaller than `min`.
fn parse_at_least<T>(section: &str, key: &str, value: &str, min: T) -> Result<T, ConfigFileError>
where
    T: FromStr + PartialOrd + Display + Copy,
{
    let parsed: T = value
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, value, "must be an integer".to_string()))?;
    if parsed < min {
        return Err(invalid(section, key, value, format!("must be at least {}", min)));
    }
    Ok(parsed)
}

/// Expand ~ to home directory in paths.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
