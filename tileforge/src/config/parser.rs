//! INI parsing: the single place where INI key names map to struct fields.

use ini::{Ini, Properties};
use std::str::FromStr;

use super::file::ConfigFileError;
use super::settings::ConfigFile;

/// Parses an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [scheduler] section
    if let Some(section) = ini.section(Some("scheduler")) {
        if let Some(v) = parse_number::<usize>(section, "scheduler", "local_workers")? {
            config.scheduler.local_workers = v;
        }
        if let Some(v) = parse_number::<usize>(section, "scheduler", "remote_workers")? {
            config.scheduler.remote_workers = v;
        }
        if let Some(v) = section.get("thread_name_prefix") {
            let v = v.trim();
            if !v.is_empty() {
                config.scheduler.thread_name_prefix = v.to_string();
            }
        }
    }

    // [cache] section
    if let Some(section) = ini.section(Some("cache")) {
        if let Some(v) = parse_number::<u64>(section, "cache", "index_capacity")? {
            if v == 0 {
                return Err(invalid("cache", "index_capacity", "0", "must be at least 1"));
            }
            config.cache.capacity = v;
        }
    }

    // [remote] section
    if let Some(section) = ini.section(Some("remote")) {
        let remote = &mut config.remote;
        if let Some(v) = section.get("protocol") {
            let v = v.trim().to_lowercase();
            if v != "http" && v != "https" {
                return Err(invalid("remote", "protocol", &v, "must be one of: http, https"));
            }
            remote.protocol = v;
        }
        if let Some(v) = section.get("host") {
            let v = v.trim();
            if v.is_empty() || v.contains('/') {
                return Err(invalid("remote", "host", v, "expected a bare host name"));
            }
            remote.host = v.to_string();
        }
        if let Some(v) = section.get("base_path") {
            remote.base_path = v.trim().trim_end_matches('/').to_string();
        }
        if let Some(v) = section.get("extension") {
            let v = v.trim().trim_start_matches('.');
            if !v.is_empty() {
                remote.extension = v.to_string();
            }
        }
        if let Some(v) = parse_number::<u8>(section, "remote", "min_zoom")? {
            remote.min_zoom = v;
        }
        if let Some(v) = parse_number::<u8>(section, "remote", "max_zoom")? {
            remote.max_zoom = v;
        }
        if let Some(v) = parse_number::<usize>(section, "remote", "parallel_requests")? {
            remote.parallel_requests = v.max(1);
        }
        if let Some(v) = parse_number::<u64>(section, "remote", "timeout")? {
            remote.timeout_secs = v;
        }
        if let Some(v) = section.get("user_agent") {
            let v = v.trim();
            if !v.is_empty() {
                remote.user_agent = v.to_string();
            }
        }
        if remote.min_zoom > remote.max_zoom {
            return Err(invalid(
                "remote",
                "min_zoom",
                &remote.min_zoom.to_string(),
                "must not exceed max_zoom",
            ));
        }
    }

    Ok(config)
}

fn parse_number<T: FromStr>(
    section: &Properties,
    section_name: &str,
    key: &str,
) -> Result<Option<T>, ConfigFileError> {
    match section.get(key) {
        None => Ok(None),
        Some(v) => v
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| invalid(section_name, key, v, "expected a non-negative integer")),
    }
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
