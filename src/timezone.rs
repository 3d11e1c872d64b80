//! Time Zone Reporting
//!
//! The server renders check-in times in the user's zone, which it reads
//! from a `timezone` cookie. This module resolves the host's IANA zone
//! name and formats that cookie.

use std::path::Path;

/// Name of the cookie the server reads the zone from
pub const COOKIE_NAME: &str = "timezone";

/// Resolve the host's IANA zone name, falling back to `default`
pub fn resolve(default: &str) -> String {
    if let Some(name) = from_env() {
        return name;
    }
    if let Some(name) = from_timezone_file(Path::new("/etc/timezone")) {
        return name;
    }
    if let Some(name) = from_localtime_link(Path::new("/etc/localtime")) {
        return name;
    }

    tracing::debug!("Could not resolve host time zone, using {}", default);
    default.to_string()
}

/// Cookie pair sent with every request, e.g. `timezone=Europe/Berlin`
pub fn cookie(zone: &str) -> String {
    format!("{}={}", COOKIE_NAME, zone)
}

fn from_env() -> Option<String> {
    let value = std::env::var("TZ").ok()?;
    // POSIX allows a leading colon before a zone file name
    let value = value.trim().trim_start_matches(':');
    if is_zone_name(value) {
        Some(value.to_string())
    } else {
        None
    }
}

fn from_timezone_file(path: &Path) -> Option<String> {
    let content = std::fs::read_to_string(path).ok()?;
    let name = content.lines().next()?.trim();
    if is_zone_name(name) {
        Some(name.to_string())
    } else {
        None
    }
}

/// `/etc/localtime` is usually a symlink into `.../zoneinfo/<Area>/<City>`
fn from_localtime_link(path: &Path) -> Option<String> {
    let target = std::fs::read_link(path).ok()?;
    let target = target.to_string_lossy();
    let (_, name) = target.split_once("zoneinfo/")?;
    // Some distributions link through zoneinfo/posix/ or zoneinfo/right/
    let name = name
        .strip_prefix("posix/")
        .or_else(|| name.strip_prefix("right/"))
        .unwrap_or(name);

    if is_zone_name(name) {
        Some(name.to_string())
    } else {
        None
    }
}

fn is_zone_name(value: &str) -> bool {
    !value.is_empty()
        && !value.starts_with('/')
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '_' | '-' | '+'))
}
