//! Skill configuration — fail-soft INI store and resolved settings.
//!
//! The configuration file is flat sectioned key/value text (`[section]`
//! headers, `key = value` or `key: value` lines, `#`/`;` comment lines),
//! read as UTF-8 into a [`Document`].
//!
//! # Fail-soft policy
//!
//! [`read`] never surfaces an error: a missing, unreadable, or malformed
//! file is reported as a `warn!` diagnostic and downgraded to an empty
//! document, so callers always receive a usable configuration.  [`write`]
//! likewise reports failures and returns `false` instead of erroring.
//! There is no partial-write atomicity guarantee; a crash mid-write can
//! leave a truncated file.

use std::{
    collections::BTreeMap,
    env, fs,
    path::{Path, PathBuf},
};

use tracing::warn;

use crate::error::AppError;

/// Default configuration file, looked up in the working directory.
pub const CONFIG_INI: &str = "config.ini";

const DEFAULT_MQTT_HOST: &str = "localhost";
const DEFAULT_MQTT_PORT: &str = "1883";

/// A parsed configuration document: section name → option name → value.
///
/// All values are strings.  Sections iterate in sorted order, which keeps
/// [`write`] output deterministic; insertion order carries no meaning.
pub type Document = BTreeMap<String, BTreeMap<String, String>>;

// ── read / write ─────────────────────────────────────────────────────────────

/// Read the configuration file at `path`.
///
/// Never errors: any problem (missing file, bad encoding, parse failure)
/// yields an empty document after a diagnostic.  A malformed file is
/// rejected whole — the result is never a partially-parsed document.
pub fn read(path: &Path) -> Document {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            warn!(path = %path.display(), "config read failed: {e} — using empty configuration");
            return Document::new();
        }
    };
    match parse(&text) {
        Ok(doc) => doc,
        Err(e) => {
            warn!(path = %path.display(), "config parse failed: {e} — using empty configuration");
            Document::new()
        }
    }
}

/// Serialize `doc` as sectioned key/value text and overwrite `path`.
///
/// Returns `false` (after a diagnostic) on any I/O failure; never errors.
pub fn write(path: &Path, doc: &Document) -> bool {
    match fs::write(path, render(doc)) {
        Ok(()) => true,
        Err(e) => {
            warn!(path = %path.display(), "config write failed: {e}");
            false
        }
    }
}

// ── parse / render ───────────────────────────────────────────────────────────

/// Parse INI text into a [`Document`].
///
/// Duplicate options within a section keep the last value; a duplicate
/// *section* header, an option line before any section, or a line that is
/// neither a header, an option, a comment, nor blank is a parse error.
pub fn parse(text: &str) -> Result<Document, AppError> {
    let mut doc = Document::new();
    let mut current: Option<String> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(rest) = line.strip_prefix('[') {
            let Some(name) = rest.strip_suffix(']') else {
                return Err(AppError::Config(format!(
                    "line {}: malformed section header {line:?}",
                    idx + 1
                )));
            };
            let name = name.trim();
            if name.is_empty() {
                return Err(AppError::Config(format!("line {}: empty section name", idx + 1)));
            }
            if doc.contains_key(name) {
                return Err(AppError::Config(format!(
                    "line {}: duplicate section [{name}]",
                    idx + 1
                )));
            }
            doc.insert(name.to_string(), BTreeMap::new());
            current = Some(name.to_string());
            continue;
        }

        // Option line: split at the first `=` or `:`, whichever comes first.
        let Some(sep) = line.find(['=', ':']) else {
            return Err(AppError::Config(format!(
                "line {}: expected 'key = value', got {line:?}",
                idx + 1
            )));
        };
        let key = line[..sep].trim();
        let value = line[sep + 1..].trim();
        if key.is_empty() {
            return Err(AppError::Config(format!("line {}: empty option name", idx + 1)));
        }
        let Some(section) = current.as_ref() else {
            return Err(AppError::Config(format!(
                "line {}: option before any [section] header",
                idx + 1
            )));
        };
        doc.entry(section.clone())
            .or_default()
            .insert(key.to_string(), value.to_string());
    }

    Ok(doc)
}

/// Render a [`Document`] back to sectioned key/value text.
pub fn render(doc: &Document) -> String {
    let mut out = String::new();
    for (section, options) in doc {
        out.push('[');
        out.push_str(section);
        out.push_str("]\n");
        for (key, value) in options {
            out.push_str(key);
            out.push_str(" = ");
            out.push_str(value);
            out.push('\n');
        }
        out.push('\n');
    }
    out
}

// ── settings ─────────────────────────────────────────────────────────────────

/// Runtime settings resolved from the configuration document.
///
/// The MQTT broker always runs on the master device; a skill deployed on a
/// satellite points `[mqtt]` at the master's address.  Precedence per value:
/// built-in default ← `[mqtt]` section ← `NELUM_MQTT_ADDR` env override.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Dialogue bus connection address, `host:port`.
    pub mqtt_addr: String,
}

impl Settings {
    /// Resolve settings from `doc`, applying env-var overrides.
    pub fn resolve(doc: &Document) -> Self {
        let mqtt_addr_override = env::var("NELUM_MQTT_ADDR").ok();
        Self::resolve_with(doc, mqtt_addr_override.as_deref())
    }

    /// Internal resolver — tests pass overrides directly instead of
    /// mutating env vars.
    pub fn resolve_with(doc: &Document, mqtt_addr_override: Option<&str>) -> Self {
        let mqtt = doc.get("mqtt");
        let host = mqtt
            .and_then(|s| s.get("host"))
            .map_or(DEFAULT_MQTT_HOST, String::as_str);
        let port = mqtt
            .and_then(|s| s.get("port"))
            .map_or(DEFAULT_MQTT_PORT, String::as_str);

        let mqtt_addr = match mqtt_addr_override {
            Some(addr) => addr.to_string(),
            None => format!("{host}:{port}"),
        };

        Self { mqtt_addr }
    }
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

// ── tests ────────────────────────────────────────────────────────────────────
