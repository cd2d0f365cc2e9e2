//! Emulator configuration model.
//!
//! The Previous emulator keeps its settings in an INI-style `previous.cfg`:
//! `[Section]` headers, `key = value` pairs, and comment lines starting with
//! `#`, `;`, or `//`. The parser is deliberately lenient (the file is written
//! by the emulator, not by us) and preserves section and entry order so the
//! dashboard can render the file faithfully.

use std::path::Path;

use padmin_core::{PadminError, Result};

/// One `[Section]` of the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigSection {
    pub name: String,
    /// Entries in file order.
    pub entries: Vec<(String, String)>,
}

impl ConfigSection {
    /// Look up a value in this section.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Parsed emulator configuration.
///
/// Entries appearing before the first section header land in an unnamed
/// section with an empty name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmulatorConfig {
    pub sections: Vec<ConfigSection>,
}

impl EmulatorConfig {
    /// Read and parse a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| PadminError::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(Self::parse(&content))
    }

    /// Parse configuration text. Malformed lines are skipped, not fatal.
    pub fn parse(content: &str) -> Self {
        let mut sections: Vec<ConfigSection> = Vec::new();
        let mut current = ConfigSection::default();

        for raw_line in content.lines() {
            let line = raw_line.trim();
            if line.is_empty() || is_comment(line) {
                continue;
            }

            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                if !current.name.is_empty() || !current.entries.is_empty() {
                    sections.push(std::mem::take(&mut current));
                }
                current.name = name.trim().to_string();
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                current
                    .entries
                    .push((key.trim().to_string(), unquote(value.trim()).to_string()));
            }
        }

        if !current.name.is_empty() || !current.entries.is_empty() {
            sections.push(current);
        }

        Self { sections }
    }

    /// Look up a section by name.
    pub fn section(&self, name: &str) -> Option<&ConfigSection> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// Look up a value by section and key.
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.section(section)?.get(key)
    }

    /// True when the parse yielded nothing usable.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

fn is_comment(line: &str) -> bool {
    line.starts_with('#') || line.starts_with(';') || line.starts_with("//")
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}
