//! Minimal INI reader for color-map configuration files.
//!
//! Supports `[section]` headers, `key = value` and `key: value` options,
//! full-line `#` / `;` comments and indented continuation lines. Option keys
//! are trimmed and lower-cased; sections and options keep their file order.

use crate::core::errors::{PipelineError, PipelineResult};
use std::path::Path;

/// A parsed INI document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniDocument {
    sections: Vec<IniSection>,
}

/// One `[section]` of an INI document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IniSection {
    /// The section name as written between the brackets.
    pub name: String,
    /// The options of the section in file order.
    pub options: Vec<(String, String)>,
}

impl IniDocument {
    /// Reads and parses an INI file.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Io` if the file cannot be read and
    /// `PipelineError::ConfigError` if its content is malformed.
    pub fn from_path(path: &Path) -> PipelineResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content).map_err(|e| match e {
            PipelineError::ConfigError { message } => {
                PipelineError::config_error(format!("{}: {message}", path.display()))
            }
            other => other,
        })
    }

    /// Parses INI text.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::ConfigError` for options outside a section,
    /// lines without a delimiter, and duplicate sections or options.
    pub fn parse(content: &str) -> PipelineResult<Self> {
        let mut doc = IniDocument::default();

        for (index, raw_line) in content.lines().enumerate() {
            let line_no = index + 1;
            let trimmed = raw_line.trim();

            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
                continue;
            }

            let is_continuation = raw_line.starts_with([' ', '\t']);
            if is_continuation {
                if let Some((_, value)) = doc
                    .sections
                    .last_mut()
                    .and_then(|section| section.options.last_mut())
                {
                    value.push('\n');
                    value.push_str(trimmed);
                    continue;
                }
            }

            if let Some(name) = trimmed
                .strip_prefix('[')
                .and_then(|rest| rest.strip_suffix(']'))
            {
                let name = name.trim();
                if doc.section(name).is_some() {
                    return Err(PipelineError::config_error(format!(
                        "line {line_no}: duplicate section '{name}'"
                    )));
                }
                doc.sections.push(IniSection {
                    name: name.to_string(),
                    options: Vec::new(),
                });
                continue;
            }

            let Some(split_at) = trimmed.find(['=', ':']) else {
                return Err(PipelineError::config_error(format!(
                    "line {line_no}: expected 'key = value', got '{trimmed}'"
                )));
            };
            let key = trimmed[..split_at].trim().to_lowercase();
            let value = trimmed[split_at + 1..].trim().to_string();

            let Some(section) = doc.sections.last_mut() else {
                return Err(PipelineError::config_error(format!(
                    "line {line_no}: option '{key}' appears before any section header"
                )));
            };
            if section.options.iter().any(|(existing, _)| *existing == key) {
                return Err(PipelineError::config_error(format!(
                    "line {line_no}: duplicate option '{key}' in section '{}'",
                    section.name
                )));
            }
            section.options.push((key, value));
        }

        Ok(doc)
    }

    /// Returns the section with the given name, if present.
    pub fn section(&self, name: &str) -> Option<&IniSection> {
        self.sections.iter().find(|section| section.name == name)
    }

    /// Returns the options of a section.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::ConfigError` if the section is absent. A
    /// section that is present but has no options yields an empty slice.
    pub fn items(&self, name: &str) -> PipelineResult<&[(String, String)]> {
        self.section(name)
            .map(|section| section.options.as_slice())
            .ok_or_else(|| PipelineError::config_error(format!("missing section '[{name}]'")))
    }
}
