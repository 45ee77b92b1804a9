use crate::error::{SimError, SimResult};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// A parsed `.tir` tyre-parameter file.
///
/// The format is a sequence of `[GROUP_NAME]` headers followed by
/// `KEY = VALUE` lines; comment lines start with `$` or `!`. Group and
/// key names follow the Magic Formula 6.1.2 naming, e.g.
/// `LONGITUDINAL_COEFFICIENTS.PCX1`.
#[derive(Debug, Clone, PartialEq)]
pub struct TirFile {
    source: String,
    groups: BTreeMap<String, BTreeMap<String, String>>,
}

impl TirFile {
    pub fn from_file<P: AsRef<Path>>(path: P) -> SimResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        Self::parse_named(&content, &path.display().to_string())
    }

    pub fn parse(content: &str) -> SimResult<Self> {
        Self::parse_named(content, "<inline>")
    }

    fn parse_named(content: &str, source: &str) -> SimResult<Self> {
        let mut groups: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
        let mut active_group: Option<String> = None;

        for (line_number, raw_line) in content.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('$') || line.starts_with('!') {
                continue;
            }

            if line.starts_with('[') {
                let group = Self::parse_group_header(line).ok_or_else(|| {
                    SimError::parse(
                        source,
                        format!("line {}: invalid parameter group '{}'", line_number + 1, line),
                    )
                })?;
                groups.entry(group.clone()).or_default();
                active_group = Some(group);
                continue;
            }

            if let Some((key, value)) = Self::parse_parameter(line) {
                let group = active_group.as_ref().ok_or_else(|| {
                    SimError::parse(
                        source,
                        format!(
                            "line {}: parameter '{}' appears before any parameter group",
                            line_number + 1,
                            key
                        ),
                    )
                })?;
                if let Some(parameters) = groups.get_mut(group) {
                    parameters.insert(key, value);
                }
            }
        }

        Ok(Self {
            source: source.to_string(),
            groups,
        })
    }

    fn parse_group_header(line: &str) -> Option<String> {
        let end = line.find(']')?;
        let name = &line[1..end];
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_uppercase() || c == '_') {
            return None;
        }
        Some(name.to_string())
    }

    fn parse_parameter(line: &str) -> Option<(String, String)> {
        let (key, value) = line.split_once('=')?;
        let key = key.trim();
        if key.is_empty()
            || !key
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
        {
            return None;
        }
        // Trailing $ comments are not part of the value.
        let value = value.split('$').next().unwrap_or("");
        let value = value.trim().trim_matches('\'').trim();
        Some((key.to_string(), value.to_string()))
    }

    pub fn group_names(&self) -> Vec<&str> {
        self.groups.keys().map(|k| k.as_str()).collect()
    }

    pub fn get(&self, group: &str, key: &str) -> Option<&str> {
        self.groups.get(group)?.get(key).map(|v| v.as_str())
    }

    pub fn get_f64(&self, group: &str, key: &str) -> SimResult<f64> {
        let value = self.get(group, key).ok_or_else(|| {
            SimError::parse(
                self.source.as_str(),
                format!("missing tyre parameter {}.{}", group, key),
            )
        })?;
        value.parse().map_err(|_| {
            SimError::parse(
                self.source.as_str(),
                format!("tyre parameter {}.{} is not a number: '{}'", group, key, value),
            )
        })
    }

    pub fn get_string(&self, group: &str, key: &str) -> SimResult<&str> {
        self.get(group, key).ok_or_else(|| {
            SimError::parse(
                self.source.as_str(),
                format!("missing tyre parameter {}.{}", group, key),
            )
        })
    }
}
