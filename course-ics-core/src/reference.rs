use std::{collections::HashMap, fmt, sync::LazyLock};

use chrono::NaiveDate;
use regex::Regex;
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{MapAccess, Visitor},
};

use crate::{ReferenceEntry, Result};

static SUBJECT_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]+\d{3}[A-Z]?").expect("valid subject prefix regex"));

/// How a course code was matched against the reference table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LookupSource {
    Exact,
    /// Matched after dropping everything from the first `.`.
    SectionStripped,
    /// First entry sharing the subject + number prefix.
    SubjectPrefix,
    /// No entry matched; defaults were used.
    Default,
}

/// Result of resolving one course code.
#[derive(Debug, Clone, Copy)]
pub struct Resolved<'a> {
    pub entry: &'a ReferenceEntry,
    pub source: LookupSource,
}

/// Row form of a reference entry, used for JSON import and export.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceRow {
    pub course_code: String,
    pub location: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TableDocument {
    Rows(Vec<ReferenceRow>),
    Keyed(KeyedEntries),
}

/// Object keyed by course code, in document order.
struct KeyedEntries(Vec<(String, ReferenceEntry)>);

impl<'de> Deserialize<'de> for KeyedEntries {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct KeyedVisitor;

        impl<'de> Visitor<'de> for KeyedVisitor {
            type Value = KeyedEntries;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("an object keyed by course code")
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((code, entry)) = map.next_entry::<String, ReferenceEntry>()? {
                    entries.push((code, entry));
                }
                Ok(KeyedEntries(entries))
            }
        }

        deserializer.deserialize_map(KeyedVisitor)
    }
}

/// Read-only course code → location/term lookup.
///
/// Entries keep insertion order, which decides the subject-prefix match.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTable {
    entries: Vec<(String, ReferenceEntry)>,
    index: HashMap<String, usize>,
}

impl ReferenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load either an array of rows or an object keyed by course code.
    ///
    /// Keyed objects keep document order.
    pub fn from_json(json_data: &str) -> Result<Self> {
        let document: TableDocument = serde_json::from_str(json_data)?;
        let table = match document {
            TableDocument::Rows(rows) => rows
                .into_iter()
                .map(|row| {
                    (
                        row.course_code,
                        ReferenceEntry {
                            location: row.location,
                            start_date: row.start_date,
                            end_date: row.end_date,
                        },
                    )
                })
                .collect(),
            TableDocument::Keyed(KeyedEntries(entries)) => entries.into_iter().collect(),
        };
        Ok(table)
    }

    /// Add an entry; a repeated code replaces the earlier entry in place.
    #[must_use]
    pub fn with_entry(mut self, course_code: impl Into<String>, entry: ReferenceEntry) -> Self {
        self.insert(course_code.into(), entry);
        self
    }

    fn insert(&mut self, course_code: String, entry: ReferenceEntry) {
        if let Some(&idx) = self.index.get(&course_code) {
            self.entries[idx].1 = entry;
        } else {
            self.index.insert(course_code.clone(), self.entries.len());
            self.entries.push((course_code, entry));
        }
    }

    pub fn get(&self, course_code: &str) -> Option<&ReferenceEntry> {
        self.index.get(course_code).map(|&idx| &self.entries[idx].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ReferenceEntry)> {
        self.entries.iter().map(|(code, entry)| (code.as_str(), entry))
    }

    /// Resolve a code: exact, then section stripped, then subject prefix,
    /// then `default`.
    pub fn lookup<'a>(&'a self, course_code: &str, default: &'a ReferenceEntry) -> Resolved<'a> {
        let code = course_code.trim();

        if let Some(entry) = self.get(code) {
            return Resolved {
                entry,
                source: LookupSource::Exact,
            };
        }

        if let Some((base, _section)) = code.split_once('.') {
            if let Some(entry) = self.get(base) {
                return Resolved {
                    entry,
                    source: LookupSource::SectionStripped,
                };
            }
        }

        if let Some(prefix) = SUBJECT_PREFIX_RE.find(code) {
            let prefix = prefix.as_str();
            if let Some((_, entry)) = self.entries.iter().find(|(key, _)| key.starts_with(prefix)) {
                return Resolved {
                    entry,
                    source: LookupSource::SubjectPrefix,
                };
            }
        }

        Resolved {
            entry: default,
            source: LookupSource::Default,
        }
    }

    /// Entries as rows, in insertion order.
    pub fn rows(&self) -> Vec<ReferenceRow> {
        self.iter()
            .map(|(code, entry)| ReferenceRow {
                course_code: code.to_string(),
                location: entry.location.clone(),
                start_date: entry.start_date,
                end_date: entry.end_date,
            })
            .collect()
    }

    pub fn export_to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.rows())?)
    }
}

impl FromIterator<(String, ReferenceEntry)> for ReferenceTable {
    fn from_iter<I: IntoIterator<Item = (String, ReferenceEntry)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (code, entry) in iter {
            table.insert(code, entry);
        }
        table
    }
}
