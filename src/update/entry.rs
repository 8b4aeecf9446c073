// src/update/entry.rs

//! Update instructions
//!
//! An `InstallerEntry` selects installer records (by `Query`, or by the
//! identity fields it defines) and carries field overrides. A `LocaleEntry`
//! sets one field of one locale manifest.

use crate::error::{Error, Result};
use crate::manifest::canonical::structurally_equal;
use crate::manifest::{FieldMap, SchemaProvider, Value};
use std::fmt;

/// Key of the selector inside an installer entry document
pub const QUERY_KEY: &str = "Query";

/// Fields that identify an installer record for matching
pub const IDENTITY_FIELDS: &[&str] = &[
    "InstallerLocale",
    "Architecture",
    "InstallerType",
    "NestedInstallerType",
    "Scope",
];

/// Selector of an installer entry
#[derive(Clone)]
pub enum Query {
    /// Every field must exist on the candidate with an equal value
    ExactFields(FieldMap),
    /// Arbitrary predicate over the candidate
    Predicate(fn(&FieldMap) -> bool),
}

impl Query {
    pub fn matches(&self, candidate: &FieldMap) -> bool {
        match self {
            Query::ExactFields(fields) => fields_match(fields.iter(), candidate),
            Query::Predicate(predicate) => predicate(candidate),
        }
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::ExactFields(fields) => f.debug_tuple("ExactFields").field(fields).finish(),
            Query::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::ExactFields(fields) => f.write_str(&describe_fields(fields.iter())),
            Query::Predicate(_) => f.write_str("<predicate>"),
        }
    }
}

fn fields_match<'a>(mut fields: impl Iterator<Item = (&'a str, &'a Value)>, candidate: &FieldMap) -> bool {
    fields.all(|(key, expected)| {
        candidate
            .get(key)
            .is_some_and(|actual| structurally_equal(expected, actual))
    })
}

/// `{Key: value, ...}` rendering used in error messages
pub(crate) fn describe_fields<'a>(fields: impl Iterator<Item = (&'a str, &'a Value)>) -> String {
    let parts: Vec<String> = fields.map(|(key, value)| format!("{}: {}", key, value)).collect();
    format!("{{{}}}", parts.join(", "))
}

/// Identity fields of an installer record, for error messages
pub(crate) fn describe_identity(installer: &FieldMap) -> String {
    describe_fields(installer.iter().filter(|(key, _)| IDENTITY_FIELDS.contains(key)))
}

/// A declarative update of matching installer records
#[derive(Debug, Clone, Default)]
pub struct InstallerEntry {
    pub query: Option<Query>,
    pub fields: FieldMap,
}

impl InstallerEntry {
    pub fn new(fields: FieldMap) -> Self {
        Self { query: None, fields }
    }

    pub fn with_query(mut self, query: Query) -> Self {
        self.query = Some(query);
        self
    }

    /// Parse an entry document; `Query` must be a mapping and every other
    /// key must be a legal installer key
    pub fn from_fields(mut fields: FieldMap, schema: &dyn SchemaProvider) -> Result<Self> {
        let query = match fields.remove(QUERY_KEY) {
            None => None,
            Some(Value::Map(query)) => {
                check_installer_keys(query.keys(), schema)?;
                Some(Query::ExactFields(query))
            }
            Some(other) => {
                return Err(Error::InvalidQuery(format!(
                    "expected a mapping, found {}",
                    other.type_name()
                )));
            }
        };

        check_installer_keys(fields.keys(), schema)?;
        Ok(Self { query, fields })
    }

    /// Whether this entry selects `candidate`
    ///
    /// Without a Query, every identity field the entry defines must equal
    /// the candidate's; an entry defining none matches everything.
    pub fn matches(&self, candidate: &FieldMap) -> bool {
        match &self.query {
            Some(query) => query.matches(candidate),
            None => fields_match(self.identity_fields(), candidate),
        }
    }

    fn identity_fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().filter(|(key, _)| IDENTITY_FIELDS.contains(key))
    }

    /// Fields written onto the matched installer; identity fields only
    /// count when a Query did the selecting
    pub fn applicable_fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        let has_query = self.query.is_some();
        self.fields
            .iter()
            .filter(move |(key, _)| has_query || !IDENTITY_FIELDS.contains(key))
    }

    /// Whether the entry overrides `key`
    pub fn supplies(&self, key: &str) -> bool {
        self.applicable_fields().any(|(k, _)| k == key)
    }

    /// Selector rendering for error messages
    pub fn describe(&self) -> String {
        match &self.query {
            Some(query) => query.to_string(),
            None => describe_fields(self.identity_fields()),
        }
    }
}

fn check_installer_keys<'a>(mut keys: impl Iterator<Item = &'a str>, schema: &dyn SchemaProvider) -> Result<()> {
    match keys.find(|key| !schema.installer_keys().contains(key)) {
        Some(key) => Err(Error::UnrecognizedKey(key.to_string())),
        None => Ok(()),
    }
}

/// Sets one field of a locale manifest (the default locale when `locale`
/// is `None`)
#[derive(Debug, Clone, PartialEq)]
pub struct LocaleEntry {
    pub locale: Option<String>,
    pub key: String,
    pub value: Value,
}

impl LocaleEntry {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            locale: None,
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn for_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    /// Parse a `{Locale?, Key, Value}` document
    pub fn from_fields(mut fields: FieldMap) -> Result<Self> {
        let locale = match fields.remove("Locale") {
            None => None,
            Some(Value::String(tag)) => Some(tag),
            Some(other) => {
                return Err(Error::ParseError(format!(
                    "locale entry Locale must be a string, found {}",
                    other.type_name()
                )));
            }
        };
        let key = match fields.remove("Key") {
            Some(Value::String(key)) => key,
            _ => return Err(Error::ParseError("locale entry needs a string Key".to_string())),
        };
        let value = fields
            .remove("Value")
            .ok_or_else(|| Error::ParseError(format!("locale entry for {} has no Value", key)))?;

        if let Some(extra) = fields.keys().next() {
            return Err(Error::UnrecognizedKey(extra.to_string()));
        }

        Ok(Self { locale, key, value })
    }
}

/// How old installers are paired with entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReconcileMode {
    /// Each old installer is updated by the last entry matching it
    #[default]
    Update,
    /// Each entry produces one installer templated on the first old
    /// installer it matches
    Replace,
}

impl std::str::FromStr for ReconcileMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "update" => Ok(ReconcileMode::Update),
            "replace" => Ok(ReconcileMode::Replace),
            _ => Err(Error::ParseError(format!("unknown mode '{}'", s))),
        }
    }
}

/// Everything a reconcile run applies
#[derive(Debug, Clone, Default)]
pub struct UpdateInstructions {
    pub mode: ReconcileMode,
    pub installer_entries: Vec<InstallerEntry>,
    pub locale_entries: Vec<LocaleEntry>,
}

impl UpdateInstructions {
    /// Parse a `{Mode?, Installers: [...], Locales: [...]}` document
    pub fn from_fields(mut fields: FieldMap, schema: &dyn SchemaProvider) -> Result<Self> {
        let mode = match fields.remove("Mode") {
            None => ReconcileMode::default(),
            Some(Value::String(mode)) => mode.parse()?,
            Some(other) => {
                return Err(Error::ParseError(format!("Mode must be a string, found {}", other.type_name())));
            }
        };

        let installer_entries = take_maps(&mut fields, "Installers")?
            .into_iter()
            .map(|entry| InstallerEntry::from_fields(entry, schema))
            .collect::<Result<Vec<_>>>()?;

        let locale_entries = take_maps(&mut fields, "Locales")?
            .into_iter()
            .map(LocaleEntry::from_fields)
            .collect::<Result<Vec<_>>>()?;

        if let Some(extra) = fields.keys().next() {
            return Err(Error::UnrecognizedKey(extra.to_string()));
        }

        Ok(Self {
            mode,
            installer_entries,
            locale_entries,
        })
    }

    /// Parse a YAML (or JSON) instructions document
    pub fn from_yaml(content: &str, schema: &dyn SchemaProvider) -> Result<Self> {
        let fields = FieldMap::from_yaml(content)?;
        Self::from_fields(fields, schema)
    }
}

fn take_maps(fields: &mut FieldMap, key: &str) -> Result<Vec<FieldMap>> {
    match fields.remove(key) {
        None => Ok(Vec::new()),
        Some(Value::List(items)) => items
            .into_iter()
            .map(|item| match item {
                Value::Map(map) => Ok(map),
                other => Err(Error::ParseError(format!(
                    "{} items must be mappings, found {}",
                    key,
                    other.type_name()
                ))),
            })
            .collect(),
        Some(other) => Err(Error::ParseError(format!("{} must be a list, found {}", key, other.type_name()))),
    }
}
