//! The process-wide rule table.
//!
//! The default table is compiled in from `rules/default.yml`. A host may
//! install a different table once at startup; after that the table is
//! fixed for the life of the process.

use std::path::Path;
use std::sync::{Arc, OnceLock};

use crate::error::TableError;
use crate::schema::{ActionRule, PropertyRule, RuleTableDocument};

const DEFAULT_TABLE: &str = include_str!("../rules/default.yml");

static GLOBAL: OnceLock<Arc<RuleTable>> = OnceLock::new();

/// Two independent, ordered rule lists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleTable {
    pub action_rules: Vec<ActionRule>,
    pub property_rules: Vec<PropertyRule>,
}

impl RuleTable {
    pub fn new(action_rules: Vec<ActionRule>, property_rules: Vec<PropertyRule>) -> Self {
        Self {
            action_rules,
            property_rules,
        }
    }

    /// The table shipped with the binary.
    pub fn embedded() -> Result<Self, TableError> {
        Self::from_yaml(DEFAULT_TABLE)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, TableError> {
        let doc: RuleTableDocument = serde_yaml::from_str(yaml)?;
        Ok(doc.into())
    }

    pub fn from_path(path: &Path) -> Result<Self, TableError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml)
    }

    pub fn is_empty(&self) -> bool {
        self.action_rules.is_empty() && self.property_rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.action_rules.len() + self.property_rules.len()
    }

    /// The installed table, or the embedded one if nothing was installed.
    pub fn global() -> Result<Arc<RuleTable>, TableError> {
        if let Some(table) = GLOBAL.get() {
            return Ok(table.clone());
        }
        let table = Arc::new(Self::embedded()?);
        Ok(GLOBAL.get_or_init(|| table).clone())
    }

    /// Fix `table` as the process-wide table. Fails if one is already set,
    /// including by an earlier call to [`RuleTable::global`].
    pub fn install(table: RuleTable) -> Result<Arc<RuleTable>, TableError> {
        let table = Arc::new(table);
        GLOBAL
            .set(table.clone())
            .map_err(|_| TableError::AlreadyInstalled)?;
        tracing::info!(
            action_rules = table.action_rules.len(),
            property_rules = table.property_rules.len(),
            "rule table installed"
        );
        Ok(table)
    }
}

impl From<RuleTableDocument> for RuleTable {
    fn from(doc: RuleTableDocument) -> Self {
        Self::new(doc.action_rules, doc.property_rules)
    }
}
