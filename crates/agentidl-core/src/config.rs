//! Configuration: `agentidl.toml` and rule documents
//!
//! Every section is optional; missing sections and rule paths fall back to
//! the built-in defaults. Rule paths are resolved relative to the directory of
//! the configuration file that names them.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::codegen::Flavor;
use crate::ontology::PrefixTable;
use crate::validator::{DocumentKind, DocumentRules, RuleSet};
use crate::{Error, Result};

/// Default configuration file name looked up in the working directory
pub const CONFIG_FILE: &str = "agentidl.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub codegen: CodegenConfig,
    #[serde(default)]
    pub ontology: OntologyConfig,
    #[serde(default)]
    pub rules: RulesConfig,
    /// Directory relative rule paths resolve against
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodegenConfig {
    /// Flavor used when the command line does not choose one
    #[serde(default)]
    pub flavor: Option<Flavor>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OntologyConfig {
    /// Added to, or replacing, the built-in prefixes
    #[serde(default)]
    pub prefixes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RulesConfig {
    #[serde(default)]
    pub definition: Option<PathBuf>,
    #[serde(default)]
    pub delegation: Option<PathBuf>,
    #[serde(default)]
    pub execution: Option<PathBuf>,
}

/// Parse configuration text.
pub fn parse_config(text: &str) -> Result<Config> {
    toml::from_str(text).map_err(|e| Error::ConfigError(e.to_string()))
}

/// Load a configuration file; its directory becomes the base for rule paths.
pub fn load_config(path: &Path) -> Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| Error::Io(format!("{}: {}", path.display(), e)))?;
    let mut config: Config = toml::from_str(&text)
        .map_err(|e| Error::ConfigError(format!("{}: {}", path.display(), e)))?;
    config.base_dir = path.parent().map(Path::to_path_buf);
    tracing::debug!(path = %path.display(), "loaded configuration");
    Ok(config)
}

/// Load a rule document: `.toml` files through `toml`, anything else as JSON.
pub fn load_rules<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| Error::Io(format!("{}: {}", path.display(), e)))?;
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let parsed = if is_toml {
        toml::from_str(&text).map_err(|e| e.to_string())
    } else {
        serde_json::from_str(&text).map_err(|e| e.to_string())
    };
    parsed.map_err(|e| Error::ConfigError(format!("{}: {}", path.display(), e)))
}

impl Config {
    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    pub fn prefix_table(&self) -> PrefixTable {
        PrefixTable::with_overrides(&self.ontology.prefixes)
    }

    /// Definition rules from `override_path`, the configured path, or defaults
    pub fn definition_rules(&self, override_path: Option<&Path>) -> Result<RuleSet> {
        match override_path {
            Some(path) => load_rules(path),
            None => match &self.rules.definition {
                Some(path) => load_rules(&self.resolve(path)),
                None => Ok(RuleSet::default()),
            },
        }
    }

    /// Document rules for `kind` from `override_path`, the configured path,
    /// or the built-in defaults for that kind
    pub fn document_rules(&self, kind: DocumentKind, override_path: Option<&Path>) -> Result<DocumentRules> {
        let configured = match kind {
            DocumentKind::DelegationContext => &self.rules.delegation,
            DocumentKind::ExecutionRecord => &self.rules.execution,
        };
        let path = match (override_path, configured) {
            (Some(path), _) => path.to_path_buf(),
            (None, Some(path)) => self.resolve(path),
            (None, None) => return Ok(DocumentRules::for_kind(kind)),
        };
        let mut rules: DocumentRules = load_rules(&path)?;
        rules.kind = kind;
        Ok(rules)
    }
}
