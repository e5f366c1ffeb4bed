//! Ontology projector
//!
//! Projects an [`InterfaceModel`] into two aligned linked-data views: a
//! JSON-LD graph and a Turtle document. Both read the same model and the same
//! [`PrefixTable`], which is passed in at construction.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::model::{InterfaceModel, OperationModel};

/// CURIE prefix → namespace IRI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrefixTable {
    prefixes: BTreeMap<String, String>,
}

/// Prefixes the projected vocabulary itself is written in
const CORE_PREFIXES: &[(&str, &str)] = &[
    ("rdfs", "http://www.w3.org/2000/01/rdf-schema#"),
    ("owl", "http://www.w3.org/2002/07/owl#"),
    ("agent", "https://agentidl.dev/ns/agent#"),
];

impl Default for PrefixTable {
    fn default() -> Self {
        let mut table = PrefixTable::empty();
        table.insert("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#");
        table.insert("xsd", "http://www.w3.org/2001/XMLSchema#");
        table.insert("proof", "https://agentidl.dev/ns/proof#");
        for (prefix, iri) in CORE_PREFIXES {
            table.insert(*prefix, *iri);
        }
        table
    }
}

impl PrefixTable {
    pub fn empty() -> Self {
        PrefixTable {
            prefixes: BTreeMap::new(),
        }
    }

    /// Add or replace a prefix
    pub fn insert(&mut self, prefix: impl Into<String>, iri: impl Into<String>) {
        self.prefixes.insert(prefix.into(), iri.into());
    }

    pub fn get(&self, prefix: &str) -> Option<&str> {
        self.prefixes.get(prefix).map(String::as_str)
    }

    /// Defaults overlaid with `overrides`
    pub fn with_overrides(overrides: &BTreeMap<String, String>) -> Self {
        let mut table = PrefixTable::default();
        for (prefix, iri) in overrides {
            table.insert(prefix.clone(), iri.clone());
        }
        table
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.prefixes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Split `prefix:local` when the prefix is known
    fn split<'a>(&self, curie: &'a str) -> Option<(&str, &'a str)> {
        let (prefix, local) = curie.split_once(':')?;
        if local.starts_with("//") {
            return None;
        }
        let iri = self.get(prefix)?;
        Some((iri, local))
    }

    /// Expand a CURIE to a full IRI. Unknown prefixes and absolute IRIs are
    /// returned unchanged.
    pub fn expand(&self, curie: &str) -> String {
        match self.split(curie) {
            Some((iri, local)) => format!("{}{}", iri, local),
            None => curie.to_string(),
        }
    }
}

fn is_absolute_iri(value: &str) -> bool {
    value.split_once("://").is_some_and(|(scheme, _)| {
        !scheme.is_empty()
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    })
}

/// Builds JSON-LD and Turtle views of a model
#[derive(Debug, Clone)]
pub struct OntologyProjector {
    prefixes: PrefixTable,
}

impl Default for OntologyProjector {
    fn default() -> Self {
        OntologyProjector::new(PrefixTable::default())
    }
}

impl OntologyProjector {
    /// `rdfs`, `owl` and `agent` are added when `prefixes` lacks them;
    /// bindings already present are kept.
    pub fn new(mut prefixes: PrefixTable) -> Self {
        for (prefix, iri) in CORE_PREFIXES {
            if prefixes.get(prefix).is_none() {
                prefixes.insert(*prefix, *iri);
            }
        }
        OntologyProjector { prefixes }
    }

    pub fn prefixes(&self) -> &PrefixTable {
        &self.prefixes
    }

    fn class_curie(model: &InterfaceModel) -> String {
        format!("agent:{}", model.name)
    }

    /// Node identifier for an operation: its intent, or `Interface.Operation`
    /// when it declares none.
    fn operation_id(model: &InterfaceModel, op: &OperationModel) -> String {
        if op.intent.is_empty() {
            format!("{}.{}", model.name, op.name)
        } else {
            op.intent.clone()
        }
    }

    fn context_terms(&self) -> Value {
        let mut terms = Map::new();
        for (prefix, iri) in self.prefixes.iter() {
            terms.insert(prefix.to_string(), Value::String(iri.to_string()));
        }
        terms.insert("label".into(), json!("rdfs:label"));
        terms.insert("Intent".into(), json!("agent:Intent"));
        terms.insert("intent".into(), json!("agent:intent"));
        terms.insert("proof".into(), json!("agent:proof"));
        terms.insert("semantic".into(), json!({ "@id": "agent:semantic", "@type": "@id" }));
        Value::Object(terms)
    }

    /// JSON-LD document with one class node and one node per operation.
    pub fn graph(&self, model: &InterfaceModel) -> Value {
        let mut context = Vec::new();
        if let Some(uri) = &model.context {
            context.push(Value::String(uri.clone()));
        }
        context.push(self.context_terms());

        let mut class = Map::new();
        class.insert(
            "@id".into(),
            Value::String(self.prefixes.expand(&Self::class_curie(model))),
        );
        class.insert("@type".into(), json!("owl:Class"));
        class.insert("label".into(), Value::String(model.name.clone()));
        if let Some(semantic) = &model.semantic {
            class.insert("semantic".into(), Value::String(self.prefixes.expand(semantic)));
        }

        let mut nodes = vec![Value::Object(class)];
        for op in &model.operations {
            let mut node = Map::new();
            node.insert(
                "@id".into(),
                Value::String(self.prefixes.expand(&Self::operation_id(model, op))),
            );
            node.insert("@type".into(), json!("Intent"));
            node.insert("label".into(), Value::String(op.name.clone()));
            if !op.intent.is_empty() {
                node.insert("intent".into(), Value::String(op.intent.clone()));
            }
            if let Some(proof) = &op.proof {
                node.insert("proof".into(), Value::String(proof.clone()));
            }
            nodes.push(Value::Object(node));
        }

        tracing::debug!(interface = %model.name, nodes = nodes.len(), "projected JSON-LD graph");
        json!({
            "@context": context,
            "@graph": nodes,
        })
    }

    /// A Turtle term for `value`: a prefixed name when its prefix is declared
    /// in the header, `<value>` otherwise.
    fn term(&self, value: &str) -> String {
        if !is_absolute_iri(value) && self.prefixes.split(value).is_some() {
            value.to_string()
        } else {
            format!("<{}>", value)
        }
    }

    /// Turtle document: prefix header, class triple, intent and proof triples.
    pub fn turtle(&self, model: &InterfaceModel) -> String {
        let mut out = String::new();
        for (prefix, iri) in self.prefixes.iter() {
            out.push_str(&format!("@prefix {}: <{}> .\n", prefix, iri));
        }
        out.push('\n');

        let class = self.term(&Self::class_curie(model));
        out.push_str(&format!(
            "{} a owl:Class ; rdfs:label {} .\n",
            class,
            literal(&model.name)
        ));

        for op in &model.operations {
            let id = self.term(&Self::operation_id(model, op));
            out.push_str(&format!(
                "{} a agent:Intent ; rdfs:label {} ; agent:operationOf {} .\n",
                id,
                literal(&op.name),
                class
            ));
            if let Some(proof) = &op.proof {
                out.push_str(&format!("{} agent:requiresProof {} .\n", id, self.term(proof)));
            }
        }
        out
    }
}

fn literal(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}
