//! Interface model builder
//!
//! Normalizes the first interface of a parsed document into an
//! [`InterfaceModel`]: names, semantic URIs, and per-operation intent, proof,
//! resolved parameter list and resolved return type. The model is the single
//! source of truth every generator reads from.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::attributes::Extensions;
use crate::parser::ast::{interfaces, Definition, OperationNode};
use crate::types::{self, TypeDescriptor};
use crate::{Error, Result};

/// One operation parameter with its resolved type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub type_expr: String,
    #[serde(skip)]
    pub descriptor: TypeDescriptor,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationModel {
    pub name: String,
    /// Empty when the operation declares no `[Intent]`
    pub intent: String,
    pub proof: Option<String>,
    /// Declaration order defines positional payload mapping
    pub parameters: Vec<Parameter>,
    pub return_type: String,
    #[serde(skip)]
    pub return_descriptor: Option<TypeDescriptor>,
    #[serde(skip)]
    pub extensions: Extensions,
}

impl OperationModel {
    /// Build from an operation AST node, resolving every type
    pub fn from_node(node: &OperationNode) -> Self {
        let extensions = Extensions::from_attributes(&node.ext_attrs);
        let parameters = node
            .arguments
            .iter()
            .map(|arg| Parameter {
                name: arg.name.clone(),
                type_expr: types::resolve(&arg.idl_type),
                descriptor: arg.idl_type.clone(),
            })
            .collect();

        OperationModel {
            name: node.name.clone(),
            intent: extensions.intent.clone().unwrap_or_default(),
            proof: extensions.proof.clone(),
            parameters,
            return_type: types::resolve_opt(node.idl_type.as_ref()),
            return_descriptor: node.idl_type.clone(),
            extensions,
        }
    }

    pub fn parameter_names(&self) -> impl Iterator<Item = &str> {
        self.parameters.iter().map(|p| p.name.as_str())
    }

    /// Return type once an asynchronous result settles (`Promise<T>` → `T`)
    pub fn awaited_return_type(&self) -> String {
        types::resolve_awaited(self.return_descriptor.as_ref())
    }
}

/// Normalized interface model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceModel {
    pub name: String,
    pub context: Option<String>,
    pub semantic: Option<String>,
    /// Unique names, declaration order preserved
    pub operations: Vec<OperationModel>,
}

impl InterfaceModel {
    pub fn new(name: impl Into<String>) -> Self {
        InterfaceModel {
            name: name.into(),
            context: None,
            semantic: None,
            operations: Vec::new(),
        }
    }

    pub fn operation(&self, name: &str) -> Option<&OperationModel> {
        self.operations.iter().find(|op| op.name == name)
    }

    /// Insert an operation; a redeclared name replaces the earlier entry in place.
    /// Returns true when an earlier entry was replaced.
    pub fn insert_operation(&mut self, operation: OperationModel) -> bool {
        match self.operations.iter_mut().find(|op| op.name == operation.name) {
            Some(existing) => {
                *existing = operation;
                true
            }
            None => {
                self.operations.push(operation);
                false
            }
        }
    }

    /// Every custom type name referenced by any operation, sorted.
    ///
    /// Excludes the interface's own name; generic wrappers and built-ins are
    /// never collected by the resolver.
    pub fn referenced_types(&self) -> Vec<String> {
        let mut names = self.collected_types();
        names.remove(&self.name);
        names.into_iter().collect()
    }

    /// True when an operation takes or returns the interface's own type.
    /// Generators alias the name to the client contract in that case.
    pub fn references_self(&self) -> bool {
        self.collected_types().contains(&self.name)
    }

    fn collected_types(&self) -> std::collections::BTreeSet<String> {
        let mut names = std::collections::BTreeSet::new();
        for op in &self.operations {
            for param in &op.parameters {
                types::collect_into(&param.descriptor, &mut names);
            }
            if let Some(ret) = &op.return_descriptor {
                types::collect_into(ret, &mut names);
            }
        }
        names
    }

    /// Operation name → {intent, proof}, in declaration order
    pub fn intents(&self) -> IntentRegistry {
        IntentRegistry {
            entries: self
                .operations
                .iter()
                .map(|op| IntentEntry {
                    operation: op.name.clone(),
                    intent: op.intent.clone(),
                    proof: op.proof.clone(),
                })
                .collect(),
        }
    }
}

/// One row of the intents registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentEntry {
    pub operation: String,
    pub intent: String,
    pub proof: Option<String>,
}

/// The registry shared by generated clients and handler registrars
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentRegistry {
    pub entries: Vec<IntentEntry>,
}

impl IntentRegistry {
    pub fn get(&self, operation: &str) -> Option<&IntentEntry> {
        self.entries.iter().find(|e| e.operation == operation)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ── Public API ────────────────────────────────────────────

/// Build the interface model from the first interface of a document.
///
/// # Errors
/// Returns `NoInterfaceDefinition` when the document has no interface.
pub fn build(definitions: &[Definition]) -> Result<InterfaceModel> {
    let iface = interfaces(definitions)
        .next()
        .ok_or(Error::NoInterfaceDefinition)?;

    let ext = Extensions::from_attributes(&iface.ext_attrs);
    let mut model = InterfaceModel {
        name: iface.name.clone(),
        context: ext.context,
        semantic: ext.semantic,
        operations: Vec::new(),
    };

    for node in iface.operations() {
        if node.name.is_empty() {
            tracing::debug!(interface = %iface.name, "skipping anonymous operation");
            continue;
        }
        if model.insert_operation(OperationModel::from_node(node)) {
            tracing::debug!(
                interface = %iface.name,
                operation = %node.name,
                "operation redeclared; later declaration replaces earlier"
            );
        }
    }

    tracing::debug!(
        interface = %model.name,
        operations = model.operations.len(),
        "built interface model"
    );
    Ok(model)
}

/// Parse IDL text and build its model in one step
pub fn build_from_source(source: &str) -> Result<InterfaceModel> {
    let definitions = crate::parser::parse(source)?;
    build(&definitions)
}

/// Hex SHA-256 of the model's canonical JSON form
pub fn model_hash(model: &InterfaceModel) -> String {
    let canonical = serde_json::to_string(model).unwrap_or_default();
    let digest = Sha256::digest(canonical.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#"
        [Context="https://agentidl.dev/contexts/trade.jsonld", Semantic="agent:Marketplace"]
        interface Marketplace {
          readonly attribute DOMString owner;

          [Intent="agent:ProposeContract", Proof="proof:SignedOffer"]
          Promise<ContractResponse> proposeContract(ContractProposal proposal);

          [Intent=agent:ExecutePayment]
          Promise<PaymentResult> executePayment(double amount, DOMString currency);

          boolean ping();
        };

        interface Ignored {
          [Intent="agent:Other"] void other();
        };
    "#;

    fn model() -> InterfaceModel {
        build_from_source(SOURCE).unwrap()
    }

    #[test]
    fn test_build_interface_metadata() {
        let m = model();
        assert_eq!(m.name, "Marketplace");
        assert_eq!(
            m.context.as_deref(),
            Some("https://agentidl.dev/contexts/trade.jsonld")
        );
        assert_eq!(m.semantic.as_deref(), Some("agent:Marketplace"));
    }

    #[test]
    fn test_build_operations_in_declaration_order() {
        let m = model();
        let names: Vec<&str> = m.operations.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["proposeContract", "executePayment", "ping"]);
    }

    #[test]
    fn test_build_operation_details() {
        let m = model();
        let propose = m.operation("proposeContract").unwrap();
        assert_eq!(propose.intent, "agent:ProposeContract");
        assert_eq!(propose.proof.as_deref(), Some("proof:SignedOffer"));
        assert_eq!(propose.return_type, "Promise<ContractResponse>");
        assert_eq!(propose.awaited_return_type(), "ContractResponse");

        let pay = m.operation("executePayment").unwrap();
        assert_eq!(pay.intent, "agent:ExecutePayment");
        assert_eq!(pay.proof, None);
        let params: Vec<(&str, &str)> = pay
            .parameters
            .iter()
            .map(|p| (p.name.as_str(), p.type_expr.as_str()))
            .collect();
        assert_eq!(params, vec![("amount", "number"), ("currency", "string")]);
    }

    #[test]
    fn test_missing_intent_defaults_to_empty() {
        let ping = model().operation("ping").cloned().unwrap();
        assert_eq!(ping.intent, "");
        assert_eq!(ping.proof, None);
        assert_eq!(ping.return_type, "boolean");
    }

    #[test]
    fn test_no_interface_found() {
        let err = build_from_source("enum Currency { \"USD\" };").unwrap_err();
        assert_eq!(err, Error::NoInterfaceDefinition);
    }

    #[test]
    fn test_redeclared_operation_overwrites_in_place() {
        let m = build_from_source(
            r#"interface A {
                [Intent="agent:First"] void run();
                void stop();
                [Intent="agent:Second"] void run(long times);
            };"#,
        )
        .unwrap();
        let names: Vec<&str> = m.operations.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["run", "stop"]);
        let run = m.operation("run").unwrap();
        assert_eq!(run.intent, "agent:Second");
        assert_eq!(run.parameters.len(), 1);
    }

    #[test]
    fn test_referenced_types_exclude_interface_name() {
        let m = build_from_source(
            r#"interface Node {
                Promise<Node> parent();
                sequence<Edge> edges(Filter? filter);
                Promise<any> raw();
            };"#,
        )
        .unwrap();
        assert_eq!(m.referenced_types(), vec!["Edge".to_string(), "Filter".to_string()]);
    }

    #[test]
    fn test_intents_registry() {
        let registry = model().intents();
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.get("executePayment").unwrap().intent, "agent:ExecutePayment");
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_model_hash_stable_and_sensitive() {
        let a = model_hash(&model());
        assert_eq!(a.len(), 64);
        assert_eq!(a, model_hash(&model()));

        let mut changed = model();
        changed.operations[0].intent = "agent:Changed".into();
        assert_ne!(a, model_hash(&changed));
    }
}
