//! AgentIDL Core - compiler and runtime for intent-annotated interface definitions
//!
//! An interface definition annotated with `[Intent]`, `[Proof]`, `[Context]`,
//! `[Semantic]`, `[Delegation]` and `[Capability]` attributes is compiled into
//! a single [`InterfaceModel`], and every artifact is projected from that model.
//!
//! # Architecture
//!
//! ```text
//! IDL Text → Parser → AST ─┬→ Model Builder → InterfaceModel ─┬→ Codegen (TS / JS)
//!                          │   (types + attributes)           ├→ Ontology (JSON-LD / Turtle)
//!                          │                                  └→ Runtime (agents, intents)
//!                          └→ Validator (definition rules)
//!
//! JSON documents ─────────────→ Validator (delegation / execution rules)
//! Scenario documents ─────────→ Scenario runner (validator + runtime)
//! ```
//!
//! # Guarantees
//!
//! - **Deterministic**: same source always produces byte-identical artifacts
//! - **Single source**: generators read the model, never the source text
//! - **Total validation**: rule violations are collected, never raised

pub mod attributes;
pub mod codegen;
pub mod config;
pub mod error;
pub mod model;
pub mod ontology;
pub mod parser;
pub mod runtime;
pub mod scenario;
pub mod types;
pub mod validator;

pub use codegen::{Flavor, GeneratedModule, GeneratedModules};
pub use error::{Error, Result};
pub use model::{model_hash, InterfaceModel, IntentRegistry, OperationModel};
pub use ontology::{OntologyProjector, PrefixTable};
pub use runtime::{Agent, AgentTransport, IntentClient, Message, Transport};
pub use validator::{DocumentKind, DocumentRules, Finding, FindingKind, RuleSet, ValidationReport};

/// Version of the compiler library, stamped into `agentidl version`
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Everything one compilation run produces
#[derive(Debug, Clone, PartialEq)]
pub struct Artifacts {
    pub model: InterfaceModel,
    pub hash: String,
    pub modules: Vec<GeneratedModules>,
    pub graph: serde_json::Value,
    pub turtle: String,
}

/// Parse `source`, build its model, and project every artifact.
///
/// # Errors
/// Returns `ParseError` for malformed source and `NoInterfaceDefinition`
/// when the source declares no interface.
pub fn compile(source: &str, flavors: &[Flavor], prefixes: PrefixTable) -> Result<Artifacts> {
    let model = model::build_from_source(source)?;
    let projector = OntologyProjector::new(prefixes);
    let modules = flavors
        .iter()
        .map(|&flavor| codegen::generate(&model, flavor))
        .collect();
    Ok(Artifacts {
        hash: model_hash(&model),
        graph: projector.graph(&model),
        turtle: projector.turtle(&model),
        modules,
        model,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#"
        [Context="https://agentidl.dev/contexts/trade.jsonld", Semantic="agent:Marketplace"]
        interface Marketplace {
          [Intent="agent:ProposeContract", Proof="proof:SignedOffer"]
          Promise<ContractResponse> proposeContract(ContractProposal proposal);
          [Intent="agent:ExecutePayment", Delegation]
          Promise<PaymentResult> executePayment(double amount, DOMString currency, DelegationContext ctx);
        };
    "#;

    #[test]
    fn test_compile_all_artifacts() {
        let artifacts = compile(
            SOURCE,
            &[Flavor::TypeScript, Flavor::JavaScript],
            PrefixTable::default(),
        )
        .unwrap();
        assert_eq!(artifacts.model.name, "Marketplace");
        assert_eq!(artifacts.modules.len(), 2);
        assert_eq!(artifacts.graph["@graph"].as_array().unwrap().len(), 3);
        assert!(artifacts.turtle.contains("agent:ExecutePayment a agent:Intent"));
        assert!(artifacts.modules[0]
            .client
            .source
            .contains(&format!("model sha256:{}", artifacts.hash)));
    }

    #[test]
    fn test_compile_without_interface() {
        let err = compile("enum E { \"a\" };", &[Flavor::TypeScript], PrefixTable::default())
            .unwrap_err();
        assert_eq!(err, Error::NoInterfaceDefinition);
    }

    #[test]
    fn test_determinism_100_iterations() {
        let first = compile(SOURCE, &[Flavor::TypeScript], PrefixTable::default()).unwrap();
        for i in 0..100 {
            let result = compile(SOURCE, &[Flavor::TypeScript], PrefixTable::default()).unwrap();
            assert_eq!(first, result, "Non-determinism at iteration {}", i);
        }
    }
}
