//! Scenario runner
//!
//! A [`Scenario`] names an interface definition, one operation call, an
//! optional delegation context, and the status the call is expected to
//! produce. [`ScenarioRunner::run`] executes it between two in-process agents:
//!
//! 1. An attached delegation context is checked first; any error finding
//!    rejects the call before it is made.
//! 2. The caller invokes the operation on the target through `call_method`.
//! 3. The completed call is written up as an execution record and checked.
//!
//! Locating scenario files and loading the definition they reference is left
//! to the caller.

use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::model::InterfaceModel;
use crate::runtime::{Agent, Message};
use crate::validator::{validate_document, DocumentRules, Finding};

pub const STATUS_REJECTED: &str = "rejected";
pub const STATUS_ACCEPTED: &str = "accepted";
pub const STATUS_ERROR: &str = "error";
/// Status reported when a handler result carries no `status` field
pub const STATUS_COMPLETED: &str = "completed";

fn default_caller() -> String {
    "Buyer".to_string()
}

fn default_target() -> String {
    "Seller".to_string()
}

/// One data-driven test case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub name: String,
    /// Path of the IDL document, relative to the scenario file
    pub definition: String,
    pub operation: String,
    /// Array: positional arguments. Object: arguments by parameter name.
    #[serde(default)]
    pub payload: Value,
    /// Inline delegation context document
    #[serde(default)]
    pub delegation: Option<Value>,
    pub expected_status: String,
    #[serde(default = "default_caller")]
    pub caller: String,
    #[serde(default = "default_target")]
    pub target: String,
    /// Declarative behavior for the target agent
    #[serde(default)]
    pub handlers: Vec<ScriptedHandler>,
}

impl Scenario {
    /// Positional arguments for `operation` in `model`
    pub fn arguments(&self, model: &InterfaceModel) -> Vec<Value> {
        match &self.payload {
            Value::Array(args) => args.clone(),
            Value::Object(named) => model
                .operation(&self.operation)
                .map(|op| {
                    op.parameter_names()
                        .map(|name| named.get(name).cloned().unwrap_or(Value::Null))
                        .collect()
                })
                .unwrap_or_default(),
            Value::Null => Vec::new(),
            other => vec![other.clone()],
        }
    }
}

/// A precondition on one payload field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guard {
    pub field: String,
    /// Field must be a number strictly greater than this
    #[serde(default)]
    pub greater_than: Option<f64>,
    /// Field must be present and non-null
    #[serde(default)]
    pub required: bool,
    pub reason: String,
}

impl Guard {
    fn admits(&self, payload: &Map<String, Value>) -> bool {
        let value = payload.get(&self.field).filter(|v| !v.is_null());
        if self.required && value.is_none() {
            return false;
        }
        match (self.greater_than, value) {
            (Some(bound), Some(v)) => v.as_f64().is_some_and(|n| n > bound),
            (Some(_), None) => false,
            (None, _) => true,
        }
    }
}

/// Canned target behavior: reject on the first failing guard, otherwise
/// respond with `respond` (status `accepted` unless it says otherwise).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptedHandler {
    pub operation: String,
    #[serde(default)]
    pub guards: Vec<Guard>,
    #[serde(default)]
    pub respond: Map<String, Value>,
}

impl ScriptedHandler {
    pub fn respond_to(&self, payload: &Map<String, Value>) -> Value {
        if let Some(guard) = self.guards.iter().find(|g| !g.admits(payload)) {
            return json!({ "status": STATUS_REJECTED, "reason": guard.reason });
        }
        let mut response = Map::new();
        response.insert("status".into(), Value::String(STATUS_ACCEPTED.into()));
        for (key, value) in &self.respond {
            response.insert(key.clone(), value.clone());
        }
        Value::Object(response)
    }

    /// Register every scripted handler on `agent`. Handlers naming
    /// operations outside the agent's model are skipped with a warning.
    pub fn install_all(handlers: &[ScriptedHandler], agent: &mut Agent) {
        for scripted in handlers {
            let behavior = scripted.clone();
            let registered = agent.register_operation(
                &scripted.operation,
                move |_args: Vec<Value>, message: Message| {
                    let response = behavior.respond_to(&message.payload);
                    async move { Ok(response) }
                },
            );
            if let Err(e) = registered {
                tracing::warn!(operation = %scripted.operation, error = %e, "scripted handler skipped");
            }
        }
    }
}

/// Result of one scenario run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioOutcome {
    pub name: String,
    pub expected_status: String,
    pub actual_status: String,
    pub passed: bool,
    pub result: Option<Value>,
    /// Delegation findings for rejected calls, execution record findings otherwise
    pub findings: Vec<Finding>,
    pub error: Option<String>,
    pub duration_ms: u128,
}

/// Runs scenarios against delegation and execution rules
#[derive(Debug, Clone)]
pub struct ScenarioRunner {
    pub delegation_rules: DocumentRules,
    pub execution_rules: DocumentRules,
}

impl Default for ScenarioRunner {
    fn default() -> Self {
        ScenarioRunner {
            delegation_rules: DocumentRules::delegation_context(),
            execution_rules: DocumentRules::execution_record(),
        }
    }
}

impl ScenarioRunner {
    pub fn new(delegation_rules: DocumentRules, execution_rules: DocumentRules) -> Self {
        ScenarioRunner {
            delegation_rules,
            execution_rules,
        }
    }

    /// Run one scenario. `install` registers the target agent's handlers.
    pub async fn run<F>(&self, scenario: &Scenario, model: &InterfaceModel, install: F) -> ScenarioOutcome
    where
        F: FnOnce(&mut Agent),
    {
        let started = Instant::now();
        let mut outcome = ScenarioOutcome {
            name: scenario.name.clone(),
            expected_status: scenario.expected_status.clone(),
            actual_status: String::new(),
            passed: false,
            result: None,
            findings: Vec::new(),
            error: None,
            duration_ms: 0,
        };

        if let Some(doc) = &scenario.delegation {
            match validate_document(doc, &self.delegation_rules) {
                Ok(report) if !report.is_valid() => {
                    tracing::debug!(scenario = %scenario.name, findings = report.findings.len(), "delegation rejected");
                    outcome.actual_status = STATUS_REJECTED.to_string();
                    outcome.findings = report.findings;
                    return finish(outcome, started);
                }
                Ok(_) => {}
                Err(e) => {
                    outcome.actual_status = STATUS_ERROR.to_string();
                    outcome.error = Some(e.to_string());
                    return finish(outcome, started);
                }
            }
        }

        let caller = Agent::new(scenario.caller.clone(), model.clone());
        let mut target = Agent::new(scenario.target.clone(), model.clone());
        install(&mut target);

        let args = scenario.arguments(model);
        match caller.call_method(&target, &scenario.operation, args.clone()).await {
            Ok(result) => {
                outcome.actual_status = result
                    .get("status")
                    .and_then(Value::as_str)
                    .unwrap_or(STATUS_COMPLETED)
                    .to_string();
                let record = execution_record(scenario, model, args, &result);
                match validate_document(&record, &self.execution_rules) {
                    Ok(report) => outcome.findings = report.findings,
                    Err(e) => outcome.error = Some(e.to_string()),
                }
                outcome.result = Some(result);
            }
            Err(e) => {
                outcome.actual_status = STATUS_ERROR.to_string();
                outcome.error = Some(e.to_string());
            }
        }
        finish(outcome, started)
    }
}

fn finish(mut outcome: ScenarioOutcome, started: Instant) -> ScenarioOutcome {
    outcome.passed = outcome.actual_status == outcome.expected_status;
    outcome.duration_ms = started.elapsed().as_millis();
    tracing::debug!(
        scenario = %outcome.name,
        expected = %outcome.expected_status,
        actual = %outcome.actual_status,
        passed = outcome.passed,
        "scenario finished"
    );
    outcome
}

/// Audit record of a completed call
fn execution_record(scenario: &Scenario, model: &InterfaceModel, args: Vec<Value>, result: &Value) -> Value {
    let op = model.operation(&scenario.operation);
    let mut record = Map::new();
    record.insert("from".into(), Value::String(scenario.caller.clone()));
    record.insert("to".into(), Value::String(scenario.target.clone()));
    record.insert("operation".into(), Value::String(scenario.operation.clone()));
    record.insert(
        "intent".into(),
        Value::String(op.map(|o| o.intent.clone()).unwrap_or_default()),
    );
    record.insert("timestamp".into(), Value::String(Utc::now().to_rfc3339()));
    record.insert(
        "payload".into(),
        Value::Object(op.map(|o| crate::runtime::positional_payload(o, args)).unwrap_or_default()),
    );
    record.insert("result".into(), result.clone());
    for field in ["proof", "attestation"] {
        if let Some(attached) = result.get(field) {
            record.insert(field.into(), attached.clone());
        }
    }
    Value::Object(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::build_from_source;
    use crate::validator::FindingKind;

    const SOURCE: &str = r#"
        interface Marketplace {
          [Intent="agent:ProposeContract"]
          Promise<ContractResponse> proposeContract(ContractProposal proposal);
          [Intent="agent:ExecutePayment"]
          Promise<PaymentResult> executePayment(double amount, DOMString currency);
        };
    "#;

    fn scenario(json: Value) -> Scenario {
        serde_json::from_value(json).unwrap()
    }

    fn payment_handler() -> ScriptedHandler {
        serde_json::from_value(json!({
            "operation": "executePayment",
            "guards": [{ "field": "amount", "greaterThan": 0, "reason": "Amount must be positive." }],
            "respond": { "receipt": "R-1" }
        }))
        .unwrap()
    }

    #[test]
    fn test_scenario_defaults() {
        let s = scenario(json!({
            "name": "x", "definition": "m.webidl", "operation": "proposeContract",
            "expectedStatus": "accepted"
        }));
        assert_eq!(s.caller, "Buyer");
        assert_eq!(s.target, "Seller");
        assert!(s.delegation.is_none());
        assert!(s.handlers.is_empty());
    }

    #[test]
    fn test_named_payload_maps_to_positions() {
        let model = build_from_source(SOURCE).unwrap();
        let s = scenario(json!({
            "name": "x", "definition": "m.webidl", "operation": "executePayment",
            "payload": { "currency": "USD", "amount": 3 }, "expectedStatus": "accepted"
        }));
        assert_eq!(s.arguments(&model), vec![json!(3), json!("USD")]);
    }

    #[test]
    fn test_scripted_guard_boundary() {
        let handler = payment_handler();
        let respond = |amount: Value| {
            let mut payload = Map::new();
            payload.insert("amount".into(), amount);
            handler.respond_to(&payload)
        };
        assert_eq!(
            respond(json!(-10)),
            json!({ "status": "rejected", "reason": "Amount must be positive." })
        );
        assert_eq!(respond(json!(0))["status"], "rejected");
        assert_eq!(respond(json!(0.01)), json!({ "status": "accepted", "receipt": "R-1" }));
        assert_eq!(respond(json!("ten"))["status"], "rejected");
    }

    #[test]
    fn test_execution_record_keeps_proof_and_attestation_apart() {
        let model = build_from_source(SOURCE).unwrap();
        let s = scenario(json!({
            "name": "pay", "definition": "m.webidl", "operation": "executePayment",
            "payload": [25.0, "USD"], "expectedStatus": "accepted"
        }));
        let result = json!({
            "status": "accepted",
            "proof": { "type": "proof:SignedOffer" },
            "attestation": { "type": "proof:Receipt" }
        });
        let record = execution_record(&s, &model, s.arguments(&model), &result);
        assert_eq!(record["proof"]["type"], "proof:SignedOffer");
        assert_eq!(record["attestation"]["type"], "proof:Receipt");
        assert_eq!(record["payload"], json!({ "amount": 25.0, "currency": "USD" }));

        let proof_only = json!({ "status": "accepted", "proof": { "type": "proof:SignedOffer" } });
        let record = execution_record(&s, &model, s.arguments(&model), &proof_only);
        assert_eq!(record["proof"]["type"], "proof:SignedOffer");
        assert!(record.get("attestation").is_none());
    }

    #[tokio::test]
    async fn test_run_accepted() {
        let model = build_from_source(SOURCE).unwrap();
        let s = scenario(json!({
            "name": "pay", "definition": "m.webidl", "operation": "executePayment",
            "payload": [25.0, "USD"], "expectedStatus": "accepted"
        }));
        let handlers = vec![payment_handler()];
        let outcome = ScenarioRunner::default()
            .run(&s, &model, |agent| ScriptedHandler::install_all(&handlers, agent))
            .await;
        assert!(outcome.passed, "{:?}", outcome);
        assert_eq!(outcome.result.unwrap()["receipt"], "R-1");
        assert!(outcome.findings.is_empty(), "{:?}", outcome.findings);
    }

    #[tokio::test]
    async fn test_revoked_delegation_rejects_before_call() {
        let model = build_from_source(SOURCE).unwrap();
        let s = scenario(json!({
            "name": "revoked", "definition": "m.webidl", "operation": "executePayment",
            "payload": [25.0, "USD"], "expectedStatus": "rejected",
            "delegation": {
                "delegator": "did:example:alice", "delegate": "did:example:buyer",
                "scope": ["agent:ExecutePayment"], "issuedAt": "2026-01-01",
                "expiresAt": "2026-12-31", "revoked": true
            }
        }));
        let mut installed = false;
        let outcome = ScenarioRunner::default()
            .run(&s, &model, |_agent| installed = true)
            .await;
        assert!(outcome.passed);
        assert!(!installed, "target is never built for a rejected delegation");
        assert!(outcome
            .findings
            .iter()
            .any(|f| f.kind == FindingKind::RevokedDelegation));
    }

    #[tokio::test]
    async fn test_unhandled_intent_is_error_status() {
        let model = build_from_source(SOURCE).unwrap();
        let s = scenario(json!({
            "name": "nobody home", "definition": "m.webidl", "operation": "proposeContract",
            "payload": [{}], "expectedStatus": "accepted"
        }));
        let outcome = ScenarioRunner::default().run(&s, &model, |_agent| {}).await;
        assert!(!outcome.passed);
        assert_eq!(outcome.actual_status, "error");
        assert!(outcome.error.unwrap().contains("agent:ProposeContract"));
    }

    #[tokio::test]
    async fn test_result_without_status_is_completed() {
        let model = build_from_source(SOURCE).unwrap();
        let s = scenario(json!({
            "name": "plain", "definition": "m.webidl", "operation": "proposeContract",
            "payload": [{}], "expectedStatus": "completed"
        }));
        let outcome = ScenarioRunner::default()
            .run(&s, &model, |agent| {
                agent.register_intent("agent:ProposeContract", |_m: Message| async {
                    Ok(json!({ "contractId": "C-1" }))
                });
            })
            .await;
        assert!(outcome.passed, "{:?}", outcome);
    }
}
