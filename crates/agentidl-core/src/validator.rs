//! Conformance validator - definition and document checks against rule sets
//!
//! Two independent checks:
//!
//! 1. **Definition check** ([`validate_definition`]) runs over the raw AST:
//!    recognized attribute names, required attributes, delegation parameters,
//!    and redeclared operation names.
//! 2. **Document check** ([`validate_document`]) runs over a JSON delegation
//!    context or execution record: required fields, timestamps, proof or
//!    attestation sub-objects, and revocation.
//!
//! Both accumulate every finding into a [`ValidationReport`]. Rule violations
//! are never raised as errors; only input that cannot be read as a document
//! at all fails with [`Error::MalformedDocument`].

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::attributes::{self, RECOGNIZED};
use crate::parser::ast::{interfaces, Definition, ExtAttr, OperationNode};
use crate::{Error, Result};

// ── Report Types ──────────────────────────────────────────

/// Accumulated findings of one check
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub findings: Vec<Finding>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if no errors were found (warnings are OK)
    pub fn is_valid(&self) -> bool {
        !self.findings.iter().any(|f| f.severity == Severity::Error)
    }

    pub fn errors(&self) -> Vec<&Finding> {
        self.findings
            .iter()
            .filter(|f| f.severity == Severity::Error)
            .collect()
    }

    pub fn warnings(&self) -> Vec<&Finding> {
        self.findings
            .iter()
            .filter(|f| f.severity == Severity::Warning)
            .collect()
    }

    /// Findings of one kind
    pub fn of_kind(&self, kind: FindingKind) -> Vec<&Finding> {
        self.findings.iter().filter(|f| f.kind == kind).collect()
    }

    fn add_error(&mut self, kind: FindingKind, message: String, location: impl Into<String>) {
        self.findings.push(Finding {
            severity: Severity::Error,
            kind,
            message,
            location: location.into(),
        });
    }

    fn add_warning(&mut self, kind: FindingKind, message: String, location: impl Into<String>) {
        self.findings.push(Finding {
            severity: Severity::Warning,
            kind,
            message,
            location: location.into(),
        });
    }
}

/// A single rule violation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    pub kind: FindingKind,
    pub message: String,
    /// `Interface`, `Interface.operation`, or a document field path
    pub location: String,
}

impl std::fmt::Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        if self.location.is_empty() {
            write!(f, "{} [{}]: {}", prefix, self.kind, self.message)
        } else {
            write!(f, "{} [{}] at {}: {}", prefix, self.kind, self.location, self.message)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Category of rule violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FindingKind {
    UnknownExtensionAttribute,
    MissingRequiredAttribute,
    MissingDelegationParameter,
    DuplicateOperation,
    MissingRequiredField,
    InvalidTimestamp,
    InvalidProofType,
    RevokedDelegation,
}

impl std::fmt::Display for FindingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            FindingKind::UnknownExtensionAttribute => "unknown-attribute",
            FindingKind::MissingRequiredAttribute => "missing-attribute",
            FindingKind::MissingDelegationParameter => "missing-delegation-parameter",
            FindingKind::DuplicateOperation => "duplicate-operation",
            FindingKind::MissingRequiredField => "missing-field",
            FindingKind::InvalidTimestamp => "invalid-timestamp",
            FindingKind::InvalidProofType => "invalid-proof-type",
            FindingKind::RevokedDelegation => "revoked-delegation",
        };
        write!(f, "{}", name)
    }
}

// ── Definition Check ──────────────────────────────────────

/// Rules for the definition check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSet {
    #[serde(alias = "allowedAttributes")]
    pub allowed_attributes: Vec<String>,
    #[serde(alias = "requiredInterfaceAttributes")]
    pub required_interface_attributes: Vec<String>,
    #[serde(alias = "requiredOperationAttributes")]
    pub required_operation_attributes: Vec<String>,
    #[serde(alias = "delegationAttribute")]
    pub delegation_attribute: String,
    #[serde(alias = "delegationParameterType")]
    pub delegation_parameter_type: String,
}

impl Default for RuleSet {
    fn default() -> Self {
        RuleSet {
            allowed_attributes: RECOGNIZED.iter().map(|s| s.to_string()).collect(),
            required_interface_attributes: Vec::new(),
            required_operation_attributes: vec![attributes::INTENT.to_string()],
            delegation_attribute: attributes::DELEGATION.to_string(),
            delegation_parameter_type: "DelegationContext".to_string(),
        }
    }
}

/// Check every interface and operation of a parsed document against `rules`.
///
/// # Errors
/// Returns `NoInterfaceDefinition` when the document has no interface.
pub fn validate_definition(definitions: &[Definition], rules: &RuleSet) -> Result<ValidationReport> {
    let mut report = ValidationReport::new();
    let allowed: BTreeSet<&str> = rules.allowed_attributes.iter().map(String::as_str).collect();
    let mut seen_any = false;

    for iface in interfaces(definitions) {
        seen_any = true;
        check_allowed(&mut report, &iface.ext_attrs, &allowed, &iface.name);
        check_required(
            &mut report,
            &iface.ext_attrs,
            &rules.required_interface_attributes,
            &iface.name,
        );

        let mut names = BTreeSet::new();
        for op in iface.operations() {
            let location = if op.name.is_empty() {
                format!("{}.<anonymous>", iface.name)
            } else {
                format!("{}.{}", iface.name, op.name)
            };
            check_allowed(&mut report, &op.ext_attrs, &allowed, &location);
            check_required(
                &mut report,
                &op.ext_attrs,
                &rules.required_operation_attributes,
                &location,
            );
            check_delegation(&mut report, op, rules, &location);

            if !op.name.is_empty() && !names.insert(op.name.as_str()) {
                report.add_warning(
                    FindingKind::DuplicateOperation,
                    format!(
                        "operation '{}' is declared more than once; the last declaration wins",
                        op.name
                    ),
                    location,
                );
            }
        }
    }

    if !seen_any {
        return Err(Error::NoInterfaceDefinition);
    }
    tracing::debug!(findings = report.findings.len(), "definition check complete");
    Ok(report)
}

fn check_allowed(report: &mut ValidationReport, attrs: &[ExtAttr], allowed: &BTreeSet<&str>, location: &str) {
    for attr in attrs {
        if !allowed.contains(attr.name.as_str()) {
            report.add_error(
                FindingKind::UnknownExtensionAttribute,
                format!("unknown extension attribute '{}'", attr.name),
                location,
            );
        }
    }
}

fn check_required(report: &mut ValidationReport, attrs: &[ExtAttr], required: &[String], location: &str) {
    for name in required {
        if attributes::read(Some(attrs), name).is_none() {
            report.add_error(
                FindingKind::MissingRequiredAttribute,
                format!("required attribute '{}' is missing or has no value", name),
                location,
            );
        }
    }
}

fn check_delegation(report: &mut ValidationReport, op: &OperationNode, rules: &RuleSet, location: &str) {
    if !attributes::has(&op.ext_attrs, &rules.delegation_attribute) {
        return;
    }
    let satisfied = op
        .arguments
        .iter()
        .any(|arg| arg.idl_type.name() == Some(rules.delegation_parameter_type.as_str()));
    if !satisfied {
        report.add_error(
            FindingKind::MissingDelegationParameter,
            format!(
                "operation declares [{}] but takes no '{}' parameter",
                rules.delegation_attribute, rules.delegation_parameter_type
            ),
            location,
        );
    }
}

// ── Document Check ────────────────────────────────────────

/// The two document shapes the validator understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentKind {
    #[default]
    DelegationContext,
    ExecutionRecord,
}

impl std::str::FromStr for DocumentKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "delegation" | "delegation-context" => Ok(DocumentKind::DelegationContext),
            "execution" | "execution-record" => Ok(DocumentKind::ExecutionRecord),
            other => Err(format!(
                "unknown document kind '{}', expected delegation or execution",
                other
            )),
        }
    }
}

/// Rules for one document kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRules {
    /// Selects the revocation check. Rule files may omit it, in which case it
    /// deserializes as `delegation-context`; `Config::document_rules`
    /// overwrites it with the kind the file was loaded for.
    #[serde(default)]
    pub kind: DocumentKind,
    #[serde(default, alias = "requiredFields")]
    pub required_fields: Vec<String>,
    #[serde(default, alias = "timestampFields")]
    pub timestamp_fields: Vec<String>,
    /// Required `type` of a `proof`/`attestation` sub-object, when set
    #[serde(default, alias = "expectedProofType")]
    pub expected_proof_type: Option<String>,
    #[serde(default, alias = "proofRequiredFields")]
    pub proof_required_fields: Vec<String>,
}

impl DocumentRules {
    /// Built-in rules for delegation contexts
    pub fn delegation_context() -> Self {
        DocumentRules {
            kind: DocumentKind::DelegationContext,
            required_fields: strings(&["delegator", "delegate", "scope", "issuedAt", "expiresAt"]),
            timestamp_fields: strings(&["issuedAt", "expiresAt"]),
            expected_proof_type: Some("Ed25519Signature2020".to_string()),
            proof_required_fields: strings(&["type", "created", "proofValue"]),
        }
    }

    /// Built-in rules for execution records
    pub fn execution_record() -> Self {
        DocumentRules {
            kind: DocumentKind::ExecutionRecord,
            required_fields: strings(&["from", "to", "intent", "timestamp"]),
            timestamp_fields: strings(&["timestamp"]),
            expected_proof_type: None,
            proof_required_fields: strings(&["type"]),
        }
    }

    pub fn for_kind(kind: DocumentKind) -> Self {
        match kind {
            DocumentKind::DelegationContext => Self::delegation_context(),
            DocumentKind::ExecutionRecord => Self::execution_record(),
        }
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

/// Sub-objects carrying an attestation
const PROOF_FIELDS: &[&str] = &["proof", "attestation"];

/// Check a JSON document against `rules`.
///
/// # Errors
/// Returns `MalformedDocument` when `document` is not a JSON object.
pub fn validate_document(document: &Value, rules: &DocumentRules) -> Result<ValidationReport> {
    let doc = document.as_object().ok_or_else(|| {
        Error::MalformedDocument(format!("expected a JSON object, found {}", json_kind(document)))
    })?;
    let mut report = ValidationReport::new();

    check_fields(&mut report, doc, &rules.required_fields, "");

    for field in &rules.timestamp_fields {
        match doc.get(field) {
            None | Some(Value::Null) => {}
            Some(value) if is_timestamp(value) => {}
            Some(value) => report.add_error(
                FindingKind::InvalidTimestamp,
                format!("'{}' is not a valid timestamp: {}", field, value),
                field.clone(),
            ),
        }
    }

    for &field in PROOF_FIELDS {
        match doc.get(field) {
            None | Some(Value::Null) => {}
            Some(Value::Object(proof)) => check_proof(&mut report, proof, rules, field),
            Some(other) => report.add_error(
                FindingKind::InvalidProofType,
                format!("'{}' must be an object, found {}", field, json_kind(other)),
                field,
            ),
        }
    }

    if rules.kind == DocumentKind::DelegationContext && doc.get("revoked") == Some(&Value::Bool(true)) {
        report.add_error(
            FindingKind::RevokedDelegation,
            "delegation has been revoked".to_string(),
            "revoked",
        );
    }

    tracing::debug!(
        kind = ?rules.kind,
        findings = report.findings.len(),
        "document check complete"
    );
    Ok(report)
}

/// Parse `text` as JSON and check it.
///
/// # Errors
/// Returns `MalformedDocument` when `text` is not JSON or not an object.
pub fn validate_document_str(text: &str, rules: &DocumentRules) -> Result<ValidationReport> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| Error::MalformedDocument(e.to_string()))?;
    validate_document(&value, rules)
}

fn check_fields(report: &mut ValidationReport, object: &Map<String, Value>, required: &[String], prefix: &str) {
    for field in required {
        if matches!(object.get(field), None | Some(Value::Null)) {
            let location = if prefix.is_empty() {
                field.clone()
            } else {
                format!("{}.{}", prefix, field)
            };
            report.add_error(
                FindingKind::MissingRequiredField,
                format!("required field '{}' is missing or null", location),
                location,
            );
        }
    }
}

fn check_proof(report: &mut ValidationReport, proof: &Map<String, Value>, rules: &DocumentRules, field: &str) {
    if let Some(expected) = &rules.expected_proof_type {
        let actual = proof.get("type").and_then(Value::as_str);
        if actual != Some(expected.as_str()) {
            report.add_error(
                FindingKind::InvalidProofType,
                format!(
                    "{} type must be '{}', found {}",
                    field,
                    expected,
                    actual.map(|a| format!("'{}'", a)).unwrap_or_else(|| "none".to_string())
                ),
                format!("{}.type", field),
            );
        }
    }
    check_fields(report, proof, &rules.proof_required_fields, field);
}

/// RFC 3339, `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM:SS`, or integer epoch millis
pub fn is_timestamp(value: &Value) -> bool {
    match value {
        Value::String(s) => {
            DateTime::parse_from_rfc3339(s).is_ok()
                || NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
                || NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").is_ok()
        }
        Value::Number(n) => n
            .as_i64()
            .is_some_and(|ms| DateTime::from_timestamp_millis(ms).is_some()),
        _ => false,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
