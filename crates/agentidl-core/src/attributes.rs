//! Extension attribute reader
//!
//! [`read`] is the only place attribute values are extracted. The model
//! builder reads through [`Extensions`], which is populated with it, and the
//! validator calls it directly, so both always see the same values.

use serde::{Deserialize, Serialize};

use crate::parser::ast::{ExtAttr, ExtAttrValue};

/// Interface-level attribute naming the JSON-LD context URI
pub const CONTEXT: &str = "Context";
/// Interface-level attribute naming the semantic class URI
pub const SEMANTIC: &str = "Semantic";
/// Operation-level attribute carrying the intent identifier
pub const INTENT: &str = "Intent";
/// Operation-level attribute carrying the proof/attestation identifier
pub const PROOF: &str = "Proof";
/// Operation-level attribute declaring a delegation requirement
pub const DELEGATION: &str = "Delegation";
/// Operation-level attribute naming a required capability
pub const CAPABILITY: &str = "Capability";

/// The closed set of recognized extension attributes
pub const RECOGNIZED: &[&str] = &[CONTEXT, SEMANTIC, INTENT, PROOF, DELEGATION, CAPABILITY];

/// Read the string value of attribute `name`.
///
/// Returns `None` when the list is absent, the attribute is missing, or its
/// value is not string-shaped (a bare flag or an identifier list). A value
/// wrapped in double quotes is unquoted; anything else is returned verbatim.
pub fn read(attributes: Option<&[ExtAttr]>, name: &str) -> Option<String> {
    let attr = attributes?.iter().find(|a| a.name == name)?;
    match attr.rhs.as_ref()? {
        ExtAttrValue::Identifier(value) => Some(value.clone()),
        ExtAttrValue::String(value) => Some(unquote(value).to_string()),
        ExtAttrValue::IdentifierList(_) => None,
    }
}

/// True when attribute `name` is declared at all, with or without a value.
pub fn has(attributes: &[ExtAttr], name: &str) -> bool {
    attributes.iter().any(|a| a.name == name)
}

fn unquote(value: &str) -> &str {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

/// Semantic metadata read once from an attribute list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extensions {
    pub context: Option<String>,
    pub semantic: Option<String>,
    pub intent: Option<String>,
    pub proof: Option<String>,
    /// `[Delegation]` present, valued or not
    pub delegation: bool,
    pub capability: Option<String>,
}

impl Extensions {
    pub fn from_attributes(attributes: &[ExtAttr]) -> Self {
        let attrs = Some(attributes);
        Extensions {
            context: read(attrs, CONTEXT),
            semantic: read(attrs, SEMANTIC),
            intent: read(attrs, INTENT),
            proof: read(attrs, PROOF),
            delegation: has(attributes, DELEGATION),
            capability: read(attrs, CAPABILITY),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs() -> Vec<ExtAttr> {
        vec![
            ExtAttr::identifier("Intent", "agent:ProposeContract"),
            ExtAttr::string("Proof", "\"proof:SignedReceipt\""),
            ExtAttr::flag("Delegation"),
            ExtAttr {
                name: "Capability".into(),
                rhs: Some(ExtAttrValue::IdentifierList(vec!["pay".into(), "refund".into()])),
            },
        ]
    }

    #[test]
    fn test_read_identifier_value() {
        let list = attrs();
        assert_eq!(
            read(Some(&list), "Intent"),
            Some("agent:ProposeContract".to_string())
        );
    }

    #[test]
    fn test_read_strips_quotes() {
        let list = attrs();
        assert_eq!(
            read(Some(&list), "Proof"),
            Some("proof:SignedReceipt".to_string())
        );
    }

    #[test]
    fn test_read_unbalanced_quote_verbatim() {
        let list = vec![ExtAttr::string("Proof", "\"open")];
        assert_eq!(read(Some(&list), "Proof"), Some("\"open".to_string()));
    }

    #[test]
    fn test_read_missing_cases() {
        let list = attrs();
        assert_eq!(read(None, "Intent"), None);
        assert_eq!(read(Some(&list), "Semantic"), None);
        assert_eq!(read(Some(&list), "Delegation"), None, "flag has no value");
        assert_eq!(read(Some(&list), "Capability"), None, "lists are not strings");
    }

    #[test]
    fn test_extensions_record() {
        let ext = Extensions::from_attributes(&attrs());
        assert_eq!(ext.intent.as_deref(), Some("agent:ProposeContract"));
        assert_eq!(ext.proof.as_deref(), Some("proof:SignedReceipt"));
        assert!(ext.delegation);
        assert_eq!(ext.capability, None);
        assert_eq!(ext.context, None);
    }
}
