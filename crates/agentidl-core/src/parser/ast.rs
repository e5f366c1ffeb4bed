//! Definition AST - the parsed structure of an interface-definition document
//!
//! Produced by [`crate::parser::parse`] or deserialized from the JSON shape
//! emitted by external interface-description parsers (`idlType`, `extAttrs`,
//! `rhs`, members tagged by `type`). Every core algorithm reads only this tree.
//!
//! All AST types are immutable after construction and derive:
//! Debug, Clone, PartialEq, Serialize, Deserialize

use serde::{Deserialize, Serialize};

use crate::types::TypeDescriptor;

/// A parsed source document: definitions in declaration order
pub type Definitions = Vec<Definition>;

/// Top-level definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Definition {
    Interface(InterfaceNode),
    Dictionary(DictionaryNode),
    Enum(EnumNode),
    Typedef(TypedefNode),
    /// Any definition kind the core does not interpret (namespaces, callbacks, ...)
    #[serde(other)]
    Other,
}

impl Definition {
    pub fn name(&self) -> Option<&str> {
        match self {
            Definition::Interface(i) => Some(&i.name),
            Definition::Dictionary(d) => Some(&d.name),
            Definition::Enum(e) => Some(&e.name),
            Definition::Typedef(t) => Some(&t.name),
            Definition::Other => None,
        }
    }
}

/// Iterate the interface definitions of a document, in order
pub fn interfaces(definitions: &[Definition]) -> impl Iterator<Item = &InterfaceNode> {
    definitions.iter().filter_map(|d| match d {
        Definition::Interface(i) => Some(i),
        _ => None,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceNode {
    pub name: String,
    #[serde(default)]
    pub inheritance: Option<String>,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub ext_attrs: Vec<ExtAttr>,
}

impl InterfaceNode {
    /// Operation members in declaration order
    pub fn operations(&self) -> impl Iterator<Item = &OperationNode> {
        self.members.iter().filter_map(|m| match m {
            Member::Operation(op) => Some(op),
            _ => None,
        })
    }
}

/// Interface member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Member {
    Operation(OperationNode),
    Attribute(AttributeNode),
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationNode {
    /// Empty for anonymous special operations
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub idl_type: Option<TypeDescriptor>,
    #[serde(default)]
    pub arguments: Vec<Argument>,
    #[serde(default)]
    pub ext_attrs: Vec<ExtAttr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeNode {
    pub name: String,
    #[serde(default)]
    pub idl_type: Option<TypeDescriptor>,
    #[serde(default)]
    pub readonly: bool,
    #[serde(default)]
    pub ext_attrs: Vec<ExtAttr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Argument {
    pub name: String,
    #[serde(default)]
    pub idl_type: TypeDescriptor,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub variadic: bool,
    #[serde(default)]
    pub ext_attrs: Vec<ExtAttr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DictionaryNode {
    pub name: String,
    #[serde(default)]
    pub inheritance: Option<String>,
    #[serde(default)]
    pub members: Vec<FieldNode>,
    #[serde(default)]
    pub ext_attrs: Vec<ExtAttr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldNode {
    pub name: String,
    #[serde(default)]
    pub idl_type: TypeDescriptor,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub ext_attrs: Vec<ExtAttr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumNode {
    pub name: String,
    #[serde(default)]
    pub values: Vec<String>,
    #[serde(default)]
    pub ext_attrs: Vec<ExtAttr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedefNode {
    pub name: String,
    #[serde(default)]
    pub idl_type: TypeDescriptor,
    #[serde(default)]
    pub ext_attrs: Vec<ExtAttr>,
}

/// `[Name]`, `[Name=value]`, `[Name="value"]` or `[Name=(a, b)]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtAttr {
    pub name: String,
    #[serde(default)]
    pub rhs: Option<ExtAttrValue>,
}

impl ExtAttr {
    pub fn flag(name: impl Into<String>) -> Self {
        ExtAttr { name: name.into(), rhs: None }
    }

    /// Attribute with a string literal value; `raw` keeps its quotes
    pub fn string(name: impl Into<String>, raw: impl Into<String>) -> Self {
        ExtAttr {
            name: name.into(),
            rhs: Some(ExtAttrValue::String(raw.into())),
        }
    }

    pub fn identifier(name: impl Into<String>, ident: impl Into<String>) -> Self {
        ExtAttr {
            name: name.into(),
            rhs: Some(ExtAttrValue::Identifier(ident.into())),
        }
    }
}

/// Right-hand side of an extension attribute.
///
/// String literals are stored verbatim, quotes included, exactly as they
/// appear in source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "kebab-case")]
pub enum ExtAttrValue {
    Identifier(String),
    String(String),
    IdentifierList(Vec<String>),
}
