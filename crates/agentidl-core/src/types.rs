//! Type resolver - maps interface type descriptors to target type expressions
//!
//! A [`TypeDescriptor`] is a closed tree: a primitive (or nominal) name, a
//! union of alternatives, a generic wrapper with its arguments, or a nullable
//! wrapper around a single inner descriptor. Resolution is structural
//! recursion over that tree and always terminates.
//!
//! # Guarantees
//!
//! - **Total**: resolution never fails; unknown shapes degrade to `any`
//! - **Pure**: no hidden state, same descriptor always yields the same text
//! - **Order preserving**: union members keep declaration order, no dedup

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Placeholder expression for absent or unrecognized descriptors
pub const ANY: &str = "any";

/// Combinator joining union members and multi-argument generics
const UNION_SEPARATOR: &str = " | ";

/// Names the target language already defines; never declared as custom types
const BUILTIN_NAMES: &[&str] = &[
    "any", "void", "undefined", "object", "null", "unknown", "bigint", "symbol", "Promise",
    "Array",
];

/// Recursive type descriptor
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "RawDescriptor", into = "RawDescriptor")]
pub enum TypeDescriptor {
    /// Primitive or nominal type name (`boolean`, `unsigned long`, `Contract`)
    Primitive(String),
    /// `(A or B or C)`
    Union(Vec<TypeDescriptor>),
    /// `Promise<T>`, `sequence<T>`, `record<K, V>`, ...
    Generic { kind: String, args: Vec<TypeDescriptor> },
    /// `T?`: resolves to its inner type
    Nullable(Box<TypeDescriptor>),
    #[default]
    Unknown,
}

impl TypeDescriptor {
    pub fn primitive(name: impl Into<String>) -> Self {
        TypeDescriptor::Primitive(name.into())
    }

    pub fn generic(kind: impl Into<String>, inner: TypeDescriptor) -> Self {
        TypeDescriptor::Generic {
            kind: kind.into(),
            args: vec![inner],
        }
    }

    /// The nominal name of a primitive descriptor, looking through `Nullable`
    pub fn name(&self) -> Option<&str> {
        match self {
            TypeDescriptor::Primitive(name) => Some(name),
            TypeDescriptor::Nullable(inner) => inner.name(),
            _ => None,
        }
    }
}

// ── Primitive table ──────────────────────────────────────

/// Look up a name in the primitive table.
///
/// Returns `None` for names the table does not recognize; those are nominal
/// references to custom types.
pub fn lookup_primitive(name: &str) -> Option<&'static str> {
    match name {
        "boolean" => Some("boolean"),
        "byte" | "octet" => Some("number"),
        "short" | "unsigned short" | "long" | "unsigned long" | "long long"
        | "unsigned long long" => Some("number"),
        "float" | "unrestricted float" | "double" | "unrestricted double" => Some("number"),
        "DOMString" | "ByteString" | "USVString" => Some("string"),
        _ => None,
    }
}

fn is_builtin(name: &str) -> bool {
    BUILTIN_NAMES.contains(&name)
}

// ── Resolution ───────────────────────────────────────────

/// Resolve an optional descriptor; absent descriptors resolve to `any`.
pub fn resolve_opt(descriptor: Option<&TypeDescriptor>) -> String {
    descriptor.map(resolve).unwrap_or_else(|| ANY.to_string())
}

/// Resolve a descriptor into a target type expression.
pub fn resolve(descriptor: &TypeDescriptor) -> String {
    match descriptor {
        TypeDescriptor::Primitive(name) => lookup_primitive(name).unwrap_or(name).to_string(),
        TypeDescriptor::Union(members) => join(members),
        TypeDescriptor::Generic { kind, args } => {
            let inner = if args.is_empty() {
                ANY.to_string()
            } else {
                join(args)
            };
            match kind.as_str() {
                "Promise" => format!("Promise<{}>", inner),
                "sequence" => format!("Array<{}>", inner),
                other => format!("{}<{}>", other, inner),
            }
        }
        TypeDescriptor::Nullable(inner) => resolve(inner),
        TypeDescriptor::Unknown => ANY.to_string(),
    }
}

fn join(members: &[TypeDescriptor]) -> String {
    members
        .iter()
        .map(resolve)
        .collect::<Vec<_>>()
        .join(UNION_SEPARATOR)
}

/// Resolve the type a caller observes once an asynchronous result settles:
/// a top-level `Promise<T>` resolves to `T`, anything else as [`resolve`].
pub fn resolve_awaited(descriptor: Option<&TypeDescriptor>) -> String {
    match descriptor {
        Some(TypeDescriptor::Generic { kind, args }) if kind == "Promise" => {
            if args.is_empty() {
                ANY.to_string()
            } else {
                join(args)
            }
        }
        Some(TypeDescriptor::Nullable(inner)) => resolve_awaited(Some(inner)),
        other => resolve_opt(other),
    }
}

// ── Referenced custom types ──────────────────────────────

/// Collect the nominal custom type names a descriptor references.
pub fn collect_referenced_types(descriptor: &TypeDescriptor) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    collect_into(descriptor, &mut names);
    names
}

/// Accumulate referenced custom type names into `names`.
pub fn collect_into(descriptor: &TypeDescriptor, names: &mut BTreeSet<String>) {
    match descriptor {
        TypeDescriptor::Primitive(name) => {
            if lookup_primitive(name).is_none() && !is_builtin(name) {
                names.insert(name.clone());
            }
        }
        TypeDescriptor::Union(members) => {
            for member in members {
                collect_into(member, names);
            }
        }
        TypeDescriptor::Generic { args, .. } => {
            for arg in args {
                collect_into(arg, names);
            }
        }
        TypeDescriptor::Nullable(inner) => collect_into(inner, names),
        TypeDescriptor::Unknown => {}
    }
}

// ── Wire shape ───────────────────────────────────────────

/// Loose JSON shape used by external parsers: a bare name, an array of
/// alternatives, or an object wrapping an inner `idlType`.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawDescriptor {
    Name(String),
    Members(Vec<RawDescriptor>),
    Node(RawNode),
    Other(serde_json::Value),
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    generic: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    nullable: bool,
    idl_type: Box<RawDescriptor>,
}

impl From<RawDescriptor> for TypeDescriptor {
    fn from(raw: RawDescriptor) -> Self {
        match raw {
            RawDescriptor::Name(name) => TypeDescriptor::Primitive(name),
            RawDescriptor::Members(members) => {
                TypeDescriptor::Union(members.into_iter().map(Into::into).collect())
            }
            RawDescriptor::Node(node) => {
                let inner = match node.generic.filter(|g| !g.is_empty()) {
                    Some(kind) => {
                        let args = match *node.idl_type {
                            RawDescriptor::Members(members) => {
                                members.into_iter().map(Into::into).collect()
                            }
                            single => vec![single.into()],
                        };
                        TypeDescriptor::Generic { kind, args }
                    }
                    None => (*node.idl_type).into(),
                };
                if node.nullable {
                    TypeDescriptor::Nullable(Box::new(inner))
                } else {
                    inner
                }
            }
            RawDescriptor::Other(_) => TypeDescriptor::Unknown,
        }
    }
}

impl From<TypeDescriptor> for RawDescriptor {
    fn from(descriptor: TypeDescriptor) -> Self {
        match descriptor {
            TypeDescriptor::Primitive(name) => RawDescriptor::Name(name),
            TypeDescriptor::Union(members) => {
                RawDescriptor::Members(members.into_iter().map(Into::into).collect())
            }
            TypeDescriptor::Generic { kind, args } => RawDescriptor::Node(RawNode {
                generic: Some(kind),
                nullable: false,
                idl_type: Box::new(RawDescriptor::Members(
                    args.into_iter().map(Into::into).collect(),
                )),
            }),
            TypeDescriptor::Nullable(inner) => RawDescriptor::Node(RawNode {
                generic: None,
                nullable: true,
                idl_type: Box::new((*inner).into()),
            }),
            TypeDescriptor::Unknown => RawDescriptor::Other(serde_json::Value::Null),
        }
    }
}
