//! Code generator: projects an [`InterfaceModel`] into client/handler modules
//!
//! Every artifact is derived from the model alone:
//!
//! ```text
//! InterfaceModel ─┬─ client module:   message/transport contract, custom-type
//!                 │                   placeholders, intents registry, client
//!                 │                   contract + factory
//!                 └─ handler module:  handler contract + registrar, importing
//!                                     the registry from the client module
//! ```
//!
//! The handler module never re-derives intents; it imports the registry the
//! client module exports, and both [`GeneratedModule`]s carry that same
//! [`IntentRegistry`] value.

pub mod javascript;
pub mod typescript;

use serde::{Deserialize, Serialize};

use crate::model::{model_hash, InterfaceModel, IntentRegistry, OperationModel};

/// Emission flavor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flavor {
    /// Statically typed output
    #[default]
    TypeScript,
    /// Untyped output with JSDoc annotations
    JavaScript,
}

impl Flavor {
    pub fn extension(self) -> &'static str {
        match self {
            Flavor::TypeScript => "ts",
            Flavor::JavaScript => "js",
        }
    }

    /// Module specifier the handler module uses to import the client module
    fn import_suffix(self) -> &'static str {
        match self {
            Flavor::TypeScript => "",
            Flavor::JavaScript => ".js",
        }
    }
}

impl std::str::FromStr for Flavor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ts" | "typescript" => Ok(Flavor::TypeScript),
            "js" | "javascript" => Ok(Flavor::JavaScript),
            other => Err(format!("unknown flavor '{}', expected ts or js", other)),
        }
    }
}

/// One generated source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedModule {
    pub file_name: String,
    pub source: String,
    /// The registry the module embeds or imports
    pub intents: IntentRegistry,
}

/// Client/handler module pair for one flavor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedModules {
    pub flavor: Flavor,
    pub client: GeneratedModule,
    pub handlers: GeneratedModule,
}

/// Generate the client/handler pair for `model` in `flavor`.
pub fn generate(model: &InterfaceModel, flavor: Flavor) -> GeneratedModules {
    let names = Names::for_model(model, flavor);
    let (client, handlers) = match flavor {
        Flavor::TypeScript => (
            typescript::client(model, &names),
            typescript::handlers(model, &names),
        ),
        Flavor::JavaScript => (
            javascript::client(model, &names),
            javascript::handlers(model, &names),
        ),
    };
    let intents = model.intents();
    tracing::debug!(
        interface = %model.name,
        ?flavor,
        operations = intents.len(),
        "generated client/handler modules"
    );

    GeneratedModules {
        flavor,
        client: GeneratedModule {
            file_name: names.client_file.clone(),
            source: client,
            intents: intents.clone(),
        },
        handlers: GeneratedModule {
            file_name: names.handlers_file.clone(),
            source: handlers,
            intents,
        },
    }
}

// ── Shared naming ─────────────────────────────────────────

/// Exported identifiers and file names derived from the interface name
pub(crate) struct Names {
    pub registry: String,
    pub client: String,
    pub factory: String,
    pub handlers: String,
    pub registrar: String,
    pub client_file: String,
    pub handlers_file: String,
    pub client_import: String,
    pub hash: String,
}

impl Names {
    fn for_model(model: &InterfaceModel, flavor: Flavor) -> Self {
        let name = &model.name;
        let stem = kebab_case(name);
        let ext = flavor.extension();
        Names {
            registry: format!("{}Intents", name),
            client: format!("{}Client", name),
            factory: format!("create{}Client", name),
            handlers: format!("{}Handlers", name),
            registrar: format!("register{}Handlers", name),
            client_file: format!("{}.client.{}", stem, ext),
            handlers_file: format!("{}.handlers.{}", stem, ext),
            client_import: format!("./{}.client{}", stem, flavor.import_suffix()),
            hash: model_hash(model),
        }
    }
}

/// `PaymentGateway` → `payment-gateway`
pub fn kebab_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let chars: Vec<char> = name.chars().collect();
    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() {
            let prev_lower = i > 0 && (chars[i - 1].is_ascii_lowercase() || chars[i - 1].is_ascii_digit());
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            let prev_upper = i > 0 && chars[i - 1].is_ascii_uppercase();
            if prev_lower || (prev_upper && next_lower) {
                out.push('-');
            }
            out.push(c.to_ascii_lowercase());
        } else if c == '_' {
            out.push('-');
        } else {
            out.push(c);
        }
    }
    out
}

/// A JavaScript string literal for `value`
pub(crate) fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

pub(crate) fn js_nullable_string(value: Option<&str>) -> String {
    value.map(js_string).unwrap_or_else(|| "null".to_string())
}

/// `{ a, b }` payload literal in declared parameter order
pub(crate) fn payload_literal(op: &OperationModel) -> String {
    let names: Vec<&str> = op.parameter_names().collect();
    if names.is_empty() {
        "{}".to_string()
    } else {
        format!("{{ {} }}", names.join(", "))
    }
}

/// `T | Promise<T>`, parenthesizing unions
pub(crate) fn sync_or_async(awaited: &str) -> String {
    if awaited.contains(" | ") {
        format!("({}) | Promise<{}>", awaited, awaited)
    } else {
        format!("{} | Promise<{}>", awaited, awaited)
    }
}

pub(crate) fn header(model: &InterfaceModel, names: &Names, kind: &str) -> String {
    format!(
        "// Generated by agentidl from interface {} ({}). Do not edit.\n// model sha256:{}\n",
        model.name, kind, names.hash
    )
}

/// Line-oriented source writer with two-space indentation
pub(crate) struct Emitter {
    buf: String,
    indent: usize,
}

impl Emitter {
    pub fn new() -> Self {
        Emitter {
            buf: String::new(),
            indent: 0,
        }
    }

    pub fn line(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref();
        if !text.is_empty() {
            for _ in 0..self.indent {
                self.buf.push_str("  ");
            }
            self.buf.push_str(text);
        }
        self.buf.push('\n');
    }

    pub fn blank(&mut self) {
        self.buf.push('\n');
    }

    pub fn raw(&mut self, text: &str) {
        self.buf.push_str(text);
    }

    pub fn open(&mut self, text: impl AsRef<str>) {
        self.line(text);
        self.indent += 1;
    }

    pub fn close(&mut self, text: impl AsRef<str>) {
        self.indent = self.indent.saturating_sub(1);
        self.line(text);
    }

    pub fn finish(self) -> String {
        self.buf
    }
}
