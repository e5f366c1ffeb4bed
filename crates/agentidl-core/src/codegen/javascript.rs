//! JavaScript flavor: same structure as the TypeScript output, typed through
//! JSDoc comments instead of declarations.

use super::{header, js_nullable_string, js_string, payload_literal, sync_or_async, Emitter, Names};
use crate::model::{InterfaceModel, OperationModel};

fn jsdoc_function(op: &OperationModel, trailing: Option<&str>, returns: &str) -> String {
    let mut args: Vec<String> = op.parameters.iter().map(|p| p.type_expr.clone()).collect();
    if let Some(extra) = trailing {
        args.push(extra.to_string());
    }
    format!("function({}): ({})", args.join(", "), returns)
}

pub(crate) fn client(model: &InterfaceModel, names: &Names) -> String {
    let mut out = Emitter::new();
    out.raw(&header(model, names, "client"));
    out.blank();

    out.line("/**");
    out.line(" * @typedef {Object} IntentMessage");
    out.line(" * @property {string} intent");
    out.line(" * @property {string|null} [proof]");
    out.line(" * @property {Object<string, *>} payload");
    out.line(" * @property {string} [from]");
    out.line(" * @property {string} [to]");
    out.line(" * @property {string} [timestamp]");
    out.line(" */");
    out.blank();

    out.line("/**");
    out.line(" * @typedef {Object} IntentTransport");
    out.line(" * @property {function(IntentMessage): Promise<*>} send");
    out.line(" */");
    out.blank();

    let custom = model.referenced_types();
    for name in &custom {
        out.line(format!("/** @typedef {{Object<string, *>}} {} */", name));
    }
    if !custom.is_empty() {
        out.blank();
    }

    out.open(format!("export const {} = Object.freeze({{", names.registry));
    for op in &model.operations {
        out.line(format!(
            "{}: Object.freeze({{ intent: {}, proof: {} }}),",
            op.name,
            js_string(&op.intent),
            js_nullable_string(op.proof.as_deref())
        ));
    }
    out.close("});");
    out.blank();

    out.line("/**");
    out.line(" * @param {IntentTransport} transport");
    out.line(" */");
    out.open(format!("export function {}(transport) {{", names.factory));
    out.open("return {");
    for op in &model.operations {
        out.line("/**");
        for p in &op.parameters {
            out.line(format!(" * @param {{{}}} {}", p.type_expr, p.name));
        }
        out.line(format!(" * @returns {{Promise<{}>}}", op.awaited_return_type()));
        out.line(" */");
        let params: Vec<&str> = op.parameter_names().collect();
        out.open(format!("{}({}) {{", op.name, params.join(", ")));
        out.open("return transport.send({");
        out.line(format!("intent: {}.{}.intent,", names.registry, op.name));
        out.line(format!("proof: {}.{}.proof,", names.registry, op.name));
        out.line(format!("payload: {},", payload_literal(op)));
        out.close("});");
        out.close("},");
    }
    out.close("};");
    out.close("}");

    if model.references_self() {
        out.blank();
        out.line(format!(
            "/** @typedef {{ReturnType<typeof {}>}} {} */",
            names.factory, model.name
        ));
    }

    out.finish()
}

pub(crate) fn handlers(model: &InterfaceModel, names: &Names) -> String {
    let mut out = Emitter::new();
    out.raw(&header(model, names, "handlers"));
    out.blank();

    out.line(format!(
        "import {{ {} }} from {};",
        names.registry,
        js_string(&names.client_import)
    ));
    out.blank();

    let mut type_imports = vec!["IntentMessage".to_string()];
    type_imports.extend(model.referenced_types());
    if model.references_self() {
        type_imports.push(model.name.clone());
    }
    for name in &type_imports {
        out.line(format!(
            "/** @typedef {{import({}).{}}} {} */",
            js_string(&names.client_import),
            name,
            name
        ));
    }
    out.blank();

    out.line("/**");
    out.line(format!(" * @typedef {{Object}} {}", names.handlers));
    for op in &model.operations {
        let returns = sync_or_async(&op.awaited_return_type());
        out.line(format!(
            " * @property {{{}}} {}",
            jsdoc_function(op, Some("IntentMessage="), &returns),
            op.name
        ));
    }
    out.line(" */");
    out.blank();

    out.line("/**");
    out.line(" * @param {{ registerIntent: function(string, function(IntentMessage): *): void }} runtime");
    out.line(format!(" * @param {{{}}} handlers", names.handlers));
    out.line(" */");
    out.open(format!("export function {}(runtime, handlers) {{", names.registrar));
    for op in &model.operations {
        out.open(format!(
            "runtime.registerIntent({}.{}.intent, (message) => {{",
            names.registry, op.name
        ));
        out.line("const payload = message.payload ?? {};");
        let mut args: Vec<String> = op
            .parameters
            .iter()
            .map(|p| format!("payload[{}]", js_string(&p.name)))
            .collect();
        args.push("message".to_string());
        out.line(format!("return handlers.{}({});", op.name, args.join(", ")));
        out.close("});");
    }
    out.close("}");

    out.finish()
}

#[cfg(test)]
mod tests {
    use crate::codegen::{generate, Flavor};
    use crate::model::build_from_source;

    const SOURCE: &str = r#"
        interface Marketplace {
          [Intent="agent:ExecutePayment"]
          Promise<PaymentResult> executePayment(double amount, DOMString currency);
        };
    "#;

    #[test]
    fn test_client_uses_jsdoc() {
        let model = build_from_source(SOURCE).unwrap();
        let src = generate(&model, Flavor::JavaScript).client.source;

        assert!(src.contains("/** @typedef {Object<string, *>} PaymentResult */"));
        assert!(src.contains(
            "executePayment: Object.freeze({ intent: \"agent:ExecutePayment\", proof: null }),"
        ));
        assert!(src.contains(" * @param {number} amount"));
        assert!(src.contains(" * @returns {Promise<PaymentResult>}"));
        assert!(src.contains("export function createMarketplaceClient(transport) {"));
        assert!(src.contains("executePayment(amount, currency) {"));
        assert!(!src.contains(": number"), "no type annotations in plain JS");
    }

    #[test]
    fn test_handlers_import_registry() {
        let model = build_from_source(SOURCE).unwrap();
        let src = generate(&model, Flavor::JavaScript).handlers.source;

        assert!(src.contains("import { MarketplaceIntents } from \"./marketplace.client.js\";"));
        assert!(src.contains(
            " * @property {function(number, string, IntentMessage=): (PaymentResult | Promise<PaymentResult>)} executePayment"
        ));
        assert!(src.contains(
            "/** @typedef {import(\"./marketplace.client.js\").IntentMessage} IntentMessage */"
        ));
        assert!(src.contains(
            "/** @typedef {import(\"./marketplace.client.js\").PaymentResult} PaymentResult */"
        ));
        assert!(src.contains("export function registerMarketplaceHandlers(runtime, handlers) {"));
        assert!(src.contains(
            "return handlers.executePayment(payload[\"amount\"], payload[\"currency\"], message);"
        ));
    }

    #[test]
    fn test_self_reference_typedef() {
        let model = build_from_source("interface Node { Promise<Node> parent(Node child); };").unwrap();
        let modules = generate(&model, Flavor::JavaScript);
        assert!(modules
            .client
            .source
            .contains("/** @typedef {ReturnType<typeof createNodeClient>} Node */"));
        assert!(!modules.client.source.contains("{Object<string, *>} Node */"));
        assert!(modules
            .handlers
            .source
            .contains("/** @typedef {import(\"./node.client.js\").Node} Node */"));
    }
}
