//! TypeScript flavor

use super::{header, js_nullable_string, js_string, payload_literal, sync_or_async, Emitter, Names};
use crate::model::{InterfaceModel, OperationModel};

fn param_list(op: &OperationModel) -> String {
    op.parameters
        .iter()
        .map(|p| format!("{}: {}", p.name, p.type_expr))
        .collect::<Vec<_>>()
        .join(", ")
}

fn client_signature(op: &OperationModel) -> String {
    format!(
        "{}({}): Promise<{}>",
        op.name,
        param_list(op),
        op.awaited_return_type()
    )
}

pub(crate) fn client(model: &InterfaceModel, names: &Names) -> String {
    let mut out = Emitter::new();
    out.raw(&header(model, names, "client"));
    out.blank();

    out.open("export interface IntentMessage {");
    out.line("intent: string;");
    out.line("proof?: string | null;");
    out.line("payload: Record<string, unknown>;");
    out.line("from?: string;");
    out.line("to?: string;");
    out.line("timestamp?: string;");
    out.close("}");
    out.blank();

    out.open("export interface IntentTransport {");
    out.line("send(message: IntentMessage): Promise<unknown>;");
    out.close("}");
    out.blank();

    let custom = model.referenced_types();
    for name in &custom {
        out.line(format!("export type {} = Record<string, unknown>;", name));
    }
    if !custom.is_empty() {
        out.blank();
    }

    out.open(format!("export const {} = {{", names.registry));
    for op in &model.operations {
        out.line(format!(
            "{}: {{ intent: {}, proof: {} }},",
            op.name,
            js_string(&op.intent),
            js_nullable_string(op.proof.as_deref())
        ));
    }
    out.close("} as const;");
    out.blank();

    out.open(format!("export interface {} {{", names.client));
    for op in &model.operations {
        out.line(format!("{};", client_signature(op)));
    }
    out.close("}");
    out.blank();

    if model.references_self() {
        out.line(format!("export type {} = {};", model.name, names.client));
        out.blank();
    }

    out.open(format!(
        "export function {}(transport: IntentTransport): {} {{",
        names.factory, names.client
    ));
    out.open("return {");
    for op in &model.operations {
        out.open(format!("{} {{", client_signature(op)));
        out.open("return transport.send({");
        out.line(format!("intent: {}.{}.intent,", names.registry, op.name));
        out.line(format!("proof: {}.{}.proof,", names.registry, op.name));
        out.line(format!("payload: {},", payload_literal(op)));
        out.close(format!("}}) as Promise<{}>;", op.awaited_return_type()));
        out.close("},");
    }
    out.close("};");
    out.close("}");

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
    let mut type_imports = vec!["IntentMessage".to_string()];
    type_imports.extend(model.referenced_types());
    if model.references_self() {
        type_imports.push(model.name.clone());
    }
    out.line(format!(
        "import type {{ {} }} from {};",
        type_imports.join(", "),
        js_string(&names.client_import)
    ));
    out.blank();

    out.open("export interface IntentRuntime {");
    out.line("registerIntent(intent: string, handler: (message: IntentMessage) => unknown): void;");
    out.close("}");
    out.blank();

    out.open(format!("export interface {} {{", names.handlers));
    for op in &model.operations {
        let mut params: Vec<String> = op
            .parameters
            .iter()
            .map(|p| format!("{}: {}", p.name, p.type_expr))
            .collect();
        params.push("message?: IntentMessage".to_string());
        out.line(format!(
            "{}({}): {};",
            op.name,
            params.join(", "),
            sync_or_async(&op.awaited_return_type())
        ));
    }
    out.close("}");
    out.blank();

    out.open(format!(
        "export function {}(runtime: IntentRuntime, handlers: {}): void {{",
        names.registrar, names.handlers
    ));
    for op in &model.operations {
        out.open(format!(
            "runtime.registerIntent({}.{}.intent, (message: IntentMessage) => {{",
            names.registry, op.name
        ));
        out.line("const payload = message.payload ?? {};");
        let mut args: Vec<String> = op
            .parameters
            .iter()
            .map(|p| format!("payload[{}] as {}", js_string(&p.name), p.type_expr))
            .collect();
        args.push("message".to_string());
        out.line(format!("return handlers.{}({});", op.name, args.join(", ")));
        out.close("});");
    }
    out.close("}");

    out.finish()
}
