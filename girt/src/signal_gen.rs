//! Signal generation — the overloaded `connect` method and its per-signal
//! argument-type metadata table.

use std::collections::HashSet;

use tracing::trace;

use crate::class_gen::GenContext;
use crate::ffi::FfiType;
use crate::mapper::TypeUsage;
use crate::model::{GirClass, GirSignal, TypeKind};
use crate::naming;

/// The pieces a class needs to surface its signals: compile-time `connect`
/// overloads, the runtime `connect` implementation, and the module-level
/// metadata table the dispatch wrapper reads.
#[derive(Debug)]
pub struct SignalBlock {
    pub overloads: Vec<String>,
    pub runtime_impl: Vec<String>,
    pub metadata: Vec<String>,
    pub usage: TypeUsage,
}

/// Union of a class's own signals, its interfaces' signals, and its ancestor
/// chain's signals. Returns the collected list plus whether an ancestor
/// reference crossed a namespace boundary (in which case collection stopped
/// — that namespace's data may not be loaded, so the caller must treat the
/// parent as "might contribute signals").
pub fn collect_signals<'a>(
    ctx: &GenContext<'a>,
    class: &'a GirClass,
) -> (Vec<&'a GirSignal>, bool) {
    let mut collected: Vec<&GirSignal> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for signal in &class.signals {
        if seen.insert(signal.name.as_str()) {
            collected.push(signal);
        }
    }

    // First-seen-wins on name collisions across interfaces.
    for iface_name in &class.implements {
        let Some(iface) = ctx.resolve_interface(iface_name) else {
            continue;
        };
        for signal in &iface.signals {
            if seen.insert(signal.name.as_str()) {
                collected.push(signal);
            }
        }
    }

    let mut cross_namespace_parent = false;
    let mut visited: HashSet<&str> = HashSet::new();
    let mut parent = class.parent.as_deref();
    while let Some(parent_name) = parent {
        if parent_name.contains('.') {
            cross_namespace_parent = true;
            break;
        }
        if !visited.insert(parent_name) {
            break;
        }
        let Some(ancestor) = ctx.resolve_class(parent_name) else {
            break;
        };
        for signal in &ancestor.signals {
            if seen.insert(signal.name.as_str()) {
                collected.push(signal);
            }
        }
        parent = ancestor.parent.as_deref();
    }

    (collected, cross_namespace_parent)
}

/// Name of a class's signal metadata table: `Button` → `BUTTON_SIGNAL_META`.
pub fn metadata_table_name(class_ts_name: &str) -> String {
    format!("{}_SIGNAL_META", naming::to_shouty_snake_case(class_ts_name))
}

/// Generate the full signal surface for one class.
pub fn generate<'a>(ctx: &GenContext<'a>, class: &'a GirClass, class_ts_name: &str) -> SignalBlock {
    let mut usage = TypeUsage::default();
    let (signals, _) = collect_signals(ctx, class);
    let table = metadata_table_name(class_ts_name);

    let mut overloads = Vec::new();
    for signal in &signals {
        overloads.push(signal_overload(ctx, signal, class_ts_name, &mut usage));
    }

    // Every object structurally supports property-change notification even
    // when the GIR data doesn't enumerate `notify` on the subtype.
    let has_notify = signals.iter().any(|s| s.name == "notify");
    if !has_notify && ctx.namespace_name() != "GObject" {
        let pspec = param_spec_ts(ctx, &mut usage);
        overloads.push(format!(
            "connect(signal: \"notify\", handler: (self: {class_ts_name}, pspec: {pspec}) => void, after?: boolean): number;",
        ));
    }

    // Escape hatch for signals not enumerable at generation time, e.g.
    // dynamically-added actions.
    overloads.push(
        "connect(signal: string, handler: (...args: unknown[]) => unknown, after?: boolean): number;"
            .to_string(),
    );

    let runtime_impl = runtime_connect(&table);

    let mut metadata = Vec::new();
    metadata.push(format!(
        "export const {table}: Record<string, SignalMeta> = {{"
    ));
    for signal in &signals {
        metadata.push(metadata_entry(ctx, signal));
    }
    metadata.push("};".to_string());

    trace!(class = class_ts_name, signals = signals.len(), "generated signal surface");

    SignalBlock {
        overloads,
        runtime_impl,
        metadata,
        usage,
    }
}

/// One typed overload:
/// `connect(signal: "clicked", handler: (self, ...params) => ret, after?): number;`
fn signal_overload(
    ctx: &GenContext<'_>,
    signal: &GirSignal,
    class_ts_name: &str,
    usage: &mut TypeUsage,
) -> String {
    let mut handler_params = vec![format!("self: {class_ts_name}")];
    for param in &signal.parameters {
        let ts = signal_param_ts(ctx, param.ty.name.as_deref(), &param.ty, usage);
        handler_params.push(format!("{}: {}", naming::escape_ident(&param.name), ts));
    }

    let ret = match &signal.return_type {
        Some(ty) if ty.name.as_deref() != Some("none") => {
            ctx.mapper().map_type(ty, true, Some(usage)).ts
        }
        _ => "void".to_string(),
    };

    format!(
        "connect(signal: \"{}\", handler: ({}) => {}, after?: boolean): number;",
        signal.name,
        handler_params.join(", "),
        ret
    )
}

/// Prefer a direct class/interface reference for a signal parameter type;
/// fall back to the generic mapper result.
fn signal_param_ts(
    ctx: &GenContext<'_>,
    name: Option<&str>,
    ty: &crate::model::GirType,
    usage: &mut TypeUsage,
) -> String {
    if let Some(name) = name
        && let Some(rt) = ctx.registry().resolve_in_namespace(name, ctx.namespace_name())
        && matches!(rt.kind, TypeKind::Class | TypeKind::Interface)
    {
        if rt.namespace != ctx.namespace_name() {
            usage
                .external_types
                .insert(rt.transformed_name.clone(), rt.namespace.clone());
            return format!("{}.{}", rt.namespace, rt.transformed_name);
        }
        return rt.transformed_name.clone();
    }
    ctx.mapper().map_type(ty, false, Some(usage)).ts
}

fn param_spec_ts(ctx: &GenContext<'_>, usage: &mut TypeUsage) -> String {
    match ctx.registry().resolve("GObject.ParamSpec") {
        Some(rt) if rt.namespace != ctx.namespace_name() => {
            usage
                .external_types
                .insert(rt.transformed_name.clone(), rt.namespace.clone());
            format!("{}.{}", rt.namespace, rt.transformed_name)
        }
        Some(rt) => rt.transformed_name.clone(),
        None => "unknown".to_string(),
    }
}

/// One metadata table entry. Descriptor computation is a side channel —
/// usage tracking is suppressed (`None`) so metadata does not inflate the
/// import list.
fn metadata_entry(ctx: &GenContext<'_>, signal: &GirSignal) -> String {
    let mapper = ctx.mapper();
    let params: Vec<String> = signal
        .parameters
        .iter()
        .map(|p| mapper.map_type(&p.ty, false, None).ffi.to_ts())
        .collect();

    let mut entry = format!("\"{}\": {{ params: [{}]", signal.name, params.join(", "));
    if let Some(ret) = &signal.return_type
        && ret.name.as_deref() != Some("none")
    {
        let mapped = mapper.map_type(ret, true, None);
        if mapped.ffi != FfiType::Undefined {
            entry.push_str(&format!(", returnType: {}", mapped.ffi.to_ts()));
        }
    }
    entry.push_str(" },");
    entry
}

/// The runtime `connect` implementation. Each gobject-typed argument is
/// resolved through the pointer-to-instance lookup; boxed arguments carry no
/// identity of their own and go through the class-by-type-name lookup
/// instead. With no metadata entry, only the self parameter is wrapped and
/// everything else passes through untyped.
fn runtime_connect(table: &str) -> Vec<String> {
    [
        "connect(signal: string, handler: (...args: unknown[]) => unknown, after?: boolean): number {".to_string(),
        format!("const meta = {table}[signal] ?? {{ params: [] }};"),
        "const wrapped = (...args: unknown[]) => {".to_string(),
        "const self = getObject(args[0] as bigint, this.constructor as never);".to_string(),
        "const rest = args.slice(1).map((value, index) => {".to_string(),
        "const desc = meta.params[index];".to_string(),
        "if (desc === undefined) {".to_string(),
        "return value;".to_string(),
        "}".to_string(),
        "if (desc.type === \"gobject\") {".to_string(),
        "return getObject(value as bigint);".to_string(),
        "}".to_string(),
        "if (desc.type === \"boxed\") {".to_string(),
        "return getNativeClass(desc.innerType).wrap(value as bigint);".to_string(),
        "}".to_string(),
        "return value;".to_string(),
        "});".to_string(),
        "return handler(self, ...rest);".to_string(),
        "};".to_string(),
        "return connectSignal(this.id, signal, meta, wrapped, after ?? false);".to_string(),
        "}".to_string(),
    ]
    .to_vec()
}
