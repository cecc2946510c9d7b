//! Emission — per-namespace module assembly and the cross-cutting index.
//!
//! File writes happen strictly after in-memory generation completes for a
//! unit; this module only produces source text.

use std::collections::{HashMap, HashSet};

use anyhow::Result;
use tracing::{debug, warn};

use crate::class_gen::{self, GenContext};
use crate::config::Config;
use crate::ffi::FfiType;
use crate::format;
use crate::mapper::{LocalRecord, TypeMapper, TypeUsage};
use crate::model::{GirClass, GirInterface, GirNamespace, TypeRegistry};
use crate::naming;

/// Qualified-name → class map across all loaded namespaces.
pub fn build_class_map(namespaces: &[GirNamespace]) -> HashMap<String, &GirClass> {
    let mut map = HashMap::new();
    for ns in namespaces {
        for class in &ns.classes {
            map.insert(format!("{}.{}", ns.name, class.name), class);
        }
    }
    map
}

/// Qualified-name → interface map across all loaded namespaces.
pub fn build_interface_map(namespaces: &[GirNamespace]) -> HashMap<String, &GirInterface> {
    let mut map = HashMap::new();
    for ns in namespaces {
        for iface in &ns.interfaces {
            map.insert(format!("{}.{}", ns.name, iface.name), iface);
        }
    }
    map
}

/// Classes excluded from generation: configured skips plus every class whose
/// constructors all carry unsupported callback shapes. Computed across all
/// namespaces up front so cross-namespace references degrade consistently.
pub fn compute_skipped_classes(
    namespaces: &[GirNamespace],
    registry: &TypeRegistry,
    cfg: &Config,
) -> HashSet<String> {
    let mut skipped: HashSet<String> = cfg.skip_classes.iter().cloned().collect();
    for ns in namespaces {
        let mapper = TypeMapper::new(registry, &ns.name);
        for class in &ns.classes {
            if class.constructors.is_empty() {
                continue;
            }
            let none_callable = class.constructors.iter().all(|c| {
                c.parameters
                    .iter()
                    .any(|p| mapper.is_unsupported_callback(p))
            });
            if none_callable {
                skipped.insert(format!("{}.{}", ns.name, class.name));
            }
        }
    }
    skipped
}

/// File name of a namespace's generated module, e.g. `Gtk` → `gtk.ts`.
pub fn namespace_file_name(ns_name: &str) -> String {
    format!("{}.ts", ns_name.to_lowercase())
}

/// Generate one namespace's module source.
pub fn emit_namespace(
    ns: &GirNamespace,
    registry: &TypeRegistry,
    class_map: &HashMap<String, &GirClass>,
    interface_map: &HashMap<String, &GirInterface>,
    skipped: &HashSet<String>,
) -> Result<String> {
    let mut mapper = TypeMapper::new(registry, &ns.name);
    mapper.set_skipped_classes(skipped.iter().cloned());
    for en in ns.enumerations.iter().chain(ns.bitfields.iter()) {
        mapper.register_enum(&en.name, &naming::normalize_class_name(&en.name));
    }
    for record in &ns.records {
        if record.disguised || record.opaque {
            continue;
        }
        let Some(type_name) = record.glib_type_name.as_deref() else {
            continue;
        };
        mapper.register_record(
            &record.name,
            LocalRecord {
                ts_name: naming::normalize_class_name(&record.name),
                glib_type_name: type_name.to_string(),
                lib: ns.shared_library.clone(),
                get_type_fn: record
                    .glib_get_type
                    .clone()
                    .or_else(|| Some(naming::get_type_fn(type_name))),
            },
        );
    }

    let ctx = GenContext {
        namespace: ns,
        registry,
        mapper,
        class_map,
        interface_map,
    };

    let mut usage = TypeUsage::default();
    let mut uses_ref = false;
    let mut uses_signals = false;
    let mut body: Vec<String> = Vec::new();

    for en in ns.enumerations.iter().chain(ns.bitfields.iter()) {
        emit_enum(en, &mut body);
    }

    if !ns.constants.is_empty() {
        for constant in &ns.constants {
            emit_constant(&ctx, constant, &mut body);
        }
        body.push(String::new());
    }

    for iface in &ns.interfaces {
        emit_interface(&ctx, iface, &mut usage, &mut uses_ref, &mut body);
    }

    for func in &ns.functions {
        if func.variadic
            || func
                .parameters
                .iter()
                .any(|p| ctx.mapper().is_unsupported_callback(p))
        {
            warn!(namespace = %ns.name, function = %func.name, "skipping namespace function");
            continue;
        }
        class_gen::emit_free_function(&ctx, func, &mut body, &mut usage, &mut uses_ref);
    }

    let mut generated = 0usize;
    for class in &ns.classes {
        if skipped.contains(&format!("{}.{}", ns.name, class.name)) {
            continue;
        }
        let Some(artifact) = class_gen::generate_class(&ctx, class) else {
            continue;
        };
        usage.merge(artifact.usage);
        uses_ref |= artifact.uses_ref;
        uses_signals |= artifact.uses_signals;
        body.push(artifact.source);
        body.push(String::new());
        generated += 1;
    }

    // Imports are synthesized from the fold of per-class usage, so they come
    // last even though they lead the file.
    let mut header: Vec<String> = Vec::new();
    header.push("// Generated by girt — do not edit.".to_string());
    header.push(runtime_import(uses_ref, uses_signals));
    for external in usage.external_namespaces() {
        if external != ns.name {
            header.push(format!(
                "import * as {external} from \"./{}\";",
                namespace_file_name(external).replace(".ts", ".js")
            ));
        }
    }
    header.push(String::new());

    debug!(namespace = %ns.name, classes = generated, "emitted namespace module");

    let source = format!("{}\n{}", header.join("\n"), body.join("\n"));
    Ok(format::format_or_warn(&namespace_file_name(&ns.name), source))
}

fn runtime_import(uses_ref: bool, uses_signals: bool) -> String {
    let mut values = vec!["call", "getObject", "getType", "isInstantiating"];
    if uses_ref {
        values.push("createRef");
    }
    if uses_signals {
        values.push("connectSignal");
        values.push("getNativeClass");
    }
    values.sort_unstable();
    let mut items: Vec<String> = values.into_iter().map(str::to_string).collect();
    if uses_ref {
        items.push("type Ref".to_string());
    }
    if uses_signals {
        items.push("type SignalMeta".to_string());
    }
    format!(
        "import {{ {} }} from \"@girt/runtime\";",
        items.join(", ")
    )
}

fn emit_enum(en: &crate::model::GirEnumeration, body: &mut Vec<String>) {
    body.push(format!(
        "export enum {} {{",
        naming::normalize_class_name(&en.name)
    ));
    for member in &en.members {
        body.push(format!(
            "{} = {},",
            naming::to_shouty_snake_case(&member.name),
            member.value
        ));
    }
    body.push("}".to_string());
    body.push(String::new());
}

/// Interface declarations carry signatures only; the implementations are
/// flattened into each implementing class.
fn emit_interface(
    ctx: &GenContext<'_>,
    iface: &crate::model::GirInterface,
    usage: &mut TypeUsage,
    uses_ref: &mut bool,
    body: &mut Vec<String>,
) {
    let ts_name = ctx.ts_name_of(&iface.name);
    body.push(format!("export interface {ts_name} {{"));
    for method in &iface.methods {
        if method.variadic
            || method
                .parameters
                .iter()
                .any(|p| ctx.mapper().is_unsupported_callback(p))
        {
            continue;
        }
        let params = class_gen::render_params(ctx, method, usage, uses_ref);
        let ret = match &method.return_type {
            Some(ty) => {
                let mapped = ctx.mapper().map_type(ty, true, Some(&mut *usage));
                class_gen::ts_with_null(&mapped)
            }
            None => "void".to_string(),
        };
        body.push(format!(
            "{}({}): {ret};",
            naming::to_camel_case(&method.name),
            params.signature
        ));
    }
    body.push("}".to_string());
    body.push(String::new());
}

fn emit_constant(ctx: &GenContext<'_>, constant: &crate::model::GirConstant, body: &mut Vec<String>) {
    let mapped = ctx.mapper().map_type(&constant.ty, false, None);
    let name = naming::to_shouty_snake_case(&constant.name);
    match mapped.ffi {
        FfiType::String { .. } => body.push(format!(
            "export const {name} = \"{}\";",
            constant.value.replace('\\', "\\\\").replace('"', "\\\"")
        )),
        FfiType::Boolean => body.push(format!("export const {name} = {};", constant.value)),
        FfiType::Int { .. } | FfiType::Float { .. } => {
            if constant.value.parse::<f64>().is_ok() {
                body.push(format!("export const {name} = {};", constant.value));
            } else {
                warn!(constant = %constant.name, "skipping constant with non-numeric value");
            }
        }
        _ => warn!(constant = %constant.name, "skipping constant with unsupported type"),
    }
}

/// The namespace index module. Namespaces are ordered by name length
/// descending so longest-match-first prefix stripping resolves ambiguous
/// unqualified type names correctly at runtime.
pub fn emit_index(namespaces: &[GirNamespace]) -> String {
    let mut ordered: Vec<&GirNamespace> = namespaces.iter().collect();
    ordered.sort_by(|a, b| {
        b.name
            .len()
            .cmp(&a.name.len())
            .then_with(|| a.name.cmp(&b.name))
    });

    let mut lines: Vec<String> = Vec::new();
    lines.push("// Generated by girt — do not edit.".to_string());
    for ns in namespaces {
        lines.push(format!(
            "import * as {} from \"./{}\";",
            ns.name,
            namespace_file_name(&ns.name).replace(".ts", ".js")
        ));
    }
    lines.push(String::new());
    lines.push("export const NAMESPACES: Record<string, object> = {".to_string());
    for ns in &ordered {
        lines.push(format!("{}: {},", ns.name, ns.name));
    }
    lines.push("};".to_string());

    format::format_or_warn("index.ts", lines.join("\n"))
}
