//! JSX generation — component prop interfaces, intrinsic-element
//! declarations, and the reconciler metadata tables, derived from the widget
//! subclass graph.

use std::collections::{HashMap, HashSet};

use anyhow::{Result, bail};
use tracing::{debug, trace};

use crate::config::JsxConfig;
use crate::mapper::{MappedType, TypeMapper};
use crate::model::{GirClass, GirInterface, GirNamespace, TypeKind, TypeRegistry};
use crate::naming;

/// The two cross-namespace JSX output files.
#[derive(Debug)]
pub struct JsxArtifacts {
    /// Prop interfaces + global intrinsic-element registry.
    pub props_source: String,
    /// Reconciler metadata tables.
    pub meta_source: String,
}

/// Container capability facts for one widget.
#[derive(Debug, Default, Clone)]
struct ContainerCaps {
    append: bool,
    set_child: bool,
    /// Writable object-typed properties whose type descends from the widget
    /// root, excluding `child`.
    slots: Vec<String>,
}

/// One widget plus its pre-resolved context.
struct Widget<'a> {
    namespace: &'a str,
    class: &'a GirClass,
    ts_name: String,
    key: String,
}

pub fn generate(
    namespaces: &[GirNamespace],
    registry: &TypeRegistry,
    class_map: &HashMap<String, &GirClass>,
    interface_map: &HashMap<String, &GirInterface>,
    cfg: &JsxConfig,
    skipped_classes: &HashSet<String>,
) -> Result<JsxArtifacts> {
    let widgets = collect_widgets(namespaces, registry, class_map, cfg, skipped_classes);
    debug!(widgets = widgets.len(), root = %cfg.widget_root, "deriving widget capabilities");

    let widget_keys: HashSet<&str> = widgets.iter().map(|w| w.key.as_str()).collect();
    let caps = derive_capabilities(&widgets, registry, &widget_keys, cfg);

    let mut mappers: HashMap<&str, TypeMapper> = HashMap::new();
    for ns in namespaces {
        mappers.insert(ns.name.as_str(), TypeMapper::new(registry, &ns.name));
    }

    let props_source = emit_props(&widgets, &caps, &mappers, cfg)?;
    let meta_source = emit_meta(&widgets, &caps, class_map, interface_map)?;

    Ok(JsxArtifacts {
        props_source,
        meta_source,
    })
}

// ---------------------------------------------------------------------------
// Widget graph
// ---------------------------------------------------------------------------

/// All classes whose ancestor chain reaches the widget root (plus the root
/// itself), minus skipped classes.
fn collect_widgets<'a>(
    namespaces: &'a [GirNamespace],
    registry: &TypeRegistry,
    class_map: &HashMap<String, &'a GirClass>,
    cfg: &JsxConfig,
    skipped_classes: &HashSet<String>,
) -> Vec<Widget<'a>> {
    let mut widgets = Vec::new();
    for ns in namespaces {
        for class in &ns.classes {
            let key = format!("{}.{}", ns.name, class.name);
            if skipped_classes.contains(&key) {
                continue;
            }
            if key != cfg.widget_root && !descends_from(&key, &cfg.widget_root, class_map) {
                continue;
            }
            let ts_name = registry
                .resolve(&key)
                .map(|rt| rt.transformed_name.clone())
                .unwrap_or_else(|| naming::normalize_class_name(&class.name));
            widgets.push(Widget {
                namespace: &ns.name,
                class,
                ts_name,
                key,
            });
        }
    }
    widgets
}

fn descends_from(key: &str, root: &str, class_map: &HashMap<String, &GirClass>) -> bool {
    let mut visited = HashSet::new();
    let mut current_key = key.to_string();
    while let Some(cls) = class_map.get(&current_key).copied() {
        let Some(parent) = cls.parent.as_deref() else {
            return false;
        };
        // Unqualified parent names live in the current class's namespace.
        let ns = current_key.split_once('.').map(|(ns, _)| ns).unwrap_or_default();
        let parent_key = if parent.contains('.') {
            parent.to_string()
        } else {
            format!("{ns}.{parent}")
        };
        if parent_key == root {
            return true;
        }
        if !visited.insert(parent_key.clone()) {
            return false;
        }
        current_key = parent_key;
    }
    false
}

fn derive_capabilities(
    widgets: &[Widget<'_>],
    registry: &TypeRegistry,
    widget_keys: &HashSet<&str>,
    _cfg: &JsxConfig,
) -> HashMap<String, ContainerCaps> {
    let mut caps = HashMap::new();
    for widget in widgets {
        let class = widget.class;
        let mut entry = ContainerCaps {
            append: class.methods.iter().any(|m| m.name == "append"),
            set_child: class.methods.iter().any(|m| m.name == "set_child")
                || class
                    .properties
                    .iter()
                    .any(|p| p.name == "child" && p.writable),
            slots: Vec::new(),
        };
        for prop in &class.properties {
            if !prop.writable || prop.name == "child" {
                continue;
            }
            let Some(type_name) = prop.ty.name.as_deref() else {
                continue;
            };
            let Some(rt) = registry.resolve_in_namespace(type_name, widget.namespace) else {
                continue;
            };
            if rt.kind == TypeKind::Class && widget_keys.contains(rt.key().as_str()) {
                entry.slots.push(naming::to_camel_case(&prop.name));
            }
        }
        trace!(widget = %widget.key, append = entry.append, set_child = entry.set_child, slots = entry.slots.len(), "capabilities");
        caps.insert(widget.key.clone(), entry);
    }
    caps
}

/// Fetch a widget's capability entry. A widget missing from the map at this
/// point is an internal generator bug, not malformed input — fail loudly.
fn caps_of<'a>(
    caps: &'a HashMap<String, ContainerCaps>,
    key: &str,
) -> Result<&'a ContainerCaps> {
    match caps.get(key) {
        Some(entry) => Ok(entry),
        None => bail!("container metadata missing for widget {key}: capability pass incomplete"),
    }
}

// ---------------------------------------------------------------------------
// Prop interfaces and intrinsic elements
// ---------------------------------------------------------------------------

/// Qualify a mapped type name for the cross-namespace props file.
fn qualified_ts(mapped: &MappedType) -> String {
    if let Some(key) = mapped.resolved.as_deref()
        && !mapped.ts.contains('.')
        && let Some((ns, _)) = key.split_once('.')
    {
        return format!("{ns}.{}", mapped.ts);
    }
    mapped.ts.clone()
}

fn emit_props(
    widgets: &[Widget<'_>],
    caps: &HashMap<String, ContainerCaps>,
    mappers: &HashMap<&str, TypeMapper>,
    cfg: &JsxConfig,
) -> Result<String> {
    let mut lines: Vec<String> = Vec::new();
    let namespaces: std::collections::BTreeSet<&str> =
        widgets.iter().map(|w| w.namespace).collect();
    for ns in &namespaces {
        lines.push(format!(
            "import * as {ns} from \"./{}.js\";",
            ns.to_lowercase()
        ));
    }
    lines.push(String::new());

    for widget in widgets {
        let entry = caps_of(caps, &widget.key)?;
        let mapper = &mappers[widget.namespace];
        let iface_name = format!("{}Props", widget.ts_name);

        // Subclasses extend their parent widget's interface and declare only
        // their own props; the base contract's prop names stay reserved.
        let parent_iface = widget
            .class
            .parent
            .as_deref()
            .and_then(|p| {
                let parent_key = if p.contains('.') {
                    p.to_string()
                } else {
                    format!("{}.{p}", widget.namespace)
                };
                widgets
                    .iter()
                    .find(|w| w.key == parent_key)
                    .map(|w| format!("{}Props", w.ts_name))
            });

        match parent_iface {
            Some(parent) => lines.push(format!("export interface {iface_name} extends {parent} {{")),
            None => lines.push(format!("export interface {iface_name} {{")),
        }

        for prop in &widget.class.properties {
            if !prop.writable {
                continue;
            }
            let camel = naming::to_camel_case(&prop.name);
            if cfg.base_component_props.iter().any(|p| p == &camel) {
                continue;
            }
            if entry.slots.contains(&camel) {
                // Named child slot: fills with an element, not a value.
                lines.push(format!("{camel}?: JSX.Element;"));
                continue;
            }
            let mapped = mapper.map_type(&prop.ty, false, None);
            lines.push(format!("{camel}?: {};", qualified_ts(&mapped)));
        }

        for signal in &widget.class.signals {
            let handler_name = format!("on{}", naming::to_pascal_case(&signal.name));
            let mut params = vec![format!("self: {}.{}", widget.namespace, widget.ts_name)];
            for p in &signal.parameters {
                let mapped = mapper.map_type(&p.ty, false, None);
                params.push(format!(
                    "{}: {}",
                    naming::escape_ident(&p.name),
                    qualified_ts(&mapped)
                ));
            }
            lines.push(format!(
                "{handler_name}?: ({}) => void;",
                params.join(", ")
            ));
        }

        lines.push("}".to_string());
        lines.push(String::new());
    }

    // The global intrinsic-element registry merging all widgets.
    lines.push("declare global {".to_string());
    lines.push("namespace JSX {".to_string());
    lines.push("interface IntrinsicElements {".to_string());
    for widget in widgets {
        // Abstract widgets cannot be instantiated by the reconciler.
        if widget.class.abstract_ {
            continue;
        }
        let _ = caps_of(caps, &widget.key)?;
        let element = format!(
            "{}-{}",
            widget.namespace.to_lowercase(),
            naming::to_kebab_case(&widget.class.name)
        );
        lines.push(format!("\"{element}\": {}Props;", widget.ts_name));
    }
    lines.push("}".to_string());
    lines.push("}".to_string());
    lines.push("}".to_string());

    Ok(lines.join("\n"))
}

// ---------------------------------------------------------------------------
// Reconciler metadata tables
// ---------------------------------------------------------------------------

fn emit_meta(
    widgets: &[Widget<'_>],
    caps: &HashMap<String, ContainerCaps>,
    class_map: &HashMap<String, &GirClass>,
    interface_map: &HashMap<String, &GirInterface>,
) -> Result<String> {
    let mut lines: Vec<String> = Vec::new();

    // Ordered required then optional constructor parameter names.
    lines.push("export const CONSTRUCTOR_PARAMS: Record<string, string[]> = {".to_string());
    for widget in widgets {
        let (required, _) = constructor_param_names(widget.class);
        lines.push(format!(
            "{}: [{}],",
            widget.ts_name,
            quote_list(&required)
        ));
    }
    lines.push("};".to_string());
    lines.push(String::new());

    lines.push("export const CONSTRUCTOR_PROPS: Record<string, string[]> = {".to_string());
    for widget in widgets {
        let (_, optional) = constructor_param_names(widget.class);
        lines.push(format!(
            "{}: [{}],",
            widget.ts_name,
            quote_list(&optional)
        ));
    }
    lines.push("};".to_string());
    lines.push(String::new());

    // Property name → [getter | null, setter].
    lines.push(
        "export const PROPS: Record<string, Record<string, [string | null, string]>> = {"
            .to_string(),
    );
    for widget in widgets {
        let mut entries = Vec::new();
        for prop in &widget.class.properties {
            if !prop.writable || prop.construct_only {
                continue;
            }
            let camel = naming::to_camel_case(&prop.name);
            let getter = if prop.readable {
                let name = prop
                    .getter
                    .clone()
                    .unwrap_or_else(|| format!("get_{}", prop.name.replace('-', "_")));
                format!("\"{}\"", naming::to_camel_case(&name))
            } else {
                "null".to_string()
            };
            let setter = prop
                .setter
                .clone()
                .unwrap_or_else(|| format!("set_{}", prop.name.replace('-', "_")));
            entries.push(format!(
                "{camel}: [{getter}, \"{}\"]",
                naming::to_camel_case(&setter)
            ));
        }
        lines.push(format!("{}: {{ {} }},", widget.ts_name, entries.join(", ")));
    }
    lines.push("};".to_string());
    lines.push(String::new());

    // All signal names, own + inherited.
    lines.push("export const SIGNALS: Record<string, string[]> = {".to_string());
    for widget in widgets {
        let names = inherited_signal_names(widget, class_map, interface_map);
        lines.push(format!("{}: [{}],", widget.ts_name, quote_list(&names)));
    }
    lines.push("};".to_string());
    lines.push(String::new());

    lines.push(
        "export const CONTAINERS: Record<string, { append: boolean; setChild: boolean; slots: string[] }> = {"
            .to_string(),
    );
    for widget in widgets {
        let entry = caps_of(caps, &widget.key)?;
        lines.push(format!(
            "{}: {{ append: {}, setChild: {}, slots: [{}] }},",
            widget.ts_name,
            entry.append,
            entry.set_child,
            quote_list(&entry.slots)
        ));
    }
    lines.push("};".to_string());

    Ok(lines.join("\n"))
}

fn quote_list(items: &[String]) -> String {
    items
        .iter()
        .map(|i| format!("\"{i}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Required and optional parameter names of the widget's main constructor.
fn constructor_param_names(class: &GirClass) -> (Vec<String>, Vec<String>) {
    let Some(ctor) = class.constructors.iter().find(|c| !c.variadic) else {
        return (Vec::new(), Vec::new());
    };
    let mut required = Vec::new();
    let mut optional = Vec::new();
    for p in &ctor.parameters {
        let name = naming::to_camel_case(&p.name);
        if p.optional || p.nullable {
            optional.push(name);
        } else {
            required.push(name);
        }
    }
    (required, optional)
}

/// Own + interface + ancestor signal names, deduplicated, own-first.
fn inherited_signal_names(
    widget: &Widget<'_>,
    class_map: &HashMap<String, &GirClass>,
    interface_map: &HashMap<String, &GirInterface>,
) -> Vec<String> {
    let mut names = Vec::new();
    let mut seen = HashSet::new();
    let mut push = |name: &str, names: &mut Vec<String>, seen: &mut HashSet<String>| {
        if seen.insert(name.to_string()) {
            names.push(name.to_string());
        }
    };

    for s in &widget.class.signals {
        push(&s.name, &mut names, &mut seen);
    }
    for iface_name in &widget.class.implements {
        let key = if iface_name.contains('.') {
            iface_name.clone()
        } else {
            format!("{}.{iface_name}", widget.namespace)
        };
        if let Some(iface) = interface_map.get(&key) {
            for s in &iface.signals {
                push(&s.name, &mut names, &mut seen);
            }
        }
    }

    let mut visited = HashSet::new();
    let mut parent = widget.class.parent.as_deref().map(|p| {
        if p.contains('.') {
            p.to_string()
        } else {
            format!("{}.{p}", widget.namespace)
        }
    });
    while let Some(parent_key) = parent {
        if !visited.insert(parent_key.clone()) {
            break;
        }
        let Some(ancestor) = class_map.get(&parent_key).copied() else {
            break;
        };
        for s in &ancestor.signals {
            push(&s.name, &mut names, &mut seen);
        }
        let ns = parent_key.split_once('.').map(|(ns, _)| ns).unwrap_or("");
        parent = ancestor.parent.as_deref().map(|p| {
            if p.contains('.') {
                p.to_string()
            } else {
                format!("{ns}.{p}")
            }
        });
    }

    names
}
