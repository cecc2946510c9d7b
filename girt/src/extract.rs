//! Extraction — GIR XML nodes → intermediate model types.
//!
//! Deliberately thin: attribute reads and node walks only. Anything the
//! generators cannot use degrades at mapping time, not here.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use roxmltree::{Document, Node};
use tracing::{debug, trace, warn};

use crate::model::*;

const C_NS: &str = "http://www.gtk.org/introspection/c/1.0";
const GLIB_NS: &str = "http://www.gtk.org/introspection/glib/1.0";

/// Parse a `.gir` file into a [`GirNamespace`].
pub fn extract_file(path: &Path, shared_library_override: Option<&str>) -> Result<GirNamespace> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading gir file {}", path.display()))?;
    let ns = extract_str(&content, shared_library_override)
        .with_context(|| format!("parsing gir file {}", path.display()))?;
    Ok(ns)
}

/// Parse GIR XML text into a [`GirNamespace`].
pub fn extract_str(xml: &str, shared_library_override: Option<&str>) -> Result<GirNamespace> {
    let doc = Document::parse(xml).context("malformed gir XML")?;
    let namespace_node = doc
        .root_element()
        .children()
        .find(|n| n.is_element() && n.tag_name().name() == "namespace")
        .context("gir file has no <namespace> element")?;

    let name = namespace_node
        .attribute("name")
        .context("<namespace> has no name")?
        .to_string();
    let version = namespace_node
        .attribute("version")
        .unwrap_or_default()
        .to_string();
    // Multi-library namespaces list several .so names; the first carries the
    // symbols we bind.
    let shared_library = shared_library_override
        .map(str::to_string)
        .or_else(|| {
            namespace_node
                .attribute("shared-library")
                .map(|libs| libs.split(',').next().unwrap_or(libs).to_string())
        });

    let mut ns = GirNamespace {
        name,
        version,
        shared_library,
        ..Default::default()
    };

    for child in namespace_node.children().filter(Node::is_element) {
        if !is_introspectable(&child) {
            trace!(tag = child.tag_name().name(), "skipping non-introspectable entity");
            continue;
        }
        match child.tag_name().name() {
            "class" => match extract_class(&child) {
                Ok(class) => {
                    debug!(name = %class.name, methods = class.methods.len(), "extracted class");
                    ns.classes.push(class);
                }
                Err(e) => warn!(err = %e, "skipping class"),
            },
            "interface" => match extract_interface(&child) {
                Ok(iface) => {
                    debug!(name = %iface.name, "extracted interface");
                    ns.interfaces.push(iface);
                }
                Err(e) => warn!(err = %e, "skipping interface"),
            },
            "record" => match extract_record(&child) {
                Ok(record) => {
                    trace!(name = %record.name, "extracted record");
                    ns.records.push(record);
                }
                Err(e) => warn!(err = %e, "skipping record"),
            },
            "enumeration" => match extract_enumeration(&child) {
                Ok(en) => ns.enumerations.push(en),
                Err(e) => warn!(err = %e, "skipping enumeration"),
            },
            "bitfield" => match extract_enumeration(&child) {
                Ok(bf) => ns.bitfields.push(bf),
                Err(e) => warn!(err = %e, "skipping bitfield"),
            },
            "callback" => match extract_callback(&child) {
                Ok(cb) => ns.callbacks.push(cb),
                Err(e) => warn!(err = %e, "skipping callback"),
            },
            "constant" => match extract_constant(&child) {
                Ok(c) => ns.constants.push(c),
                Err(e) => warn!(err = %e, "skipping constant"),
            },
            "function" => match extract_function(&child) {
                Ok(f) => ns.functions.push(f),
                Err(e) => warn!(err = %e, "skipping function"),
            },
            _ => {}
        }
    }

    tracing::info!(
        namespace = %ns.name,
        classes = ns.classes.len(),
        interfaces = ns.interfaces.len(),
        records = ns.records.len(),
        enums = ns.enumerations.len() + ns.bitfields.len(),
        callbacks = ns.callbacks.len(),
        "namespace extraction complete"
    );

    Ok(ns)
}

fn is_introspectable(node: &Node) -> bool {
    node.attribute("introspectable") != Some("0")
}

fn bool_attr(node: &Node, name: &str) -> bool {
    node.attribute(name) == Some("1")
}

// ---------------------------------------------------------------------------
// Declaration extraction — one function per GIR element kind
// ---------------------------------------------------------------------------

fn extract_class(node: &Node) -> Result<GirClass> {
    let name = node.attribute("name").context("class has no name")?;

    let mut class = GirClass {
        name: name.to_string(),
        parent: node.attribute("parent").map(str::to_string),
        abstract_: bool_attr(node, "abstract"),
        glib_type_name: node.attribute((GLIB_NS, "type-name")).map(str::to_string),
        glib_get_type: node.attribute((GLIB_NS, "get-type")).map(str::to_string),
        ..Default::default()
    };

    let mut seen_methods = HashSet::new();
    for child in node.children().filter(Node::is_element) {
        if !is_introspectable(&child) {
            continue;
        }
        match (child.tag_name().namespace(), child.tag_name().name()) {
            (_, "implements") => {
                if let Some(iface) = child.attribute("name") {
                    class.implements.push(iface.to_string());
                }
            }
            (_, "constructor") => match extract_function(&child) {
                Ok(f) => class.constructors.push(f),
                Err(e) => warn!(class = name, err = %e, "skipping constructor"),
            },
            (_, "method") => match extract_function(&child) {
                Ok(f) => {
                    // C macro aliases can declare the same method twice.
                    if !seen_methods.insert(f.name.clone()) {
                        trace!(class = name, method = %f.name, "skipping duplicate method");
                        continue;
                    }
                    class.methods.push(f);
                }
                Err(e) => warn!(class = name, err = %e, "skipping method"),
            },
            (_, "function") => match extract_function(&child) {
                Ok(f) => class.functions.push(f),
                Err(e) => warn!(class = name, err = %e, "skipping function"),
            },
            (_, "property") => match extract_property(&child) {
                Ok(p) => class.properties.push(p),
                Err(e) => warn!(class = name, err = %e, "skipping property"),
            },
            (Some(GLIB_NS), "signal") => match extract_signal(&child) {
                Ok(s) => class.signals.push(s),
                Err(e) => warn!(class = name, err = %e, "skipping signal"),
            },
            _ => {}
        }
    }

    Ok(class)
}

fn extract_interface(node: &Node) -> Result<GirInterface> {
    let name = node.attribute("name").context("interface has no name")?;

    let mut iface = GirInterface {
        name: name.to_string(),
        glib_type_name: node.attribute((GLIB_NS, "type-name")).map(str::to_string),
        glib_get_type: node.attribute((GLIB_NS, "get-type")).map(str::to_string),
        ..Default::default()
    };

    for child in node.children().filter(Node::is_element) {
        if !is_introspectable(&child) {
            continue;
        }
        match (child.tag_name().namespace(), child.tag_name().name()) {
            (_, "prerequisite") => {
                if let Some(p) = child.attribute("name") {
                    iface.prerequisites.push(p.to_string());
                }
            }
            (_, "method") => match extract_function(&child) {
                Ok(f) => iface.methods.push(f),
                Err(e) => warn!(interface = name, err = %e, "skipping method"),
            },
            (_, "property") => match extract_property(&child) {
                Ok(p) => iface.properties.push(p),
                Err(e) => warn!(interface = name, err = %e, "skipping property"),
            },
            (Some(GLIB_NS), "signal") => match extract_signal(&child) {
                Ok(s) => iface.signals.push(s),
                Err(e) => warn!(interface = name, err = %e, "skipping signal"),
            },
            _ => {}
        }
    }

    Ok(iface)
}

fn extract_record(node: &Node) -> Result<GirRecord> {
    let name = node.attribute("name").context("record has no name")?;
    Ok(GirRecord {
        name: name.to_string(),
        glib_type_name: node.attribute((GLIB_NS, "type-name")).map(str::to_string),
        glib_get_type: node.attribute((GLIB_NS, "get-type")).map(str::to_string),
        disguised: bool_attr(node, "disguised"),
        opaque: bool_attr(node, "opaque"),
    })
}

fn extract_enumeration(node: &Node) -> Result<GirEnumeration> {
    let name = node.attribute("name").context("enumeration has no name")?;
    let mut members = Vec::new();
    for child in node.children().filter(Node::is_element) {
        if child.tag_name().name() != "member" {
            continue;
        }
        let member_name = child.attribute("name").unwrap_or_default();
        let value = child
            .attribute("value")
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(0);
        members.push(GirEnumMember {
            name: member_name.to_string(),
            value,
        });
    }
    Ok(GirEnumeration {
        name: name.to_string(),
        members,
    })
}

fn extract_callback(node: &Node) -> Result<GirCallback> {
    let name = node.attribute("name").context("callback has no name")?;
    let (parameters, _) = extract_parameters(node);
    Ok(GirCallback {
        name: name.to_string(),
        parameters,
        return_type: extract_return_type(node),
    })
}

fn extract_constant(node: &Node) -> Result<GirConstant> {
    let name = node.attribute("name").context("constant has no name")?;
    let value = node.attribute("value").context("constant has no value")?;
    Ok(GirConstant {
        name: name.to_string(),
        value: value.to_string(),
        ty: extract_type_info(node).unwrap_or_default(),
    })
}

fn extract_function(node: &Node) -> Result<GirFunction> {
    let name = node.attribute("name").context("function has no name")?;
    let (parameters, variadic) = extract_parameters(node);
    Ok(GirFunction {
        name: name.to_string(),
        c_identifier: node.attribute((C_NS, "identifier")).map(str::to_string),
        parameters,
        return_type: extract_return_type(node),
        throws: bool_attr(node, "throws"),
        variadic,
    })
}

fn extract_signal(node: &Node) -> Result<GirSignal> {
    let name = node.attribute("name").context("signal has no name")?;
    let (parameters, _) = extract_parameters(node);
    Ok(GirSignal {
        name: name.to_string(),
        parameters,
        return_type: extract_return_type(node),
    })
}

fn extract_property(node: &Node) -> Result<GirProperty> {
    let name = node.attribute("name").context("property has no name")?;
    Ok(GirProperty {
        name: name.to_string(),
        ty: extract_type_info(node).context("property has no type")?,
        // `readable` defaults to on in GIR; `writable` defaults to off.
        readable: node.attribute("readable") != Some("0"),
        writable: bool_attr(node, "writable"),
        construct_only: bool_attr(node, "construct-only"),
        getter: node.attribute("getter").map(str::to_string),
        setter: node.attribute("setter").map(str::to_string),
    })
}

// ---------------------------------------------------------------------------
// Parameter and type extraction
// ---------------------------------------------------------------------------

/// Extract the `<parameters>` block. Returns the parameter list and whether a
/// `<varargs/>` entry made the function variadic. The instance parameter is
/// implicit in the binding surface and is not included.
fn extract_parameters(node: &Node) -> (Vec<GirParameter>, bool) {
    let mut params = Vec::new();
    let mut variadic = false;

    let Some(params_node) = node
        .children()
        .find(|n| n.is_element() && n.tag_name().name() == "parameters")
    else {
        return (params, false);
    };

    for child in params_node.children().filter(Node::is_element) {
        match child.tag_name().name() {
            "instance-parameter" => continue,
            "parameter" => {}
            _ => continue,
        }
        if child
            .children()
            .any(|n| n.is_element() && n.tag_name().name() == "varargs")
        {
            variadic = true;
            continue;
        }
        let name = child.attribute("name").unwrap_or("arg").to_string();
        let direction = match child.attribute("direction") {
            Some("out") => Direction::Out,
            Some("inout") => Direction::InOut,
            _ => Direction::In,
        };
        params.push(GirParameter {
            name,
            ty: extract_type_info(&child).unwrap_or_default(),
            direction,
            caller_allocates: bool_attr(&child, "caller-allocates"),
            nullable: bool_attr(&child, "nullable") || bool_attr(&child, "allow-none"),
            optional: bool_attr(&child, "optional"),
            scope: child.attribute("scope").map(str::to_string),
            closure: child.attribute("closure").and_then(|v| v.parse().ok()),
            destroy: child.attribute("destroy").and_then(|v| v.parse().ok()),
        });
    }

    (params, variadic)
}

fn extract_return_type(node: &Node) -> Option<GirType> {
    let ret = node
        .children()
        .find(|n| n.is_element() && n.tag_name().name() == "return-value")?;
    extract_type_info(&ret)
}

/// Extract the type reference carried by a `<parameter>`, `<return-value>`,
/// `<property>`, or `<constant>` node: its child `<type>` or `<array>`, with
/// transfer/nullability read from the owner.
fn extract_type_info(owner: &Node) -> Option<GirType> {
    let type_node = owner
        .children()
        .find(|n| n.is_element() && matches!(n.tag_name().name(), "type" | "array"))?;

    let transfer = match owner.attribute("transfer-ownership") {
        Some("full") => Transfer::Full,
        Some("container") => Transfer::Container,
        _ => Transfer::None,
    };
    let nullable = bool_attr(owner, "nullable") || bool_attr(owner, "allow-none");

    let mut ty = extract_type_node(&type_node);
    ty.transfer = transfer;
    ty.nullable = nullable;
    Some(ty)
}

fn extract_type_node(node: &Node) -> GirType {
    let c_type = node.attribute((C_NS, "type")).map(str::to_string);
    let name = node.attribute("name").map(str::to_string);

    if node.tag_name().name() == "array" {
        let element = node
            .children()
            .find(|n| n.is_element() && matches!(n.tag_name().name(), "type" | "array"))
            .map(|n| Box::new(extract_type_node(&n)));
        return GirType {
            name,
            c_type,
            is_array: true,
            element_type: element,
            ..Default::default()
        };
    }

    // GIR writes native linked lists as `<type name="GLib.List">` with the
    // element type nested inside; normalize them to arrays so the mapper's
    // C-type list detection sees one shape for all sequences.
    if matches!(name.as_deref(), Some("GLib.List") | Some("GLib.SList")) {
        let element = node
            .children()
            .find(|n| n.is_element() && matches!(n.tag_name().name(), "type" | "array"))
            .map(|n| Box::new(extract_type_node(&n)));
        return GirType {
            name,
            c_type,
            is_array: true,
            element_type: element,
            ..Default::default()
        };
    }

    GirType {
        name,
        c_type,
        ..Default::default()
    }
}
