//! JSX generation: container capabilities, prop interfaces, intrinsic
//! elements, and the reconciler metadata tables.

use girt::config::JsxConfig;
use girt::emit::{build_class_map, build_interface_map};
use girt::jsx_gen;
use girt::model::*;
use std::collections::HashSet;

fn ty(name: &str) -> GirType {
    GirType::named(name)
}

fn prop(name: &str, t: GirType, writable: bool) -> GirProperty {
    GirProperty {
        name: name.to_string(),
        ty: t,
        readable: true,
        writable,
        ..Default::default()
    }
}

fn method(name: &str, c_id: &str) -> GirFunction {
    GirFunction {
        name: name.to_string(),
        c_identifier: Some(c_id.to_string()),
        ..Default::default()
    }
}

/// A small widget tree: Widget (abstract root), Box (append), Window
/// (set_child + a titlebar slot), Label (plain leaf with a constructor).
fn fixture() -> Vec<GirNamespace> {
    let widget = GirClass {
        name: "Widget".to_string(),
        abstract_: true,
        properties: vec![prop("visible", ty("gboolean"), true)],
        signals: vec![GirSignal {
            name: "show".to_string(),
            ..Default::default()
        }],
        ..Default::default()
    };
    let boxed = GirClass {
        name: "Box".to_string(),
        parent: Some("Widget".to_string()),
        methods: vec![method("append", "gtk_box_append")],
        constructors: vec![GirFunction {
            name: "new".to_string(),
            c_identifier: Some("gtk_box_new".to_string()),
            ..Default::default()
        }],
        ..Default::default()
    };
    let window = GirClass {
        name: "Window".to_string(),
        parent: Some("Widget".to_string()),
        properties: vec![
            prop("child", ty("Widget"), true),
            prop("titlebar", ty("Widget"), true),
            prop("title", ty("utf8"), true),
        ],
        constructors: vec![GirFunction {
            name: "new".to_string(),
            c_identifier: Some("gtk_window_new".to_string()),
            ..Default::default()
        }],
        ..Default::default()
    };
    let label = GirClass {
        name: "Label".to_string(),
        parent: Some("Widget".to_string()),
        properties: vec![prop("label", ty("utf8"), true)],
        signals: vec![GirSignal {
            name: "copy_clipboard".to_string(),
            ..Default::default()
        }],
        constructors: vec![GirFunction {
            name: "new".to_string(),
            c_identifier: Some("gtk_label_new".to_string()),
            parameters: vec![GirParameter {
                name: "str".to_string(),
                ty: ty("utf8"),
                nullable: true,
                ..Default::default()
            }],
            ..Default::default()
        }],
        ..Default::default()
    };

    vec![GirNamespace {
        name: "Gtk".to_string(),
        shared_library: Some("libgtk-4.so.1".to_string()),
        classes: vec![widget, boxed, window, label],
        ..Default::default()
    }]
}

fn generate(namespaces: &[GirNamespace]) -> jsx_gen::JsxArtifacts {
    let registry = TypeRegistry::from_namespaces(namespaces);
    let class_map = build_class_map(namespaces);
    let interface_map = build_interface_map(namespaces);
    jsx_gen::generate(
        namespaces,
        &registry,
        &class_map,
        &interface_map,
        &JsxConfig::default(),
        &HashSet::new(),
    )
    .expect("jsx generation succeeds")
}

#[test]
fn container_capabilities_are_derived_from_the_widget_graph() {
    let artifacts = generate(&fixture());
    let meta = &artifacts.meta_source;

    assert!(
        meta.contains("Box: { append: true, setChild: false, slots: [] },"),
        "{meta}"
    );
    assert!(
        meta.contains("Window: { append: false, setChild: true, slots: [\"titlebar\"] },"),
        "{meta}"
    );
    assert!(
        meta.contains("Label: { append: false, setChild: false, slots: [] },"),
        "{meta}"
    );
}

#[test]
fn prop_interfaces_extend_the_parent_widget() {
    let artifacts = generate(&fixture());
    let props = &artifacts.props_source;

    assert!(props.contains("export interface WidgetProps {"), "{props}");
    assert!(
        props.contains("export interface BoxProps extends WidgetProps {"),
        "{props}"
    );
    assert!(props.contains("label?: string;"), "{props}");
    assert!(
        props.contains("onCopyClipboard?: (self: Gtk.Label) => void;"),
        "{props}"
    );
    // Named slots fill with elements, not values.
    assert!(props.contains("titlebar?: JSX.Element;"), "{props}");
}

#[test]
fn intrinsic_elements_exclude_abstract_widgets() {
    let artifacts = generate(&fixture());
    let props = &artifacts.props_source;

    assert!(props.contains("\"gtk-label\": LabelProps;"), "{props}");
    assert!(props.contains("\"gtk-window\": WindowProps;"), "{props}");
    assert!(
        !props.contains("\"gtk-widget\""),
        "abstract root is not instantiable: {props}"
    );
}

#[test]
fn constructor_params_split_required_and_optional() {
    let artifacts = generate(&fixture());
    let meta = &artifacts.meta_source;

    // Label's only constructor parameter is nullable → optional.
    assert!(meta.contains("export const CONSTRUCTOR_PARAMS"), "{meta}");
    assert!(meta.contains("export const CONSTRUCTOR_PROPS"), "{meta}");
    let params_section = meta
        .split("export const CONSTRUCTOR_PROPS")
        .next()
        .unwrap();
    assert!(params_section.contains("Label: [],"), "{params_section}");
    let props_section = meta
        .split("export const CONSTRUCTOR_PROPS")
        .nth(1)
        .unwrap();
    assert!(props_section.contains("Label: [\"str\"],"), "{props_section}");
}

#[test]
fn props_table_maps_to_getter_setter_pairs() {
    let artifacts = generate(&fixture());
    let meta = &artifacts.meta_source;

    assert!(
        meta.contains("label: [\"getLabel\", \"setLabel\"]"),
        "{meta}"
    );
    assert!(
        meta.contains("title: [\"getTitle\", \"setTitle\"]"),
        "{meta}"
    );
}

#[test]
fn signals_table_includes_inherited_names() {
    let artifacts = generate(&fixture());
    let meta = &artifacts.meta_source;

    assert!(
        meta.contains("Label: [\"copy_clipboard\", \"show\"],"),
        "own signals first, then inherited: {meta}"
    );
    assert!(meta.contains("Box: [\"show\"],"), "{meta}");
}

#[test]
fn skipped_widgets_are_left_out() {
    let namespaces = fixture();
    let registry = TypeRegistry::from_namespaces(&namespaces);
    let class_map = build_class_map(&namespaces);
    let interface_map = build_interface_map(&namespaces);
    let skipped: HashSet<String> = ["Gtk.Label".to_string()].into_iter().collect();

    let artifacts = jsx_gen::generate(
        &namespaces,
        &registry,
        &class_map,
        &interface_map,
        &JsxConfig::default(),
        &skipped,
    )
    .unwrap();

    assert!(!artifacts.props_source.contains("LabelProps"));
    assert!(!artifacts.meta_source.contains("Label:"));
}
