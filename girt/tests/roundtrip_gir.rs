//! Roundtrip integration test: parse Mini-1.0.gir → generate the tree →
//! verify the emitted surface.

use std::path::Path;
use std::sync::LazyLock;

use girt::GeneratedTree;

static TREE: LazyLock<GeneratedTree> = LazyLock::new(|| {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../tests/fixtures/mini.toml");
    girt::generate(&path).expect("generate mini tree")
});

fn file(name: &str) -> &'static str {
    TREE.files
        .get(name)
        .unwrap_or_else(|| panic!("{name} missing. Files: {:?}", TREE.files.keys()))
}

#[test]
fn roundtrip_tree_layout() {
    assert!(!TREE.files.is_empty());
    for name in ["mini.ts", "jsx.ts", "meta.ts", "index.ts"] {
        let _ = file(name);
    }
}

#[test]
fn roundtrip_module_header() {
    let mini = file("mini.ts");
    assert!(
        mini.starts_with("// Generated by girt — do not edit."),
        "missing header: {:?}",
        mini.lines().next()
    );
    assert!(mini.contains("from \"@girt/runtime\";"), "runtime import missing");
}

#[test]
fn roundtrip_enum_and_constant() {
    let mini = file("mini.ts");
    assert!(mini.contains("export enum Align {"), "{mini}");
    assert!(mini.contains("START = 0,"), "{mini}");
    assert!(mini.contains("CENTER = 1,"), "{mini}");
    assert!(mini.contains("export const PRIORITY_DEFAULT = 100;"), "{mini}");
}

#[test]
fn roundtrip_classes() {
    let mini = file("mini.ts");
    assert!(mini.contains("export class Widget {"), "{mini}");
    assert!(mini.contains("export class Button extends Widget {"), "{mini}");
    assert!(
        mini.contains("static newWithLabel(label: string): Button {"),
        "{mini}"
    );
    assert!(mini.contains("getLabel(): string | null {"), "{mini}");
    assert!(
        mini.contains("\"mini_button_get_label\""),
        "native symbol binding missing: {mini}"
    );
    assert!(
        mini.contains("setAlign(align: Align): void {"),
        "enum-typed parameter: {mini}"
    );
}

#[test]
fn roundtrip_interfaces_and_namespace_functions() {
    let mini = file("mini.ts");
    assert!(mini.contains("export interface Actionable {"), "{mini}");
    assert!(
        mini.contains("setActionName(name: string | null): void;"),
        "{mini}"
    );
    assert!(mini.contains("export function init(): void {"), "{mini}");
    assert!(mini.contains("\"mini_init\""), "{mini}");
}

#[test]
fn roundtrip_non_introspectable_entities_are_dropped() {
    let mini = file("mini.ts");
    assert!(
        !mini.contains("internalTweak"),
        "introspectable=\"0\" must not surface: {mini}"
    );
}

#[test]
fn roundtrip_caller_allocated_out_param() {
    let mini = file("mini.ts");
    // caller-allocates + boxed: no Ref wrapper, borrowed storage.
    assert!(
        mini.contains("getBounds(bounds: Rect): void {"),
        "{mini}"
    );
    assert!(
        mini.contains("innerType: \"MiniRect\""),
        "boxed descriptor carries the GLib type name: {mini}"
    );
}

#[test]
fn roundtrip_signals() {
    let mini = file("mini.ts");
    assert!(
        mini.contains(
            "connect(signal: \"clicked\", handler: (self: Button) => void, after?: boolean): number;"
        ),
        "{mini}"
    );
    assert!(
        mini.contains("connect(signal: \"destroy\""),
        "inherited signal overload: {mini}"
    );
    assert!(mini.contains("export const BUTTON_SIGNAL_META"), "{mini}");
    assert!(mini.contains("\"clicked\": { params: [] },"), "{mini}");
}

#[test]
fn roundtrip_jsx_surface() {
    let jsx = file("jsx.ts");
    assert!(jsx.contains("export interface WidgetProps {"), "{jsx}");
    assert!(
        jsx.contains("export interface ButtonProps extends WidgetProps {"),
        "{jsx}"
    );
    assert!(jsx.contains("\"mini-button\": ButtonProps;"), "{jsx}");
    assert!(
        !jsx.contains("\"mini-widget\""),
        "abstract root must not be intrinsic: {jsx}"
    );

    let meta = file("meta.ts");
    assert!(meta.contains("label: [\"getLabel\", \"setLabel\"]"), "{meta}");
    assert!(meta.contains("Button: [\"clicked\", \"destroy\"],"), "{meta}");
}

#[test]
fn roundtrip_namespace_index() {
    let index = file("index.ts");
    assert!(index.contains("import * as Mini from \"./mini.js\";"), "{index}");
    assert!(index.contains("Mini: Mini,"), "{index}");
}

#[test]
fn roundtrip_output_is_indented() {
    let mini = file("mini.ts");
    // The formatter indents method bodies two levels deep.
    assert!(
        mini.lines().any(|l| l.starts_with("    ")),
        "formatter did not run: {mini}"
    );
}

#[test]
fn run_writes_the_tree_to_disk() {
    let out = tempfile::tempdir().expect("tempdir");
    let config = Path::new(env!("CARGO_MANIFEST_DIR")).join("../tests/fixtures/mini.toml");
    let written = girt::run(&config, Some(out.path())).expect("run succeeds");

    assert_eq!(written, out.path());
    assert!(out.path().join("mini.ts").is_file());
    assert!(out.path().join("index.ts").is_file());
}
