//! Signal surfacing: inheritance collection, typed overloads, the synthetic
//! `notify` overload, the catch-all, and the metadata table.

use girt::class_gen::GenContext;
use girt::emit::{build_class_map, build_interface_map};
use girt::mapper::TypeMapper;
use girt::model::*;
use girt::signal_gen;

fn signal(name: &str, params: Vec<GirParameter>, ret: Option<GirType>) -> GirSignal {
    GirSignal {
        name: name.to_string(),
        parameters: params,
        return_type: ret,
    }
}

fn in_param(name: &str, ty: GirType) -> GirParameter {
    GirParameter {
        name: name.to_string(),
        ty,
        ..Default::default()
    }
}

struct Fixture {
    namespaces: Vec<GirNamespace>,
}

impl Fixture {
    fn new(namespaces: Vec<GirNamespace>) -> Self {
        Fixture { namespaces }
    }

    fn generate(&self, ns_name: &str, class_name: &str) -> signal_gen::SignalBlock {
        let registry = TypeRegistry::from_namespaces(&self.namespaces);
        let class_map = build_class_map(&self.namespaces);
        let interface_map = build_interface_map(&self.namespaces);
        let ns = self
            .namespaces
            .iter()
            .find(|n| n.name == ns_name)
            .expect("namespace present");
        let ctx = GenContext {
            namespace: ns,
            registry: &registry,
            mapper: TypeMapper::new(&registry, ns_name),
            class_map: &class_map,
            interface_map: &interface_map,
        };
        let class = ns
            .classes
            .iter()
            .find(|c| c.name == class_name)
            .expect("class present");
        let ts_name = ctx.ts_name_of(class_name);
        signal_gen::generate(&ctx, class, &ts_name)
    }
}

fn gtk_with(classes: Vec<GirClass>, interfaces: Vec<GirInterface>) -> GirNamespace {
    GirNamespace {
        name: "Gtk".to_string(),
        shared_library: Some("libgtk-4.so.1".to_string()),
        classes,
        interfaces,
        ..Default::default()
    }
}

#[test]
fn ancestor_signals_are_collected() {
    let widget = GirClass {
        name: "Widget".to_string(),
        signals: vec![signal("destroy", vec![], None)],
        ..Default::default()
    };
    let button = GirClass {
        name: "Button".to_string(),
        parent: Some("Widget".to_string()),
        signals: vec![signal("clicked", vec![], None)],
        ..Default::default()
    };
    let fixture = Fixture::new(vec![gtk_with(vec![widget, button], vec![])]);
    let block = fixture.generate("Gtk", "Button");

    let overloads = block.overloads.join("\n");
    assert!(overloads.contains("signal: \"clicked\""), "{overloads}");
    assert!(overloads.contains("signal: \"destroy\""), "{overloads}");
}

#[test]
fn interface_signals_are_first_seen_wins() {
    let editable = GirInterface {
        name: "Editable".to_string(),
        signals: vec![signal("changed", vec![], None)],
        ..Default::default()
    };
    let other = GirInterface {
        name: "CellEditable".to_string(),
        signals: vec![signal("changed", vec![], None), signal("editing_done", vec![], None)],
        ..Default::default()
    };
    let entry = GirClass {
        name: "Entry".to_string(),
        implements: vec!["Editable".to_string(), "CellEditable".to_string()],
        ..Default::default()
    };
    let fixture = Fixture::new(vec![gtk_with(vec![entry], vec![editable, other])]);
    let block = fixture.generate("Gtk", "Entry");

    let overloads = block.overloads.join("\n");
    let changed_count = overloads.matches("signal: \"changed\"").count();
    assert_eq!(changed_count, 1, "collisions collapse first-seen-wins: {overloads}");
    assert!(overloads.contains("signal: \"editing_done\""), "{overloads}");
}

#[test]
fn cross_namespace_parent_stops_collection_and_flags() {
    let swatch = GirClass {
        name: "Swatch".to_string(),
        parent: Some("Gdk.Paintable".to_string()),
        ..Default::default()
    };
    let ns = gtk_with(vec![swatch], vec![]);
    let namespaces = vec![ns];
    let registry = TypeRegistry::from_namespaces(&namespaces);
    let class_map = build_class_map(&namespaces);
    let interface_map = build_interface_map(&namespaces);
    let ctx = GenContext {
        namespace: &namespaces[0],
        registry: &registry,
        mapper: TypeMapper::new(&registry, "Gtk"),
        class_map: &class_map,
        interface_map: &interface_map,
    };

    let (signals, cross_ns) = signal_gen::collect_signals(&ctx, &namespaces[0].classes[0]);
    assert!(signals.is_empty());
    assert!(cross_ns, "a cross-namespace parent might contribute signals");
}

#[test]
fn notify_overload_is_injected() {
    let button = GirClass {
        name: "Button".to_string(),
        signals: vec![signal("clicked", vec![], None)],
        ..Default::default()
    };
    let fixture = Fixture::new(vec![gtk_with(vec![button], vec![])]);
    let block = fixture.generate("Gtk", "Button");

    let overloads = block.overloads.join("\n");
    assert!(
        overloads.contains("connect(signal: \"notify\", handler: (self: Button, pspec: unknown) => void"),
        "{overloads}"
    );
}

#[test]
fn notify_uses_param_spec_when_gobject_is_loaded() {
    let pspec = GirClass {
        name: "ParamSpec".to_string(),
        ..Default::default()
    };
    let gobject = GirNamespace {
        name: "GObject".to_string(),
        classes: vec![pspec],
        ..Default::default()
    };
    let button = GirClass {
        name: "Button".to_string(),
        signals: vec![signal("clicked", vec![], None)],
        ..Default::default()
    };
    let fixture = Fixture::new(vec![gobject, gtk_with(vec![button], vec![])]);
    let block = fixture.generate("Gtk", "Button");

    let overloads = block.overloads.join("\n");
    assert!(
        overloads.contains("pspec: GObject.ParamSpec"),
        "{overloads}"
    );
    assert_eq!(
        block.usage.external_types.get("ParamSpec").map(String::as_str),
        Some("GObject")
    );
}

#[test]
fn the_catch_all_overload_is_always_last() {
    let plain = GirClass {
        name: "Plain".to_string(),
        signals: vec![signal("ping", vec![], None)],
        ..Default::default()
    };
    let fixture = Fixture::new(vec![gtk_with(vec![plain], vec![])]);
    let block = fixture.generate("Gtk", "Plain");

    let last = block.overloads.last().expect("has overloads");
    assert_eq!(
        last,
        "connect(signal: string, handler: (...args: unknown[]) => unknown, after?: boolean): number;"
    );
}

#[test]
fn metadata_carries_descriptors_and_return_types() {
    let rect = GirRecord {
        name: "Rectangle".to_string(),
        glib_type_name: Some("GdkRectangle".to_string()),
        ..Default::default()
    };
    let area = GirClass {
        name: "Area".to_string(),
        signals: vec![
            signal(
                "resize",
                vec![
                    in_param("width", GirType::named("gint")),
                    in_param("height", GirType::named("gint")),
                ],
                None,
            ),
            signal(
                "query",
                vec![in_param("region", GirType::named("Rectangle"))],
                Some(GirType::named("gboolean")),
            ),
        ],
        ..Default::default()
    };
    let mut ns = gtk_with(vec![area], vec![]);
    ns.records = vec![rect];
    let fixture = Fixture::new(vec![ns]);
    let block = fixture.generate("Gtk", "Area");

    let metadata = block.metadata.join("\n");
    assert!(
        metadata.contains(
            "\"resize\": { params: [{ type: \"int\", size: 32, signed: true }, { type: \"int\", size: 32, signed: true }] },"
        ),
        "{metadata}"
    );
    // Boxed signal arguments carry the type name the runtime resolves
    // through the class-by-type-name lookup.
    assert!(metadata.contains("innerType: \"GdkRectangle\""), "{metadata}");
    assert!(
        metadata.contains("returnType: { type: \"boolean\" }"),
        "{metadata}"
    );
}

#[test]
fn runtime_impl_unwraps_gobject_and_boxed_arguments() {
    let plain = GirClass {
        name: "Plain".to_string(),
        signals: vec![signal("ping", vec![], None)],
        ..Default::default()
    };
    let fixture = Fixture::new(vec![gtk_with(vec![plain], vec![])]);
    let block = fixture.generate("Gtk", "Plain");

    let body = block.runtime_impl.join("\n");
    assert!(body.contains("PLAIN_SIGNAL_META[signal] ?? { params: [] }"), "{body}");
    assert!(body.contains("getObject(value as bigint)"), "{body}");
    assert!(body.contains("getNativeClass(desc.innerType)"), "{body}");
    assert!(body.contains("connectSignal(this.id, signal, meta, wrapped, after ?? false)"), "{body}");
}
