//! Ownership, direction, and degradation rules of the type mapper.

use girt::ffi::{FfiType, ListKind, Trampoline};
use girt::mapper::TypeMapper;
use girt::model::{Direction, GirParameter, GirType, Transfer, TypeRegistry};

fn registry() -> TypeRegistry {
    let mut registry = TypeRegistry::default();
    registry.register_native_class(
        "Gtk",
        "Widget",
        Some("GtkWidget"),
        Some("libgtk-4.so.1"),
        Some("gtk_widget_get_type"),
    );
    registry.register_record(
        "Gdk",
        "Rectangle",
        "GdkRectangle",
        Some("libgtk-4.so.1"),
        Some("gdk_rectangle_get_type"),
    );
    registry.register_callback("Gtk", "TickCallback");
    registry
}

fn in_param(name: &str, ty: GirType) -> GirParameter {
    GirParameter {
        name: name.to_string(),
        ty,
        direction: Direction::In,
        ..Default::default()
    }
}

#[test]
fn transfer_full_parameter_is_owned_by_callee() {
    let registry = registry();
    let mapper = TypeMapper::new(&registry, "Gtk");

    let full = in_param(
        "child",
        GirType {
            transfer: Transfer::Full,
            ..GirType::named("Widget")
        },
    );
    assert_eq!(
        mapper.map_parameter(&full, None).ffi,
        FfiType::GObject { borrowed: false }
    );

    let none = in_param("child", GirType::named("Widget"));
    assert_eq!(
        mapper.map_parameter(&none, None).ffi,
        FfiType::GObject { borrowed: true }
    );
}

#[test]
fn return_position_is_borrowed_regardless_of_transfer() {
    let registry = registry();
    let mapper = TypeMapper::new(&registry, "Gtk");

    let ty = GirType {
        transfer: Transfer::Full,
        ..GirType::named("Widget")
    };
    assert_eq!(
        mapper.map_type(&ty, true, None).ffi,
        FfiType::GObject { borrowed: true }
    );

    let rect = mapper.map_type(&GirType::named("Gdk.Rectangle"), true, None);
    match rect.ffi {
        FfiType::Boxed {
            borrowed,
            inner_type,
            ..
        } => {
            assert!(borrowed, "boxed return values are borrowed");
            assert_eq!(inner_type, "GdkRectangle");
        }
        other => panic!("expected boxed descriptor, got {other:?}"),
    }
}

#[test]
fn out_parameters_wrap_in_refs() {
    let registry = registry();
    let mapper = TypeMapper::new(&registry, "Gtk");

    let out = GirParameter {
        name: "width".to_string(),
        ty: GirType::named("gint"),
        direction: Direction::Out,
        ..Default::default()
    };
    let mapped = mapper.map_parameter(&out, None);
    assert!(
        mapped.ts.starts_with("Ref<"),
        "out param type should be Ref<...>, got {}",
        mapped.ts
    );
    assert!(matches!(mapped.ffi, FfiType::Ref { .. }));
}

#[test]
fn caller_allocated_storage_skips_the_ref_wrapper() {
    let registry = registry();
    let mapper = TypeMapper::new(&registry, "Gtk");

    let out = GirParameter {
        name: "rect".to_string(),
        ty: GirType::named("Gdk.Rectangle"),
        direction: Direction::Out,
        caller_allocates: true,
        ..Default::default()
    };
    let mapped = mapper.map_parameter(&out, None);
    match mapped.ffi {
        FfiType::Boxed { borrowed, .. } => {
            assert!(borrowed, "caller provides storage, no ownership transfer")
        }
        other => panic!("expected unwrapped boxed descriptor, got {other:?}"),
    }
    assert!(
        !mapped.ts.starts_with("Ref<"),
        "caller-allocates must not wrap, got {}",
        mapped.ts
    );
}

#[test]
fn glist_arrays_carry_the_list_marker() {
    let registry = registry();
    let mapper = TypeMapper::new(&registry, "Gtk");

    let list = GirType {
        is_array: true,
        c_type: Some("GList*".to_string()),
        element_type: Some(Box::new(GirType::named("utf8"))),
        ..Default::default()
    };
    match mapper.map_type(&list, true, None).ffi {
        FfiType::Array {
            item_type,
            list_type,
            borrowed,
        } => {
            assert_eq!(list_type, Some(ListKind::GList));
            assert!(borrowed);
            assert_eq!(*item_type, FfiType::String { borrowed: true });
        }
        other => panic!("expected array descriptor, got {other:?}"),
    }

    let slist = GirType {
        is_array: true,
        c_type: Some("GSList*".to_string()),
        element_type: Some(Box::new(GirType::named("utf8"))),
        ..Default::default()
    };
    match mapper.map_type(&slist, false, None).ffi {
        FfiType::Array { list_type, .. } => assert_eq!(list_type, Some(ListKind::GSList)),
        other => panic!("expected array descriptor, got {other:?}"),
    }

    let plain = GirType {
        is_array: true,
        c_type: Some("gint*".to_string()),
        element_type: Some(Box::new(GirType::named("gint"))),
        ..Default::default()
    };
    match mapper.map_type(&plain, false, None).ffi {
        FfiType::Array { list_type, .. } => assert_eq!(list_type, None),
        other => panic!("expected array descriptor, got {other:?}"),
    }
}

#[test]
fn arrays_without_element_info_degrade() {
    let registry = registry();
    let mapper = TypeMapper::new(&registry, "Gtk");

    let bare = GirType {
        is_array: true,
        ..Default::default()
    };
    let mapped = mapper.map_type(&bare, false, None);
    assert_eq!(mapped.ts, "unknown[]");
    match mapped.ffi {
        FfiType::Array { item_type, .. } => assert_eq!(*item_type, FfiType::Undefined),
        other => panic!("expected array descriptor, got {other:?}"),
    }
}

#[test]
fn skipped_classes_degrade_to_unknown() {
    let registry = registry();
    let mut mapper = TypeMapper::new(&registry, "Gtk");
    mapper.set_skipped_classes(["Gtk.Widget".to_string()]);

    let mapped = mapper.map_type(&GirType::named("Widget"), true, None);
    assert_eq!(mapped.ts, "unknown");
    assert_eq!(mapped.ffi, FfiType::GObject { borrowed: true });
}

#[test]
fn unresolved_c_types_collapse_to_pointer_or_void() {
    let registry = registry();
    let mapper = TypeMapper::new(&registry, "Gtk");

    let ptr = GirType {
        name: Some("MysteryStruct".to_string()),
        c_type: Some("MysteryStruct*".to_string()),
        ..Default::default()
    };
    assert_eq!(
        mapper.map_type(&ptr, false, None).ffi,
        FfiType::Int {
            size: 64,
            signed: false
        }
    );

    let untyped = GirType::default();
    assert_eq!(mapper.map_type(&untyped, false, None).ffi, FfiType::Undefined);
}

#[test]
fn recognized_callback_shapes_get_trampolines() {
    let registry = registry();
    let mapper = TypeMapper::new(&registry, "Gtk");

    let async_cb = in_param("callback", GirType::named("Gio.AsyncReadyCallback"));
    match mapper.map_parameter(&async_cb, None).ffi {
        FfiType::Callback {
            trampoline,
            source_type,
            result_type,
            ..
        } => {
            assert_eq!(trampoline, Trampoline::AsyncReady);
            assert_eq!(*source_type.unwrap(), FfiType::GObject { borrowed: true });
            assert_eq!(*result_type.unwrap(), FfiType::GObject { borrowed: true });
        }
        other => panic!("expected asyncReady callback, got {other:?}"),
    }

    let destroy = in_param("notify", GirType::named("GLib.DestroyNotify"));
    match mapper.map_parameter(&destroy, None).ffi {
        FfiType::Callback { trampoline, .. } => assert_eq!(trampoline, Trampoline::Destroy),
        other => panic!("expected destroy callback, got {other:?}"),
    }

    let draw = in_param("draw_func", GirType::named("Gtk.DrawingAreaDrawFunc"));
    match mapper.map_parameter(&draw, None).ffi {
        FfiType::Callback {
            trampoline,
            arg_types,
            ..
        } => {
            assert_eq!(trampoline, Trampoline::DrawFunc);
            let args = arg_types.expect("draw func has a fixed argument shape");
            assert_eq!(args.len(), 4);
            assert_eq!(args[0], FfiType::GObject { borrowed: true });
            match &args[1] {
                FfiType::Boxed {
                    inner_type,
                    get_type_fn,
                    ..
                } => {
                    assert_eq!(inner_type, "CairoContext");
                    assert_eq!(
                        get_type_fn.as_deref(),
                        Some("cairo_gobject_context_get_type")
                    );
                }
                other => panic!("expected boxed cairo context, got {other:?}"),
            }
            assert_eq!(
                args[2],
                FfiType::Int {
                    size: 32,
                    signed: true
                }
            );
        }
        other => panic!("expected drawFunc callback, got {other:?}"),
    }
}

#[test]
fn unmodeled_registered_callbacks_become_untyped() {
    let registry = registry();
    let mapper = TypeMapper::new(&registry, "Gtk");

    let param = in_param("callback", GirType::named("TickCallback"));
    let mapped = mapper.map_parameter(&param, None);
    assert_eq!(mapped.ts, "(...args: unknown[]) => unknown");
    match mapped.ffi {
        FfiType::Callback {
            trampoline,
            ref arg_types,
            ref return_type,
            ..
        } => {
            assert_eq!(trampoline, Trampoline::Closure);
            assert!(arg_types.is_none(), "untyped callbacks carry no schema");
            assert!(return_type.is_none());
        }
        other => panic!("expected untyped callback, got {other:?}"),
    }
    assert_eq!(mapped.ffi.to_ts(), "{ type: \"callback\" }");
}

#[test]
fn usage_tracking_is_an_explicit_output() {
    let registry = registry();
    let mapper = TypeMapper::new(&registry, "Gtk");

    let mut usage = girt::mapper::TypeUsage::default();
    mapper.map_type(&GirType::named("Gdk.Rectangle"), false, Some(&mut usage));
    assert_eq!(
        usage.external_types.get("Rectangle").map(String::as_str),
        Some("Gdk")
    );
    assert_eq!(usage.external_namespaces().into_iter().collect::<Vec<_>>(), ["Gdk"]);

    // Suppressed side computation: same mapping, no bookkeeping channel.
    let mapped = mapper.map_type(&GirType::named("Gdk.Rectangle"), false, None);
    assert_eq!(mapped.ts, "Gdk.Rectangle");
}
