//! Scalar-table fidelity: every basic-type entry must map to its exact
//! width/signedness descriptor — a wrong entry silently corrupts values
//! across the FFI boundary.

use girt::ffi::FfiType;
use girt::mapper::{MappedType, TypeMapper};
use girt::model::{GirType, Transfer, TypeRegistry};

fn map(name: &str) -> MappedType {
    let registry = TypeRegistry::default();
    let mapper = TypeMapper::new(&registry, "Gtk");
    mapper.map_type(&GirType::named(name), false, None)
}

#[test]
fn unsigned_64_bit_aliases() {
    for name in ["guint64", "uint64", "gulong", "gsize", "size_t", "guintptr"] {
        assert_eq!(
            map(name).ffi,
            FfiType::Int {
                size: 64,
                signed: false
            },
            "wrong descriptor for {name}"
        );
    }
}

#[test]
fn signed_64_bit_aliases() {
    for name in ["gint64", "glong", "gssize", "ssize_t", "goffset", "gintptr"] {
        assert_eq!(
            map(name).ffi,
            FfiType::Int {
                size: 64,
                signed: true
            },
            "wrong descriptor for {name}"
        );
    }
}

#[test]
fn thirty_two_bit_aliases() {
    for name in ["gint", "gint32", "int", "int32"] {
        assert_eq!(
            map(name).ffi,
            FfiType::Int {
                size: 32,
                signed: true
            },
            "wrong descriptor for {name}"
        );
    }
    for name in ["guint", "guint32", "uint32", "gunichar"] {
        assert_eq!(
            map(name).ffi,
            FfiType::Int {
                size: 32,
                signed: false
            },
            "wrong descriptor for {name}"
        );
    }
}

#[test]
fn small_integer_aliases() {
    assert_eq!(
        map("gint8").ffi,
        FfiType::Int {
            size: 8,
            signed: true
        }
    );
    assert_eq!(
        map("guint8").ffi,
        FfiType::Int {
            size: 8,
            signed: false
        }
    );
    assert_eq!(
        map("gint16").ffi,
        FfiType::Int {
            size: 16,
            signed: true
        }
    );
    assert_eq!(
        map("guint16").ffi,
        FfiType::Int {
            size: 16,
            signed: false
        }
    );
}

#[test]
fn floating_types() {
    assert_eq!(map("gfloat").ffi, FfiType::Float { size: 32 });
    assert_eq!(map("gdouble").ffi, FfiType::Float { size: 64 });
    assert_eq!(map("double").ffi, FfiType::Float { size: 64 });
    assert_eq!(map("gfloat").ts, "number");
}

#[test]
fn boolean_and_void() {
    assert_eq!(map("gboolean").ffi, FfiType::Boolean);
    assert_eq!(map("gboolean").ts, "boolean");
    assert_eq!(map("none").ffi, FfiType::Undefined);
    assert_eq!(map("none").ts, "void");
}

#[test]
fn glib_typedefs() {
    assert_eq!(
        map("GType").ffi,
        FfiType::Int {
            size: 64,
            signed: false
        }
    );
    assert_eq!(
        map("GQuark").ffi,
        FfiType::Int {
            size: 32,
            signed: false
        }
    );
    assert_eq!(
        map("GLib.TimeSpan").ffi,
        FfiType::Int {
            size: 64,
            signed: true
        }
    );
    assert_eq!(
        map("GLib.DateDay").ffi,
        FfiType::Int {
            size: 8,
            signed: false
        }
    );
    assert_eq!(
        map("GLib.DateYear").ffi,
        FfiType::Int {
            size: 16,
            signed: false
        }
    );
}

#[test]
fn posix_aliases() {
    assert_eq!(
        map("pid_t").ffi,
        FfiType::Int {
            size: 32,
            signed: true
        }
    );
    assert_eq!(
        map("uid_t").ffi,
        FfiType::Int {
            size: 32,
            signed: false
        }
    );
    assert_eq!(
        map("time_t").ffi,
        FfiType::Int {
            size: 64,
            signed: true
        }
    );
}

#[test]
fn pointer_sized_opaques() {
    for name in ["gpointer", "gconstpointer"] {
        assert_eq!(
            map(name).ffi,
            FfiType::Int {
                size: 64,
                signed: false
            },
            "{name} should be the opaque pointer representation"
        );
    }
}

#[test]
fn strings_borrow_by_transfer() {
    let registry = TypeRegistry::default();
    let mapper = TypeMapper::new(&registry, "Gtk");

    let borrowed = GirType {
        transfer: Transfer::None,
        ..GirType::named("utf8")
    };
    assert_eq!(
        mapper.map_type(&borrowed, false, None).ffi,
        FfiType::String { borrowed: true }
    );

    let owned = GirType {
        transfer: Transfer::Full,
        ..GirType::named("filename")
    };
    let mapped = mapper.map_type(&owned, false, None);
    assert_eq!(mapped.ffi, FfiType::String { borrowed: false });
    assert_eq!(mapped.ts, "string");
}

#[test]
fn gvariant_is_its_own_strategy() {
    let mapped = map("GLib.Variant");
    assert_eq!(mapped.ffi, FfiType::GVariant { borrowed: false });

    let registry = TypeRegistry::default();
    let mapper = TypeMapper::new(&registry, "GLib");
    let in_glib = mapper.map_type(&GirType::named("Variant"), true, None);
    assert_eq!(in_glib.ffi, FfiType::GVariant { borrowed: true });
}
