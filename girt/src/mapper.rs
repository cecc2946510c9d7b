//! The type mapper — GIR type references → TypeScript types + FFI descriptors.
//!
//! One mapper exists per namespace generation pass, backed by the complete
//! cross-namespace [`TypeRegistry`]. Mapping never fails: every unresolved or
//! partially-specified type degrades to a conservative representation (opaque
//! pointer, `unknown`, or an untyped callback) so that a single unmodeled
//! type cannot abort a namespace's generation.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::ffi::{FfiType, ListKind, POINTER_TYPE, Trampoline};
use crate::model::{
    Direction, GirParameter, GirType, RegisteredType, Transfer, TypeKind, TypeRegistry,
};
use crate::naming;

/// Result of mapping one GIR type reference.
///
/// Recomputed per call site, never persisted. `ffi` fully determines the
/// marshaling strategy; `ts` is purely advisory for the output type system.
#[derive(Debug, Clone)]
pub struct MappedType {
    pub ts: String,
    pub ffi: FfiType,
    /// Qualified registry key of the resolved type, when one resolved.
    pub resolved: Option<String>,
    pub kind: Option<TypeKind>,
    pub nullable: bool,
}

impl MappedType {
    fn new(ts: &str, ffi: FfiType) -> Self {
        MappedType {
            ts: ts.to_string(),
            ffi,
            resolved: None,
            kind: None,
            nullable: false,
        }
    }
}

/// Accumulator for "which types did a mapping pass touch" — consumed by the
/// generators to synthesize imports. Threaded explicitly through mapping
/// calls; passing `None` suppresses tracking for side computations.
#[derive(Debug, Default)]
pub struct TypeUsage {
    /// Transformed names of same-namespace enums referenced.
    pub enums: BTreeSet<String>,
    /// Transformed names of same-namespace records referenced.
    pub records: BTreeSet<String>,
    /// Transformed name → owning namespace, for cross-namespace references.
    pub external_types: BTreeMap<String, String>,
}

impl TypeUsage {
    pub fn merge(&mut self, other: TypeUsage) {
        self.enums.extend(other.enums);
        self.records.extend(other.records);
        self.external_types.extend(other.external_types);
    }

    /// Namespaces that need an import statement.
    pub fn external_namespaces(&self) -> BTreeSet<&str> {
        self.external_types.values().map(String::as_str).collect()
    }
}

/// A record registered directly on the mapper (same-pass types that are not
/// routed through the registry).
#[derive(Debug, Clone)]
pub struct LocalRecord {
    pub ts_name: String,
    pub glib_type_name: String,
    pub lib: Option<String>,
    pub get_type_fn: Option<String>,
}

/// Per-namespace type translation engine.
pub struct TypeMapper<'a> {
    registry: &'a TypeRegistry,
    namespace: String,
    /// Same-pass enum table: GIR name → transformed name.
    enums: HashMap<String, String>,
    /// Same-pass record table.
    records: HashMap<String, LocalRecord>,
    /// Qualified names of classes excluded from generation; references to
    /// them degrade to `unknown` instead of dangling.
    skipped_classes: HashSet<String>,
}

impl<'a> TypeMapper<'a> {
    pub fn new(registry: &'a TypeRegistry, namespace: &str) -> Self {
        TypeMapper {
            registry,
            namespace: namespace.to_string(),
            enums: HashMap::new(),
            records: HashMap::new(),
            skipped_classes: HashSet::new(),
        }
    }

    pub fn register_enum(&mut self, gir_name: &str, ts_name: &str) {
        self.enums
            .insert(gir_name.to_string(), ts_name.to_string());
    }

    pub fn register_record(&mut self, gir_name: &str, record: LocalRecord) {
        self.records.insert(gir_name.to_string(), record);
    }

    pub fn set_skipped_classes(&mut self, qualified_names: impl IntoIterator<Item = String>) {
        self.skipped_classes = qualified_names.into_iter().collect();
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Qualify an unqualified name with the current namespace.
    fn qualify(&self, name: &str) -> String {
        if name.contains('.') {
            name.to_string()
        } else {
            format!("{}.{}", self.namespace, name)
        }
    }

    // -----------------------------------------------------------------------
    // mapType
    // -----------------------------------------------------------------------

    /// Map a GIR type reference in return (`is_return`) or argument position.
    pub fn map_type(
        &self,
        ty: &GirType,
        is_return: bool,
        mut usage: Option<&mut TypeUsage>,
    ) -> MappedType {
        if ty.is_array {
            return self.map_array(ty, is_return, usage);
        }

        let Some(name) = ty.name.as_deref() else {
            return self.map_c_type(ty.c_type.as_deref());
        };

        if name == "utf8" || name == "filename" {
            let mut mapped = MappedType::new(
                "string",
                FfiType::String {
                    borrowed: ty.transfer == Transfer::None,
                },
            );
            mapped.nullable = ty.nullable;
            return mapped;
        }

        if let Some(mapped) = basic_type(name) {
            return mapped;
        }

        // GVariant is a fundamental type with its own marshaling strategy.
        if self.qualify(name) == "GLib.Variant" {
            let mut mapped = MappedType::new(
                "unknown",
                FfiType::GVariant {
                    borrowed: is_return,
                },
            );
            mapped.nullable = ty.nullable;
            return mapped;
        }

        // Resolution ladder: current-namespace registry lookup, then the
        // same-pass enum/record tables, then qualified lookup, then the
        // C-type fallback.
        if !name.contains('.') {
            if let Some(rt) = self.registry.resolve(&format!("{}.{}", self.namespace, name)) {
                return self.map_registered(rt, ty, is_return, usage);
            }
            if let Some(ts_name) = self.enums.get(name) {
                if let Some(usage) = usage.as_deref_mut() {
                    usage.enums.insert(ts_name.clone());
                }
                let mut mapped = MappedType::new(
                    ts_name,
                    FfiType::Int {
                        size: 32,
                        signed: true,
                    },
                );
                mapped.kind = Some(TypeKind::Enum);
                return mapped;
            }
            if let Some(record) = self.records.get(name) {
                if let Some(usage) = usage.as_deref_mut() {
                    usage.records.insert(record.ts_name.clone());
                }
                let mut mapped = MappedType::new(
                    &record.ts_name,
                    FfiType::Boxed {
                        borrowed: is_return,
                        inner_type: record.glib_type_name.clone(),
                        lib: record.lib.clone(),
                        get_type_fn: record.get_type_fn.clone(),
                    },
                );
                mapped.kind = Some(TypeKind::Record);
                mapped.nullable = ty.nullable;
                return mapped;
            }
        } else if let Some(rt) = self.registry.resolve(name) {
            return self.map_registered(rt, ty, is_return, usage);
        }

        self.map_c_type(ty.c_type.as_deref())
    }

    fn map_array(
        &self,
        ty: &GirType,
        is_return: bool,
        mut usage: Option<&mut TypeUsage>,
    ) -> MappedType {
        let list_type = ty.c_type.as_deref().and_then(|ct| {
            if ct.contains("GSList") {
                Some(ListKind::GSList)
            } else if ct.contains("GList") {
                Some(ListKind::GList)
            } else {
                None
            }
        });

        // No element info: degraded but non-fatal.
        let Some(element) = ty.element_type.as_deref() else {
            return MappedType::new(
                "unknown[]",
                FfiType::Array {
                    item_type: Box::new(FfiType::Undefined),
                    list_type,
                    borrowed: is_return,
                },
            );
        };

        let item = self.map_type(element, is_return, usage.as_deref_mut());
        let mut mapped = MappedType::new(
            &format!("{}[]", item.ts),
            FfiType::Array {
                item_type: Box::new(item.ffi),
                list_type,
                borrowed: is_return,
            },
        );
        mapped.nullable = ty.nullable;
        mapped
    }

    fn map_registered(
        &self,
        rt: &RegisteredType,
        ty: &GirType,
        is_return: bool,
        mut usage: Option<&mut TypeUsage>,
    ) -> MappedType {
        let external = rt.namespace != self.namespace;
        let ts_name = if external {
            format!("{}.{}", rt.namespace, rt.transformed_name)
        } else {
            rt.transformed_name.clone()
        };
        let track_external = |usage: &mut Option<&mut TypeUsage>| {
            if external && let Some(usage) = usage.as_deref_mut() {
                usage
                    .external_types
                    .insert(rt.transformed_name.clone(), rt.namespace.clone());
            }
        };

        match rt.kind {
            TypeKind::Enum => {
                track_external(&mut usage);
                if !external && let Some(usage) = usage.as_deref_mut() {
                    usage.enums.insert(rt.transformed_name.clone());
                }
                let mut mapped = MappedType::new(
                    &ts_name,
                    FfiType::Int {
                        size: 32,
                        signed: true,
                    },
                );
                mapped.resolved = Some(rt.key());
                mapped.kind = Some(TypeKind::Enum);
                mapped
            }
            TypeKind::Record => {
                let glib_type_name = rt
                    .glib_type_name
                    .clone()
                    .unwrap_or_else(|| rt.name.clone());
                if glib_type_name == "GVariant" {
                    let mut mapped = MappedType::new(
                        &ts_name,
                        FfiType::GVariant {
                            borrowed: is_return,
                        },
                    );
                    mapped.resolved = Some(rt.key());
                    mapped.kind = Some(TypeKind::Record);
                    return mapped;
                }
                track_external(&mut usage);
                if !external && let Some(usage) = usage.as_deref_mut() {
                    usage.records.insert(rt.transformed_name.clone());
                }
                let get_type_fn = rt
                    .glib_get_type
                    .clone()
                    .or_else(|| Some(naming::get_type_fn(&glib_type_name)));
                let mut mapped = MappedType::new(
                    &ts_name,
                    FfiType::Boxed {
                        borrowed: is_return,
                        inner_type: glib_type_name,
                        lib: rt.shared_library.clone(),
                        get_type_fn,
                    },
                );
                mapped.resolved = Some(rt.key());
                mapped.kind = Some(TypeKind::Record);
                mapped.nullable = ty.nullable;
                mapped
            }
            // Callbacks are not marshaled as rich values in return/field
            // position — only as call arguments via explicit trampoline
            // descriptors built in map_parameter.
            TypeKind::Callback => {
                let mut mapped = MappedType::new("bigint", POINTER_TYPE);
                mapped.resolved = Some(rt.key());
                mapped.kind = Some(TypeKind::Callback);
                mapped
            }
            TypeKind::Class | TypeKind::Interface => {
                if self.skipped_classes.contains(&rt.key()) {
                    // Referencing a type that will not exist in the output
                    // would dangle; degrade instead.
                    let mut mapped = MappedType::new(
                        "unknown",
                        FfiType::GObject {
                            borrowed: is_return,
                        },
                    );
                    mapped.kind = Some(rt.kind);
                    return mapped;
                }
                track_external(&mut usage);
                let mut mapped = MappedType::new(
                    &ts_name,
                    FfiType::GObject {
                        borrowed: is_return,
                    },
                );
                mapped.resolved = Some(rt.key());
                mapped.kind = Some(rt.kind);
                mapped.nullable = ty.nullable;
                mapped
            }
        }
    }

    /// Last-resort fallback: collapse an unresolved C type to `void` or the
    /// opaque unsigned 64-bit pointer representation.
    pub fn map_c_type(&self, c_type: Option<&str>) -> MappedType {
        let Some(c_type) = c_type else {
            return MappedType::new("void", FfiType::Undefined);
        };
        if c_type.ends_with('*') {
            return MappedType::new("bigint", POINTER_TYPE);
        }
        let stripped = c_type
            .trim_start_matches("const ")
            .trim_start_matches("volatile ");
        match stripped {
            "void" => MappedType::new("void", FfiType::Undefined),
            "gboolean" => MappedType::new("boolean", FfiType::Boolean),
            "char" | "signed char" => int_type(8, true),
            "unsigned char" => int_type(8, false),
            "short" | "short int" => int_type(16, true),
            "unsigned short" => int_type(16, false),
            "int" => int_type(32, true),
            "unsigned" | "unsigned int" => int_type(32, false),
            // LP64: C long is 64-bit on the platforms this targets.
            "long" | "long int" | "long long" | "ssize_t" => int_type(64, true),
            "unsigned long" | "unsigned long long" | "size_t" => int_type(64, false),
            "float" => MappedType::new("number", FfiType::Float { size: 32 }),
            "double" | "long double" => MappedType::new("number", FfiType::Float { size: 64 }),
            // Otherwise unrecognized — opaque pointer-sized value.
            _ => MappedType::new("bigint", POINTER_TYPE),
        }
    }

    // -----------------------------------------------------------------------
    // mapParameter
    // -----------------------------------------------------------------------

    /// Map a parameter, applying direction wrapping, caller-allocates
    /// storage rules, ownership-transfer adjustment, and callback trampoline
    /// modeling.
    pub fn map_parameter(
        &self,
        param: &GirParameter,
        usage: Option<&mut TypeUsage>,
    ) -> MappedType {
        if param.direction == Direction::In
            && let Some(name) = param.ty.name.as_deref()
            && let Some(mapped) = self.map_callback_shape(name)
        {
            return mapped;
        }

        let mut inner = self.map_type(&param.ty, false, usage);
        inner.nullable = inner.nullable || param.nullable || param.optional;

        if param.direction != Direction::In {
            // Caller-provided storage: no ownership transfer occurs, and no
            // by-reference wrapper is needed.
            if param.caller_allocates
                && matches!(inner.ffi, FfiType::Boxed { .. } | FfiType::GObject { .. })
            {
                inner.ffi.set_borrowed(true);
                return inner;
            }
            return MappedType {
                ts: format!("Ref<{}>", inner.ts),
                ffi: FfiType::Ref {
                    inner_type: Box::new(inner.ffi),
                },
                resolved: inner.resolved,
                kind: inner.kind,
                nullable: false,
            };
        }

        // Ownership-transfer adjustment for `in` parameters: transfer-full
        // hands the value to the callee, anything else leaves it with the
        // caller.
        if inner.ffi.is_ownable() {
            inner.ffi.set_borrowed(param.ty.transfer != Transfer::Full);
        }

        inner
    }

    /// Hand-modeled trampoline descriptors for the recognized callback
    /// shapes. Everything else funnels through [`untyped_callback`] at the
    /// call sites that ask for it.
    ///
    /// [`untyped_callback`]: FfiType::untyped_callback
    pub fn map_callback_shape(&self, name: &str) -> Option<MappedType> {
        match self.qualify(name).as_str() {
            "Gio.AsyncReadyCallback" => Some(MappedType::new(
                "(source: unknown, result: unknown) => void",
                FfiType::Callback {
                    trampoline: Trampoline::AsyncReady,
                    arg_types: None,
                    return_type: None,
                    source_type: Some(Box::new(FfiType::GObject { borrowed: true })),
                    result_type: Some(Box::new(FfiType::GObject { borrowed: true })),
                },
            )),
            "GLib.DestroyNotify" => Some(MappedType::new(
                "() => void",
                FfiType::Callback {
                    trampoline: Trampoline::Destroy,
                    arg_types: None,
                    return_type: None,
                    source_type: None,
                    result_type: None,
                },
            )),
            // The GIR schema alone cannot express this trampoline's native
            // argument shape; the cairo context is a GObject-boxed value
            // reached through an explicit get_type symbol.
            "Gtk.DrawingAreaDrawFunc" => Some(MappedType::new(
                "(self: unknown, cr: unknown, width: number, height: number) => void",
                FfiType::Callback {
                    trampoline: Trampoline::DrawFunc,
                    arg_types: Some(vec![
                        FfiType::GObject { borrowed: true },
                        FfiType::Boxed {
                            borrowed: true,
                            inner_type: "CairoContext".to_string(),
                            lib: Some("libcairo-gobject.so.2".to_string()),
                            get_type_fn: Some("cairo_gobject_context_get_type".to_string()),
                        },
                        FfiType::Int {
                            size: 32,
                            signed: true,
                        },
                        FfiType::Int {
                            size: 32,
                            signed: true,
                        },
                    ]),
                    return_type: None,
                    source_type: None,
                    result_type: None,
                },
            )),
            qualified => {
                let is_closure_record = qualified == "GObject.Closure";
                let is_registered_callback = self
                    .registry
                    .resolve_in_namespace(name, &self.namespace)
                    .is_some_and(|rt| rt.kind == TypeKind::Callback);
                if is_closure_record || is_registered_callback {
                    // Unmodeled callback shape: the burden of correct
                    // marshaling is deferred entirely to the runtime
                    // trampoline dispatcher.
                    Some(MappedType::new(
                        "(...args: unknown[]) => unknown",
                        FfiType::untyped_callback(),
                    ))
                } else {
                    None
                }
            }
        }
    }

    /// Whether a parameter is a callback the generators cannot marshal —
    /// any callback type outside the recognized trampoline shapes.
    pub fn is_unsupported_callback(&self, param: &GirParameter) -> bool {
        let Some(name) = param.ty.name.as_deref() else {
            return false;
        };
        match self.qualify(name).as_str() {
            "Gio.AsyncReadyCallback" | "GLib.DestroyNotify" | "Gtk.DrawingAreaDrawFunc" => false,
            _ => self
                .registry
                .resolve_in_namespace(name, &self.namespace)
                .is_some_and(|rt| rt.kind == TypeKind::Callback),
        }
    }

    /// Whether a parameter is a GIO async-ready callback.
    pub fn is_async_ready_callback(&self, param: &GirParameter) -> bool {
        param
            .ty
            .name
            .as_deref()
            .is_some_and(|name| self.qualify(name) == "Gio.AsyncReadyCallback")
    }
}

fn int_type(size: u8, signed: bool) -> MappedType {
    MappedType::new("number", FfiType::Int { size, signed })
}

/// The fixed scalar table. Every entry pins an exact bit-width and
/// signedness — this is the ABI contract with the native call layer.
fn basic_type(name: &str) -> Option<MappedType> {
    let mapped = match name {
        "gboolean" => MappedType::new("boolean", FfiType::Boolean),
        "none" | "void" => MappedType::new("void", FfiType::Undefined),

        "gint8" | "int8" | "gchar" | "char" => int_type(8, true),
        "guint8" | "uint8" | "guchar" => int_type(8, false),

        "gint16" | "int16" | "gshort" => int_type(16, true),
        "guint16" | "uint16" | "gushort" | "gunichar2" => int_type(16, false),

        "gint" | "gint32" | "int" | "int32" => int_type(32, true),
        "guint" | "guint32" | "uint" | "uint32" | "unsigned" | "gunichar" => int_type(32, false),

        "gint64" | "int64" | "glong" | "long" | "gssize" | "ssize_t" | "goffset" | "gintptr"
        | "time_t" => int_type(64, true),
        "guint64" | "uint64" | "gulong" | "ulong" | "gsize" | "size_t" | "guintptr" | "dev_t" => {
            int_type(64, false)
        }

        "gfloat" | "float" => MappedType::new("number", FfiType::Float { size: 32 }),
        "gdouble" | "double" | "long double" => {
            MappedType::new("number", FfiType::Float { size: 64 })
        }

        "gpointer" | "gconstpointer" => MappedType::new("bigint", POINTER_TYPE),

        "GType" | "GLib.Type" => int_type(64, false),
        "GQuark" | "GLib.Quark" => int_type(32, false),
        "TimeSpan" | "GLib.TimeSpan" => int_type(64, true),
        "DateDay" | "GLib.DateDay" => int_type(8, false),
        "DateYear" | "GLib.DateYear" => int_type(16, false),
        "Time" | "GLib.Time" => int_type(32, true),

        "pid_t" => int_type(32, true),
        "uid_t" | "gid_t" | "socklen_t" => int_type(32, false),

        _ => return None,
    };
    Some(mapped)
}
