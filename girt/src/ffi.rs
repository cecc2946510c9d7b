//! FFI type descriptors — the wire protocol between generated code and the
//! native call layer.
//!
//! Every native invocation is described as
//! `call(library, symbol, args: {type, value}[], returnType)` where each
//! `type` is one of these descriptors, rendered as a TypeScript object
//! literal. A descriptor must be self-sufficient to marshal a value without
//! further registry lookups at call time; registry lookups happen only at
//! generation time.

use std::fmt::Write as _;

/// Native linked-list flavor for array descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    GList,
    GSList,
}

impl ListKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ListKind::GList => "glist",
            ListKind::GSList => "gslist",
        }
    }
}

/// Which C trampoline routes a callback invocation back into managed code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trampoline {
    /// Standard GLib closure (signal handlers).
    Closure,
    /// GAsyncReadyCallback for async operations.
    AsyncReady,
    /// GDestroyNotify for cleanup callbacks.
    Destroy,
    /// GtkDrawingAreaDrawFunc for drawing callbacks.
    DrawFunc,
}

impl Trampoline {
    pub fn as_str(self) -> &'static str {
        match self {
            Trampoline::Closure => "closure",
            Trampoline::AsyncReady => "asyncReady",
            Trampoline::Destroy => "destroy",
            Trampoline::DrawFunc => "drawFunc",
        }
    }
}

/// A type descriptor for values crossing the FFI boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum FfiType {
    /// Fixed-width integer. `size` is 8, 16, 32, or 64 — getting width or
    /// signedness wrong silently corrupts values across the boundary.
    Int { size: u8, signed: bool },
    /// Floating point, 32 or 64 bits wide.
    Float { size: u8 },
    /// NUL-terminated string. `borrowed` means the native side retains
    /// ownership and the binding must not free it.
    String { borrowed: bool },
    /// GLib gboolean.
    Boolean,
    /// Void / no value.
    Undefined,
    /// Null pointer.
    Null,
    /// Reference-counted native object.
    GObject { borrowed: bool },
    /// Reference-counted GVariant value.
    GVariant { borrowed: bool },
    /// Value/struct type dispatched dynamically through its GLib type.
    Boxed {
        borrowed: bool,
        inner_type: String,
        lib: Option<String>,
        get_type_fn: Option<String>,
    },
    /// C array or native linked list of `item_type`.
    Array {
        item_type: Box<FfiType>,
        list_type: Option<ListKind>,
        borrowed: bool,
    },
    /// Out / in-out parameter wrapper.
    Ref { inner_type: Box<FfiType> },
    /// Callback function. `arg_types`/`return_type` describe the trampoline
    /// signature when known; an untyped callback carries none of them and
    /// defers marshaling to the runtime dispatcher.
    Callback {
        trampoline: Trampoline,
        arg_types: Option<Vec<FfiType>>,
        return_type: Option<Box<FfiType>>,
        source_type: Option<Box<FfiType>>,
        result_type: Option<Box<FfiType>>,
    },
}

/// Opaque-pointer representation for unresolved C types.
pub const POINTER_TYPE: FfiType = FfiType::Int {
    size: 64,
    signed: false,
};

impl FfiType {
    /// The untyped callback descriptor — no argument schema, closure
    /// trampoline, marshaling deferred entirely to the runtime dispatcher.
    pub fn untyped_callback() -> FfiType {
        FfiType::Callback {
            trampoline: Trampoline::Closure,
            arg_types: None,
            return_type: None,
            source_type: None,
            result_type: None,
        }
    }

    /// Whether this descriptor carries a `borrowed` ownership flag.
    pub fn is_ownable(&self) -> bool {
        matches!(
            self,
            FfiType::GObject { .. } | FfiType::Boxed { .. } | FfiType::GVariant { .. }
        )
    }

    /// Force the `borrowed` flag on descriptors that carry one; no-op otherwise.
    pub fn set_borrowed(&mut self, value: bool) {
        match self {
            FfiType::GObject { borrowed }
            | FfiType::GVariant { borrowed }
            | FfiType::String { borrowed }
            | FfiType::Boxed { borrowed, .. }
            | FfiType::Array { borrowed, .. } => *borrowed = value,
            _ => {}
        }
    }

    /// Render this descriptor as a TypeScript object literal.
    pub fn to_ts(&self) -> String {
        let mut out = String::new();
        self.write_ts(&mut out);
        out
    }

    fn write_ts(&self, out: &mut String) {
        match self {
            FfiType::Int { size, signed } => {
                let _ = write!(out, "{{ type: \"int\", size: {size}, signed: {signed} }}");
            }
            FfiType::Float { size } => {
                let _ = write!(out, "{{ type: \"float\", size: {size} }}");
            }
            FfiType::String { borrowed } => {
                let _ = write!(out, "{{ type: \"string\", borrowed: {borrowed} }}");
            }
            FfiType::Boolean => out.push_str("{ type: \"boolean\" }"),
            FfiType::Undefined => out.push_str("{ type: \"undefined\" }"),
            FfiType::Null => out.push_str("{ type: \"null\" }"),
            FfiType::GObject { borrowed } => {
                let _ = write!(out, "{{ type: \"gobject\", borrowed: {borrowed} }}");
            }
            FfiType::GVariant { borrowed } => {
                let _ = write!(out, "{{ type: \"gvariant\", borrowed: {borrowed} }}");
            }
            FfiType::Boxed {
                borrowed,
                inner_type,
                lib,
                get_type_fn,
            } => {
                let _ = write!(
                    out,
                    "{{ type: \"boxed\", borrowed: {borrowed}, innerType: \"{inner_type}\""
                );
                if let Some(lib) = lib {
                    let _ = write!(out, ", lib: \"{lib}\"");
                }
                if let Some(get_type_fn) = get_type_fn {
                    let _ = write!(out, ", getTypeFn: \"{get_type_fn}\"");
                }
                out.push_str(" }");
            }
            FfiType::Array {
                item_type,
                list_type,
                borrowed,
            } => {
                out.push_str("{ type: \"array\", itemType: ");
                item_type.write_ts(out);
                if let Some(list) = list_type {
                    let _ = write!(out, ", listType: \"{}\"", list.as_str());
                }
                let _ = write!(out, ", borrowed: {borrowed} }}");
            }
            FfiType::Ref { inner_type } => {
                out.push_str("{ type: \"ref\", innerType: ");
                inner_type.write_ts(out);
                out.push_str(" }");
            }
            FfiType::Callback {
                trampoline,
                arg_types,
                return_type,
                source_type,
                result_type,
            } => {
                out.push_str("{ type: \"callback\"");
                if *trampoline != Trampoline::Closure
                    || arg_types.is_some()
                    || return_type.is_some()
                {
                    let _ = write!(out, ", trampoline: \"{}\"", trampoline.as_str());
                }
                if let Some(args) = arg_types {
                    out.push_str(", argTypes: [");
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        arg.write_ts(out);
                    }
                    out.push(']');
                }
                if let Some(ret) = return_type {
                    out.push_str(", returnType: ");
                    ret.write_ts(out);
                }
                if let Some(source) = source_type {
                    out.push_str(", sourceType: ");
                    source.write_ts(out);
                }
                if let Some(result) = result_type {
                    out.push_str(", resultType: ");
                    result.write_ts(out);
                }
                out.push_str(" }");
            }
        }
    }
}
