//! Intermediate model types — the bridge between GIR extraction and binding emission.
//!
//! These types are XML-independent and output-independent, making both the
//! extractor and the generators easier to test in isolation.

use std::collections::HashMap;

use crate::naming;

/// A fully extracted namespace ready for binding generation.
#[derive(Debug, Default)]
pub struct GirNamespace {
    pub name: String,
    pub version: String,
    /// First entry of the `shared-library` attribute (e.g. `libgtk-4.so.1`).
    pub shared_library: Option<String>,
    pub classes: Vec<GirClass>,
    pub interfaces: Vec<GirInterface>,
    pub records: Vec<GirRecord>,
    pub enumerations: Vec<GirEnumeration>,
    pub bitfields: Vec<GirEnumeration>,
    pub callbacks: Vec<GirCallback>,
    pub constants: Vec<GirConstant>,
    pub functions: Vec<GirFunction>,
}

/// A GObject class.
#[derive(Debug, Default)]
pub struct GirClass {
    pub name: String,
    /// Parent class name, possibly `Ns.Name`-qualified.
    pub parent: Option<String>,
    /// Implemented interface names, possibly qualified.
    pub implements: Vec<String>,
    pub abstract_: bool,
    pub glib_type_name: Option<String>,
    pub glib_get_type: Option<String>,
    pub constructors: Vec<GirFunction>,
    pub methods: Vec<GirFunction>,
    pub functions: Vec<GirFunction>,
    pub properties: Vec<GirProperty>,
    pub signals: Vec<GirSignal>,
}

/// A GObject interface.
#[derive(Debug, Default)]
pub struct GirInterface {
    pub name: String,
    pub prerequisites: Vec<String>,
    pub glib_type_name: Option<String>,
    pub glib_get_type: Option<String>,
    pub methods: Vec<GirFunction>,
    pub properties: Vec<GirProperty>,
    pub signals: Vec<GirSignal>,
}

/// A plain C struct or boxed type.
#[derive(Debug, Default)]
pub struct GirRecord {
    pub name: String,
    pub glib_type_name: Option<String>,
    pub glib_get_type: Option<String>,
    /// `disguised="1"` — the struct layout is hidden.
    pub disguised: bool,
    /// `opaque="1"` — pointer-only type with no boxing support.
    pub opaque: bool,
}

/// An enumeration or bitfield.
#[derive(Debug, Default)]
pub struct GirEnumeration {
    pub name: String,
    pub members: Vec<GirEnumMember>,
}

/// A single enumeration member.
#[derive(Debug, Default)]
pub struct GirEnumMember {
    pub name: String,
    pub value: i64,
}

/// A named callback type.
#[derive(Debug, Default)]
pub struct GirCallback {
    pub name: String,
    pub parameters: Vec<GirParameter>,
    pub return_type: Option<GirType>,
}

/// A namespace-level constant.
#[derive(Debug, Default)]
pub struct GirConstant {
    pub name: String,
    pub value: String,
    pub ty: GirType,
}

/// A constructor, method, or static function.
#[derive(Debug, Default)]
pub struct GirFunction {
    pub name: String,
    pub c_identifier: Option<String>,
    pub parameters: Vec<GirParameter>,
    pub return_type: Option<GirType>,
    pub throws: bool,
    /// Has a `<varargs/>` parameter — uncallable through the FFI layer.
    pub variadic: bool,
}

/// A signal declaration.
#[derive(Debug, Default)]
pub struct GirSignal {
    pub name: String,
    pub parameters: Vec<GirParameter>,
    pub return_type: Option<GirType>,
}

/// A GObject property.
#[derive(Debug, Default)]
pub struct GirProperty {
    pub name: String,
    pub ty: GirType,
    pub readable: bool,
    pub writable: bool,
    pub construct_only: bool,
    pub getter: Option<String>,
    pub setter: Option<String>,
}

/// Ownership-transfer annotation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Transfer {
    #[default]
    None,
    Container,
    Full,
}

/// Parameter direction.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    #[default]
    In,
    Out,
    InOut,
}

/// A type reference as it appears in GIR data.
#[derive(Debug, Default, Clone)]
pub struct GirType {
    /// Type name, possibly `Ns.Name`-qualified. `None` for untyped nodes.
    pub name: Option<String>,
    pub c_type: Option<String>,
    pub is_array: bool,
    pub element_type: Option<Box<GirType>>,
    pub transfer: Transfer,
    pub nullable: bool,
}

impl GirType {
    /// Shorthand for a plain named type with no C type info.
    pub fn named(name: &str) -> Self {
        GirType {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }
}

/// A function parameter.
#[derive(Debug, Default, Clone)]
pub struct GirParameter {
    pub name: String,
    pub ty: GirType,
    pub direction: Direction,
    pub caller_allocates: bool,
    pub nullable: bool,
    pub optional: bool,
    /// Callback scope (`async`, `call`, `notified`).
    pub scope: Option<String>,
    /// Index of the userdata parameter consumed by this callback's trampoline.
    pub closure: Option<usize>,
    /// Index of the destroy-notify parameter consumed by this callback's trampoline.
    pub destroy: Option<usize>,
}

impl GirParameter {
    /// A parameter with a non-`in` direction is never a closure target.
    pub fn is_closure_target_of(&self, index: usize, owner: &GirFunction) -> bool {
        if self.direction != Direction::In {
            return false;
        }
        owner
            .parameters
            .iter()
            .any(|p| p.closure == Some(index) || p.destroy == Some(index))
    }
}

/// What kind of thing a registered type is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Class,
    Interface,
    Enum,
    Record,
    Callback,
}

/// A type known to the [`TypeRegistry`].
///
/// Created once during [`TypeRegistry::from_namespaces`]; immutable afterward.
#[derive(Debug, Clone)]
pub struct RegisteredType {
    pub kind: TypeKind,
    pub name: String,
    pub namespace: String,
    /// Output-surface name (pascal-cased, collision-disambiguated).
    pub transformed_name: String,
    pub glib_type_name: Option<String>,
    pub shared_library: Option<String>,
    pub glib_get_type: Option<String>,
}

impl RegisteredType {
    /// Qualified registry key, `"Namespace.Name"`.
    pub fn key(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }
}

/// Global type registry — the single source of truth for what kind of thing a
/// name is, which namespace it lives in, and what output name and library it
/// gets.
///
/// Built once per generation run, before any per-namespace mapping pass, then
/// treated as read-only. Lookups never fail; absence is `None`, pushing the
/// "fall back to an opaque pointer" decision to the type mapper.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: HashMap<String, RegisteredType>,
    /// Registration order of keys. The unqualified-name fallback scan in
    /// [`resolve_in_namespace`](Self::resolve_in_namespace) walks this list so
    /// its result is stable across runs instead of depending on hash-map
    /// iteration order.
    order: Vec<String>,
    /// Transformed name → owning qualified key, for cross-namespace
    /// collision disambiguation.
    taken_names: HashMap<String, String>,
}

impl TypeRegistry {
    /// Idempotent insert keyed by `"namespace.name"`.
    fn insert(&mut self, mut entry: RegisteredType) {
        let key = entry.key();
        if self.types.contains_key(&key) {
            return;
        }
        // A transformed name already claimed by another namespace gets the
        // namespace prefixed onto it (e.g. two `Window` types).
        if let Some(owner) = self.taken_names.get(&entry.transformed_name)
            && owner != &key
        {
            entry.transformed_name =
                naming::namespace_prefixed(&entry.namespace, &entry.transformed_name);
        }
        self.taken_names
            .entry(entry.transformed_name.clone())
            .or_insert_with(|| key.clone());
        self.order.push(key.clone());
        self.types.insert(key, entry);
    }

    pub fn register_native_class(
        &mut self,
        namespace: &str,
        name: &str,
        glib_type_name: Option<&str>,
        shared_library: Option<&str>,
        glib_get_type: Option<&str>,
    ) {
        self.insert(RegisteredType {
            kind: TypeKind::Class,
            name: name.to_string(),
            namespace: namespace.to_string(),
            transformed_name: naming::normalize_class_name(name),
            glib_type_name: glib_type_name.map(str::to_string),
            shared_library: shared_library.map(str::to_string),
            glib_get_type: glib_get_type.map(str::to_string),
        });
    }

    pub fn register_interface(
        &mut self,
        namespace: &str,
        name: &str,
        glib_type_name: Option<&str>,
        shared_library: Option<&str>,
        glib_get_type: Option<&str>,
    ) {
        self.insert(RegisteredType {
            kind: TypeKind::Interface,
            name: name.to_string(),
            namespace: namespace.to_string(),
            transformed_name: naming::normalize_class_name(name),
            glib_type_name: glib_type_name.map(str::to_string),
            shared_library: shared_library.map(str::to_string),
            glib_get_type: glib_get_type.map(str::to_string),
        });
    }

    pub fn register_enum(&mut self, namespace: &str, name: &str) {
        self.insert(RegisteredType {
            kind: TypeKind::Enum,
            name: name.to_string(),
            namespace: namespace.to_string(),
            transformed_name: naming::normalize_class_name(name),
            glib_type_name: None,
            shared_library: None,
            glib_get_type: None,
        });
    }

    pub fn register_record(
        &mut self,
        namespace: &str,
        name: &str,
        glib_type_name: &str,
        shared_library: Option<&str>,
        glib_get_type: Option<&str>,
    ) {
        self.insert(RegisteredType {
            kind: TypeKind::Record,
            name: name.to_string(),
            namespace: namespace.to_string(),
            transformed_name: naming::normalize_class_name(name),
            glib_type_name: Some(glib_type_name.to_string()),
            shared_library: shared_library.map(str::to_string),
            glib_get_type: glib_get_type.map(str::to_string),
        });
    }

    pub fn register_callback(&mut self, namespace: &str, name: &str) {
        self.insert(RegisteredType {
            kind: TypeKind::Callback,
            name: name.to_string(),
            namespace: namespace.to_string(),
            transformed_name: naming::normalize_class_name(name),
            glib_type_name: None,
            shared_library: None,
            glib_get_type: None,
        });
    }

    /// Exact lookup by qualified `"Namespace.Name"` key. Never throws.
    pub fn resolve(&self, qualified_name: &str) -> Option<&RegisteredType> {
        self.types.get(qualified_name)
    }

    /// Resolve a possibly-unqualified name from the point of view of
    /// `current_namespace`.
    ///
    /// A qualified name defers to [`resolve`](Self::resolve). An unqualified
    /// name tries `current_namespace.name` first; on a miss, falls back to a
    /// linear scan of all registered types in registration order, matching
    /// either the original or the transformed name. The fallback is
    /// best-effort: when two namespaces register the same unqualified name,
    /// the earliest-registered one wins.
    pub fn resolve_in_namespace(
        &self,
        name: &str,
        current_namespace: &str,
    ) -> Option<&RegisteredType> {
        if name.contains('.') {
            return self.resolve(name);
        }
        if let Some(found) = self.types.get(&format!("{current_namespace}.{name}")) {
            return Some(found);
        }
        self.order
            .iter()
            .filter_map(|key| self.types.get(key))
            .find(|t| t.name == name || t.transformed_name == name)
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Build a complete registry from the full set of parsed namespaces.
    ///
    /// Must fully complete before any per-namespace mapping pass begins —
    /// cross-namespace resolution depends on the complete registry.
    pub fn from_namespaces(namespaces: &[GirNamespace]) -> Self {
        let mut registry = TypeRegistry::default();
        for ns in namespaces {
            let lib = ns.shared_library.as_deref();
            for class in &ns.classes {
                registry.register_native_class(
                    &ns.name,
                    &class.name,
                    class.glib_type_name.as_deref(),
                    lib,
                    class.glib_get_type.as_deref(),
                );
            }
            for iface in &ns.interfaces {
                registry.register_interface(
                    &ns.name,
                    &iface.name,
                    iface.glib_type_name.as_deref(),
                    lib,
                    iface.glib_get_type.as_deref(),
                );
            }
            for en in &ns.enumerations {
                registry.register_enum(&ns.name, &en.name);
            }
            // Bitfields are plain integer enums as far as marshaling goes.
            for bf in &ns.bitfields {
                registry.register_enum(&ns.name, &bf.name);
            }
            for record in &ns.records {
                // Disguised/opaque records have no boxing support and are
                // intentionally excluded; so are records without a GLib type
                // name (no way to dispatch them dynamically).
                if record.disguised || record.opaque {
                    continue;
                }
                let Some(type_name) = record.glib_type_name.as_deref() else {
                    continue;
                };
                registry.register_record(
                    &ns.name,
                    &record.name,
                    type_name,
                    lib,
                    record.glib_get_type.as_deref(),
                );
            }
            for callback in &ns.callbacks {
                registry.register_callback(&ns.name, &callback.name);
            }
        }
        registry
    }
}
