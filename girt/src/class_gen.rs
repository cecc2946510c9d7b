//! Class generation — one binding class per GIR class: constructor strategy
//! selection, method surfacing (own + interface-contributed + renames),
//! sync/async promise pairing, and cyclic-return-type breaking.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::{debug, trace, warn};

use crate::ffi::FfiType;
use crate::mapper::{MappedType, TypeMapper, TypeUsage};
use crate::model::{
    Direction, GirClass, GirFunction, GirInterface, GirNamespace, GirType, TypeKind, TypeRegistry,
};
use crate::naming;
use crate::signal_gen;

/// Shared context for one namespace generation pass. The registry and the
/// class/interface maps span all loaded namespaces and are read-only here.
pub struct GenContext<'a> {
    pub namespace: &'a GirNamespace,
    pub registry: &'a TypeRegistry,
    pub mapper: TypeMapper<'a>,
    pub class_map: &'a HashMap<String, &'a GirClass>,
    pub interface_map: &'a HashMap<String, &'a GirInterface>,
}

impl<'a> GenContext<'a> {
    pub fn namespace_name(&self) -> &str {
        &self.namespace.name
    }

    pub fn mapper(&self) -> &TypeMapper<'a> {
        &self.mapper
    }

    pub fn registry(&self) -> &TypeRegistry {
        self.registry
    }

    pub fn shared_library(&self) -> &str {
        self.namespace.shared_library.as_deref().unwrap_or("")
    }

    pub fn qualify(&self, name: &str) -> String {
        if name.contains('.') {
            name.to_string()
        } else {
            format!("{}.{}", self.namespace.name, name)
        }
    }

    pub fn resolve_class(&self, name: &str) -> Option<&'a GirClass> {
        self.class_map.get(&self.qualify(name)).copied()
    }

    pub fn resolve_interface(&self, name: &str) -> Option<&'a GirInterface> {
        self.interface_map.get(&self.qualify(name)).copied()
    }

    /// Output-surface name of a type, preferring the registry's
    /// collision-adjusted transformed name.
    pub fn ts_name_of(&self, name: &str) -> String {
        match self.registry.resolve_in_namespace(name, &self.namespace.name) {
            Some(rt) => rt.transformed_name.clone(),
            None => naming::normalize_class_name(name.rsplit('.').next().unwrap_or(name)),
        }
    }
}

/// The explicit output of one class generation pass. Callers fold artifacts
/// into the namespace module; there is no shared mutable generation state.
#[derive(Debug)]
pub struct ClassArtifact {
    pub gir_name: String,
    pub ts_name: String,
    pub source: String,
    pub usage: TypeUsage,
    /// C identifier → surfaced method name, for every collision rename.
    pub renames: BTreeMap<String, String>,
    pub uses_ref: bool,
    pub uses_async: bool,
    pub uses_signals: bool,
}

/// How a surfaced method reached the class.
struct Surfaced<'a> {
    func: &'a GirFunction,
    /// Final (possibly renamed) output name.
    name: String,
    is_static: bool,
}

/// Generate one class. Returns `None` when the class has constructors but
/// none is free of unsupported callback types — a constructor that cannot be
/// called safely must not appear to be callable, so the class is omitted
/// entirely. Callers handle "no artifact" as a normal outcome.
pub fn generate_class<'a>(ctx: &GenContext<'a>, class: &'a GirClass) -> Option<ClassArtifact> {
    let mapper = ctx.mapper();

    let callable_ctors: Vec<&GirFunction> = class
        .constructors
        .iter()
        .filter(|c| {
            !c.parameters
                .iter()
                .any(|p| mapper.is_unsupported_callback(p))
        })
        .collect();
    if !class.constructors.is_empty() && callable_ctors.is_empty() {
        warn!(class = %class.name, "skipping class: no callable constructor");
        return None;
    }

    let mut usage = TypeUsage::default();
    let mut renames = BTreeMap::new();
    let mut uses_ref = false;

    let ts_name = ctx.ts_name_of(&class.name);
    let class_key = ctx.qualify(&class.name);

    // Parent reference for the extends clause.
    let parent_ts = class.parent.as_deref().map(|parent| {
        match ctx.registry.resolve_in_namespace(parent, ctx.namespace_name()) {
            Some(rt) if rt.namespace != ctx.namespace_name() => {
                usage
                    .external_types
                    .insert(rt.transformed_name.clone(), rt.namespace.clone());
                format!("{}.{}", rt.namespace, rt.transformed_name)
            }
            Some(rt) => rt.transformed_name.clone(),
            None => {
                // Parent namespace not loaded; reference it anyway rather
                // than silently reparenting the class.
                match parent.split_once('.') {
                    Some((ns, name)) => {
                        let transformed = naming::normalize_class_name(name);
                        usage
                            .external_types
                            .insert(transformed.clone(), ns.to_string());
                        format!("{ns}.{transformed}")
                    }
                    None => naming::normalize_class_name(parent),
                }
            }
        }
    });

    // ------------------------------------------------------------------
    // Method surfacing
    // ------------------------------------------------------------------

    let ancestor_names = ancestor_method_names(ctx, class);
    let own_names: HashSet<String> = class
        .methods
        .iter()
        .map(|m| naming::to_camel_case(&m.name))
        .collect();

    let mut surfaced: Vec<Surfaced> = Vec::new();

    for method in &class.methods {
        if method.variadic {
            trace!(class = %class.name, method = %method.name, "skipping variadic method");
            continue;
        }
        if method
            .parameters
            .iter()
            .any(|p| mapper.is_unsupported_callback(p))
        {
            warn!(class = %class.name, method = %method.name, "skipping method with unsupported callback");
            continue;
        }
        let camel = naming::to_camel_case(&method.name);
        // An own method colliding with an ancestor's binding-level method
        // would call the wrong native symbol — there is no virtual dispatch
        // here, it is all static symbol binding. Same for `connect`, which
        // is reserved for signal connection.
        let name = if ancestor_names.contains(&camel)
            || (camel == "connect" && class.parent.is_some())
        {
            let renamed = format!(
                "{}{}",
                naming::to_camel_case(&ts_name),
                naming::to_pascal_case(&method.name)
            );
            if let Some(c_id) = &method.c_identifier {
                renames.insert(c_id.clone(), renamed.clone());
            }
            renamed
        } else {
            camel
        };
        surfaced.push(Surfaced {
            func: method,
            name,
            is_static: false,
        });
    }

    // Interface methods not already shadowed by the class or an ancestor.
    // When two interfaces declare the same name, the second one encountered
    // is renamed `<InterfaceName><PascalMethod>`; the first keeps its plain
    // name.
    let mut seen_iface: HashSet<String> = HashSet::new();
    for iface_name in &class.implements {
        let Some(iface) = ctx.resolve_interface(iface_name) else {
            continue;
        };
        let iface_ts = ctx.ts_name_of(iface_name);
        for method in &iface.methods {
            if method.variadic
                || method
                    .parameters
                    .iter()
                    .any(|p| mapper.is_unsupported_callback(p))
            {
                continue;
            }
            let camel = naming::to_camel_case(&method.name);
            if own_names.contains(&camel) || ancestor_names.contains(&camel) {
                continue;
            }
            let name = if seen_iface.contains(&camel) {
                let renamed = format!("{iface_ts}{}", naming::to_pascal_case(&method.name));
                if let Some(c_id) = &method.c_identifier {
                    renames.insert(c_id.clone(), renamed.clone());
                }
                renamed
            } else {
                seen_iface.insert(camel.clone());
                camel
            };
            surfaced.push(Surfaced {
                func: method,
                name,
                is_static: false,
            });
        }
    }

    // Static functions declared on the class.
    let mut taken: HashSet<String> = surfaced.iter().map(|s| s.name.clone()).collect();
    for func in &class.functions {
        if func.variadic
            || func
                .parameters
                .iter()
                .any(|p| mapper.is_unsupported_callback(p))
        {
            continue;
        }
        let camel = naming::to_camel_case(&func.name);
        if !taken.insert(camel.clone()) {
            trace!(class = %class.name, function = %func.name, "skipping shadowed static function");
            continue;
        }
        surfaced.push(Surfaced {
            func,
            name: camel,
            is_static: true,
        });
    }

    // ------------------------------------------------------------------
    // Async/finish pairing
    // ------------------------------------------------------------------

    let (sync_surface, async_pairs) = pair_async_methods(ctx, surfaced);

    // ------------------------------------------------------------------
    // Emission
    // ------------------------------------------------------------------

    // Interfaces the class declares; their methods are flattened into the
    // class body below, which is what satisfies the clause.
    let implements_ts: Vec<String> = class
        .implements
        .iter()
        .filter_map(|iface_name| {
            let rt = ctx
                .registry
                .resolve_in_namespace(iface_name, ctx.namespace_name())?;
            if rt.namespace != ctx.namespace_name() {
                usage
                    .external_types
                    .insert(rt.transformed_name.clone(), rt.namespace.clone());
                Some(format!("{}.{}", rt.namespace, rt.transformed_name))
            } else {
                Some(rt.transformed_name.clone())
            }
        })
        .collect();

    let mut lines: Vec<String> = Vec::new();
    let mut header = format!("export class {ts_name}");
    if let Some(parent) = &parent_ts {
        header.push_str(&format!(" extends {parent}"));
    }
    if !implements_ts.is_empty() {
        header.push_str(&format!(" implements {}", implements_ts.join(", ")));
    }
    header.push_str(" {");
    lines.push(header);

    let main_ctor = if class.parent.is_some() {
        callable_ctors.iter().find(|c| !c.variadic).copied()
    } else {
        None
    };

    emit_constructor(ctx, class, main_ctor, &mut lines, &mut usage, &mut uses_ref);

    for &ctor in callable_ctors.iter().filter(|c| !c.variadic) {
        if main_ctor.is_some_and(|main| std::ptr::eq(main, ctor)) {
            continue;
        }
        emit_factory(ctx, ctor, &ts_name, &mut lines, &mut usage, &mut uses_ref);
    }

    let cycle_guard = CycleGuard::new(ctx, class, &class_key);

    for entry in &sync_surface {
        emit_method(ctx, entry, &cycle_guard, &mut lines, &mut usage, &mut uses_ref);
    }

    let uses_async = !async_pairs.is_empty();
    for pair in &async_pairs {
        emit_async_wrapper(ctx, pair, &mut lines, &mut usage, &mut uses_ref);
    }

    // Signal surfacing. Cross-namespace ancestors might contribute signals
    // we cannot see, so any parent reference forces a connect block.
    let (collected, cross_ns_parent) = signal_gen::collect_signals(ctx, class);
    let uses_signals = !collected.is_empty() || cross_ns_parent;
    let mut metadata: Vec<String> = Vec::new();
    if uses_signals {
        let block = signal_gen::generate(ctx, class, &ts_name);
        lines.extend(block.overloads);
        lines.extend(block.runtime_impl);
        metadata = block.metadata;
        usage.merge(block.usage);
    }

    lines.push("}".to_string());
    if !metadata.is_empty() {
        lines.push(String::new());
        lines.extend(metadata);
    }

    debug!(class = %class.name, methods = sync_surface.len(), async_wrappers = async_pairs.len(), "generated class");

    Some(ClassArtifact {
        gir_name: class.name.clone(),
        ts_name,
        source: lines.join("\n"),
        usage,
        renames,
        uses_ref,
        uses_async,
        uses_signals,
    })
}

// ---------------------------------------------------------------------------
// Constructor strategies
// ---------------------------------------------------------------------------

/// Emit the instance constructor. Four mutually exclusive shapes:
///
/// 1. main constructor + parent → allocate inline behind the instantiating
///    guard (the wrapping path must call `super()` without re-allocating);
/// 2. no main constructor, but parent + GType registration + concrete →
///    allocate through `g_object_new`;
/// 3. parent only → trivial delegate, instances arise by wrapping pointers;
/// 4. no parent → hierarchy root owning the allocation bookkeeping.
fn emit_constructor(
    ctx: &GenContext<'_>,
    class: &GirClass,
    main_ctor: Option<&GirFunction>,
    lines: &mut Vec<String>,
    usage: &mut TypeUsage,
    uses_ref: &mut bool,
) {
    if class.parent.is_none() {
        lines.push("id!: bigint;".to_string());
        lines.push(String::new());
        lines.push("constructor() {".to_string());
        lines.push("this.id = this.create();".to_string());
        lines.push("}".to_string());
        lines.push(String::new());
        lines.push("protected create(): bigint {".to_string());
        lines.push("return 0n;".to_string());
        lines.push("}".to_string());
        return;
    }

    if let Some(ctor) = main_ctor {
        let params = render_params(ctx, ctor, usage, uses_ref);
        lines.push(format!("constructor({}) {{", params.signature));
        lines.push("super();".to_string());
        lines.push("if (!isInstantiating()) {".to_string());
        lines.push("return;".to_string());
        lines.push("}".to_string());
        push_call(
            lines,
            ctx.shared_library(),
            ctor.c_identifier.as_deref().unwrap_or(&ctor.name),
            &params.args,
            &FfiType::GObject { borrowed: false },
            "this.id = ",
            " as bigint;",
        );
        lines.push("}".to_string());
        return;
    }

    if let Some(get_type) = &class.glib_get_type
        && !class.abstract_
    {
        let args = vec![
            (
                FfiType::Int {
                    size: 64,
                    signed: false,
                }
                .to_ts(),
                format!("getType(\"{}\", \"{get_type}\")", ctx.shared_library()),
            ),
            (FfiType::Null.to_ts(), "null".to_string()),
        ];
        lines.push("constructor() {".to_string());
        lines.push("super();".to_string());
        lines.push("if (!isInstantiating()) {".to_string());
        lines.push("return;".to_string());
        lines.push("}".to_string());
        push_call(
            lines,
            "libgobject-2.0.so.0",
            "g_object_new",
            &args,
            &FfiType::GObject { borrowed: false },
            "this.id = ",
            " as bigint;",
        );
        lines.push("}".to_string());
        return;
    }

    // Not directly constructible; instances only arise by wrapping pointers
    // of known type.
    lines.push("constructor() {".to_string());
    lines.push("super();".to_string());
    lines.push("}".to_string());
}

fn emit_factory(
    ctx: &GenContext<'_>,
    ctor: &GirFunction,
    ts_name: &str,
    lines: &mut Vec<String>,
    usage: &mut TypeUsage,
    uses_ref: &mut bool,
) {
    let symbol = ctor.c_identifier.as_deref().unwrap_or(&ctor.name);
    let name = naming::factory_name(symbol, &ctor.name);
    let params = render_params(ctx, ctor, usage, uses_ref);

    lines.push(String::new());
    lines.push(format!(
        "static {name}({}): {ts_name} {{",
        params.signature
    ));
    push_call(
        lines,
        ctx.shared_library(),
        symbol,
        &params.args,
        &FfiType::GObject { borrowed: false },
        "const ptr = ",
        " as bigint;",
    );
    lines.push(format!("return getObject(ptr, {ts_name});"));
    lines.push("}".to_string());
}

// ---------------------------------------------------------------------------
// Method emission
// ---------------------------------------------------------------------------

pub(crate) struct RenderedParams {
    pub(crate) signature: String,
    /// `(descriptor, value expression)` pairs for the call argument list.
    pub(crate) args: Vec<(String, String)>,
}

/// Render a function's `in`/`out` parameters into a signature and call
/// arguments. Callback parameters map to trampoline descriptors with the
/// handler function itself as the value; closure targets are consumed by the
/// trampoline and never surfaced.
pub(crate) fn render_params(
    ctx: &GenContext<'_>,
    func: &GirFunction,
    usage: &mut TypeUsage,
    uses_ref: &mut bool,
) -> RenderedParams {
    let mapper = ctx.mapper();
    let mut signature = Vec::new();
    let mut args = Vec::new();

    for (index, param) in func.parameters.iter().enumerate() {
        if param.is_closure_target_of(index, func) {
            continue;
        }
        let mapped = mapper.map_parameter(param, Some(&mut *usage));
        if matches!(mapped.ffi, FfiType::Ref { .. }) {
            *uses_ref = true;
        }
        let ident = naming::escape_ident(&param.name);
        signature.push(format!("{ident}: {}", ts_with_null(&mapped)));
        args.push((mapped.ffi.to_ts(), ident));
    }

    RenderedParams {
        signature: signature.join(", "),
        args,
    }
}

pub(crate) fn ts_with_null(mapped: &MappedType) -> String {
    if mapped.nullable {
        format!("{} | null", mapped.ts)
    } else {
        mapped.ts.clone()
    }
}

/// Emit a native invocation, one argument per line:
/// `{prefix}call("lib", "symbol", [ ...args ], RET){suffix}`.
fn push_call(
    lines: &mut Vec<String>,
    lib: &str,
    symbol: &str,
    args: &[(String, String)],
    ret: &FfiType,
    prefix: &str,
    suffix: &str,
) {
    if args.is_empty() {
        lines.push(format!(
            "{prefix}call(\"{lib}\", \"{symbol}\", [], {}){suffix}",
            ret.to_ts()
        ));
        return;
    }
    lines.push(format!("{prefix}call(\"{lib}\", \"{symbol}\", ["));
    for (desc, value) in args {
        lines.push(format!("{{ type: {desc}, value: {value} }},"));
    }
    lines.push(format!("], {}){suffix}", ret.to_ts()));
}

fn emit_method(
    ctx: &GenContext<'_>,
    entry: &Surfaced<'_>,
    cycle_guard: &CycleGuard<'_, '_>,
    lines: &mut Vec<String>,
    usage: &mut TypeUsage,
    uses_ref: &mut bool,
) {
    let mapper = ctx.mapper();
    let func = entry.func;
    let symbol = func.c_identifier.as_deref().unwrap_or(&func.name);
    let params = render_params(ctx, func, usage, uses_ref);

    let ret = match &func.return_type {
        Some(ty) => mapper.map_type(ty, true, Some(&mut *usage)),
        None => MappedType {
            ts: "void".to_string(),
            ffi: FfiType::Undefined,
            resolved: None,
            kind: None,
            nullable: false,
        },
    };
    let cyclic = cycle_guard.is_cyclic(&ret);

    let prefix = if entry.is_static { "static " } else { "" };
    lines.push(String::new());
    lines.push(format!(
        "{prefix}{}({}): {} {{",
        entry.name,
        params.signature,
        ts_with_null(&ret)
    ));

    let mut args = Vec::new();
    if !entry.is_static {
        args.push((
            FfiType::GObject { borrowed: true }.to_ts(),
            "this.id".to_string(),
        ));
    }
    args.extend(params.args);

    let lib = ctx.shared_library();
    match return_shape(&ret, cyclic) {
        ReturnShape::Void => push_call(lines, lib, symbol, &args, &ret.ffi, "", ";"),
        ReturnShape::Instance => {
            push_call(lines, lib, symbol, &args, &ret.ffi, "const ptr = ", " as bigint;");
            if ret.nullable {
                lines.push(format!(
                    "return ptr === 0n ? null : getObject(ptr, {});",
                    ret.ts
                ));
            } else {
                lines.push(format!("return getObject(ptr, {});", ret.ts));
            }
        }
        ReturnShape::InterfaceCast => {
            push_call(lines, lib, symbol, &args, &ret.ffi, "const ptr = ", " as bigint;");
            if ret.nullable {
                lines.push(format!(
                    "return ptr === 0n ? null : (getObject(ptr) as {});",
                    ret.ts
                ));
            } else {
                lines.push(format!("return getObject(ptr) as {};", ret.ts));
            }
        }
        ReturnShape::CyclicStandIn => {
            // Returning the full instance here would close an import cycle;
            // only the identity survives. Callers needing the full API must
            // re-resolve through getObject.
            push_call(lines, lib, symbol, &args, &ret.ffi, "const ptr = ", " as bigint;");
            lines.push(format!("return {{ id: ptr }} as {};", ret.ts));
        }
        ReturnShape::Cast => {
            push_call(
                lines,
                lib,
                symbol,
                &args,
                &ret.ffi,
                "return ",
                &format!(" as {};", ts_with_null(&ret)),
            );
        }
    }

    lines.push("}".to_string());
}

enum ReturnShape {
    Void,
    /// Class instance resolved through the pointer cache.
    Instance,
    /// Interface-typed value: the pointer resolves to its concrete class,
    /// viewed through the interface.
    InterfaceCast,
    CyclicStandIn,
    Cast,
}

fn return_shape(ret: &MappedType, cyclic: bool) -> ReturnShape {
    if ret.ffi == FfiType::Undefined {
        return ReturnShape::Void;
    }
    if ret.ts == "unknown" {
        return ReturnShape::Cast;
    }
    match ret.kind {
        Some(TypeKind::Class) if cyclic => ReturnShape::CyclicStandIn,
        Some(TypeKind::Class) => ReturnShape::Instance,
        Some(TypeKind::Interface) => ReturnShape::InterfaceCast,
        _ => ReturnShape::Cast,
    }
}

/// Emit a namespace-level function as a module-level export. Same body
/// shapes as methods, minus the instance argument and the cycle guard
/// (free functions cannot close an import cycle onto themselves).
pub(crate) fn emit_free_function(
    ctx: &GenContext<'_>,
    func: &GirFunction,
    lines: &mut Vec<String>,
    usage: &mut TypeUsage,
    uses_ref: &mut bool,
) {
    let mapper = ctx.mapper();
    let symbol = func.c_identifier.as_deref().unwrap_or(&func.name);
    let params = render_params(ctx, func, usage, uses_ref);

    let ret = match &func.return_type {
        Some(ty) => mapper.map_type(ty, true, Some(&mut *usage)),
        None => MappedType {
            ts: "void".to_string(),
            ffi: FfiType::Undefined,
            resolved: None,
            kind: None,
            nullable: false,
        },
    };

    lines.push(format!(
        "export function {}({}): {} {{",
        naming::to_camel_case(&func.name),
        params.signature,
        ts_with_null(&ret)
    ));

    let lib = ctx.shared_library();
    match return_shape(&ret, false) {
        ReturnShape::Void => push_call(lines, lib, symbol, &params.args, &ret.ffi, "", ";"),
        ReturnShape::Instance => {
            push_call(lines, lib, symbol, &params.args, &ret.ffi, "const ptr = ", " as bigint;");
            lines.push(format!("return getObject(ptr, {});", ret.ts));
        }
        ReturnShape::InterfaceCast => {
            push_call(lines, lib, symbol, &params.args, &ret.ffi, "const ptr = ", " as bigint;");
            lines.push(format!("return getObject(ptr) as {};", ret.ts));
        }
        ReturnShape::CyclicStandIn | ReturnShape::Cast => {
            push_call(
                lines,
                lib,
                symbol,
                &params.args,
                &ret.ffi,
                "return ",
                &format!(" as {};", ts_with_null(&ret)),
            );
        }
    }

    lines.push("}".to_string());
    lines.push(String::new());
}

// ---------------------------------------------------------------------------
// Async/finish pairing
// ---------------------------------------------------------------------------

struct AsyncPair<'a> {
    begin: Surfaced<'a>,
    finish: &'a GirFunction,
    /// Indexes into `begin.func.parameters` surfaced on the wrapper.
    wrapper_params: Vec<usize>,
}

/// Pair GIO async methods with their `_finish` partners. Paired methods are
/// removed from the sync surface and replaced with one promise-returning
/// wrapper. If dropping the callback leaves an optional parameter before a
/// required one, no valid wrapper signature exists: pairing is abandoned and
/// the begin method stays on the sync surface (the finish partner is not
/// surfaced either way once a pair is recognized).
fn pair_async_methods<'a>(
    ctx: &GenContext<'a>,
    surfaced: Vec<Surfaced<'a>>,
) -> (Vec<Surfaced<'a>>, Vec<AsyncPair<'a>>) {
    let mapper = ctx.mapper();

    let name_to_index: HashMap<String, usize> = surfaced
        .iter()
        .enumerate()
        .map(|(i, e)| (e.func.name.clone(), i))
        .collect();

    // Indexes removed from the sync surface, and the recognized valid pairs.
    let mut dropped: HashSet<usize> = HashSet::new();
    let mut pairs: Vec<(usize, usize, Vec<usize>)> = Vec::new();

    for (i, entry) in surfaced.iter().enumerate() {
        if entry.is_static {
            continue;
        }
        if !entry
            .func
            .parameters
            .iter()
            .any(|p| mapper.is_async_ready_callback(p))
        {
            continue;
        }
        let base = entry
            .func
            .name
            .strip_suffix("_async")
            .unwrap_or(&entry.func.name);
        let finish_name = format!("{base}_finish");
        let Some(&j) = name_to_index.get(&finish_name) else {
            continue;
        };
        if i == j || dropped.contains(&j) {
            continue;
        }

        let wrapper_params = wrapper_param_indexes(ctx, entry.func);
        let mut seen_optional = false;
        let valid = wrapper_params.iter().all(|&idx| {
            let p = &entry.func.parameters[idx];
            if p.optional {
                seen_optional = true;
                true
            } else {
                !seen_optional
            }
        });

        // Once a pair is recognized, the finish half stays internal whether
        // or not a wrapper materializes.
        dropped.insert(j);
        if valid {
            dropped.insert(i);
            pairs.push((i, j, wrapper_params));
        } else {
            // No valid call signature exists; the begin method stays on the
            // plain sync surface instead.
            trace!(method = %entry.func.name, "abandoning async pairing: optional parameter precedes a required one");
        }
    }

    let finish_refs: Vec<&'a GirFunction> = pairs.iter().map(|(_, j, _)| surfaced[*j].func).collect();
    let mut slots: Vec<Option<Surfaced>> = surfaced.into_iter().map(Some).collect();

    let mut async_pairs = Vec::new();
    for ((i, _, wrapper_params), finish) in pairs.into_iter().zip(finish_refs) {
        let begin = slots[i].take().expect("begin surfaced exactly once");
        async_pairs.push(AsyncPair {
            begin,
            finish,
            wrapper_params,
        });
    }

    let sync_surface = slots
        .into_iter()
        .enumerate()
        .filter_map(|(i, slot)| {
            let entry = slot?;
            if dropped.contains(&i) { None } else { Some(entry) }
        })
        .collect();

    (sync_surface, async_pairs)
}

/// Wrapper parameter indexes: everything except the async callback and the
/// closure targets its trampoline consumes.
fn wrapper_param_indexes(ctx: &GenContext<'_>, func: &GirFunction) -> Vec<usize> {
    let mapper = ctx.mapper();
    let mut indexes = Vec::new();
    for (i, p) in func.parameters.iter().enumerate() {
        if mapper.is_async_ready_callback(p) {
            continue;
        }
        if p.is_closure_target_of(i, func) {
            continue;
        }
        indexes.push(i);
    }
    indexes
}

fn emit_async_wrapper(
    ctx: &GenContext<'_>,
    pair: &AsyncPair<'_>,
    lines: &mut Vec<String>,
    usage: &mut TypeUsage,
    uses_ref: &mut bool,
) {
    let mapper = ctx.mapper();
    let lib = ctx.shared_library();
    let begin = pair.begin.func;
    let begin_symbol = begin.c_identifier.as_deref().unwrap_or(&begin.name);
    let finish = pair.finish;
    let finish_symbol = finish.c_identifier.as_deref().unwrap_or(&finish.name);

    // Wrapper signature: surfaced begin params, optional ones with `?`.
    let mut signature = Vec::new();
    let mut begin_args: Vec<(String, String)> = vec![(
        FfiType::GObject { borrowed: true }.to_ts(),
        "this.id".to_string(),
    )];
    for &idx in &pair.wrapper_params {
        let param = &begin.parameters[idx];
        let mapped = mapper.map_parameter(param, Some(&mut *usage));
        let ident = naming::escape_ident(&param.name);
        if param.optional {
            signature.push(format!("{ident}?: {}", ts_with_null(&mapped)));
        } else {
            signature.push(format!("{ident}: {}", ts_with_null(&mapped)));
        }
        begin_args.push((mapped.ffi.to_ts(), ident));
    }

    // Finish call: instance + async result + refs for each out parameter.
    let finish_ret = match &finish.return_type {
        Some(ty) => mapper.map_type(ty, true, Some(&mut *usage)),
        None => MappedType {
            ts: "void".to_string(),
            ffi: FfiType::Undefined,
            resolved: None,
            kind: None,
            nullable: false,
        },
    };
    let outs: Vec<&crate::model::GirParameter> = finish
        .parameters
        .iter()
        .filter(|p| p.direction != Direction::In)
        .collect();

    // Resolution type: plain value without outs, otherwise an object keyed
    // by `result` plus each out parameter.
    let void_ret = finish_ret.ffi == FfiType::Undefined;
    let promise_ts = if outs.is_empty() {
        ts_with_null(&finish_ret)
    } else {
        let mut fields = Vec::new();
        if !void_ret {
            fields.push(format!("result: {}", ts_with_null(&finish_ret)));
        }
        for out in &outs {
            let inner = mapper.map_type(&out.ty, false, Some(&mut *usage));
            fields.push(format!(
                "{}: {}",
                naming::escape_ident(&out.name),
                inner.ts
            ));
        }
        format!("{{ {} }}", fields.join(", "))
    };

    lines.push(String::new());
    lines.push(format!(
        "{}({}): Promise<{promise_ts}> {{",
        pair.begin.name,
        signature.join(", ")
    ));
    lines.push("return new Promise((resolve, reject) => {".to_string());

    // The async-ready callback slots into the begin call's argument list in
    // the position the trampoline expects.
    let cb_desc = FfiType::Callback {
        trampoline: crate::ffi::Trampoline::AsyncReady,
        arg_types: None,
        return_type: None,
        source_type: Some(Box::new(FfiType::GObject { borrowed: true })),
        result_type: Some(Box::new(FfiType::GObject { borrowed: true })),
    };

    lines.push(format!("call(\"{lib}\", \"{begin_symbol}\", ["));
    for (desc, value) in &begin_args {
        lines.push(format!("{{ type: {desc}, value: {value} }},"));
    }
    lines.push(format!(
        "{{ type: {}, value: (_source: unknown, result: unknown) => {{",
        cb_desc.to_ts()
    ));
    lines.push("try {".to_string());

    *uses_ref |= !outs.is_empty();
    let mut finish_args: Vec<(String, String)> = vec![
        (
            FfiType::GObject { borrowed: true }.to_ts(),
            "this.id".to_string(),
        ),
        (
            FfiType::GObject { borrowed: true }.to_ts(),
            "result".to_string(),
        ),
    ];
    for out in &outs {
        let inner = mapper.map_type(&out.ty, false, None);
        let ident = naming::escape_ident(&out.name);
        lines.push(format!(
            "const {ident} = createRef({});",
            inner.ffi.to_ts()
        ));
        let wrapped = FfiType::Ref {
            inner_type: Box::new(inner.ffi),
        };
        finish_args.push((wrapped.to_ts(), ident.clone()));
    }

    if void_ret {
        push_call(lines, lib, finish_symbol, &finish_args, &finish_ret.ffi, "", ";");
    } else if matches!(
        return_shape(&finish_ret, false),
        ReturnShape::Instance | ReturnShape::InterfaceCast
    ) {
        push_call(
            lines,
            lib,
            finish_symbol,
            &finish_args,
            &finish_ret.ffi,
            "const ptr = ",
            " as bigint;",
        );
        let resolve_expr = match return_shape(&finish_ret, false) {
            ReturnShape::Instance => format!("getObject(ptr, {})", finish_ret.ts),
            _ => format!("getObject(ptr) as {}", finish_ret.ts),
        };
        if finish_ret.nullable {
            lines.push(format!(
                "const value = ptr === 0n ? null : {resolve_expr};"
            ));
        } else {
            lines.push(format!("const value = {resolve_expr};"));
        }
    } else {
        push_call(
            lines,
            lib,
            finish_symbol,
            &finish_args,
            &finish_ret.ffi,
            "const value = ",
            &format!(" as {};", ts_with_null(&finish_ret)),
        );
    }

    if outs.is_empty() {
        if void_ret {
            lines.push("resolve();".to_string());
        } else {
            lines.push("resolve(value);".to_string());
        }
    } else {
        let mut fields = Vec::new();
        if !void_ret {
            fields.push("result: value".to_string());
        }
        for out in &outs {
            let ident = naming::escape_ident(&out.name);
            let inner = mapper.map_type(&out.ty, false, None);
            fields.push(format!("{ident}: {ident}.value as {}", inner.ts));
        }
        lines.push(format!("resolve({{ {} }});", fields.join(", ")));
    }

    lines.push("} catch (error) {".to_string());
    lines.push("reject(error);".to_string());
    lines.push("}".to_string());
    lines.push("} },".to_string());
    lines.push(format!("], {});", FfiType::Undefined.to_ts()));
    lines.push("});".to_string());
    lines.push("}".to_string());
}

// ---------------------------------------------------------------------------
// Inheritance walks and cyclic-return detection
// ---------------------------------------------------------------------------

/// Camel-cased method names present anywhere in the ancestor chain.
/// Walks stop at unloaded namespaces; `visited` guards malformed cyclic
/// parent chains from looping.
fn ancestor_method_names(ctx: &GenContext<'_>, class: &GirClass) -> HashSet<String> {
    let mut names = HashSet::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut parent = class.parent.clone();
    while let Some(parent_name) = parent {
        if !visited.insert(parent_name.clone()) {
            break;
        }
        let Some(ancestor) = ctx.resolve_class(&parent_name) else {
            break;
        };
        for m in &ancestor.methods {
            names.insert(naming::to_camel_case(&m.name));
        }
        parent = ancestor.parent.clone();
    }
    names
}

/// Precomputed facts for breaking import cycles: a method returning a type
/// that descends from the generating class (or whose ancestry references it)
/// must not import that type's full definition.
struct CycleGuard<'g, 'a> {
    ctx: &'g GenContext<'a>,
    class_key: &'g str,
    class_name: &'g str,
}

impl<'g, 'a> CycleGuard<'g, 'a> {
    fn new(ctx: &'g GenContext<'a>, class: &'g GirClass, class_key: &'g str) -> Self {
        CycleGuard {
            ctx,
            class_key,
            class_name: &class.name,
        }
    }

    fn is_cyclic(&self, ret: &MappedType) -> bool {
        if !matches!(ret.kind, Some(TypeKind::Class)) {
            return false;
        }
        let Some(ret_key) = ret.resolved.as_deref() else {
            return false;
        };
        if ret_key == self.class_key {
            return false; // self-returns import nothing new
        }
        if self.is_descendant_of(ret_key, self.class_key) {
            return true;
        }
        self.ancestry_references(ret_key)
    }

    /// Whether `candidate` has `ancestor` anywhere in its parent chain.
    fn is_descendant_of(&self, candidate: &str, ancestor: &str) -> bool {
        let mut visited = HashSet::new();
        let mut current = self.ctx.class_map.get(candidate).copied();
        while let Some(cls) = current {
            let Some(parent) = cls.parent.as_deref() else {
                return false;
            };
            let parent_key = self.ctx.qualify(parent);
            if parent_key == ancestor {
                return true;
            }
            if !visited.insert(parent_key.clone()) {
                return false;
            }
            current = self.ctx.class_map.get(&parent_key).copied();
        }
        false
    }

    /// Whether any ancestor of `ret_key` references the generating class in
    /// its methods, functions, or properties. Direct type references only —
    /// record fields are not chased.
    fn ancestry_references(&self, ret_key: &str) -> bool {
        let mut visited = HashSet::new();
        let mut current = self
            .ctx
            .class_map
            .get(ret_key)
            .copied()
            .and_then(|c| c.parent.as_deref())
            .map(|p| self.ctx.qualify(p));
        while let Some(key) = current {
            if !visited.insert(key.clone()) {
                break;
            }
            let Some(cls) = self.ctx.class_map.get(&key).copied() else {
                break;
            };
            if self.class_referenced_by(cls) {
                return true;
            }
            current = cls.parent.as_deref().map(|p| self.ctx.qualify(p));
        }
        false
    }

    fn class_referenced_by(&self, cls: &GirClass) -> bool {
        let target_short = self.class_name;
        let target_qualified = self.class_key;
        let hits = |ty: &GirType| type_names_match(ty, target_short, target_qualified);

        cls.methods
            .iter()
            .chain(cls.functions.iter())
            .any(|f| {
                f.return_type.as_ref().is_some_and(&hits)
                    || f.parameters.iter().any(|p| hits(&p.ty))
            })
            || cls.properties.iter().any(|p| hits(&p.ty))
    }
}

fn type_names_match(ty: &GirType, short: &str, qualified: &str) -> bool {
    if let Some(name) = ty.name.as_deref()
        && (name == short || name == qualified)
    {
        return true;
    }
    if let Some(element) = ty.element_type.as_deref() {
        return type_names_match(element, short, qualified);
    }
    false
}
