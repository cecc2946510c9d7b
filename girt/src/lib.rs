//! girt — GObject-Introspection → TypeScript binding generator.
//!
//! Reads `.gir` data for a set of namespaces and emits the typed binding
//! surface a React-style GTK4 renderer consumes: classes with FFI call
//! descriptors, signal-connect overloads and metadata, JSX component
//! declarations, and reconciler metadata tables.
//!
//! # Quick start
//!
//! Generate the output tree from a config (suitable for build scripts):
//!
//! ```no_run
//! use std::path::Path;
//!
//! // Reads girt.toml, parses the gir files, writes the TypeScript tree.
//! girt::run(Path::new("girt.toml"), None).unwrap();
//! ```
//!
//! Or get the generated files without writing to disk:
//!
//! ```no_run
//! use std::path::Path;
//!
//! let tree = girt::generate(Path::new("girt.toml")).unwrap();
//! for (name, source) in &tree.files {
//!     println!("{name}: {} bytes", source.len());
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

pub mod class_gen;
pub mod config;
pub mod emit;
pub mod extract;
pub mod ffi;
pub mod format;
pub mod jsx_gen;
pub mod mapper;
pub mod model;
pub mod naming;
pub mod signal_gen;

/// The complete generated output, file name → source text.
#[derive(Debug, Default)]
pub struct GeneratedTree {
    pub files: BTreeMap<String, String>,
}

/// Run the full pipeline: load config, parse the gir files, generate the
/// TypeScript tree, and write it out.
///
/// `config_path` is the path to a `girt.toml` configuration file.
/// `output` optionally overrides the output directory from the config.
///
/// Returns the directory the tree was written to.
pub fn run(config_path: &Path, output: Option<&Path>) -> Result<PathBuf> {
    let cfg = config::load_config(config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;

    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));

    let tree = generate_from_config(&cfg, base_dir)?;

    let output_dir = match output {
        Some(dir) => dir.to_path_buf(),
        None => base_dir.join(&cfg.output.dir),
    };
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("creating output directory {}", output_dir.display()))?;
    for (name, source) in &tree.files {
        let path = output_dir.join(name);
        std::fs::write(&path, source)
            .with_context(|| format!("writing output to {}", path.display()))?;
    }

    info!(
        dir = %output_dir.display(),
        files = tree.files.len(),
        "wrote generated tree"
    );

    Ok(output_dir)
}

/// Parse a `girt.toml` config file and return the generated tree without
/// writing to disk.
pub fn generate(config_path: &Path) -> Result<GeneratedTree> {
    let cfg = config::load_config(config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;

    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));

    generate_from_config(&cfg, base_dir)
}

/// Generate the tree from an already-loaded [`config::Config`].
///
/// `base_dir` is the directory relative to which gir paths in the config are
/// resolved (typically the parent directory of the TOML file).
pub fn generate_from_config(cfg: &config::Config, base_dir: &Path) -> Result<GeneratedTree> {
    info!(namespaces = cfg.namespace.len(), "loaded configuration");

    // Parse every namespace first: cross-namespace resolution needs the
    // complete registry before any per-namespace pass starts.
    let mut namespaces = Vec::new();
    for ns_cfg in &cfg.namespace {
        let path = config::resolve_gir(&ns_cfg.gir_file(), base_dir, &cfg.gir_dirs);
        let ns = extract::extract_file(&path, ns_cfg.shared_library.as_deref())?;
        namespaces.push(ns);
    }

    generate_from_namespaces(cfg, &namespaces)
}

/// Generate the tree from already-parsed namespaces.
pub fn generate_from_namespaces(
    cfg: &config::Config,
    namespaces: &[model::GirNamespace],
) -> Result<GeneratedTree> {
    let registry = model::TypeRegistry::from_namespaces(namespaces);
    info!(types = registry.len(), "built type registry");

    let class_map = emit::build_class_map(namespaces);
    let interface_map = emit::build_interface_map(namespaces);
    let skipped = emit::compute_skipped_classes(namespaces, &registry, cfg);

    let mut tree = GeneratedTree::default();
    for ns in namespaces {
        let source =
            emit::emit_namespace(ns, &registry, &class_map, &interface_map, &skipped)?;
        tree.files.insert(emit::namespace_file_name(&ns.name), source);
    }

    let jsx = jsx_gen::generate(
        namespaces,
        &registry,
        &class_map,
        &interface_map,
        &cfg.jsx,
        &skipped,
    )?;
    tree.files.insert(
        "jsx.ts".to_string(),
        format::format_or_warn("jsx.ts", jsx.props_source),
    );
    tree.files.insert(
        "meta.ts".to_string(),
        format::format_or_warn("meta.ts", jsx.meta_source),
    );
    tree.files
        .insert("index.ts".to_string(), emit::emit_index(namespaces));

    info!(files = tree.files.len(), "generation complete");

    Ok(tree)
}
