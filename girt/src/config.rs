//! Configuration types for `girt.toml`.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Root configuration.
#[derive(Debug, Deserialize)]
pub struct Config {
    pub output: OutputConfig,
    /// Directories to search for `.gir` files, tried in order after
    /// `base_dir` (the TOML file's parent directory).
    #[serde(default = "default_gir_dirs")]
    pub gir_dirs: Vec<PathBuf>,
    #[serde(default)]
    pub namespace: Vec<NamespaceConfig>,
    /// Qualified class names (`Ns.Name`) excluded from generation. Any
    /// reference to one of these degrades to `unknown` instead of a dangling
    /// type reference.
    #[serde(default)]
    pub skip_classes: Vec<String>,
    #[serde(default)]
    pub jsx: JsxConfig,
}

/// Output settings.
#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    /// Directory the generated TypeScript tree is written to.
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("generated")
}

fn default_gir_dirs() -> Vec<PathBuf> {
    vec![PathBuf::from("/usr/share/gir-1.0")]
}

/// One namespace to load and generate, e.g. `Gtk` `4.0`.
#[derive(Debug, Deserialize)]
pub struct NamespaceConfig {
    pub name: String,
    pub version: String,
    /// Overrides the `shared-library` attribute from the GIR data.
    #[serde(default)]
    pub shared_library: Option<String>,
}

impl NamespaceConfig {
    /// File name of the introspection data, e.g. `Gtk-4.0.gir`.
    pub fn gir_file(&self) -> String {
        format!("{}-{}.gir", self.name, self.version)
    }
}

/// JSX / reconciler-metadata generation settings.
#[derive(Debug, Deserialize)]
pub struct JsxConfig {
    /// Qualified name of the widget hierarchy root.
    #[serde(default = "default_widget_root")]
    pub widget_root: String,
    /// Prop names owned by the base component contract; widget properties
    /// colliding with these are not surfaced on prop interfaces.
    #[serde(default = "default_base_props")]
    pub base_component_props: Vec<String>,
}

impl Default for JsxConfig {
    fn default() -> Self {
        JsxConfig {
            widget_root: default_widget_root(),
            base_component_props: default_base_props(),
        }
    }
}

fn default_widget_root() -> String {
    "Gtk.Widget".to_string()
}

fn default_base_props() -> Vec<String> {
    ["children", "key", "ref"].map(str::to_string).to_vec()
}

/// Resolve a `.gir` file by searching `base_dir` first, then each `gir_dirs`
/// entry. Absolute paths are returned as-is. If the file is not found
/// anywhere, falls back to `base_dir.join(file)` so the caller gets a
/// meaningful I/O error.
pub fn resolve_gir(file: &str, base_dir: &Path, gir_dirs: &[PathBuf]) -> PathBuf {
    let as_path = Path::new(file);
    if as_path.is_absolute() {
        return as_path.to_path_buf();
    }
    let candidate = base_dir.join(file);
    if candidate.exists() {
        return candidate;
    }
    for dir in gir_dirs {
        let candidate = dir.join(file);
        if candidate.exists() {
            return candidate;
        }
    }
    base_dir.join(file)
}

/// Load and parse a `girt.toml` configuration file.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let config: Config = toml::from_str(&content)
        .map_err(|e| anyhow::anyhow!("failed to parse config file {}: {}", path.display(), e))?;
    Ok(config)
}
