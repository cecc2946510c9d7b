use std::path::Path;

/// Generate the GTK4 binding tree at `output_dir`.
///
/// Runs girt on `gtk4.toml`, which names the standard GTK4 namespace set
/// (GLib/GObject/Gio up through Gtk). The gir files are resolved from
/// `/usr/share/gir-1.0`; install the `-dev`/`-devel` GTK4 packages first.
pub fn generate(output_dir: &Path) {
    let gen_dir = Path::new(env!("CARGO_MANIFEST_DIR"));

    girt::run(&gen_dir.join("gtk4.toml"), Some(output_dir))
        .expect("girt failed to generate the GTK4 tree");
}
