use std::path::PathBuf;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let workspace_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("..");
    let output_dir = workspace_dir.join("generated/gtk4");

    girt_gtk_gen::generate(&output_dir);

    println!("Generated GTK4 bindings at {}", output_dir.display());
}
