use std::env;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

fn main() {
    let out_dir = env::var("OUT_DIR").unwrap();
    let dest_path = Path::new(&out_dir).join("catalogs.rs");

    let mut code = String::new();
    code.push_str("/// Embedded catalog files\n");
    code.push_str("pub static CATALOGS: &[(&str, &str)] = &[\n");

    let data_dir = Path::new("data");

    if data_dir.exists() {
        let mut entries: Vec<_> = WalkDir::new(data_dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map_or(false, |ext| ext == "json"))
            .collect();
        entries.sort_by(|a, b| a.path().cmp(b.path()));

        for entry in entries {
            let path = entry.path();
            let relative_path = path.strip_prefix(data_dir).unwrap();
            let name = relative_path.to_string_lossy().replace('\\', "/");

            if let Ok(content) = fs::read_to_string(path) {
                // Debug formatting yields a valid, fully escaped Rust string literal
                code.push_str(&format!("    ({:?}, {:?}),\n", name, content));
            }
        }
    }

    code.push_str("];\n");

    fs::write(&dest_path, code).unwrap();

    println!("cargo:rerun-if-changed=data");
}
