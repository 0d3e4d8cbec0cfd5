// build.rs - stamps the build date into the binary banner

use chrono::Utc;
use std::env;
use std::fs;
use std::path::Path;

fn main() {
    let out_dir = env::var("OUT_DIR").expect("cargo sets OUT_DIR");
    let dest = Path::new(&out_dir).join("build_info.rs");

    let build_date = Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string();
    fs::write(&dest, format!("pub const BUILD_DATE: &str = \"{}\";\n", build_date))
        .expect("writing build_info.rs");

    // only rerun when this script changes, so the stamp marks a real rebuild
    println!("cargo:rerun-if-changed=build.rs");
}
