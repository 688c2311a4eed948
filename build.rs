use chrono::Utc;
use std::env;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::process::Command;

// Emits OUT_DIR/version.rs with the constants read by core::version
fn main() {
    let out_dir = env::var_os("OUT_DIR").unwrap();
    let dest_path = Path::new(&out_dir).join("version.rs");
    let mut f = File::create(&dest_path).unwrap();

    let build_time = Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string();
    let git_hash = short_git_hash().unwrap_or_else(|| "unknown".to_string());

    write_const(&mut f, "BUILD_TIME", &build_time);
    write_const(&mut f, "GIT_HASH", &git_hash);

    for watched in ["build.rs", "Cargo.toml", ".git/HEAD"] {
        println!("cargo:rerun-if-changed={}", watched);
    }
}

// None outside a git checkout or without git on PATH
fn short_git_hash() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let hash = String::from_utf8(output.stdout).ok()?;
    Some(hash.trim().to_string())
}

fn write_const(f: &mut File, name: &str, value: &str) {
    writeln!(f, "pub const {}: &str = {:?};", name, value).unwrap();
}
