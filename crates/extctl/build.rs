//! Embeds build metadata read by `extctl version`

use std::process::Command;

fn emit(key: &str, value: &str) {
    println!("cargo:rustc-env=EXTCTL_{}={}", key, value);
}

fn short_sha() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short=7", "HEAD"])
        .output()
        .ok()?;
    let sha = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (output.status.success() && !sha.is_empty()).then_some(sha)
}

fn main() {
    emit("BUILD_DATE", &chrono::Utc::now().date_naive().to_string());
    if let Ok(target) = std::env::var("TARGET") {
        emit("TARGET", &target);
    }
    if let Some(sha) = short_sha() {
        emit("GIT_SHA", &sha);
    }

    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=../../.git/HEAD");
}
