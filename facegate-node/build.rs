//! Build identification for facegate-node
//!
//! Sets GIT_HASH (short hash, `-dirty` when the tree has local edits),
//! BUILD_TIMESTAMP and BUILD_PROFILE for the start-up banner and `/health`.

use std::process::Command;

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout)
        .ok()
        .map(|text| text.trim().to_string())
}

fn main() {
    let git_hash = match git(&["rev-parse", "--short=8", "HEAD"]) {
        Some(hash) => match git(&["status", "--porcelain"]) {
            Some(changes) if !changes.is_empty() => format!("{}-dirty", hash),
            _ => hash,
        },
        None => "unknown".to_string(),
    };

    let built_at = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());

    for (key, value) in [
        ("GIT_HASH", git_hash),
        ("BUILD_TIMESTAMP", built_at),
        ("BUILD_PROFILE", profile),
    ] {
        println!("cargo:rustc-env={}={}", key, value);
    }
}
