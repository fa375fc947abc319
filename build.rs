use std::process::Command;

/// Runs git in the package directory and returns its trimmed stdout.
fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    Some(text.trim().to_string())
}

fn main() {
    for path in [".git/HEAD", ".git/index", ".git/packed-refs"] {
        println!("cargo:rerun-if-changed={}", path);
    }

    // Uncommitted changes get a "-dirty" suffix so local builds are recognizable.
    let version = match git(&["rev-parse", "--short", "HEAD"]) {
        Some(sha) => match git(&["status", "--porcelain", "--untracked-files=no"]) {
            Some(changes) if !changes.is_empty() => format!("{}-dirty", sha),
            _ => sha,
        },
        None => "unknown".to_string(),
    };

    println!("cargo:rustc-env=UPDATE_TESTER_GIT_SHA={}", version);
}
