use std::process::Command;

fn main() {
    // Get current date in YY-MM-DD format
    let date = Command::new("date")
        .args(["+%y-%m-%d"])
        .output()
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
        .unwrap_or_else(|_| "00-00-00".to_string());

    // Get commit count
    let commit_count = Command::new("git")
        .args(["rev-list", "--count", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
        .unwrap_or_else(|| "0".to_string());

    // Version: PKG+YY-MM-DD.COMMITCOUNT
    let pkg_version = std::env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "0.0.0".to_string());
    let version = format!("{}+{}.{}", pkg_version, date, commit_count);

    println!("cargo:rustc-env=FRUIT_VERSION={}", version);

    // The crate sits below the workspace root, so ask git where its directory is.
    if let Some(git_dir) = git_dir() {
        println!("cargo:rerun-if-changed={}/HEAD", git_dir);
        println!("cargo:rerun-if-changed={}/refs/heads", git_dir);
        println!("cargo:rerun-if-changed={}/packed-refs", git_dir);
    }
}

fn git_dir() -> Option<String> {
    Command::new("git")
        .args(["rev-parse", "--absolute-git-dir"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
        .filter(|dir| !dir.is_empty())
}
