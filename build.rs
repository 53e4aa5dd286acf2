use std::process::Command;

fn main() {
    // Build date shown in the startup banner
    let now = chrono::Utc::now()
        .format("%Y-%m-%d %H:%M:%S UTC")
        .to_string();
    println!("cargo:rustc-env=BUILD_DATE={}", now);

    // Git commit hash if available; main falls back to "unknown"
    if let Ok(output) = Command::new("git").args(["rev-parse", "--short", "HEAD"]).output() {
        if output.status.success() {
            let commit = String::from_utf8_lossy(&output.stdout).trim().to_string();
            println!("cargo:rustc-env=GIT_COMMIT={}", commit);
        }
    }

    // Tell cargo to re-run if git HEAD changes
    println!("cargo:rerun-if-changed=.git/HEAD");
}
