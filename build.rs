//! Build script for queuecard.
//!
//! Copies the `.env.example` template into the local data directory so
//! users find it next to the `.env` file the binary loads.

use std::{env, fs, path::PathBuf};

/// Copies `.env.example` from the crate root to
/// `<data_local_dir>/queuecard/.env.example`.
///
/// Problems are reported as cargo warnings and never fail the build.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=.env.example");

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let env_example_path = manifest_dir.join(".env.example");

    let mut out_dir = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    out_dir.push("queuecard");
    if env_example_path.is_file() {
        let copied = fs::create_dir_all(&out_dir)
            .and_then(|_| fs::read_to_string(&env_example_path))
            .and_then(|contents| fs::write(out_dir.join(".env.example"), contents));
        if let Err(e) = copied {
            println!(
                "cargo:warning=could not copy .env.example to {}: {}",
                out_dir.display(),
                e
            );
        }
    } else {
        println!(
            "cargo:warning=.env.example not found at {}",
            env_example_path.display()
        );
    }

    Ok(())
}
