//! Bakes relay defaults from `.env` into the firmware image.
//!
//! Values are read from the process environment first, then from a `.env`
//! file in the crate or workspace root. Anything unset keeps the built-in
//! default.

const OVERRIDES: [&str; 3] = ["ENVNODE_TEMP_HIGH", "ENVNODE_TEMP_LOW", "ENVNODE_INTERVAL_MS"];

fn main() {
    match dotenvy::dotenv() {
        Ok(path) => println!("cargo:rerun-if-changed={}", path.display()),
        Err(_) => println!("cargo:rerun-if-changed=.env"),
    }

    for key in OVERRIDES {
        println!("cargo:rerun-if-env-changed={key}");
        if let Ok(value) = std::env::var(key) {
            println!("cargo:rustc-env={key}={value}");
        }
    }
}
