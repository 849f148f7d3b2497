//! One-shot connectivity check for the configured inference backend.
//!
//! Usage: cargo run --bin check_api [rakabot.json]
//!
//! Sends "Hello!" once and prints the reply. Exits with status 1 on failure.

use std::path::PathBuf;

use rakabot::config::Config;
use rakabot::inference::{Backend, Inference};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let path = std::env::args().nth(1).map(PathBuf::from);
    let config = match Config::load(path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {e}");
            std::process::exit(1);
        }
    };

    let backend = match Backend::from_config(&config) {
        Ok(backend) => backend,
        Err(e) => {
            eprintln!("❌ Failed to build HTTP client: {e}");
            std::process::exit(1);
        }
    };

    match backend.infer("Hello!").await {
        Ok(text) => {
            println!("✅ {} API connection successful!", backend.name());
            println!("Response: {text}");
        }
        Err(e) => {
            println!("❌ {} API error: {e}", backend.name());
            std::process::exit(1);
        }
    }
}
