//! xbridge CLI - X (Twitter) account bridge
//!
//! Run with: cargo run --bin xbridge -- <command>
//! Or after build: ./target/release/xbridge <command>

#[tokio::main]
async fn main() {
    // Load .env file as early as possible
    // This loads environment variables for client credentials, DSNs, etc.
    let _ = dotenvy::dotenv();

    // Initialize logging
    xbridge::init_logging();

    // Run CLI (delegates to operations)
    if let Err(e) = xbridge::cli::run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
