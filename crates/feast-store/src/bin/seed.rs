//! # Seed Tool
//!
//! Writes the demo user profile into a development database.
//!
//! ## Usage
//! ```bash
//! cargo run -p feast-store --bin feast-seed
//! cargo run -p feast-store --bin feast-seed -- --db ./data/feast.db
//! cargo run -p feast-store --bin feast-seed -- --force
//! ```

use std::env;

use feast_core::{User, CART_STORAGE_KEY, USER_STORAGE_KEY};
use feast_store::{KeyValueStore, SqliteStore, StoreConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./feast_dev.db");
    let mut force = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--force" | "-f" => force = true,
            "--help" | "-h" => {
                println!("Feast Seed Tool");
                println!();
                println!("Usage: feast-seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./feast_dev.db)");
                println!("  -f, --force        Overwrite an existing profile and empty the cart");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Feast Seed Tool");
    println!("==================");
    println!("Database: {}", db_path);
    println!();

    let store = SqliteStore::new(StoreConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    if !force && store.get(USER_STORAGE_KEY).await?.is_some() {
        println!("⚠ A user profile is already stored");
        println!("  Pass --force to overwrite it.");
        store.close().await;
        return Ok(());
    }

    let user = User::demo();
    store
        .set(USER_STORAGE_KEY, serde_json::to_vec(&user)?)
        .await?;
    println!(
        "✓ Stored profile for {} ({} addresses, {} favourites)",
        user.name,
        user.addresses.len(),
        user.favorites.len()
    );

    if force {
        store.set(CART_STORAGE_KEY, b"[]".to_vec()).await?;
        println!("✓ Emptied saved cart");
    }

    store.close().await;

    println!();
    println!("✓ Seed complete!");
    Ok(())
}
