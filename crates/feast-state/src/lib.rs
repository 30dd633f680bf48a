//! # feast-state: Persisted App State for Feast
//!
//! The services the mobile UI talks to. Each is a cheap `Clone` handle that
//! can be handed to any screen.
//!
//! ## Module Organization
//! ```text
//! feast_state/
//! ├── lib.rs          ◄─── You are here (startup wiring, tracing)
//! ├── cart.rs         ◄─── CartEngine: the persisted cart
//! ├── user.rs         ◄─── UserStore: the persisted profile
//! ├── persist.rs      ◄─── hydration read + ordered background writer
//! ├── config.rs       ◄─── AppConfig (TOML + env)
//! └── error.rs        ◄─── StateError
//! ```
//!
//! ## Separate Services
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  ┌──────────────────┐ ┌──────────────────┐ ┌──────────────────────┐   │
//! │  │   CartEngine     │ │    UserStore     │ │     AppConfig        │   │
//! │  │                  │ │                  │ │                      │   │
//! │  │  • Lines         │ │  • Profile       │ │  • Storage keys      │   │
//! │  │  • Totals        │ │  • Addresses     │ │  • Delivery fee      │   │
//! │  │  • Restaurant    │ │  • Favourites    │ │  • Tax rate          │   │
//! │  └────────┬─────────┘ └────────┬─────────┘ └──────────────────────┘   │
//! │           │                    │                                        │
//! │           └─────────┬──────────┘                                        │
//! │                     ▼                                                   │
//! │        Arc<dyn KeyValueStore> (feast-store)                             │
//! │                                                                         │
//! │  Each screen takes only the service it needs.                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod cart;
pub mod config;
pub mod error;
mod persist;
pub mod user;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use feast_core::User;
use feast_store::{KeyValueStore, SqliteStore, StoreConfig};

pub use cart::{CartEngine, CartEvent};
pub use config::AppConfig;
pub use error::{StateError, StateResult};
pub use user::UserStore;

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug logs
/// - `RUST_LOG=feast=trace` - Show trace for feast crates only
/// - Default: INFO, DEBUG for feast crates
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,feast=debug,sqlx=warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init();
}

/// Everything the app needs at startup.
///
/// ## Startup Sequence
/// ```text
/// AppConfig::load_or_default(None)
///      │
///      ▼
/// SqliteStore::new(database_path)   ← creates the file, runs migrations
///      │
///      ├──► CartEngine::spawn(store, cart_key)   ← hydration in background
///      └──► UserStore::spawn(store, user_key)    ← hydration in background
/// ```
#[derive(Debug, Clone)]
pub struct Services {
    pub config: AppConfig,
    pub cart: CartEngine,
    pub user: UserStore,
}

impl Services {
    /// Opens the SQLite store named by `config` and starts both services.
    pub async fn start(config: AppConfig) -> StateResult<Self> {
        config.validate()?;

        let store = SqliteStore::new(StoreConfig::new(&config.storage.database_path)).await?;
        info!(path = %config.storage.database_path.display(), "Store opened");

        Ok(Self::with_store(config, Arc::new(store)))
    }

    /// Starts both services over an existing store.
    pub fn with_store(config: AppConfig, store: Arc<dyn KeyValueStore>) -> Self {
        let cart = CartEngine::spawn(Arc::clone(&store), config.storage.cart_key.clone());
        let user = UserStore::spawn(store, config.storage.user_key.clone(), User::demo());
        Services { config, cart, user }
    }

    /// Waits for both services to finish hydrating.
    pub async fn wait_loaded(&self) {
        self.cart.wait_loaded().await;
        self.user.wait_loaded().await;
    }

    /// Waits for every queued write of both services.
    pub async fn flush(&self) {
        self.cart.flush().await;
        self.user.flush().await;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
