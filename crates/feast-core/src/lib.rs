//! # feast-core: Pure Business Logic for Feast
//!
//! Everything the food-ordering app decides without touching storage or the
//! network: cart merging and totals, option selection, the profile's
//! address rules, checkout charges.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Feast Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Mobile UI                                    │   │
//! │  │    Restaurant ──► Menu Item ──► Cart ──► Checkout ──► Profile   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              feast-state (CartEngine, UserStore)                │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ feast-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   cart    │  │ selection │  │   │
//! │  │   │ MenuItem  │  │   Money   │  │   Cart    │  │  options  │  │   │
//! │  │   │   User    │  │  TaxRate  │  │  Summary  │  │  preview  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO STORAGE • NO NETWORK • PURE FUNCTIONS            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (MenuItem, CartLineItem, User, ...)
//! - [`money`] - Money type with integer arithmetic
//! - [`cart`] - The cart and its checkout summary
//! - [`selection`] - Option picking on the menu-item screen
//! - [`profile`] - Profile, address and favourite rules
//! - [`catalog`] - Read-only menu lookup
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use feast_core::{Cart, MenuItem, SelectedOption};
//! use feast_core::types::{MenuItemOption, OptionChoice};
//!
//! let pizza = MenuItem {
//!     id: "m1".into(),
//!     restaurant_id: "r1".into(),
//!     name: "Margherita".into(),
//!     description: String::new(),
//!     price_cents: 1000,
//!     image: String::new(),
//!     category: "Pizza".into(),
//!     popular: true,
//!     tags: vec![],
//!     options: Some(vec![MenuItemOption {
//!         id: "size".into(),
//!         name: "Size".into(),
//!         choices: vec![OptionChoice { id: "large".into(), name: "Large".into(), price_cents: 300 }],
//!         required: true,
//!         multiple: false,
//!     }]),
//! };
//!
//! let mut cart = Cart::new();
//! cart.add_item(pizza, 2, None, Some(vec![SelectedOption::new("size", ["large"])]));
//!
//! assert_eq!(cart.total().cents(), 2600);
//! assert!(!cart.can_add_from_restaurant("r2"));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod catalog;
pub mod error;
pub mod money;
pub mod profile;
pub mod selection;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{Cart, CartOp, CartRepair, CartSummary, QuantityUpdate};
pub use catalog::{MenuCatalog, StaticCatalog};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use profile::{AddressPatch, NewAddress, UserPatch};
pub use selection::OptionSelection;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Storage key of the serialized cart.
pub const CART_STORAGE_KEY: &str = "foodMarketplace:cart";

/// Storage key of the serialized user profile.
pub const USER_STORAGE_KEY: &str = "foodMarketplace:user";

/// Flat delivery fee charged per order, in cents ($2.99).
pub const DEFAULT_DELIVERY_FEE_CENTS: i64 = 299;

/// Tax on the cart subtotal, in basis points (8%).
pub const DEFAULT_TAX_RATE_BPS: u32 = 800;

/// Largest quantity the quantity selector offers for one add.
pub const MAX_ITEM_QUANTITY: i64 = 99;
