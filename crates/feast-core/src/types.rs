//! # Domain Types
//!
//! Core domain types used throughout Feast.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    MenuItem     │   │ MenuItemOption  │   │  OptionChoice   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │──►│  id, name       │──►│  id, name       │       │
//! │  │  restaurant_id  │   │  required       │   │  price_cents    │       │
//! │  │  price_cents    │   │  multiple       │   │  (surcharge)    │       │
//! │  └────────┬────────┘   └─────────────────┘   └─────────────────┘       │
//! │           │ snapshot                                                    │
//! │  ┌────────▼────────┐   ┌─────────────────┐                             │
//! │  │  CartLineItem   │──►│ SelectedOption  │                             │
//! │  │  id, quantity   │   │ option_id       │                             │
//! │  │  instructions   │   │ choice_ids      │                             │
//! │  └─────────────────┘   └─────────────────┘                             │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      User       │──►│    Address      │   │  PricingRules   │       │
//! │  │  favorites      │   │  default flag   │   │  fee, tax rate  │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All types serialize with camelCase field names; these are the shapes
//! stored in the key-value store and exported to the mobile UI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// 1 basis point = 0.01%, so 800 bps = 8%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage (for convenience).
    pub fn from_percentage(pct: f64) -> Self {
        TaxRate((pct * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::from_bps(crate::DEFAULT_TAX_RATE_BPS)
    }
}

// =============================================================================
// Pricing Rules
// =============================================================================

/// Checkout charges applied on top of the cart subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PricingRules {
    /// Flat delivery fee per order.
    pub delivery_fee: Money,

    /// Tax applied to the subtotal.
    pub tax_rate: TaxRate,
}

impl Default for PricingRules {
    fn default() -> Self {
        PricingRules {
            delivery_fee: Money::from_cents(crate::DEFAULT_DELIVERY_FEE_CENTS),
            tax_rate: TaxRate::default(),
        }
    }
}

// =============================================================================
// Menu Items
// =============================================================================

/// One selectable value of a menu item option, e.g. "Large".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct OptionChoice {
    pub id: String,
    pub name: String,
    /// Surcharge in cents. Zero for free choices.
    pub price_cents: i64,
}

impl OptionChoice {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

/// A customization axis of a menu item, e.g. "Size" or "Toppings".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct MenuItemOption {
    pub id: String,
    pub name: String,
    pub choices: Vec<OptionChoice>,
    /// A choice must be selected before the item can be ordered.
    pub required: bool,
    /// More than one choice may be selected at the same time.
    pub multiple: bool,
}

impl MenuItemOption {
    /// Looks up a choice by id.
    pub fn choice(&self, choice_id: &str) -> Option<&OptionChoice> {
        self.choices.iter().find(|c| c.id == choice_id)
    }
}

/// A dish offered by a restaurant.
///
/// Owned by the menu catalog. Carts hold full copies taken at add time, so a
/// later catalog change never reprices an item already in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct MenuItem {
    pub id: String,
    pub restaurant_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Base price in cents, before option surcharges.
    pub price_cents: i64,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub popular: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub options: Option<Vec<MenuItemOption>>,
}

impl MenuItem {
    /// Returns the base price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Looks up an option by id.
    pub fn option(&self, option_id: &str) -> Option<&MenuItemOption> {
        self.options
            .as_deref()
            .and_then(|opts| opts.iter().find(|o| o.id == option_id))
    }

    /// Surcharge of one choice, zero when the option or choice is unknown.
    pub fn choice_price(&self, option_id: &str, choice_id: &str) -> Money {
        self.option(option_id)
            .and_then(|opt| opt.choice(choice_id))
            .map(OptionChoice::price)
            .unwrap_or_default()
    }

    /// Base price plus the surcharges of every selected choice.
    ///
    /// Selections that no longer resolve against this item's options
    /// contribute nothing.
    pub fn unit_price(&self, selected: Option<&[SelectedOption]>) -> Money {
        let surcharges: Money = selected
            .unwrap_or_default()
            .iter()
            .flat_map(|sel| {
                sel.choice_ids
                    .iter()
                    .map(move |choice_id| self.choice_price(&sel.option_id, choice_id))
            })
            .sum();

        self.price() + surcharges
    }
}

// =============================================================================
// Cart Line Items
// =============================================================================

/// The choices picked for one option of one cart line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SelectedOption {
    pub option_id: String,
    pub choice_ids: Vec<String>,
}

impl SelectedOption {
    pub fn new<I, S>(option_id: impl Into<String>, choice_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SelectedOption {
            option_id: option_id.into(),
            choice_ids: choice_ids.into_iter().map(Into::into).collect(),
        }
    }
}

/// One entry in the cart: a menu item configuration and a quantity.
///
/// ## Invariants
/// - `id` is unique within the cart
/// - `quantity` is at least 1
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CartLineItem {
    pub id: String,

    /// Frozen copy of the menu item at the time it was added.
    pub menu_item: MenuItem,

    pub quantity: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub special_instructions: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub selected_options: Option<Vec<SelectedOption>>,

    #[serde(default = "Utc::now")]
    #[ts(as = "String")]
    pub added_at: DateTime<Utc>,
}

impl CartLineItem {
    /// Creates a line with a freshly generated id.
    pub fn new(
        menu_item: MenuItem,
        quantity: u32,
        special_instructions: Option<String>,
        selected_options: Option<Vec<SelectedOption>>,
    ) -> Self {
        let id = Self::generate_id(&menu_item.id);
        Self::with_id(id, menu_item, quantity, special_instructions, selected_options)
    }

    /// Creates a line with a caller supplied id.
    pub fn with_id(
        id: String,
        menu_item: MenuItem,
        quantity: u32,
        special_instructions: Option<String>,
        selected_options: Option<Vec<SelectedOption>>,
    ) -> Self {
        CartLineItem {
            id,
            menu_item,
            quantity: quantity.max(1),
            special_instructions,
            selected_options,
            added_at: Utc::now(),
        }
    }

    /// Line ids are `{menu_item_id}-{uuid}`.
    pub fn generate_id(menu_item_id: &str) -> String {
        format!("{}-{}", menu_item_id, Uuid::new_v4().simple())
    }

    /// Whether this line holds the same configuration of the same item.
    ///
    /// Order-sensitive: `[a, b]` and `[b, a]` are different customizations,
    /// and no selection differs from an empty selection.
    pub fn same_configuration(
        &self,
        menu_item_id: &str,
        selected_options: Option<&[SelectedOption]>,
    ) -> bool {
        self.menu_item.id == menu_item_id
            && self.selected_options.as_deref() == selected_options
    }

    /// Unit price including option surcharges.
    pub fn unit_price(&self) -> Money {
        self.menu_item.unit_price(self.selected_options.as_deref())
    }

    /// Unit price × quantity.
    pub fn line_total(&self) -> Money {
        self.unit_price() * self.quantity
    }

    #[inline]
    pub fn restaurant_id(&self) -> &str {
        &self.menu_item.restaurant_id
    }
}

// =============================================================================
// User Profile
// =============================================================================

/// A saved delivery address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Address {
    pub id: String,
    /// Short label such as "Home" or "Work".
    pub title: String,
    pub address: String,
    pub lat: f64,
    pub lng: f64,
    pub default: bool,
}

/// The signed-in user's profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub addresses: Vec<Address>,
    /// Favourite restaurant ids, in the order they were added.
    #[serde(default)]
    pub favorites: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub profile_image: Option<String>,
}

// =============================================================================
// Unit Tests
// =============================================================================
