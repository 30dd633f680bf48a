//! # Cart
//!
//! The pure cart: an ordered list of line items with merge-by-identity,
//! derived totals and the single-restaurant guard. No I/O happens here; the
//! persisted, shareable wrapper is `feast_state::CartEngine`.
//!
//! ## Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Operations                                      │
//! │                                                                         │
//! │  add_item(item, qty, notes, options)                                    │
//! │     ├── same item id + same options ──► line.quantity += qty            │
//! │     └── otherwise ────────────────────► push new line (fresh id)        │
//! │                                                                         │
//! │  update_quantity(id, n)                                                 │
//! │     ├── n <= 0 ──► RemovalRequested(id)   (nothing changes)             │
//! │     └── n >= 1 ──► line.quantity = n                                    │
//! │                                                                         │
//! │  remove_item(id) / clear()                                              │
//! │                                                                         │
//! │  total() = Σ (price + choice surcharges) × quantity                     │
//! │  item_count() = Σ quantity                                              │
//! │  restaurant_id() = first line's restaurant                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Single-Restaurant Invariant
//! A cart holds items from one restaurant. `add_item` does NOT enforce this;
//! callers check [`Cart::can_add_from_restaurant`] first and decide whether to
//! block the add or clear the cart.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{CartLineItem, MenuItem, PricingRules, SelectedOption};

// =============================================================================
// Outcomes
// =============================================================================

/// Result of [`Cart::update_quantity`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", content = "lineId", rename_all = "camelCase")]
#[ts(export)]
pub enum QuantityUpdate {
    /// The line now has the requested quantity.
    Updated(String),

    /// The request would drop the line to zero. Nothing changed; the caller
    /// must confirm with the user and then call `remove_item`.
    RemovalRequested(String),

    /// No line with that id. Nothing changed.
    NotFound(String),
}

/// What [`Cart::repair`] changed in a list read back from storage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CartRepair {
    /// Lines stored with quantity 0, now 1.
    pub raised_quantities: usize,
    /// Lines dropped because an earlier line had the same id.
    pub dropped_duplicates: usize,
}

impl CartRepair {
    pub fn is_clean(&self) -> bool {
        self.raised_quantities == 0 && self.dropped_duplicates == 0
    }
}

// =============================================================================
// Cart
// =============================================================================

/// An ordered collection of cart lines. Insertion order is display order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<CartLineItem>,
}

impl Cart {
    /// Creates a new empty cart.
    pub fn new() -> Self {
        Cart::default()
    }

    /// Wraps an already-built list, e.g. one loaded from storage.
    pub fn from_items(items: Vec<CartLineItem>) -> Self {
        Cart { items }
    }

    /// Restores the line invariants on a list that did not come from
    /// [`Cart`] operations: quantities are at least 1 and the first line
    /// with a given id wins.
    pub fn repair(&mut self) -> CartRepair {
        let mut repair = CartRepair::default();
        let mut seen = HashSet::new();

        self.items.retain_mut(|line| {
            if !seen.insert(line.id.clone()) {
                repair.dropped_duplicates += 1;
                return false;
            }
            if line.quantity == 0 {
                line.quantity = 1;
                repair.raised_quantities += 1;
            }
            true
        });

        repair
    }

    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    pub fn into_items(self) -> Vec<CartLineItem> {
        self.items
    }

    /// Looks up a line by id.
    pub fn line(&self, line_id: &str) -> Option<&CartLineItem> {
        self.items.iter().find(|l| l.id == line_id)
    }

    /// Adds a menu item, merging into an identical configuration if present.
    ///
    /// On merge the existing line's special instructions are kept and the new
    /// ones are dropped. A quantity of 0 counts as 1.
    ///
    /// ## Returns
    /// The id of the line that now holds the item.
    pub fn add_item(
        &mut self,
        menu_item: MenuItem,
        quantity: u32,
        special_instructions: Option<String>,
        selected_options: Option<Vec<SelectedOption>>,
    ) -> String {
        let id = CartLineItem::generate_id(&menu_item.id);
        self.add_item_with_id(id, menu_item, quantity, special_instructions, selected_options)
    }

    /// Same as [`Cart::add_item`] with a caller supplied id for a new line.
    ///
    /// Used when replaying journaled adds so a line keeps the id its caller
    /// was already given.
    pub fn add_item_with_id(
        &mut self,
        line_id: String,
        menu_item: MenuItem,
        quantity: u32,
        special_instructions: Option<String>,
        selected_options: Option<Vec<SelectedOption>>,
    ) -> String {
        let quantity = quantity.max(1);

        if let Some(line) = self
            .items
            .iter_mut()
            .find(|l| l.same_configuration(&menu_item.id, selected_options.as_deref()))
        {
            line.quantity = line.quantity.saturating_add(quantity);
            return line.id.clone();
        }

        let line = CartLineItem::with_id(
            line_id,
            menu_item,
            quantity,
            special_instructions,
            selected_options,
        );
        let id = line.id.clone();
        self.items.push(line);
        id
    }

    /// Removes a line. Unknown ids are ignored.
    ///
    /// ## Returns
    /// `true` if a line was removed.
    pub fn remove_item(&mut self, line_id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|l| l.id != line_id);
        self.items.len() != before
    }

    /// Sets a line's quantity to exactly `quantity`.
    ///
    /// A quantity of zero or below never removes the line; it returns
    /// [`QuantityUpdate::RemovalRequested`] instead. Quantities above
    /// `u32::MAX` are stored as `u32::MAX`.
    pub fn update_quantity(&mut self, line_id: &str, quantity: i64) -> QuantityUpdate {
        if quantity <= 0 {
            return if self.line(line_id).is_some() {
                QuantityUpdate::RemovalRequested(line_id.to_string())
            } else {
                QuantityUpdate::NotFound(line_id.to_string())
            };
        }

        match self.items.iter_mut().find(|l| l.id == line_id) {
            Some(line) => {
                // Saturate rather than wrap
                line.quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
                QuantityUpdate::Updated(line_id.to_string())
            }
            None => QuantityUpdate::NotFound(line_id.to_string()),
        }
    }

    /// Clears all items from the cart.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Checks if the cart is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of distinct lines.
    pub fn line_count(&self) -> usize {
        self.items.len()
    }

    /// Sum of all line quantities.
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|l| u64::from(l.quantity)).sum()
    }

    /// Sum of every line's unit price (with surcharges) × quantity.
    pub fn total(&self) -> Money {
        self.items.iter().map(CartLineItem::line_total).sum()
    }

    /// Restaurant owning this cart, taken from the first line.
    pub fn restaurant_id(&self) -> Option<&str> {
        self.items.first().map(CartLineItem::restaurant_id)
    }

    /// Whether an item from `restaurant_id` may join this cart.
    ///
    /// Advisory only: nothing is mutated and `add_item` does not consult it.
    pub fn can_add_from_restaurant(&self, restaurant_id: &str) -> bool {
        match self.restaurant_id() {
            None => true,
            Some(current) => current == restaurant_id,
        }
    }

    /// Checkout breakdown for the cart screen.
    pub fn summary(&self, rules: &PricingRules) -> CartSummary {
        CartSummary::compute(self, rules)
    }

    /// Replays buffered mutations on top of this cart.
    ///
    /// Line ids handed out before the replay keep working: when a journaled
    /// add merges into an existing line, later operations on the journaled id
    /// are redirected to the surviving line.
    ///
    /// ## Returns
    /// The aliases created: journaled line id → surviving line id.
    pub fn replay(&mut self, ops: impl IntoIterator<Item = CartOp>) -> HashMap<String, String> {
        let mut aliases: HashMap<String, String> = HashMap::new();
        let resolve = |aliases: &HashMap<String, String>, id: String| -> String {
            aliases.get(&id).cloned().unwrap_or(id)
        };

        for op in ops {
            match op {
                CartOp::Add {
                    line_id,
                    menu_item,
                    quantity,
                    special_instructions,
                    selected_options,
                } => {
                    let actual = self.add_item_with_id(
                        line_id.clone(),
                        menu_item,
                        quantity,
                        special_instructions,
                        selected_options,
                    );
                    if actual != line_id {
                        aliases.insert(line_id, actual);
                    }
                }
                CartOp::Remove { line_id } => {
                    self.remove_item(&resolve(&aliases, line_id));
                }
                CartOp::SetQuantity { line_id, quantity } => {
                    self.update_quantity(&resolve(&aliases, line_id), i64::from(quantity));
                }
                CartOp::Clear => self.clear(),
            }
        }
        aliases
    }
}

// =============================================================================
// Journaled Operations
// =============================================================================

/// A state-changing cart operation, recorded so it can be replayed.
#[derive(Debug, Clone, PartialEq)]
pub enum CartOp {
    Add {
        line_id: String,
        menu_item: MenuItem,
        quantity: u32,
        special_instructions: Option<String>,
        selected_options: Option<Vec<SelectedOption>>,
    },
    Remove {
        line_id: String,
    },
    SetQuantity {
        line_id: String,
        quantity: u32,
    },
    Clear,
}

// =============================================================================
// Summary
// =============================================================================

/// Cart totals as shown on the checkout screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CartSummary {
    pub line_count: usize,
    #[ts(type = "number")]
    pub item_count: u64,
    pub subtotal: Money,
    pub delivery_fee: Money,
    pub tax: Money,
    pub total: Money,
}

impl CartSummary {
    /// Computes the breakdown. An empty cart is all zeros; no delivery fee is
    /// charged for nothing.
    pub fn compute(cart: &Cart, rules: &PricingRules) -> Self {
        if cart.is_empty() {
            return CartSummary {
                line_count: 0,
                item_count: 0,
                subtotal: Money::zero(),
                delivery_fee: Money::zero(),
                tax: Money::zero(),
                total: Money::zero(),
            };
        }

        let subtotal = cart.total();
        let tax = subtotal.calculate_tax(rules.tax_rate);

        CartSummary {
            line_count: cart.line_count(),
            item_count: cart.item_count(),
            subtotal,
            delivery_fee: rules.delivery_fee,
            tax,
            total: subtotal + rules.delivery_fee + tax,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
