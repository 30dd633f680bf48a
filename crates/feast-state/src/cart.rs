//! # Cart Engine
//!
//! The shared, persisted cart the UI talks to.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      CartEngine Lifecycle                               │
//! │                                                                         │
//! │  CartEngine::spawn(store, key)                                          │
//! │       │                                                                 │
//! │       ├──► hydration task: store.get(key)                               │
//! │       │                                                                 │
//! │       │    meanwhile (loaded = false):                                  │
//! │       │    add / remove / set quantity / clear                          │
//! │       │      ──► applied to the in-memory cart                          │
//! │       │      ──► recorded in the journal, nothing written               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  read resolves                                                          │
//! │       ├── saved list  ──► repaired, then journal replayed on top        │
//! │       ├── nothing     ──► keep the in-memory cart                       │
//! │       └── failure     ──► warn!, keep the in-memory cart                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  loaded = true, cart written once (if journaled or repaired)            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  every mutation ──► snapshot queued to the writer task                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Thread Safety
//! `CartEngine` is a cheap `Clone` handle over `Arc<Mutex<_>>`. Mutating
//! methods are synchronous: they hold the lock only for the in-memory change
//! and for queueing the snapshot, never across I/O.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use feast_core::validation::{validate_quantity, validate_required_options};
use feast_core::{
    Cart, CartLineItem, CartOp, CartSummary, CoreError, CoreResult, MenuCatalog, MenuItem, Money,
    PricingRules, QuantityUpdate, SelectedOption, CART_STORAGE_KEY, MAX_ITEM_QUANTITY,
};
use feast_store::KeyValueStore;

use crate::persist::{Loaded, Persister};

/// Capacity of the change-notification channel. Slow subscribers skip
/// events rather than block mutations.
const EVENT_CAPACITY: usize = 64;

// =============================================================================
// Events
// =============================================================================

/// Change notifications for views that mirror the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CartEvent {
    /// Hydration finished; `loaded` is now true.
    #[serde(rename_all = "camelCase")]
    Hydrated { line_count: usize },

    /// The lines changed.
    Changed,

    /// A quantity update asked to go to zero. The UI should confirm and then
    /// call `remove_item`.
    #[serde(rename_all = "camelCase")]
    RemovalRequested { line_id: String },
}

// =============================================================================
// Engine
// =============================================================================

struct CartInner {
    cart: Cart,
    loaded: bool,
    /// Mutations made before hydration, in order.
    journal: Vec<CartOp>,
    /// Session line ids merged into saved lines during hydration.
    aliases: HashMap<String, String>,
}

impl CartInner {
    fn resolve<'a>(&'a self, line_id: &'a str) -> &'a str {
        self.aliases.get(line_id).map(String::as_str).unwrap_or(line_id)
    }
}

struct Shared {
    state: Mutex<CartInner>,
    persister: Persister,
    loaded: watch::Sender<bool>,
    events: broadcast::Sender<CartEvent>,
}

/// The persisted shopping cart.
///
/// ## Usage
/// ```rust,ignore
/// let cart = CartEngine::spawn(store.clone(), CART_STORAGE_KEY);
///
/// if !cart.can_add_from_restaurant(&item.restaurant_id) {
///     // ask the user whether to start a new cart
/// }
/// let line_id = cart.add_item(item, 2, None, None);
///
/// match cart.update_quantity(&line_id, 0) {
///     QuantityUpdate::RemovalRequested(id) => { /* confirm, then */ cart.remove_item(&id); }
///     _ => {}
/// }
/// ```
#[derive(Clone)]
pub struct CartEngine {
    shared: Arc<Shared>,
}

impl CartEngine {
    /// Creates the engine and starts hydrating from `key`.
    ///
    /// Must be called inside a tokio runtime. The engine is usable at once;
    /// see the module docs for how early mutations are merged.
    pub fn spawn(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        let (loaded, _) = watch::channel(false);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let engine = CartEngine {
            shared: Arc::new(Shared {
                state: Mutex::new(CartInner {
                    cart: Cart::new(),
                    loaded: false,
                    journal: Vec::new(),
                    aliases: HashMap::new(),
                }),
                persister: Persister::spawn(store, key.into()),
                loaded,
                events,
            }),
        };

        tokio::spawn(hydrate(Arc::clone(&engine.shared)));
        engine
    }

    /// [`spawn`](Self::spawn) with the default storage key.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::spawn(store, CART_STORAGE_KEY)
    }

    /// Creates the engine and waits for hydration to finish.
    pub async fn load(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        let engine = Self::spawn(store, key);
        engine.wait_loaded().await;
        engine
    }

    fn lock(&self) -> MutexGuard<'_, CartInner> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Executes a function with read access to the cart.
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let names: Vec<String> = engine.with_cart(|cart| {
    ///     cart.items().iter().map(|l| l.menu_item.name.clone()).collect()
    /// });
    /// ```
    pub fn with_cart<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Cart) -> R,
    {
        let state = self.lock();
        f(&state.cart)
    }

    /// Runs a mutation, journaling or persisting it, then notifies
    /// subscribers if `changed` says it did something.
    fn with_cart_mut<F, R>(&self, f: F, changed: impl FnOnce(&R) -> bool) -> R
    where
        F: FnOnce(&mut CartInner) -> R,
    {
        let (result, did_change) = {
            let mut state = self.lock();
            let result = f(&mut *state);
            let did_change = changed(&result);
            if did_change && state.loaded {
                self.shared.persister.save(&state.cart);
            }
            (result, did_change)
        };

        if did_change {
            let _ = self.shared.events.send(CartEvent::Changed);
        }
        result
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Adds a menu item, merging into a line with the same item and options.
    ///
    /// No restaurant check happens here; call
    /// [`can_add_from_restaurant`](Self::can_add_from_restaurant) first.
    /// A quantity of 0 counts as 1.
    ///
    /// ## Returns
    /// The id of the line holding the item.
    pub fn add_item(
        &self,
        menu_item: MenuItem,
        quantity: u32,
        special_instructions: Option<String>,
        selected_options: Option<Vec<SelectedOption>>,
    ) -> String {
        let line_id = CartLineItem::generate_id(&menu_item.id);
        debug!(menu_item_id = %menu_item.id, quantity, "Adding to cart");

        self.with_cart_mut(
            |state| {
                if !state.loaded {
                    state.journal.push(CartOp::Add {
                        line_id: line_id.clone(),
                        menu_item: menu_item.clone(),
                        quantity,
                        special_instructions: special_instructions.clone(),
                        selected_options: selected_options.clone(),
                    });
                }
                state.cart.add_item_with_id(
                    line_id,
                    menu_item,
                    quantity,
                    special_instructions,
                    selected_options,
                )
            },
            |_| true,
        )
    }

    /// Adds an item by id, snapshotting the catalog's current record.
    ///
    /// ## Errors
    /// - [`CoreError::InvalidQuantity`] if `quantity` is below 1
    /// - [`CoreError::Validation`] if `quantity` exceeds [`MAX_ITEM_QUANTITY`]
    /// - [`CoreError::MenuItemNotFound`] if the catalog has no such item
    /// - [`CoreError::Validation`] if a required option has no choice
    pub fn add_from_catalog(
        &self,
        catalog: &impl MenuCatalog,
        menu_item_id: &str,
        quantity: i64,
        special_instructions: Option<String>,
        selected_options: Option<Vec<SelectedOption>>,
    ) -> CoreResult<String> {
        if quantity < 1 {
            return Err(CoreError::InvalidQuantity(quantity));
        }
        let quantity = validate_quantity(quantity)?;

        let menu_item = catalog
            .menu_item(menu_item_id)
            .ok_or_else(|| CoreError::MenuItemNotFound(menu_item_id.to_string()))?;
        validate_required_options(menu_item, selected_options.as_deref())?;

        Ok(self.add_item(
            menu_item.clone(),
            quantity,
            special_instructions,
            selected_options,
        ))
    }

    /// Removes a line. Unknown ids are a no-op.
    pub fn remove_item(&self, line_id: &str) -> bool {
        debug!(line_id = %line_id, "Removing from cart");

        self.with_cart_mut(
            |state| {
                let target = state.resolve(line_id).to_string();
                if !state.loaded {
                    state.journal.push(CartOp::Remove {
                        line_id: target.clone(),
                    });
                }
                state.cart.remove_item(&target)
            },
            |removed| *removed,
        )
    }

    /// Sets a line's quantity.
    ///
    /// `quantity <= 0` changes nothing: it returns
    /// [`QuantityUpdate::RemovalRequested`] and emits
    /// [`CartEvent::RemovalRequested`] so the UI can confirm.
    pub fn update_quantity(&self, line_id: &str, quantity: i64) -> QuantityUpdate {
        debug!(line_id = %line_id, quantity, "Updating quantity");

        let outcome = self.with_cart_mut(
            |state| {
                let target = state.resolve(line_id).to_string();
                let outcome = state.cart.update_quantity(&target, quantity);
                if !state.loaded && matches!(outcome, QuantityUpdate::Updated(_)) {
                    state.journal.push(CartOp::SetQuantity {
                        line_id: target,
                        quantity: u32::try_from(quantity).unwrap_or(u32::MAX),
                    });
                }
                outcome
            },
            |outcome| matches!(outcome, QuantityUpdate::Updated(_)),
        );

        if let QuantityUpdate::RemovalRequested(id) = &outcome {
            let _ = self.shared.events.send(CartEvent::RemovalRequested {
                line_id: id.clone(),
            });
        }
        outcome
    }

    /// Empties the cart.
    pub fn clear(&self) {
        debug!("Clearing cart");

        self.with_cart_mut(
            |state| {
                if !state.loaded {
                    state.journal.push(CartOp::Clear);
                }
                state.cart.clear();
            },
            |_| true,
        )
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Σ (unit price with surcharges) × quantity.
    pub fn total(&self) -> Money {
        self.with_cart(Cart::total)
    }

    /// Σ quantity.
    pub fn item_count(&self) -> u64 {
        self.with_cart(Cart::item_count)
    }

    pub fn line_count(&self) -> usize {
        self.with_cart(Cart::line_count)
    }

    pub fn is_empty(&self) -> bool {
        self.with_cart(Cart::is_empty)
    }

    /// Restaurant of the first line.
    pub fn restaurant_id(&self) -> Option<String> {
        self.with_cart(|cart| cart.restaurant_id().map(str::to_string))
    }

    pub fn can_add_from_restaurant(&self, restaurant_id: &str) -> bool {
        self.with_cart(|cart| cart.can_add_from_restaurant(restaurant_id))
    }

    /// Checkout breakdown.
    pub fn summary(&self, rules: &PricingRules) -> CartSummary {
        self.with_cart(|cart| cart.summary(rules))
    }

    /// Snapshot of the lines in display order.
    pub fn lines(&self) -> Vec<CartLineItem> {
        self.with_cart(|cart| cart.items().to_vec())
    }

    pub fn line(&self, line_id: &str) -> Option<CartLineItem> {
        let state = self.lock();
        state.cart.line(state.resolve(line_id)).cloned()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Whether hydration has finished.
    pub fn is_loaded(&self) -> bool {
        self.lock().loaded
    }

    /// Waits for hydration to finish. Returns at once if it already has.
    pub async fn wait_loaded(&self) {
        let mut rx = self.shared.loaded.subscribe();
        let _ = rx.wait_for(|loaded| *loaded).await;
    }

    /// Waits until every write queued so far has reached the store.
    pub async fn flush(&self) {
        self.shared.persister.flush().await;
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CartEvent> {
        self.shared.events.subscribe()
    }
}

impl std::fmt::Debug for CartEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("CartEngine")
            .field("key", &self.shared.persister.key())
            .field("loaded", &state.loaded)
            .field("lines", &state.cart.line_count())
            .finish()
    }
}

// =============================================================================
// Hydration
// =============================================================================

async fn hydrate(shared: Arc<Shared>) {
    let saved: Loaded<Vec<CartLineItem>> = shared.persister.load().await;

    let line_count = {
        let mut state = shared.state.lock().unwrap_or_else(PoisonError::into_inner);
        let journal = std::mem::take(&mut state.journal);
        let had_session_changes = !journal.is_empty();
        let mut repaired = false;

        match saved {
            Loaded::Found(items) => {
                let mut cart = Cart::from_items(items);
                let repair = cart.repair();
                if !repair.is_clean() {
                    warn!(
                        key = %shared.persister.key(),
                        raised_quantities = repair.raised_quantities,
                        dropped_duplicates = repair.dropped_duplicates,
                        "Stored cart broke line invariants, repaired it"
                    );
                    repaired = true;
                }
                let aliases = cart.replay(journal);
                state.cart = cart;
                state.aliases = aliases;
            }
            // The in-memory cart already holds the session's changes
            Loaded::Missing | Loaded::Failed => {}
        }
        state.loaded = true;

        if had_session_changes || repaired {
            shared.persister.save(&state.cart);
        }

        info!(
            key = %shared.persister.key(),
            lines = state.cart.line_count(),
            merged = had_session_changes,
            "Cart hydrated"
        );
        state.cart.line_count()
    };

    shared.loaded.send_replace(true);
    let _ = shared.events.send(CartEvent::Hydrated { line_count });
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use feast_core::types::{MenuItemOption, OptionChoice};
    use feast_core::{StaticCatalog, ValidationError};
    use feast_store::MemoryStore;

    fn menu_item(id: &str, restaurant_id: &str, price_cents: i64) -> MenuItem {
        MenuItem {
            id: id.to_string(),
            restaurant_id: restaurant_id.to_string(),
            name: format!("Item {}", id),
            description: String::new(),
            price_cents,
            image: String::new(),
            category: "Mains".to_string(),
            popular: false,
            tags: vec![],
            options: None,
        }
    }

    fn pizza() -> MenuItem {
        MenuItem {
            options: Some(vec![MenuItemOption {
                id: "size".to_string(),
                name: "Size".to_string(),
                choices: vec![OptionChoice {
                    id: "large".to_string(),
                    name: "Large".to_string(),
                    price_cents: 300,
                }],
                required: true,
                multiple: false,
            }]),
            ..menu_item("p1", "r1", 1200)
        }
    }

    async fn loaded_engine() -> (Arc<MemoryStore>, CartEngine) {
        let store = Arc::new(MemoryStore::new());
        let engine = CartEngine::load(store.clone(), CART_STORAGE_KEY).await;
        (store, engine)
    }

    #[tokio::test]
    async fn test_add_and_query() {
        let (_, engine) = loaded_engine().await;
        engine.add_item(menu_item("m1", "r1", 1000), 2, None, None);
        engine.add_item(menu_item("m2", "r1", 250), 1, None, None);

        assert_eq!(engine.total().cents(), 2250);
        assert_eq!(engine.item_count(), 3);
        assert_eq!(engine.line_count(), 2);
        assert_eq!(engine.restaurant_id().as_deref(), Some("r1"));
        assert!(engine.can_add_from_restaurant("r1"));
        assert!(!engine.can_add_from_restaurant("r2"));
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let (_, engine) = loaded_engine().await;
        let other = engine.clone();
        other.add_item(menu_item("m1", "r1", 1000), 1, None, None);
        assert_eq!(engine.item_count(), 1);
    }

    #[tokio::test]
    async fn test_zero_quantity_emits_removal_request() {
        let (_, engine) = loaded_engine().await;
        let id = engine.add_item(menu_item("m1", "r1", 1000), 3, None, None);
        let mut events = engine.subscribe();

        assert_eq!(
            engine.update_quantity(&id, 0),
            QuantityUpdate::RemovalRequested(id.clone())
        );
        assert_eq!(engine.line(&id).unwrap().quantity, 3);
        assert_eq!(
            events.recv().await.unwrap(),
            CartEvent::RemovalRequested { line_id: id }
        );
    }

    #[tokio::test]
    async fn test_mutations_are_written_back() {
        let (store, engine) = loaded_engine().await;
        let id = engine.add_item(menu_item("m1", "r1", 1000), 1, None, None);
        engine.update_quantity(&id, 4);
        engine.flush().await;

        let saved: Vec<CartLineItem> =
            serde_json::from_slice(&store.peek(CART_STORAGE_KEY).await.unwrap()).unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].quantity, 4);
    }

    #[tokio::test]
    async fn test_no_op_mutations_do_not_write() {
        let (store, engine) = loaded_engine().await;
        engine.remove_item("missing");
        engine.update_quantity("missing", 2);
        engine.update_quantity("missing", 0);
        engine.flush().await;
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_add_from_catalog() {
        let (_, engine) = loaded_engine().await;
        let catalog = StaticCatalog::new(vec![pizza()]);

        let err = engine
            .add_from_catalog(&catalog, "nope", 1, None, None)
            .unwrap_err();
        assert!(matches!(err, CoreError::MenuItemNotFound(_)));

        let err = engine
            .add_from_catalog(&catalog, "p1", 1, None, None)
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::RequiredOption { .. })
        ));
        assert!(engine.is_empty());

        engine
            .add_from_catalog(
                &catalog,
                "p1",
                2,
                None,
                Some(vec![SelectedOption::new("size", ["large"])]),
            )
            .unwrap();
        assert_eq!(engine.total().cents(), 3000);
    }

    #[tokio::test]
    async fn test_add_from_catalog_bounds_quantity() {
        let (_, engine) = loaded_engine().await;
        let catalog = StaticCatalog::new(vec![menu_item("m1", "r1", 500)]);

        let err = engine
            .add_from_catalog(&catalog, "m1", 0, None, None)
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidQuantity(0)));

        let err = engine
            .add_from_catalog(&catalog, "m1", MAX_ITEM_QUANTITY + 1, None, None)
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::OutOfRange { max: 99, .. })
        ));
        assert!(engine.is_empty());

        engine
            .add_from_catalog(&catalog, "m1", MAX_ITEM_QUANTITY, None, None)
            .unwrap();
        assert_eq!(engine.item_count(), 99);
    }

    #[tokio::test]
    async fn test_summary() {
        let (_, engine) = loaded_engine().await;
        engine.add_item(menu_item("m1", "r1", 1000), 1, None, None);

        let summary = engine.summary(&PricingRules::default());
        assert_eq!(summary.subtotal.cents(), 1000);
        assert_eq!(summary.tax.cents(), 80);
        assert_eq!(summary.delivery_fee.cents(), 299);
        assert_eq!(summary.total.cents(), 1379);
    }

    #[tokio::test]
    async fn test_hydrated_event() {
        let store = Arc::new(MemoryStore::new());
        store.pause_reads();
        let engine = CartEngine::new(store.clone());
        let mut events = engine.subscribe();
        assert!(!engine.is_loaded());

        store.resume_reads();
        assert_eq!(
            events.recv().await.unwrap(),
            CartEvent::Hydrated { line_count: 0 }
        );
        assert!(engine.is_loaded());
    }

    #[tokio::test]
    async fn test_hydration_repairs_stored_lines() {
        let line = |item: MenuItem, quantity| {
            CartLineItem::with_id("l1".to_string(), item, quantity, None, None)
        };
        let mut zero = line(menu_item("m1", "r1", 500), 1);
        zero.quantity = 0;
        let twin = line(menu_item("m2", "r1", 700), 2);
        let store = Arc::new(MemoryStore::with_entry(
            CART_STORAGE_KEY,
            serde_json::to_vec(&vec![zero, twin]).unwrap(),
        ));

        let engine = CartEngine::load(store.clone(), CART_STORAGE_KEY).await;
        assert_eq!(engine.line_count(), 1);
        assert_eq!(engine.line("l1").unwrap().quantity, 1);
        assert_eq!(engine.total().cents(), 500);

        engine.flush().await;
        let saved: Vec<CartLineItem> =
            serde_json::from_slice(&store.peek(CART_STORAGE_KEY).await.unwrap()).unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].quantity, 1);
    }

    #[tokio::test]
    async fn test_clean_stored_cart_is_not_rewritten() {
        let line =
            CartLineItem::with_id("l1".to_string(), menu_item("m1", "r1", 500), 2, None, None);
        let store = Arc::new(MemoryStore::with_entry(
            CART_STORAGE_KEY,
            serde_json::to_vec(&vec![line]).unwrap(),
        ));

        let engine = CartEngine::load(store.clone(), CART_STORAGE_KEY).await;
        engine.flush().await;
        assert_eq!(engine.item_count(), 2);
        assert_eq!(store.write_count(), 0);
    }
}
