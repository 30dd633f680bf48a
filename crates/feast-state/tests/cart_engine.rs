//! End-to-end behaviour of the cart engine over real stores.

use std::sync::Arc;

use feast_core::types::{MenuItemOption, OptionChoice};
use feast_core::{
    CartLineItem, MenuCatalog, MenuItem, OptionSelection, PricingRules, QuantityUpdate,
    SelectedOption, StaticCatalog, ValidationError, CART_STORAGE_KEY,
};
use feast_state::CartEngine;
use feast_store::{KeyValueStore, MemoryStore, SqliteStore, StoreConfig};

// =============================================================================
// Fixtures
// =============================================================================

fn burger(restaurant_id: &str) -> MenuItem {
    MenuItem {
        id: "m1".to_string(),
        restaurant_id: restaurant_id.to_string(),
        name: "Classic Burger".to_string(),
        description: "Beef patty, cheddar, pickles".to_string(),
        price_cents: 1000,
        image: String::new(),
        category: "Burgers".to_string(),
        popular: true,
        tags: vec!["beef".to_string()],
        options: Some(vec![
            MenuItemOption {
                id: "size".to_string(),
                name: "Size".to_string(),
                choices: vec![
                    OptionChoice {
                        id: "regular".to_string(),
                        name: "Regular".to_string(),
                        price_cents: 0,
                    },
                    OptionChoice {
                        id: "large".to_string(),
                        name: "Large".to_string(),
                        price_cents: 300,
                    },
                ],
                required: true,
                multiple: false,
            },
            MenuItemOption {
                id: "extras".to_string(),
                name: "Extras".to_string(),
                choices: vec![
                    OptionChoice {
                        id: "bacon".to_string(),
                        name: "Bacon".to_string(),
                        price_cents: 150,
                    },
                    OptionChoice {
                        id: "egg".to_string(),
                        name: "Fried egg".to_string(),
                        price_cents: 100,
                    },
                ],
                required: false,
                multiple: true,
            },
        ]),
    }
}

fn fries(restaurant_id: &str) -> MenuItem {
    MenuItem {
        id: "m2".to_string(),
        restaurant_id: restaurant_id.to_string(),
        name: "Fries".to_string(),
        description: String::new(),
        price_cents: 399,
        image: String::new(),
        category: "Sides".to_string(),
        popular: false,
        tags: vec![],
        options: None,
    }
}

fn large() -> Option<Vec<SelectedOption>> {
    Some(vec![SelectedOption::new("size", ["large"])])
}

async fn fresh_engine() -> (Arc<MemoryStore>, CartEngine) {
    let store = Arc::new(MemoryStore::new());
    let engine = CartEngine::load(store.clone(), CART_STORAGE_KEY).await;
    (store, engine)
}

async fn saved_lines(store: &MemoryStore) -> Vec<CartLineItem> {
    let bytes = store.peek(CART_STORAGE_KEY).await.expect("cart was written");
    serde_json::from_slice(&bytes).unwrap()
}

// =============================================================================
// Cart semantics
// =============================================================================

#[tokio::test]
async fn test_merge_identity() {
    let (_, engine) = fresh_engine().await;

    let first = engine.add_item(burger("r1"), 1, None, large());
    let second = engine.add_item(burger("r1"), 2, None, large());
    assert_eq!(first, second);
    assert_eq!(engine.line_count(), 1);
    assert_eq!(engine.line(&first).unwrap().quantity, 3);

    let regular = engine.add_item(
        burger("r1"),
        1,
        None,
        Some(vec![SelectedOption::new("size", ["regular"])]),
    );
    assert_ne!(regular, first);
    assert_eq!(engine.line_count(), 2);
}

#[tokio::test]
async fn test_no_options_differs_from_empty_options() {
    let (_, engine) = fresh_engine().await;
    engine.add_item(fries("r1"), 1, None, None);
    engine.add_item(fries("r1"), 1, None, Some(vec![]));
    assert_eq!(engine.line_count(), 2);
}

#[tokio::test]
async fn test_option_order_matters_for_merge() {
    let (_, engine) = fresh_engine().await;
    let a = vec![
        SelectedOption::new("size", ["large"]),
        SelectedOption::new("extras", ["bacon", "egg"]),
    ];
    let b = vec![
        SelectedOption::new("size", ["large"]),
        SelectedOption::new("extras", ["egg", "bacon"]),
    ];
    engine.add_item(burger("r1"), 1, None, Some(a));
    engine.add_item(burger("r1"), 1, None, Some(b));
    assert_eq!(engine.line_count(), 2);
}

#[tokio::test]
async fn test_merge_keeps_existing_instructions() {
    let (_, engine) = fresh_engine().await;
    let id = engine.add_item(fries("r1"), 1, Some("extra salt".to_string()), None);
    engine.add_item(fries("r1"), 1, Some("no salt".to_string()), None);

    let line = engine.line(&id).unwrap();
    assert_eq!(line.quantity, 2);
    assert_eq!(line.special_instructions.as_deref(), Some("extra salt"));
}

#[tokio::test]
async fn test_total_includes_surcharges() {
    let (_, engine) = fresh_engine().await;
    engine.add_item(burger("r1"), 2, None, large());
    assert_eq!(engine.total().cents(), 2600);
}

#[tokio::test]
async fn test_unknown_choice_adds_nothing() {
    let (_, engine) = fresh_engine().await;
    engine.add_item(
        burger("r1"),
        1,
        None,
        Some(vec![
            SelectedOption::new("size", ["gigantic"]),
            SelectedOption::new("sauce", ["bbq"]),
        ]),
    );
    assert_eq!(engine.total().cents(), 1000);
}

#[tokio::test]
async fn test_item_count_sums_quantities() {
    let (_, engine) = fresh_engine().await;
    engine.add_item(burger("r1"), 2, None, large());
    engine.add_item(fries("r1"), 3, None, None);
    engine.add_item(burger("r1"), 1, None, None);

    assert_eq!(engine.line_count(), 3);
    assert_eq!(engine.item_count(), 6);
}

#[tokio::test]
async fn test_zero_quantity_guard() {
    let (_, engine) = fresh_engine().await;
    let id = engine.add_item(fries("r1"), 2, None, None);

    assert_eq!(
        engine.update_quantity(&id, 0),
        QuantityUpdate::RemovalRequested(id.clone())
    );
    assert_eq!(
        engine.update_quantity(&id, -4),
        QuantityUpdate::RemovalRequested(id.clone())
    );
    assert_eq!(engine.line(&id).unwrap().quantity, 2);

    assert!(engine.remove_item(&id));
    assert!(engine.is_empty());
}

#[tokio::test]
async fn test_update_quantity_sets_exactly() {
    let (_, engine) = fresh_engine().await;
    let id = engine.add_item(fries("r1"), 2, None, None);

    assert_eq!(engine.update_quantity(&id, 7), QuantityUpdate::Updated(id.clone()));
    assert_eq!(engine.item_count(), 7);
    assert_eq!(
        engine.update_quantity("ghost", 3),
        QuantityUpdate::NotFound("ghost".to_string())
    );
}

#[tokio::test]
async fn test_single_restaurant_guard() {
    let (_, engine) = fresh_engine().await;
    engine.add_item(fries("A"), 1, None, None);

    assert!(engine.can_add_from_restaurant("A"));
    assert!(!engine.can_add_from_restaurant("B"));

    // Advisory only
    engine.add_item(burger("B"), 1, None, large());
    assert_eq!(engine.restaurant_id().as_deref(), Some("A"));

    engine.clear();
    assert!(engine.can_add_from_restaurant("B"));
}

#[tokio::test]
async fn test_empty_cart_queries() {
    let (_, engine) = fresh_engine().await;
    assert_eq!(engine.total().cents(), 0);
    assert_eq!(engine.item_count(), 0);
    assert_eq!(engine.restaurant_id(), None);

    engine.add_item(fries("r1"), 1, None, None);
    engine.clear();
    assert_eq!(engine.total().cents(), 0);
    assert_eq!(engine.item_count(), 0);
    assert_eq!(engine.restaurant_id(), None);

    let summary = engine.summary(&PricingRules::default());
    assert!(summary.total.is_zero());
}

#[tokio::test]
async fn test_checkout_summary() {
    let (_, engine) = fresh_engine().await;
    engine.add_item(burger("r1"), 1, None, None);

    let summary = engine.summary(&PricingRules::default());
    assert_eq!(summary.subtotal.cents(), 1000);
    assert_eq!(summary.tax.cents(), 80);
    assert_eq!(summary.delivery_fee.cents(), 299);
    assert_eq!(summary.total.cents(), 1379);
}

#[tokio::test]
async fn test_selection_screen_to_cart() {
    let (_, engine) = fresh_engine().await;
    let item = burger("r1");
    let size = item.option("size").unwrap().clone();
    let extras = item.option("extras").unwrap().clone();

    let mut selection = OptionSelection::new();
    selection.select(&extras, "bacon");
    assert_eq!(
        selection.validate(&item),
        Err(ValidationError::RequiredOption {
            option: "Size".to_string()
        })
    );

    selection.select(&size, "regular");
    selection.select(&size, "large");
    assert!(selection.validate(&item).is_ok());
    assert_eq!(selection.line_price(&item, 2).cents(), 2900);

    engine.add_item(item, 2, None, selection.into_selected_options());
    assert_eq!(engine.total().cents(), 2900);
}

// =============================================================================
// Persistence
// =============================================================================

#[tokio::test]
async fn test_round_trip_through_restart() {
    let store = Arc::new(MemoryStore::new());
    let before = {
        let engine = CartEngine::load(store.clone(), CART_STORAGE_KEY).await;
        engine.add_item(burger("r1"), 2, Some("well done".to_string()), large());
        let id = engine.add_item(fries("r1"), 1, None, None);
        engine.update_quantity(&id, 3);
        engine.flush().await;
        engine.lines()
    };

    let engine = CartEngine::load(store.clone(), CART_STORAGE_KEY).await;
    assert_eq!(engine.lines(), before);
    assert_eq!(engine.total().cents(), 2600 + 3 * 399);
}

#[tokio::test]
async fn test_round_trip_through_sqlite() {
    let sqlite: Arc<dyn KeyValueStore> =
        Arc::new(SqliteStore::new(StoreConfig::in_memory()).await.unwrap());

    let before = {
        let engine = CartEngine::load(sqlite.clone(), CART_STORAGE_KEY).await;
        engine.add_item(burger("r1"), 1, None, large());
        engine.flush().await;
        engine.lines()
    };

    let engine = CartEngine::load(sqlite, CART_STORAGE_KEY).await;
    assert_eq!(engine.lines(), before);
}

#[tokio::test]
async fn test_catalog_price_change_does_not_reach_cart_lines() {
    let store = Arc::new(MemoryStore::new());
    let launch_menu = StaticCatalog::new(vec![burger("r1"), fries("r1")]);
    {
        let engine = CartEngine::load(store.clone(), CART_STORAGE_KEY).await;
        engine
            .add_from_catalog(&launch_menu, "m1", 2, None, large())
            .unwrap();
        engine.flush().await;
    }
    let added = burger("r1");

    // Same id, new price, and the large surcharge is gone
    let mut repriced = burger("r1");
    repriced.price_cents = 1500;
    if let Some(options) = repriced.options.as_mut() {
        options[0].choices.retain(|c| c.id != "large");
    }
    let new_menu = StaticCatalog::new(vec![repriced, fries("r1")]);
    assert_eq!(new_menu.menu_item("m1").unwrap().price_cents, 1500);

    let engine = CartEngine::load(store, CART_STORAGE_KEY).await;
    assert_eq!(engine.lines()[0].menu_item, added);
    assert_eq!(engine.total().cents(), 2600);

    // A later add of the same configuration merges into the old snapshot
    engine
        .add_from_catalog(&new_menu, "m1", 1, None, large())
        .unwrap();
    assert_eq!(engine.line_count(), 1);
    assert_eq!(engine.lines()[0].menu_item, added);
    assert_eq!(engine.total().cents(), 3900);
}

#[tokio::test]
async fn test_clear_is_persisted() {
    let (store, engine) = fresh_engine().await;
    engine.add_item(fries("r1"), 1, None, None);
    engine.clear();
    engine.flush().await;

    assert!(saved_lines(&store).await.is_empty());
}

// =============================================================================
// Hydration
// =============================================================================

#[tokio::test]
async fn test_pre_hydration_adds_merge_with_saved_cart() {
    let store = Arc::new(MemoryStore::new());
    let saved_id = {
        let engine = CartEngine::load(store.clone(), CART_STORAGE_KEY).await;
        let id = engine.add_item(fries("r1"), 1, None, None);
        engine.flush().await;
        id
    };

    store.pause_reads();
    let engine = CartEngine::spawn(store.clone(), CART_STORAGE_KEY);
    let session_fries = engine.add_item(fries("r1"), 2, None, None);
    let session_burger = engine.add_item(burger("r1"), 1, None, large());
    assert!(!engine.is_loaded());
    assert_eq!(store.write_count(), 1);

    store.resume_reads();
    engine.wait_loaded().await;
    engine.flush().await;

    // Saved line first, merged; new line appended
    let lines = engine.lines();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].id, saved_id);
    assert_eq!(lines[0].quantity, 3);
    assert_eq!(lines[1].id, session_burger);

    // The id handed out before hydration still reaches the merged line
    assert_eq!(engine.line(&session_fries).unwrap().id, saved_id);
    engine.update_quantity(&session_fries, 5);
    assert_eq!(engine.line(&saved_id).unwrap().quantity, 5);

    engine.flush().await;
    assert_eq!(saved_lines(&store).await, engine.lines());
}

#[tokio::test]
async fn test_pre_hydration_clear_discards_saved_cart() {
    let store = Arc::new(MemoryStore::new());
    {
        let engine = CartEngine::load(store.clone(), CART_STORAGE_KEY).await;
        engine.add_item(burger("r1"), 1, None, large());
        engine.flush().await;
    }

    store.pause_reads();
    let engine = CartEngine::spawn(store.clone(), CART_STORAGE_KEY);
    engine.clear();
    engine.add_item(fries("r2"), 1, None, None);

    store.resume_reads();
    engine.wait_loaded().await;
    engine.flush().await;

    assert_eq!(engine.line_count(), 1);
    assert_eq!(engine.restaurant_id().as_deref(), Some("r2"));
    assert_eq!(saved_lines(&store).await, engine.lines());
}

#[tokio::test]
async fn test_nothing_written_until_hydrated() {
    let store = Arc::new(MemoryStore::new());
    store.pause_reads();
    let engine = CartEngine::spawn(store.clone(), CART_STORAGE_KEY);

    let id = engine.add_item(fries("r1"), 1, None, None);
    engine.update_quantity(&id, 4);
    engine.flush().await;
    assert_eq!(store.write_count(), 0);

    store.resume_reads();
    engine.wait_loaded().await;
    engine.flush().await;

    // One write for the merged result
    assert_eq!(store.write_count(), 1);
    assert_eq!(saved_lines(&store).await[0].quantity, 4);
}

// =============================================================================
// Failure tolerance
// =============================================================================

#[tokio::test]
async fn test_corrupt_saved_cart_is_ignored() {
    let store = Arc::new(MemoryStore::with_entry(CART_STORAGE_KEY, "{{{"));
    let engine = CartEngine::load(store.clone(), CART_STORAGE_KEY).await;

    assert!(engine.is_loaded());
    assert!(engine.is_empty());
    engine.flush().await;
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn test_read_failure_still_loads() {
    let store = Arc::new(MemoryStore::new());
    store.fail_reads(true);
    let engine = CartEngine::load(store.clone(), CART_STORAGE_KEY).await;

    assert!(engine.is_loaded());
    engine.add_item(fries("r1"), 1, None, None);
    assert_eq!(engine.item_count(), 1);
}

#[tokio::test]
async fn test_write_failures_keep_memory_authoritative() {
    let (store, engine) = fresh_engine().await;
    store.fail_writes(true);

    let id = engine.add_item(burger("r1"), 1, None, large());
    engine.update_quantity(&id, 2);
    engine.flush().await;

    assert_eq!(engine.total().cents(), 2600);
    assert_eq!(store.peek(CART_STORAGE_KEY).await, None);

    // The next mutation after recovery writes the full state
    store.fail_writes(false);
    engine.add_item(fries("r1"), 1, None, None);
    engine.flush().await;
    assert_eq!(saved_lines(&store).await, engine.lines());
}
