//! # Menu Catalog
//!
//! Read-only lookup of menu items. The cart copies what it gets from here,
//! so catalog changes never reach items already in a cart.

use crate::types::MenuItem;

/// Source of menu item records.
pub trait MenuCatalog {
    /// Full record for a menu item, options included.
    fn menu_item(&self, menu_item_id: &str) -> Option<&MenuItem>;

    /// Every item a restaurant offers, in menu order.
    fn menu_for_restaurant(&self, restaurant_id: &str) -> Vec<&MenuItem>;
}

/// In-memory catalog, e.g. bundled menu data.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    items: Vec<MenuItem>,
}

impl StaticCatalog {
    pub fn new(items: Vec<MenuItem>) -> Self {
        StaticCatalog { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl MenuCatalog for StaticCatalog {
    fn menu_item(&self, menu_item_id: &str) -> Option<&MenuItem> {
        self.items.iter().find(|i| i.id == menu_item_id)
    }

    fn menu_for_restaurant(&self, restaurant_id: &str) -> Vec<&MenuItem> {
        self.items
            .iter()
            .filter(|i| i.restaurant_id == restaurant_id)
            .collect()
    }
}
