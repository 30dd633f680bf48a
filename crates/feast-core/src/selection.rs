//! # Option Selection
//!
//! What the menu-item screen tracks while the user customizes a dish, before
//! anything goes into the cart.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Size (required, single)     Toppings (multiple)                        │
//! │   ○ Small                     ☑ Olives   +$0.50                         │
//! │   ● Large  +$3.00             ☐ Peppers  +$0.75                         │
//! │                               ☑ Onions   +$0.50                         │
//! │                                                                         │
//! │  tap single choice   ──► replaces the selection                         │
//! │  tap multiple choice ──► toggles that choice                            │
//! │  "Add to Cart"       ──► validate() then into_selected_options()        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{MenuItem, MenuItemOption, SelectedOption};
use crate::validation::validate_required_options;

/// Choices picked so far, keyed by option id in first-touched order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionSelection {
    entries: Vec<SelectedOption>,
}

impl OptionSelection {
    pub fn new() -> Self {
        OptionSelection::default()
    }

    /// Applies a tap on `choice_id` of `option`.
    pub fn select(&mut self, option: &MenuItemOption, choice_id: &str) {
        let index = match self.entries.iter().position(|e| e.option_id == option.id) {
            Some(index) => index,
            None => {
                self.entries
                    .push(SelectedOption::new(option.id.clone(), Vec::<String>::new()));
                self.entries.len() - 1
            }
        };
        let entry = &mut self.entries[index];

        if option.multiple {
            if let Some(pos) = entry.choice_ids.iter().position(|c| c == choice_id) {
                entry.choice_ids.remove(pos);
            } else {
                entry.choice_ids.push(choice_id.to_string());
            }
        } else {
            entry.choice_ids = vec![choice_id.to_string()];
        }
    }

    /// Whether `choice_id` is currently selected for `option_id`.
    pub fn is_selected(&self, option_id: &str, choice_id: &str) -> bool {
        self.choices(option_id).iter().any(|c| c == choice_id)
    }

    /// Selected choice ids for one option.
    pub fn choices(&self, option_id: &str) -> &[String] {
        self.entries
            .iter()
            .find(|e| e.option_id == option_id)
            .map(|e| e.choice_ids.as_slice())
            .unwrap_or_default()
    }

    /// The first required option with nothing chosen, if any.
    pub fn missing_required<'a>(&self, menu_item: &'a MenuItem) -> Option<&'a MenuItemOption> {
        menu_item
            .options
            .as_deref()
            .unwrap_or_default()
            .iter()
            .find(|opt| opt.required && self.choices(&opt.id).is_empty())
    }

    /// Fails on the first required option without a choice.
    pub fn validate(&self, menu_item: &MenuItem) -> Result<(), ValidationError> {
        validate_required_options(menu_item, Some(&self.entries))
    }

    /// Price of one unit with the current choices.
    pub fn unit_price(&self, menu_item: &MenuItem) -> Money {
        menu_item.unit_price(Some(&self.entries))
    }

    /// Price shown on the "Add to Cart" bar.
    pub fn line_price(&self, menu_item: &MenuItem, quantity: u32) -> Money {
        self.unit_price(menu_item) * quantity
    }

    /// The cart representation: `None` when nothing was ever selected.
    pub fn into_selected_options(self) -> Option<Vec<SelectedOption>> {
        if self.entries.is_empty() {
            None
        } else {
            Some(self.entries)
        }
    }
}
