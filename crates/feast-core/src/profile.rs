//! # Profile Module
//!
//! Pure operations on the user profile: partial updates, delivery addresses
//! and favourite restaurants.
//!
//! ## Default Address Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  add_address(new)                                                       │
//! │     new.default OR no addresses yet ──► every existing default = false  │
//! │     (the new address keeps the flag it was given)                       │
//! │                                                                         │
//! │  update_address(id, patch{default: true})                               │
//! │     ──► every default = false, then patch applied to `id`               │
//! │                                                                         │
//! │  remove_address(id)                                                     │
//! │     removed was default AND others remain ──► first remaining = default │
//! │                                                                         │
//! │  default_address()                                                      │
//! │     first flagged default, else first address, else none               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::types::{Address, User};
use crate::validation::{
    validate_coordinates, validate_email, validate_required, ValidationResult,
};

// =============================================================================
// Inputs
// =============================================================================

/// Partial update of the profile fields. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserPatch {
    #[ts(optional)]
    pub name: Option<String>,
    #[ts(optional)]
    pub email: Option<String>,
    #[ts(optional)]
    pub phone: Option<String>,
    #[ts(optional)]
    pub profile_image: Option<String>,
}

/// A new address before it is given an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewAddress {
    pub title: String,
    pub address: String,
    pub lat: f64,
    pub lng: f64,
    pub default: bool,
}

/// Partial update of an address.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AddressPatch {
    #[ts(optional)]
    pub title: Option<String>,
    #[ts(optional)]
    pub address: Option<String>,
    #[ts(optional)]
    pub lat: Option<f64>,
    #[ts(optional)]
    pub lng: Option<f64>,
    #[ts(optional)]
    pub default: Option<bool>,
}

// =============================================================================
// Profile Operations
// =============================================================================

impl User {
    /// Profile the app starts with before the user has saved one.
    pub fn demo() -> Self {
        User {
            id: "u1".to_string(),
            name: "John Doe".to_string(),
            email: "john.doe@example.com".to_string(),
            phone: "+1 (555) 123-4567".to_string(),
            addresses: vec![
                Address {
                    id: "a1".to_string(),
                    title: "Home".to_string(),
                    address: "123 Main St, Anytown, USA".to_string(),
                    lat: 37.7749,
                    lng: -122.4194,
                    default: true,
                },
                Address {
                    id: "a2".to_string(),
                    title: "Work".to_string(),
                    address: "456 Office Blvd, Anytown, USA".to_string(),
                    lat: 37.7833,
                    lng: -122.4167,
                    default: false,
                },
            ],
            favorites: vec!["1".to_string(), "3".to_string()],
            profile_image: None,
        }
    }

    /// Applies a partial update. Nothing changes if any field is invalid.
    pub fn apply(&mut self, patch: UserPatch) -> ValidationResult<()> {
        let name = patch
            .name
            .map(|n| validate_required("name", &n))
            .transpose()?;
        let email = patch.email.map(|e| validate_email(&e)).transpose()?;

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(email) = email {
            self.email = email;
        }
        if let Some(phone) = patch.phone {
            self.phone = phone;
        }
        if let Some(image) = patch.profile_image {
            self.profile_image = Some(image);
        }
        Ok(())
    }

    /// Adds an address and returns its generated id.
    pub fn add_address(&mut self, new: NewAddress) -> ValidationResult<String> {
        let title = validate_required("title", &new.title)?;
        validate_coordinates(new.lat, new.lng)?;

        if new.default || self.addresses.is_empty() {
            self.clear_default_flags();
        }

        let id = format!("a{}", Uuid::new_v4().simple());
        self.addresses.push(Address {
            id: id.clone(),
            title,
            address: new.address,
            lat: new.lat,
            lng: new.lng,
            default: new.default,
        });
        Ok(id)
    }

    /// Updates an address in place.
    ///
    /// ## Returns
    /// `Ok(false)` if no address has that id; nothing changes in that case,
    /// including the default flags.
    pub fn update_address(&mut self, address_id: &str, patch: AddressPatch) -> ValidationResult<bool> {
        if !self.addresses.iter().any(|a| a.id == address_id) {
            return Ok(false);
        }

        let title = patch
            .title
            .map(|t| validate_required("title", &t))
            .transpose()?;
        if let Some(target) = self.addresses.iter().find(|a| a.id == address_id) {
            validate_coordinates(
                patch.lat.unwrap_or(target.lat),
                patch.lng.unwrap_or(target.lng),
            )?;
        }

        if patch.default == Some(true) {
            self.clear_default_flags();
        }

        if let Some(target) = self.addresses.iter_mut().find(|a| a.id == address_id) {
            if let Some(title) = title {
                target.title = title;
            }
            if let Some(address) = patch.address {
                target.address = address;
            }
            if let Some(lat) = patch.lat {
                target.lat = lat;
            }
            if let Some(lng) = patch.lng {
                target.lng = lng;
            }
            if let Some(default) = patch.default {
                target.default = default;
            }
        }
        Ok(true)
    }

    /// Removes an address, promoting the first remaining one to default if
    /// the removed address was the default.
    pub fn remove_address(&mut self, address_id: &str) -> bool {
        let Some(index) = self.addresses.iter().position(|a| a.id == address_id) else {
            return false;
        };

        let removed = self.addresses.remove(index);
        if removed.default {
            if let Some(first) = self.addresses.first_mut() {
                first.default = true;
            }
        }
        true
    }

    /// Adds or removes a favourite restaurant.
    ///
    /// ## Returns
    /// Whether the restaurant is a favourite afterwards.
    pub fn toggle_favorite(&mut self, restaurant_id: &str) -> bool {
        match self.favorites.iter().position(|f| f == restaurant_id) {
            Some(index) => {
                self.favorites.remove(index);
                false
            }
            None => {
                self.favorites.push(restaurant_id.to_string());
                true
            }
        }
    }

    pub fn is_favorite(&self, restaurant_id: &str) -> bool {
        self.favorites.iter().any(|f| f == restaurant_id)
    }

    /// The address orders are delivered to by default.
    pub fn default_address(&self) -> Option<&Address> {
        self.addresses
            .iter()
            .find(|a| a.default)
            .or_else(|| self.addresses.first())
    }

    fn clear_default_flags(&mut self) {
        for address in &mut self.addresses {
            address.default = false;
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
