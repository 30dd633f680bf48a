//! # Validation Module
//!
//! Input validation for cart and profile operations.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Layer 1: Mobile UI                                                     │
//! │  └── Immediate feedback (disabled buttons, inline hints)                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                   │
//! │  ├── Required menu options selected                                     │
//! │  ├── Quantities in range                                                │
//! │  └── Profile fields well-formed                                         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Services (feast-state)                                        │
//! │  └── Apply the change, persist in the background                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::types::{MenuItem, SelectedOption};
use crate::MAX_ITEM_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Cart Validators
// =============================================================================

/// Validates a quantity for adding to the cart.
///
/// ```rust
/// use feast_core::validation::validate_quantity;
///
/// assert_eq!(validate_quantity(3).unwrap(), 3);
/// assert!(validate_quantity(0).is_err());
/// assert!(validate_quantity(1000).is_err());
/// ```
pub fn validate_quantity(quantity: i64) -> ValidationResult<u32> {
    if !(1..=MAX_ITEM_QUANTITY).contains(&quantity) {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    // In range, so the conversion cannot fail.
    Ok(quantity as u32)
}

/// Checks that every required option of `menu_item` has at least one choice.
///
/// The first unmet option (in menu order) is reported.
pub fn validate_required_options(
    menu_item: &MenuItem,
    selected: Option<&[SelectedOption]>,
) -> ValidationResult<()> {
    let selected = selected.unwrap_or_default();

    let missing = menu_item
        .options
        .as_deref()
        .unwrap_or_default()
        .iter()
        .filter(|opt| opt.required)
        .find(|opt| {
            !selected
                .iter()
                .any(|sel| sel.option_id == opt.id && !sel.choice_ids.is_empty())
        });

    match missing {
        Some(opt) => Err(ValidationError::RequiredOption {
            option: opt.name.clone(),
        }),
        None => Ok(()),
    }
}

// =============================================================================
// Profile Validators
// =============================================================================

/// Validates a non-empty text field and returns it trimmed.
pub fn validate_required(field: &str, value: &str) -> ValidationResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(value.to_string())
}

/// Validates an email address: one `@` with a dotted domain after it.
///
/// ```rust
/// use feast_core::validation::validate_email;
///
/// assert!(validate_email("john.doe@example.com").is_ok());
/// assert!(validate_email("john.doe").is_err());
/// ```
pub fn validate_email(email: &str) -> ValidationResult<String> {
    let email = validate_required("email", email)?;

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };

    if !valid {
        return Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "expected name@domain".to_string(),
        });
    }

    Ok(email)
}

/// Validates a latitude/longitude pair.
pub fn validate_coordinates(lat: f64, lng: f64) -> ValidationResult<()> {
    if !(-90.0..=90.0).contains(&lat) {
        return Err(ValidationError::OutOfRange {
            field: "lat".to_string(),
            min: -90,
            max: 90,
        });
    }
    if !(-180.0..=180.0).contains(&lng) {
        return Err(ValidationError::OutOfRange {
            field: "lng".to_string(),
            min: -180,
            max: 180,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MenuItemOption, OptionChoice};

    fn burger() -> MenuItem {
        let option = |id: &str, name: &str, required: bool| MenuItemOption {
            id: id.to_string(),
            name: name.to_string(),
            choices: vec![OptionChoice {
                id: format!("{}-1", id),
                name: "First".to_string(),
                price_cents: 0,
            }],
            required,
            multiple: false,
        };

        MenuItem {
            id: "b1".to_string(),
            restaurant_id: "r1".to_string(),
            name: "Burger".to_string(),
            description: String::new(),
            price_cents: 1299,
            image: String::new(),
            category: "Burgers".to_string(),
            popular: true,
            tags: vec![],
            options: Some(vec![
                option("doneness", "Doneness", true),
                option("side", "Side", false),
                option("bun", "Bun", true),
            ]),
        }
    }

    #[test]
    fn test_required_options_reports_first_missing() {
        let item = burger();
        let err = validate_required_options(&item, None).unwrap_err();
        assert_eq!(
            err,
            ValidationError::RequiredOption {
                option: "Doneness".to_string()
            }
        );

        let partial = vec![SelectedOption::new("doneness", ["doneness-1"])];
        let err = validate_required_options(&item, Some(&partial)).unwrap_err();
        assert_eq!(
            err,
            ValidationError::RequiredOption {
                option: "Bun".to_string()
            }
        );
    }

    #[test]
    fn test_empty_choice_list_does_not_satisfy_required() {
        let item = burger();
        let selected = vec![
            SelectedOption::new("doneness", Vec::<String>::new()),
            SelectedOption::new("bun", ["bun-1"]),
        ];
        assert!(validate_required_options(&item, Some(&selected)).is_err());
    }

    #[test]
    fn test_required_options_satisfied() {
        let item = burger();
        let selected = vec![
            SelectedOption::new("bun", ["bun-1"]),
            SelectedOption::new("doneness", ["doneness-1"]),
        ];
        assert!(validate_required_options(&item, Some(&selected)).is_ok());
    }

    #[test]
    fn test_validate_email() {
        assert_eq!(validate_email("  a@b.co ").unwrap(), "a@b.co");
        assert!(validate_email("a@@b.co").is_err());
        assert!(validate_email("@b.co").is_err());
        assert!(validate_email("a@b.").is_err());
        assert!(validate_email("").is_err());
    }

    #[test]
    fn test_validate_coordinates() {
        assert!(validate_coordinates(37.7749, -122.4194).is_ok());
        assert!(validate_coordinates(91.0, 0.0).is_err());
        assert!(validate_coordinates(0.0, 181.0).is_err());
    }
}
