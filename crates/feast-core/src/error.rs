//! # Error Types
//!
//! Domain-specific error types for feast-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  feast-core errors (this file)                                         │
//! │  ├── CoreError        - General domain errors                          │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  feast-store errors (separate crate)                                   │
//! │  └── StoreError       - Key-value storage failures                     │
//! │                                                                         │
//! │  feast-state errors                                                    │
//! │  └── StateError       - Configuration failures                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Cart operations on unknown line ids are NOT errors: stale ids are
//! expected after a removal and are treated as no-ops.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Menu item id does not resolve in the catalog.
    #[error("Menu item not found: {0}")]
    MenuItemNotFound(String),

    /// Quantity to add is not positive.
    ///
    /// Raised by catalog adds. `update_quantity` with zero goes through the
    /// removal confirmation path instead.
    #[error("Invalid quantity {0}: must be at least 1")]
    InvalidQuantity(i64),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required menu item option has no selected choice.
    ///
    /// ## User Workflow
    /// ```text
    /// Burger: Size (required) - nothing picked
    ///      │
    ///      ▼
    /// Tap "Add to Cart"
    ///      │
    ///      ▼
    /// RequiredOption { option: "Size" }
    ///      │
    ///      ▼
    /// UI shows: "Please select a Size option before adding to cart."
    /// ```
    #[error("Please select a {option} option before adding to cart")]
    RequiredOption { option: String },

    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (e.g., malformed email).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::MenuItemNotFound("m42".to_string());
        assert_eq!(err.to_string(), "Menu item not found: m42");

        let err = ValidationError::RequiredOption {
            option: "Size".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Please select a Size option before adding to cart"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "name".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
