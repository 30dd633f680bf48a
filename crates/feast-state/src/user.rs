//! # User Store
//!
//! The signed-in user's profile, hydrated from storage and written back on
//! every change.
//!
//! ## Hydration
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  store.get(user_key)                                                    │
//! │     ├── profile ────────► use it                                        │
//! │     ├── nothing ────────► use the fallback profile AND write it         │
//! │     └── read/parse error ► use the fallback profile, write nothing yet  │
//! │                                                                         │
//! │  Until then there is no user: mutations return false / None and         │
//! │  change nothing.                                                        │
//! │                                                                         │
//! │  After a failed read the first mutation writes the fallback-based       │
//! │  profile over whatever is stored.                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::{debug, info};

use feast_core::validation::ValidationResult;
use feast_core::{Address, AddressPatch, NewAddress, User, UserPatch, USER_STORAGE_KEY};
use feast_store::KeyValueStore;

use crate::persist::{Loaded, Persister};

struct Shared {
    user: Mutex<Option<User>>,
    persister: Persister,
    loaded: watch::Sender<bool>,
}

/// The persisted user profile.
#[derive(Clone)]
pub struct UserStore {
    shared: Arc<Shared>,
}

impl UserStore {
    /// Creates the store and starts hydrating from `key`.
    ///
    /// Must be called inside a tokio runtime.
    pub fn spawn(store: Arc<dyn KeyValueStore>, key: impl Into<String>, fallback: User) -> Self {
        let (loaded, _) = watch::channel(false);
        let users = UserStore {
            shared: Arc::new(Shared {
                user: Mutex::new(None),
                persister: Persister::spawn(store, key.into()),
                loaded,
            }),
        };

        tokio::spawn(hydrate(Arc::clone(&users.shared), fallback));
        users
    }

    /// [`spawn`](Self::spawn) with the default key and the demo profile.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::spawn(store, USER_STORAGE_KEY, User::demo())
    }

    /// Creates the store and waits for hydration to finish.
    pub async fn load(store: Arc<dyn KeyValueStore>, key: impl Into<String>, fallback: User) -> Self {
        let users = Self::spawn(store, key, fallback);
        users.wait_loaded().await;
        users
    }

    fn lock(&self) -> MutexGuard<'_, Option<User>> {
        self.shared
            .user
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` on the hydrated user and writes the result back if `f`
    /// reports a change. `None` before hydration.
    fn with_user_mut<F, R>(&self, f: F, changed: impl FnOnce(&R) -> bool) -> Option<R>
    where
        F: FnOnce(&mut User) -> R,
    {
        let mut guard = self.lock();
        let user = guard.as_mut()?;
        let result = f(user);
        if changed(&result) {
            self.shared.persister.save(&*user);
        }
        Some(result)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Applies a partial profile update.
    ///
    /// ## Returns
    /// `Ok(false)` before hydration.
    pub fn update_user(&self, patch: UserPatch) -> ValidationResult<bool> {
        debug!("Updating profile");
        self.with_user_mut(|user| user.apply(patch), Result::is_ok)
            .map_or(Ok(false), |r| r.map(|()| true))
    }

    /// Adds an address.
    ///
    /// ## Returns
    /// The new address id, or `Ok(None)` before hydration.
    pub fn add_address(&self, address: NewAddress) -> ValidationResult<Option<String>> {
        debug!(title = %address.title, "Adding address");
        self.with_user_mut(|user| user.add_address(address), Result::is_ok)
            .transpose()
    }

    /// Updates an address. `Ok(false)` if there is no such address or no
    /// user yet.
    pub fn update_address(&self, address_id: &str, patch: AddressPatch) -> ValidationResult<bool> {
        debug!(address_id = %address_id, "Updating address");
        self.with_user_mut(
            |user| user.update_address(address_id, patch),
            |r| matches!(r, Ok(true)),
        )
        .unwrap_or(Ok(false))
    }

    pub fn remove_address(&self, address_id: &str) -> bool {
        debug!(address_id = %address_id, "Removing address");
        self.with_user_mut(|user| user.remove_address(address_id), |removed| *removed)
            .unwrap_or(false)
    }

    /// Adds or removes a favourite restaurant.
    ///
    /// ## Returns
    /// Whether the restaurant is a favourite afterwards (`false` before
    /// hydration).
    pub fn toggle_favorite(&self, restaurant_id: &str) -> bool {
        debug!(restaurant_id = %restaurant_id, "Toggling favourite");
        self.with_user_mut(|user| user.toggle_favorite(restaurant_id), |_| true)
            .unwrap_or(false)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Snapshot of the profile, `None` before hydration.
    pub fn user(&self) -> Option<User> {
        self.lock().clone()
    }

    pub fn is_favorite(&self, restaurant_id: &str) -> bool {
        self.lock()
            .as_ref()
            .is_some_and(|user| user.is_favorite(restaurant_id))
    }

    pub fn default_address(&self) -> Option<Address> {
        self.lock()
            .as_ref()
            .and_then(|user| user.default_address().cloned())
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Whether hydration has finished. `!is_loaded()` is the UI's loading
    /// flag.
    pub fn is_loaded(&self) -> bool {
        *self.shared.loaded.borrow()
    }

    pub async fn wait_loaded(&self) {
        let mut rx = self.shared.loaded.subscribe();
        let _ = rx.wait_for(|loaded| *loaded).await;
    }

    /// Waits until every write queued so far has reached the store.
    pub async fn flush(&self) {
        self.shared.persister.flush().await;
    }
}

impl std::fmt::Debug for UserStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserStore")
            .field("key", &self.shared.persister.key())
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

async fn hydrate(shared: Arc<Shared>, fallback: User) {
    let (user, write_fallback) = match shared.persister.load::<User>().await {
        Loaded::Found(user) => (user, false),
        Loaded::Missing => (fallback, true),
        Loaded::Failed => (fallback, false),
    };

    {
        let mut guard = shared.user.lock().unwrap_or_else(PoisonError::into_inner);
        if write_fallback {
            shared.persister.save(&user);
        }
        info!(
            key = %shared.persister.key(),
            user_id = %user.id,
            stored = !write_fallback,
            "Profile hydrated"
        );
        *guard = Some(user);
    }

    shared.loaded.send_replace(true);
}

// =============================================================================
// Unit Tests
// =============================================================================
