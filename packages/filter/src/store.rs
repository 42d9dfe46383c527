//! Session-wide, versioned filter state.
//!
//! The store is the single owner of the current [`FilterState`] and
//! [`OptionCatalog`]. Both are replaced whole; there is no field-level
//! mutation. Every replacement bumps the version and wakes subscribers,
//! which refetch with the new composed query.

use std::sync::Arc;

use roadwatch_filter_models::{FilterState, OptionCatalog};
use tokio::sync::watch;

/// An immutable view of the filter state at one version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSnapshot {
    /// Incremented on every replacement, starting at 0.
    pub version: u64,
    /// The filters in effect at this version.
    pub filters: Arc<FilterState>,
}

/// Shared filter state and option catalog for one dashboard session.
#[derive(Debug)]
pub struct FilterStore {
    filters: watch::Sender<FilterSnapshot>,
    catalog: watch::Sender<Arc<OptionCatalog>>,
}

impl Default for FilterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterStore {
    /// Creates a store with every filter unset and an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        let (filters, _) = watch::channel(FilterSnapshot::default());
        let (catalog, _) = watch::channel(Arc::new(OptionCatalog::default()));
        Self { filters, catalog }
    }

    /// Returns the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> FilterSnapshot {
        self.filters.borrow().clone()
    }

    /// Replaces the whole filter state and returns the new version.
    ///
    /// Replacing with an identical state still bumps the version so an
    /// explicit "apply" always refetches.
    pub fn replace(&self, filters: FilterState) -> u64 {
        let filters = Arc::new(filters);
        let mut version = 0;
        self.filters.send_modify(|snapshot| {
            snapshot.version += 1;
            snapshot.filters = filters;
            version = snapshot.version;
        });
        log::debug!("Filter state replaced (version {version})");
        version
    }

    /// Resets every dimension to unset.
    pub fn clear(&self) -> u64 {
        self.replace(FilterState::default())
    }

    /// Subscribes to filter replacements.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<FilterSnapshot> {
        self.filters.subscribe()
    }

    /// Returns the current option catalog.
    #[must_use]
    pub fn catalog(&self) -> Arc<OptionCatalog> {
        Arc::clone(&self.catalog.borrow())
    }

    /// Replaces the option catalog.
    pub fn set_catalog(&self, catalog: OptionCatalog) {
        self.catalog.send_replace(Arc::new(catalog));
    }

    /// Subscribes to catalog replacements.
    #[must_use]
    pub fn subscribe_catalog(&self) -> watch::Receiver<Arc<OptionCatalog>> {
        self.catalog.subscribe()
    }
}
