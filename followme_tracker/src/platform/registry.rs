//! Registry of flight platform drivers.
//!
//! Constructed at startup, populated via `register()` and queried by the
//! driver name from `[platform] driver`. No global state.

use super::simulation::SimulatedPlatform;
use super::{FlightPlatform, PlatformError, PlatformFactory};
use followme_common::config::AppConfig;
use std::collections::HashMap;

/// Name → factory map of available drivers.
pub struct PlatformRegistry {
    factories: HashMap<&'static str, PlatformFactory>,
}

impl PlatformRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry holding every driver shipped with the tracker.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(SimulatedPlatform::NAME, SimulatedPlatform::factory);
        registry
    }

    /// Register a driver factory.
    ///
    /// # Panics
    /// Panics if a driver with the same name is already registered.
    pub fn register(&mut self, name: &'static str, factory: PlatformFactory) {
        if self.factories.contains_key(name) {
            panic!("Platform driver '{name}' is already registered");
        }
        self.factories.insert(name, factory);
    }

    /// Instantiate the driver registered under `name`.
    ///
    /// # Errors
    /// `PlatformError::DriverNotFound` if `name` is unknown, or whatever the
    /// factory reports.
    pub fn create(
        &self,
        name: &str,
        config: &AppConfig,
    ) -> Result<Box<dyn FlightPlatform>, PlatformError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| PlatformError::DriverNotFound(name.to_string()))?;
        factory(config)
    }

    /// Registered driver names, sorted.
    pub fn list(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for PlatformRegistry {
    fn default() -> Self {
        Self::new()
    }
}
