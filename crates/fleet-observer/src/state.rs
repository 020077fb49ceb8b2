//! Shared application state for the observer API.

use std::sync::Arc;

use fleet_core::FleetController;
use fleet_db::EntityStore;

/// State shared by every handler: the fleet controller, and through it
/// the entity store.
#[derive(Debug)]
pub struct AppState<S> {
    /// Run-state controller driving the simulation.
    pub controller: Arc<FleetController<S>>,
}

impl<S: EntityStore> AppState<S> {
    /// Wrap a controller.
    pub const fn new(controller: Arc<FleetController<S>>) -> Self {
        Self { controller }
    }

    /// The entity store behind the controller.
    pub fn store(&self) -> &S {
        self.controller.store()
    }
}
