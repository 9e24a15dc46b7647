use std::sync::Arc;

use services::{
    AdminService, AppServices, AuthService, AutoSaveCoordinator, Clock, EventQueue,
    ProfileService, ProgressService, StateStore,
};

/// Everything pages and the router need, built once at startup and passed
/// down explicitly.
#[derive(Clone)]
pub struct AppContext {
    services: AppServices,
}

impl AppContext {
    #[must_use]
    pub fn new(services: AppServices) -> Self {
        Self { services }
    }

    #[must_use]
    pub fn services(&self) -> &AppServices {
        &self.services
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.services.clock()
    }

    #[must_use]
    pub fn state(&self) -> &StateStore {
        self.services.state()
    }

    #[must_use]
    pub fn auth(&self) -> Arc<AuthService> {
        self.services.auth()
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        self.services.progress()
    }

    #[must_use]
    pub fn autosave(&self) -> Arc<AutoSaveCoordinator> {
        self.services.autosave()
    }

    #[must_use]
    pub fn events(&self) -> Arc<EventQueue> {
        self.services.events()
    }

    #[must_use]
    pub fn admin(&self) -> Arc<AdminService> {
        self.services.admin()
    }

    #[must_use]
    pub fn profiles(&self) -> Arc<ProfileService> {
        self.services.profiles()
    }
}
