use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One discoverable route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub href: String,
    pub title: String,
}

impl Service {
    pub fn new(href: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            title: title.into(),
        }
    }
}

/// Append-only directory of the routes mounted on the server, served at
/// `/api` for discovery.
#[derive(Debug, Default)]
pub struct ServiceIndex {
    services: RwLock<Vec<Service>>,
}

impl ServiceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, service: Service) -> Result<()> {
        self.services
            .write()
            .map_err(|_| Error::Poisoned)?
            .push(service);
        Ok(())
    }

    /// Registered services in registration order.
    pub fn services(&self) -> Result<Vec<Service>> {
        Ok(self.services.read().map_err(|_| Error::Poisoned)?.clone())
    }

    /// The whole directory as a JSON value: `{"serviceURLs": [...]}`.
    pub fn render_index(&self) -> Result<serde_json::Value> {
        let services = self.services()?;
        Ok(serde_json::json!({ "serviceURLs": services }))
    }
}
