//! Shared request state

use std::sync::Arc;

use ld_agent::Planner;
use ld_backend::{AuthApi, ObjectStorage, TableStore};

use crate::error::{ErrorKind, ServerResult};

/// Handles to the external collaborators, injected at startup.
///
/// Every seam is a trait object so tests run the router against the
/// in-memory fakes. `planner` is `None` when the model client failed to
/// initialize; agent endpoints then serve 503.
#[derive(Clone)]
pub struct State {
    pub tables: Arc<dyn TableStore>,
    pub auth: Arc<dyn AuthApi>,
    pub storage: Arc<dyn ObjectStorage>,
    pub planner: Option<Planner>,
}

impl State {
    pub fn new(
        tables: Arc<dyn TableStore>,
        auth: Arc<dyn AuthApi>,
        storage: Arc<dyn ObjectStorage>,
        planner: Option<Planner>,
    ) -> Self {
        Self {
            tables,
            auth,
            storage,
            planner,
        }
    }

    /// The planner, or the 503 failure when it never initialized.
    pub fn planner(&self) -> ServerResult<Planner> {
        self.planner
            .clone()
            .ok_or_else(|| ErrorKind::AgentUnavailable.into())
    }
}
