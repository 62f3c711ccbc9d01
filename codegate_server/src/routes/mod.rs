//! Route handlers for the Codegate server

pub mod check;

use crate::config::Config;
use crate::guard::AdmissionEngine;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub engine: Arc<AdmissionEngine>,
}

impl AppState {
    pub fn new(config: Config, engine: Arc<AdmissionEngine>) -> Self {
        Self {
            config: Arc::new(config),
            engine,
        }
    }
}
