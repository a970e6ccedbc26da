use std::sync::Arc;

use crate::config::Config;
use crate::session::manager::Manager;

pub mod whip;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub sessions: Arc<Manager>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            sessions: Arc::new(Manager::new(config.clone())),
            config,
        }
    }
}
