use std::sync::Arc;
use kitchen_core::{Config, Dispatcher};

use crate::api::WsBroadcaster;

/// Shared application state
pub struct AppState {
    config: Config,
    dispatcher: Arc<Dispatcher>,
    ws_broadcaster: WsBroadcaster,
}

impl AppState {
    pub fn new(config: Config, dispatcher: Arc<Dispatcher>, ws_broadcaster: WsBroadcaster) -> Self {
        Self {
            config,
            dispatcher,
            ws_broadcaster,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        self.dispatcher.as_ref()
    }

    pub fn ws_broadcaster(&self) -> &WsBroadcaster {
        &self.ws_broadcaster
    }
}
