//! Application state shared across all request handlers.

use crate::config::runtime::SharedConfig;
use ofd_core::dispatch::Dispatcher;
use ofd_core::rooms::RoomTopologyManager;
use ofd_core::store::RecordStore;
use std::sync::Arc;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    /// The dispatch coordinator every intent flows through.
    pub dispatcher: Arc<Dispatcher>,
    /// Runtime configuration (can be reloaded via SIGHUP).
    pub config: SharedConfig,
}

impl AppState {
    /// Create a new AppState around the dispatcher and configuration.
    pub fn new(dispatcher: Arc<Dispatcher>, config: SharedConfig) -> Self {
        Self { dispatcher, config }
    }

    /// The record store behind the dispatcher.
    pub fn store(&self) -> &Arc<dyn RecordStore> {
        self.dispatcher.store()
    }

    /// The room registry behind the dispatcher.
    pub fn rooms(&self) -> &Arc<RoomTopologyManager> {
        self.dispatcher.rooms()
    }
}
