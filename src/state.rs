use crate::events::TelemetryBus;
use crate::relay::RelayConfig;
use crate::store::DeviceStore;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: DeviceStore,
    pub bus: TelemetryBus,
    pub relay: RelayConfig,
}

impl AppState {
    pub fn new(store: DeviceStore, relay: RelayConfig) -> Self {
        Self {
            store,
            bus: TelemetryBus::new(),
            relay,
        }
    }
}
