use ytaudio_core::{AudioService, Config};

/// Shared application state
pub struct AppState {
    config: Config,
    service: AudioService,
}

impl AppState {
    pub fn new(config: Config, service: AudioService) -> Self {
        Self { config, service }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn service(&self) -> &AudioService {
        &self.service
    }
}
