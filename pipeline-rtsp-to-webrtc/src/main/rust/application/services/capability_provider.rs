use std::sync::Arc;

use crate::domain::ports::SfuEngine;
use crate::domain::value_objects::RtpCapabilities;

/// Router capabilities, read from the engine once and shared read-only
#[derive(Debug, Clone)]
pub struct CapabilityProvider {
    capabilities: Arc<RtpCapabilities>,
}

impl CapabilityProvider {
    pub fn from_engine(engine: &dyn SfuEngine) -> Self {
        let capabilities = engine.rtp_capabilities();
        tracing::debug!(codecs = capabilities.codecs.len(), "Router capabilities loaded");
        Self {
            capabilities: Arc::new(capabilities),
        }
    }

    pub fn capabilities(&self) -> &RtpCapabilities {
        &self.capabilities
    }

    pub fn shared(&self) -> Arc<RtpCapabilities> {
        self.capabilities.clone()
    }
}
