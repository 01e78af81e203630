//! Builds the application graph from a `KodexConfig`

use std::sync::Arc;

use crate::booking::{BookingAssistant, EventService};
use crate::capabilities::Capabilities;
use crate::config::KodexConfig;
use crate::errors::KodexError;
use crate::gateway::{create_gateway, Gateway};
use crate::orchestrator::{KnowledgeBase, Orchestrator};
use crate::session::Workflow;

/// Everything a front end needs, wired from one configuration.
#[derive(Clone)]
pub struct Kodex {
    config: Arc<KodexConfig>,
    capabilities: Capabilities,
    orchestrator: Arc<Orchestrator>,
    events: Arc<EventService>,
}

impl Kodex {
    pub fn config(&self) -> &KodexConfig {
        &self.config
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn orchestrator(&self) -> Arc<Orchestrator> {
        self.orchestrator.clone()
    }

    pub fn events(&self) -> Arc<EventService> {
        self.events.clone()
    }

    /// A fresh session using the configured default vectorization settings.
    pub fn workflow(&self) -> Workflow {
        Workflow::new(self.orchestrator.clone(), self.config.design.defaults)
    }

    pub fn booking_assistant(&self) -> BookingAssistant {
        BookingAssistant::new(self.capabilities.clone(), self.events.clone(), &self.config)
    }

    pub fn knowledge_base(&self) -> KnowledgeBase {
        KnowledgeBase::new(
            self.config.chatbot.business_name.clone(),
            self.config.chatbot.knowledge.clone(),
        )
    }
}

pub struct KodexFactory;

impl KodexFactory {
    /// Validates the configuration and connects to the configured Gateway.
    pub fn create_from_config(config: KodexConfig) -> Result<Kodex, KodexError> {
        config.validate()?;
        let gateway = create_gateway(&config.gateway)?;
        Self::create_with_gateway(config, gateway)
    }

    /// Same as `create_from_config` but with a caller-supplied Gateway.
    pub fn create_with_gateway(
        config: KodexConfig,
        gateway: Arc<dyn Gateway>,
    ) -> Result<Kodex, KodexError> {
        let capabilities = Capabilities::new(gateway, config.gateway.models.clone());
        let orchestrator = Arc::new(Orchestrator::new(capabilities.clone(), &config));
        let events = Arc::new(EventService::from_config(&config.booking)?);
        log::debug!(
            "Kodex ready (chat model: {}, image model: {}, vision model: {})",
            config.gateway.models.chat,
            config.gateway.models.image,
            config.gateway.models.vision
        );

        Ok(Kodex {
            config: Arc::new(config),
            capabilities,
            orchestrator,
            events,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BookingConfig;
    use crate::test_utils::scripted_gateway::ScriptedGateway;

    #[test]
    fn missing_api_key_is_a_gateway_configuration_error() {
        let mut config = KodexConfig::default();
        config.gateway.auth.api_key = None;
        config.gateway.auth.api_key_env = Some("KODEX_FACTORY_TEST_UNSET_KEY".to_string());
        assert!(matches!(
            KodexFactory::create_from_config(config),
            Err(KodexError::Gateway(_))
        ));
    }

    #[test]
    fn invalid_config_is_rejected_before_connecting() {
        let mut config = KodexConfig::default();
        config.gateway.auth.api_key = Some("k".to_string());
        config.booking.deposit_ratio = 2.0;
        assert!(matches!(
            KodexFactory::create_from_config(config),
            Err(KodexError::Config(_))
        ));
    }

    #[tokio::test]
    async fn wires_workflow_knowledge_and_booking() {
        let mut config = KodexConfig::default();
        config.chatbot.business_name = "Taller Luz".to_string();
        config.chatbot.knowledge = "Abrimos de 9 a 18 h.".to_string();
        config.booking = BookingConfig {
            deposit_ratio: 0.25,
            ..Default::default()
        };

        let kodex =
            KodexFactory::create_with_gateway(config, Arc::new(ScriptedGateway::new(vec![])))
                .unwrap();

        let session = kodex.workflow().snapshot().await;
        assert_eq!(session.settings, kodex.config().design.defaults);
        assert_eq!(kodex.knowledge_base().business_name, "Taller Luz");
        assert_eq!(kodex.events().deposit_ratio(), 0.25);
        assert_eq!(kodex.booking_assistant().service().packages().len(), 4);
    }
}
