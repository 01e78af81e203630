//! Decides whether a chat message asks for a new design or for conversation.
//!
//! Resolution never fails. An explicit intent from the caller wins; otherwise
//! the configured strategy either assumes chat or asks the Gateway, and any
//! trouble with that classification degrades to chat.

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::capabilities::Capabilities;
use crate::config::IntentStrategy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    GenerateDesign,
    Chat,
}

impl std::str::FromStr for Intent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "generate_design" | "design" => Ok(Intent::GenerateDesign),
            "chat" => Ok(Intent::Chat),
            other => Err(format!("unknown intent '{}'", other)),
        }
    }
}

#[derive(Clone)]
pub struct IntentResolver {
    capabilities: Capabilities,
    strategy: IntentStrategy,
}

impl IntentResolver {
    pub fn new(capabilities: Capabilities, strategy: IntentStrategy) -> Self {
        Self {
            capabilities,
            strategy,
        }
    }

    pub fn strategy(&self) -> IntentStrategy {
        self.strategy
    }

    pub async fn resolve(
        &self,
        text: &str,
        explicit: Option<Intent>,
        cancel: &CancellationToken,
    ) -> Intent {
        if let Some(intent) = explicit {
            return intent;
        }
        if text.trim().is_empty() {
            return Intent::Chat;
        }

        match self.strategy {
            IntentStrategy::Explicit => Intent::Chat,
            IntentStrategy::Classify => {
                match self.capabilities.classify_intent(text, cancel).await {
                    Ok(intent) => {
                        log::debug!("Classified message as {:?}", intent);
                        intent
                    }
                    Err(e) => {
                        log::warn!(
                            "Intent classification failed ({}), treating message as chat: {}",
                            e.kind(),
                            e
                        );
                        Intent::Chat
                    }
                }
            }
        }
    }
}
