//! Orchestration core of the OBN Kodex laser design assistant.
//!
//! A user describes a design in chat or through a setup wizard (or uploads an
//! image) and gets back SVG markup suitable for laser cutting. Image
//! generation, raster-to-vector conversion and language understanding are
//! delegated to a generative-AI service behind the `Gateway` trait; this crate
//! decides what to ask for and what to do with the answer.
//!
//! # Architecture Overview
//!
//! - **Gateway**: provider seam with a Gemini REST implementation
//! - **Capabilities**: one cancellable Gateway round trip each, typed failures
//! - **Intent resolution**: explicit intent or a classification call
//! - **Orchestrator**: design pipeline and chat personas, degrading to canned replies
//! - **Setup wizard**: work type / sub-type / font / content state machine
//! - **Session workflow**: chat history, current SVG and stale-result protection
//! - **Booking demo**: in-memory event service exposed as Gateway tools
//! - **Configuration**: YAML with defaults for every section

pub mod booking;
pub mod capabilities;
pub mod config;
pub mod core_types;
pub mod errors;
pub mod factory;
pub mod gateway;
pub mod intent;
pub mod orchestrator;
pub mod session;
pub mod tools;
pub mod wizard;

pub use capabilities::Capabilities;
pub use config::*;
pub use core_types::{ChatMessage, InlineImage, Role, VectorizationSettings};
pub use errors::{FailureKind, GatewayError, KodexError, WizardError};
pub use factory::{Kodex, KodexFactory};
pub use gateway::Gateway;
pub use intent::{Intent, IntentResolver};
pub use orchestrator::{DesignRequest, DesignResult, KnowledgeBase, Orchestrator, PromptFraming};
pub use session::{Completion, Session, SessionMode, Workflow};
pub use wizard::SetupWizard;

#[cfg(test)]
pub mod test_utils;
