//! Per-session state and the workflow that drives it.
//!
//! A `Workflow` owns one `Session` behind an async mutex. Every request that
//! reaches the Gateway is issued under a `RequestTicket`; the result is only
//! applied if the ticket's generation still matches the session's, so a
//! reset (which bumps the generation and cancels the in-flight token) makes
//! any late completion a no-op.

use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::core_types::{ChatMessage, VectorizationSettings};
use crate::errors::{KodexError, WizardError};
use crate::intent::Intent;
use crate::orchestrator::{AgentTurn, DesignRequest, DesignResult, Orchestrator, PromptFraming};
use crate::wizard::{Attachment, GenerationPlan, SetupWizard};

pub const SVG_FILE_NAME: &str = "obn-kodex-vector.svg";
pub const SVG_MIME_TYPE: &str = "image/svg+xml";

pub type ChatHistory = Vec<ChatMessage>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionMode {
    #[default]
    Setup,
    Chat,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub mode: SessionMode,
    pub wizard: SetupWizard,
    pub settings: VectorizationSettings,
    pub history: ChatHistory,
    pub svg_result: Option<String>,
    pub processing: bool,
    generation: u64,
}

impl Session {
    pub fn new(settings: VectorizationSettings) -> Self {
        Self {
            mode: SessionMode::Setup,
            wizard: SetupWizard::new(),
            settings,
            history: Vec::new(),
            svg_result: None,
            processing: false,
            generation: 0,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Generation number and cancellation handle of one in-flight request.
#[derive(Debug, Clone)]
pub struct RequestTicket {
    pub generation: u64,
    pub cancel: CancellationToken,
}

/// What happened to a completed request.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Applied(DesignResult),
    /// The session moved on (reset) before the request finished.
    Discarded,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SvgDownload {
    pub file_name: &'static str,
    pub mime_type: &'static str,
    pub content: String,
}

struct State {
    session: Session,
    in_flight: Option<RequestTicket>,
}

impl State {
    fn begin(&mut self) -> RequestTicket {
        self.session.generation += 1;
        self.session.processing = true;
        let ticket = RequestTicket {
            generation: self.session.generation,
            cancel: CancellationToken::new(),
        };
        self.in_flight = Some(ticket.clone());
        ticket
    }

    fn begin_upload(&mut self, attachment: &Attachment) -> RequestTicket {
        self.session.history.push(ChatMessage::user(format!(
            "Vectorizando la imagen: {}",
            attachment.file_name
        )));
        self.session.svg_result = None;
        self.session.mode = SessionMode::Chat;
        self.begin()
    }
}

pub struct Workflow {
    orchestrator: Arc<Orchestrator>,
    state: Mutex<State>,
}

impl Workflow {
    pub fn new(orchestrator: Arc<Orchestrator>, settings: VectorizationSettings) -> Self {
        Self {
            orchestrator,
            state: Mutex::new(State {
                session: Session::new(settings),
                in_flight: None,
            }),
        }
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub async fn snapshot(&self) -> Session {
        self.state.lock().await.session.clone()
    }

    /// Applies wizard selections in place. Once the setup has been submitted
    /// the selection is read-only until `reset`.
    pub async fn with_wizard<R>(
        &self,
        f: impl FnOnce(&mut SetupWizard) -> Result<R, WizardError>,
    ) -> Result<R, WizardError> {
        let mut state = self.state.lock().await;
        if state.session.mode == SessionMode::Chat {
            return Err(WizardError::Finalized);
        }
        f(&mut state.session.wizard)
    }

    pub async fn set_settings(&self, settings: VectorizationSettings) -> Result<(), KodexError> {
        settings.validate()?;
        self.state.lock().await.session.settings = settings;
        Ok(())
    }

    /// Compiles the wizard and runs the resulting plan as a new conversation.
    pub async fn submit_setup(&self) -> Result<Completion, KodexError> {
        let mut state = self.state.lock().await;
        if state.session.processing {
            return Err(KodexError::Busy);
        }
        if state.session.mode == SessionMode::Chat {
            return Err(WizardError::Finalized.into());
        }

        let plan = state.session.wizard.compile()?;
        let settings = state.session.settings;
        match plan {
            GenerationPlan::VectorizeUpload(attachment) => {
                let ticket = state.begin_upload(&attachment);
                state.session.wizard.clear_attachment();
                drop(state);
                Ok(self.run_upload(ticket, attachment, settings).await)
            }
            GenerationPlan::Design {
                prompt,
                user_facing,
                font,
            } => {
                let request = DesignRequest::new(prompt, settings, font, PromptFraming::Verbatim)?;
                state.session.history = vec![ChatMessage::user(user_facing)];
                state.session.svg_result = None;
                state.session.mode = SessionMode::Chat;
                let ticket = state.begin();
                drop(state);

                log::info!("Submitting setup design (generation {})", ticket.generation);
                let result = self
                    .orchestrator
                    .generate_design(&request, &ticket.cancel)
                    .await;
                Ok(self.complete(&ticket, result).await)
            }
        }
    }

    /// Sends one chat message; the design-or-chat decision is left to the
    /// orchestrator.
    pub async fn submit_chat(
        &self,
        text: &str,
        intent: Option<Intent>,
    ) -> Result<Completion, KodexError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(KodexError::Validation(
                "Chat message cannot be empty".to_string(),
            ));
        }

        let mut state = self.state.lock().await;
        if state.session.processing {
            return Err(KodexError::Busy);
        }
        state.session.history.push(ChatMessage::user(text));
        state.session.mode = SessionMode::Chat;
        let history = state.session.history.clone();
        let turn = AgentTurn {
            text: text.to_string(),
            intent,
            settings: state.session.settings,
        };
        let ticket = state.begin();
        drop(state);

        let result = self.orchestrator.run(&turn, &history, &ticket.cancel).await;
        Ok(self.complete(&ticket, result).await)
    }

    /// Vectorizes an uploaded image as part of the current conversation.
    pub async fn vectorize_upload(&self, attachment: Attachment) -> Result<Completion, KodexError> {
        let mut state = self.state.lock().await;
        if state.session.processing {
            return Err(KodexError::Busy);
        }
        let settings = state.session.settings;
        let ticket = state.begin_upload(&attachment);
        drop(state);
        Ok(self.run_upload(ticket, attachment, settings).await)
    }

    async fn run_upload(
        &self,
        ticket: RequestTicket,
        attachment: Attachment,
        settings: VectorizationSettings,
    ) -> Completion {
        log::info!(
            "Vectorizing upload '{}' (generation {})",
            attachment.file_name,
            ticket.generation
        );
        let result = self
            .orchestrator
            .vectorize_upload(&attachment.image, &settings, &ticket.cancel)
            .await;
        self.complete(&ticket, result).await
    }

    /// Clears wizard, history and result; vectorization settings survive.
    /// Any in-flight request is cancelled and its result will be discarded.
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        if let Some(ticket) = state.in_flight.take() {
            log::debug!("Cancelling in-flight request {}", ticket.generation);
            ticket.cancel.cancel();
        }
        let session = &mut state.session;
        session.generation += 1;
        session.mode = SessionMode::Setup;
        session.wizard.reset();
        session.history.clear();
        session.svg_result = None;
        session.processing = false;
    }

    pub async fn svg_download(&self) -> Option<SvgDownload> {
        let state = self.state.lock().await;
        state.session.svg_result.as_ref().map(|svg| SvgDownload {
            file_name: SVG_FILE_NAME,
            mime_type: SVG_MIME_TYPE,
            content: svg.clone(),
        })
    }

    async fn complete(&self, ticket: &RequestTicket, result: DesignResult) -> Completion {
        let mut state = self.state.lock().await;
        if state.session.generation != ticket.generation {
            log::debug!(
                "Discarding stale result of request {} (session is at {})",
                ticket.generation,
                state.session.generation
            );
            return Completion::Discarded;
        }

        state.in_flight = None;
        let session = &mut state.session;
        session.processing = false;
        let reply = result
            .text_response
            .clone()
            .unwrap_or_else(|| self.orchestrator.messages().design_error.clone());
        session.history.push(ChatMessage::assistant(reply));
        if let Some(svg) = &result.svg_markup {
            session.svg_result = Some(svg.clone());
        }
        Completion::Applied(result)
    }
}
