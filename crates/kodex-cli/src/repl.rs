use anyhow::{Context, Result};
use kodex_core::core_types::ChatMessage;
use kodex_core::intent::Intent;
use kodex_core::orchestrator::KnowledgeBase;
use kodex_core::session::{Completion, SVG_FILE_NAME};
use kodex_core::{Kodex, VectorizationSettings};
use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio_util::sync::CancellationToken;

struct Prompt<R = BufReader<Stdin>> {
    lines: Lines<R>,
}

impl Prompt {
    fn new() -> Self {
        Self::from_reader(BufReader::new(tokio::io::stdin()))
    }
}

impl<R: AsyncBufRead + Unpin> Prompt<R> {
    fn from_reader(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }

    /// Next non-empty line, or `None` at end of input or on `/quit`.
    async fn next(&mut self) -> Result<Option<String>> {
        loop {
            print!("> ");
            std::io::stdout().flush()?;
            let Some(line) = self.lines.next_line().await? else {
                return Ok(None);
            };
            let line = line.trim();
            match line {
                "" => continue,
                "/quit" | "/exit" => return Ok(None),
                _ => return Ok(Some(line.to_string())),
            }
        }
    }

    /// Like `next`, but `interrupt` firing at the prompt also ends the session.
    async fn next_or<F: Future>(&mut self, interrupt: F) -> Result<Option<String>> {
        tokio::select! {
            line = self.next() => line,
            _ = interrupt => {
                println!();
                Ok(None)
            }
        }
    }
}

pub async fn chat(kodex: &Kodex, intent: Option<Intent>, settings: VectorizationSettings) -> Result<()> {
    let workflow = kodex.workflow();
    workflow.set_settings(settings).await?;

    println!("OBN Kodex LaserAI. Describe a design or ask a question.");
    println!("Commands: /design <text>, /save [file], /reset, /quit");

    let mut prompt = Prompt::new();
    while let Some(line) = prompt.next_or(tokio::signal::ctrl_c()).await? {
        if line == "/reset" {
            workflow.reset().await;
            println!("Session cleared.");
            continue;
        }
        if let Some(rest) = line.strip_prefix("/save") {
            let path = match rest.trim() {
                "" => PathBuf::from(SVG_FILE_NAME),
                path => PathBuf::from(path),
            };
            match workflow.svg_download().await {
                Some(download) => {
                    tokio::fs::write(&path, download.content)
                        .await
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("SVG saved to {}", path.display());
                }
                None => println!("There is no SVG to save yet."),
            }
            continue;
        }

        let (text, turn_intent) = match line.strip_prefix("/design ") {
            Some(rest) => (rest.to_string(), Some(Intent::GenerateDesign)),
            None => (line.clone(), intent),
        };

        tokio::select! {
            outcome = workflow.submit_chat(&text, turn_intent) => match outcome {
                Ok(Completion::Applied(result)) => {
                    if let Some(reply) = &result.text_response {
                        println!("{}", reply);
                    }
                    if result.svg_markup.is_some() {
                        println!("(SVG ready, use /save to write it)");
                    }
                }
                Ok(Completion::Discarded) => {}
                Err(e) => eprintln!("{}", e),
            },
            _ = tokio::signal::ctrl_c() => {
                workflow.reset().await;
                println!("\nCancelled. Session cleared.");
            }
        }
    }
    Ok(())
}

pub async fn bot(kodex: &Kodex, knowledge_file: Option<&Path>) -> Result<()> {
    let knowledge = match knowledge_file {
        Some(path) => KnowledgeBase::new(
            kodex.config().chatbot.business_name.clone(),
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?,
        ),
        None => kodex.knowledge_base(),
    };
    if knowledge.knowledge.trim().is_empty() {
        log::warn!("Chatbot knowledge is empty; answers will say the information is missing");
    }

    println!("{} chatbot. /quit to leave.", knowledge.business_name);
    let orchestrator = kodex.orchestrator();
    let mut history: Vec<ChatMessage> = Vec::new();
    let mut prompt = Prompt::new();
    while let Some(line) = prompt.next().await? {
        history.push(ChatMessage::user(line));
        let reply = orchestrator
            .knowledge_reply(&history, &knowledge, &CancellationToken::new())
            .await;
        println!("{}", reply.text);
        history.push(ChatMessage::assistant(reply.text));
    }
    Ok(())
}

pub async fn booking_assistant(kodex: &Kodex) -> Result<()> {
    let assistant = kodex.booking_assistant();
    println!("Asistente de reservas. /quit para salir.");

    let mut history: Vec<ChatMessage> = Vec::new();
    let mut prompt = Prompt::new();
    while let Some(line) = prompt.next().await? {
        history.push(ChatMessage::user(line));
        let reply = assistant.reply(&history, &CancellationToken::new()).await;
        println!("{}", reply.text);
        history.push(ChatMessage::assistant(reply.text));
    }
    Ok(())
}
