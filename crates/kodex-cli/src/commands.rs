use anyhow::{bail, Context, Result};
use kodex_core::booking::{parse_event_date, BookingRequest, EventService};
use kodex_core::core_types::InlineImage;
use kodex_core::orchestrator::{DesignRequest, DesignResult, PromptFraming};
use kodex_core::session::Completion;
use kodex_core::wizard::{Attachment, CutSubType, FontStyle, ThreeDSubType, WorkType};
use kodex_core::{Kodex, VectorizationSettings};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

use crate::BookingCommands;

/// Token cancelled on Ctrl-C.
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Interrupted, cancelling the request");
            child.cancel();
        }
    });
    token
}

async fn write_svg(svg: &str, output: &Path) -> Result<()> {
    tokio::fs::write(output, svg)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("SVG saved to {}", output.display());
    Ok(())
}

async fn report(result: DesignResult, output: &Path) -> Result<()> {
    if let Some(text) = &result.text_response {
        println!("{}", text);
    }
    if let Some(svg) = &result.svg_markup {
        write_svg(svg, output).await?;
    }
    match result.failure {
        Some(kind) => bail!("No SVG was produced ({})", kind),
        None => Ok(()),
    }
}

pub async fn design(
    kodex: &Kodex,
    prompt: &str,
    font: Option<FontStyle>,
    settings: VectorizationSettings,
    output: &Path,
) -> Result<()> {
    let request = DesignRequest::new(prompt, settings, font, PromptFraming::Figure)?;
    let cancel = cancel_on_ctrl_c();
    let result = kodex
        .orchestrator()
        .generate_design(&request, &cancel)
        .await;
    report(result, output).await
}

pub async fn vectorize(
    kodex: &Kodex,
    image: &Path,
    settings: VectorizationSettings,
    output: &Path,
) -> Result<()> {
    let image = InlineImage::from_file(image).await?;
    let cancel = cancel_on_ctrl_c();
    let result = kodex
        .orchestrator()
        .vectorize_upload(&image, &settings, &cancel)
        .await;
    report(result, output).await
}

pub struct WizardArgs {
    pub work_type: WorkType,
    pub cut: Option<CutSubType>,
    pub three_d: Option<ThreeDSubType>,
    pub font: Option<FontStyle>,
    pub text: Option<String>,
    pub image: Option<PathBuf>,
}

pub async fn wizard(
    kodex: &Kodex,
    args: WizardArgs,
    settings: VectorizationSettings,
    output: &Path,
) -> Result<()> {
    let attachment = match &args.image {
        Some(path) => Some(Attachment {
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            image: InlineImage::from_file(path).await?,
        }),
        None => None,
    };

    let workflow = kodex.workflow();
    workflow.set_settings(settings).await?;
    workflow
        .with_wizard(|w| {
            w.select_work_type(args.work_type);
            if let Some(sub_type) = args.cut {
                w.select_cut_sub_type(sub_type)?;
            }
            if let Some(sub_type) = args.three_d {
                w.select_three_d_sub_type(sub_type)?;
            }
            if let Some(text) = &args.text {
                w.set_text(text.as_str());
            }
            if let Some(font) = args.font {
                w.select_font(font)?;
            }
            if let Some(attachment) = attachment {
                w.attach(attachment)?;
            }
            log::debug!("Wizard step: {:?}", w.step());
            Ok::<_, kodex_core::WizardError>(())
        })
        .await?;

    let completion = workflow.submit_setup().await?;
    let Completion::Applied(result) = completion else {
        bail!("The request was superseded before it finished");
    };
    report(result, output).await
}

pub async fn refine(
    kodex: &Kodex,
    text: Option<String>,
    file: Option<&Path>,
    image: Option<&Path>,
) -> Result<()> {
    let cancel = cancel_on_ctrl_c();
    let raw = match (text, file, image) {
        (Some(text), _, _) => text,
        (None, Some(file), _) => tokio::fs::read_to_string(file)
            .await
            .with_context(|| format!("Failed to read {}", file.display()))?,
        (None, None, Some(image)) => {
            let image = InlineImage::from_file(image).await?;
            kodex
                .capabilities()
                .extract_image_text(&image, &cancel)
                .await
                .context("Could not extract text from the image")?
        }
        (None, None, None) => bail!("Provide --text, --file or --image"),
    };

    let refined = kodex
        .capabilities()
        .refine_knowledge(&raw, &cancel)
        .await
        .context("Could not refine the knowledge text")?;
    println!("{}", refined);
    Ok(())
}

pub async fn palette(kodex: &Kodex, image: &Path) -> Result<()> {
    let image = InlineImage::from_file(image).await?;
    let colors = kodex
        .capabilities()
        .analyze_logo(&image, &cancel_on_ctrl_c())
        .await
        .context("Could not analyze the logo")?;
    if colors.is_empty() {
        println!("No dominant colors found");
    }
    for color in colors {
        println!("{}", color);
    }
    Ok(())
}

pub async fn booking(events: &EventService, action: &BookingCommands) -> Result<()> {
    match action {
        BookingCommands::Packages => {
            for package in events.packages() {
                println!(
                    "{:<6} {:<18} ${:>9.2}  {}",
                    package.id, package.name, package.price, package.description
                );
            }
        }
        BookingCommands::Check { date } => {
            let date = parse_event_date(date).with_context(|| format!("Invalid date '{}'", date))?;
            println!("{}", events.check_availability(date).message);
        }
        BookingCommands::Book {
            name,
            email,
            phone,
            event_type,
            date,
            guests,
            package,
        } => {
            let event_date =
                parse_event_date(date).with_context(|| format!("Invalid date '{}'", date))?;
            let response = events
                .create_booking(BookingRequest {
                    client_name: name.clone(),
                    client_email: email.clone(),
                    client_phone: phone.clone(),
                    event_type: event_type.clone(),
                    event_date,
                    guest_count: *guests,
                    package_id: Some(package.clone()),
                    package_name: Some(package.clone()),
                })
                .await?;
            println!("{}", response.confirmation_message);
        }
        BookingCommands::Assistant => bail!("The booking assistant is interactive"),
    }
    Ok(())
}
