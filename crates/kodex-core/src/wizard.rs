//! Setup wizard: the guided path from "what kind of work" to a generation plan.
//!
//! Selections progress work type → sub-type (cut and 3D only) → content
//! (text and/or an image) → font (cut names only). Each transition is
//! checked, so later-stage fields never outlive the choice that made them
//! meaningful. `compile` turns a ready selection into either a design
//! request or a direct upload vectorization.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core_types::InlineImage;
use crate::errors::WizardError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkType {
    Cut,
    CutAndEngrave,
    Engrave,
    ThreeD,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CutSubType {
    Name,
    Figure,
    Outline,
    Shape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ThreeDSubType {
    NewDesign,
    ExistingDesign,
}

/// The work type together with its sub-type, where one applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkSelection {
    Cut(Option<CutSubType>),
    CutAndEngrave,
    Engrave,
    ThreeD(Option<ThreeDSubType>),
}

impl WorkSelection {
    pub fn work_type(&self) -> WorkType {
        match self {
            WorkSelection::Cut(_) => WorkType::Cut,
            WorkSelection::CutAndEngrave => WorkType::CutAndEngrave,
            WorkSelection::Engrave => WorkType::Engrave,
            WorkSelection::ThreeD(_) => WorkType::ThreeD,
        }
    }

    fn accepts_upload(&self) -> bool {
        !matches!(
            self,
            WorkSelection::Cut(Some(CutSubType::Name))
                | WorkSelection::ThreeD(Some(ThreeDSubType::NewDesign))
        )
    }

    /// Flows where an attached image is vectorized directly instead of
    /// being used as inspiration for a generated design.
    fn is_image_flow(&self) -> bool {
        matches!(
            self,
            WorkSelection::Cut(Some(
                CutSubType::Figure | CutSubType::Outline | CutSubType::Shape
            )) | WorkSelection::CutAndEngrave
                | WorkSelection::Engrave
                | WorkSelection::ThreeD(Some(ThreeDSubType::ExistingDesign))
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FontStyle {
    SansSerif,
    Serif,
    Script,
    Gothic,
    Display,
    Monospace,
    Fantasy,
    Handwriting,
    Blackletter,
    Decorative,
    Stencil,
    Futuristic,
    Retro,
    Comic,
    Calligraphy,
    Graffiti,
    Pixel,
    Rounded,
    Grunge,
    ArtDeco,
}

impl FontStyle {
    pub const ALL: [FontStyle; 20] = [
        FontStyle::SansSerif,
        FontStyle::Serif,
        FontStyle::Script,
        FontStyle::Gothic,
        FontStyle::Display,
        FontStyle::Monospace,
        FontStyle::Fantasy,
        FontStyle::Handwriting,
        FontStyle::Blackletter,
        FontStyle::Decorative,
        FontStyle::Stencil,
        FontStyle::Futuristic,
        FontStyle::Retro,
        FontStyle::Comic,
        FontStyle::Calligraphy,
        FontStyle::Graffiti,
        FontStyle::Pixel,
        FontStyle::Rounded,
        FontStyle::Grunge,
        FontStyle::ArtDeco,
    ];

    /// The name used inside generation prompts.
    pub fn label(&self) -> &'static str {
        match self {
            FontStyle::SansSerif => "sans-serif",
            FontStyle::Serif => "serif",
            FontStyle::Script => "script",
            FontStyle::Gothic => "gothic",
            FontStyle::Display => "display",
            FontStyle::Monospace => "monospace",
            FontStyle::Fantasy => "fantasy",
            FontStyle::Handwriting => "handwriting",
            FontStyle::Blackletter => "blackletter",
            FontStyle::Decorative => "decorative",
            FontStyle::Stencil => "stencil",
            FontStyle::Futuristic => "futuristic",
            FontStyle::Retro => "retro",
            FontStyle::Comic => "comic",
            FontStyle::Calligraphy => "calligraphy",
            FontStyle::Graffiti => "graffiti",
            FontStyle::Pixel => "pixel",
            FontStyle::Rounded => "rounded",
            FontStyle::Grunge => "grunge",
            FontStyle::ArtDeco => "art deco",
        }
    }
}

impl fmt::Display for FontStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for WorkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WorkType::Cut => "cut",
            WorkType::CutAndEngrave => "cut-and-engrave",
            WorkType::Engrave => "engrave",
            WorkType::ThreeD => "3d",
        })
    }
}

impl fmt::Display for WorkSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkSelection::Cut(Some(sub)) => write!(f, "cut + {:?}", sub),
            WorkSelection::ThreeD(Some(sub)) => write!(f, "3d + {:?}", sub),
            other => write!(f, "{}", other.work_type()),
        }
    }
}

fn normalize(s: &str) -> String {
    s.trim().to_ascii_lowercase().replace(['_', ' '], "-")
}

impl FromStr for WorkType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "cut" | "corte" => Ok(WorkType::Cut),
            "cut-and-engrave" | "cut-engrave" | "corte-grabado" => Ok(WorkType::CutAndEngrave),
            "engrave" | "grabado" => Ok(WorkType::Engrave),
            "3d" | "three-d" => Ok(WorkType::ThreeD),
            other => Err(format!("unknown work type '{}'", other)),
        }
    }
}

impl FromStr for CutSubType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "name" | "nombre" => Ok(CutSubType::Name),
            "figure" | "figura" => Ok(CutSubType::Figure),
            "outline" | "contorno" => Ok(CutSubType::Outline),
            "shape" | "forma" => Ok(CutSubType::Shape),
            other => Err(format!("unknown cut sub-type '{}'", other)),
        }
    }
}

impl FromStr for ThreeDSubType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "new" | "new-design" | "nuevo" => Ok(ThreeDSubType::NewDesign),
            "existing" | "existing-design" | "existente" => Ok(ThreeDSubType::ExistingDesign),
            other => Err(format!("unknown 3d sub-type '{}'", other)),
        }
    }
}

impl FromStr for FontStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s);
        FontStyle::ALL
            .iter()
            .copied()
            .find(|font| normalize(font.label()) == wanted)
            .ok_or_else(|| format!("unknown font style '{}'", s.trim()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub image: InlineImage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStep {
    ChooseWorkType,
    ChooseSubType,
    ProvideContent,
    ChooseFont,
    Ready,
}

/// What a ready wizard hands to the workflow.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationPlan {
    Design {
        /// Subject sentence sent to image generation.
        prompt: String,
        /// What the user typed, shown as their chat message.
        user_facing: String,
        font: Option<FontStyle>,
    },
    VectorizeUpload(Attachment),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetupWizard {
    selection: Option<WorkSelection>,
    font: Option<FontStyle>,
    text: String,
    attachment: Option<Attachment>,
}

impl SetupWizard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selection(&self) -> Option<WorkSelection> {
        self.selection
    }

    pub fn font(&self) -> Option<FontStyle> {
        self.font
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn attachment(&self) -> Option<&Attachment> {
        self.attachment.as_ref()
    }

    /// Starts over from a new work type; sub-type, font and any upload the
    /// new type would not accept are dropped. Text is kept.
    pub fn select_work_type(&mut self, work_type: WorkType) {
        self.selection = Some(match work_type {
            WorkType::Cut => WorkSelection::Cut(None),
            WorkType::CutAndEngrave => WorkSelection::CutAndEngrave,
            WorkType::Engrave => WorkSelection::Engrave,
            WorkType::ThreeD => WorkSelection::ThreeD(None),
        });
        self.font = None;
        self.drop_unaccepted_upload();
    }

    pub fn select_cut_sub_type(&mut self, sub_type: CutSubType) -> Result<(), WizardError> {
        match self.selection {
            Some(WorkSelection::Cut(_)) => {
                self.selection = Some(WorkSelection::Cut(Some(sub_type)));
                if sub_type != CutSubType::Name {
                    self.font = None;
                }
                self.drop_unaccepted_upload();
                Ok(())
            }
            Some(other) => Err(WizardError::SubTypeMismatch {
                work_type: other.work_type().to_string(),
                sub_type: format!("{:?}", sub_type),
            }),
            None => Err(WizardError::NoWorkType),
        }
    }

    pub fn select_three_d_sub_type(&mut self, sub_type: ThreeDSubType) -> Result<(), WizardError> {
        match self.selection {
            Some(WorkSelection::ThreeD(_)) => {
                self.selection = Some(WorkSelection::ThreeD(Some(sub_type)));
                self.drop_unaccepted_upload();
                Ok(())
            }
            Some(other) => Err(WizardError::SubTypeMismatch {
                work_type: other.work_type().to_string(),
                sub_type: format!("{:?}", sub_type),
            }),
            None => Err(WizardError::NoWorkType),
        }
    }

    pub fn select_font(&mut self, font: FontStyle) -> Result<(), WizardError> {
        match self.selection {
            Some(WorkSelection::Cut(Some(CutSubType::Name))) => {
                self.font = Some(font);
                Ok(())
            }
            None => Err(WizardError::NoWorkType),
            Some(_) => Err(WizardError::FontNotApplicable),
        }
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn attach(&mut self, attachment: Attachment) -> Result<(), WizardError> {
        match self.selection {
            None => Err(WizardError::NoWorkType),
            Some(selection) if !selection.accepts_upload() => {
                Err(WizardError::UploadNotAccepted(selection.to_string()))
            }
            Some(_) => {
                self.attachment = Some(attachment);
                Ok(())
            }
        }
    }

    pub fn clear_attachment(&mut self) {
        self.attachment = None;
    }

    fn drop_unaccepted_upload(&mut self) {
        if let Some(selection) = self.selection {
            if !selection.accepts_upload() && self.attachment.take().is_some() {
                log::debug!("Dropped attachment not accepted by {}", selection);
            }
        }
    }

    fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }

    pub fn step(&self) -> WizardStep {
        let Some(selection) = self.selection else {
            return WizardStep::ChooseWorkType;
        };

        match selection {
            WorkSelection::Cut(None) | WorkSelection::ThreeD(None) => WizardStep::ChooseSubType,
            WorkSelection::Cut(Some(CutSubType::Name)) => {
                if !self.has_text() {
                    WizardStep::ProvideContent
                } else if self.font.is_none() {
                    WizardStep::ChooseFont
                } else {
                    WizardStep::Ready
                }
            }
            WorkSelection::ThreeD(Some(ThreeDSubType::ExistingDesign)) => {
                if self.attachment.is_some() {
                    WizardStep::Ready
                } else {
                    WizardStep::ProvideContent
                }
            }
            WorkSelection::ThreeD(Some(ThreeDSubType::NewDesign)) => {
                if self.has_text() {
                    WizardStep::Ready
                } else {
                    WizardStep::ProvideContent
                }
            }
            WorkSelection::Cut(Some(_)) | WorkSelection::CutAndEngrave | WorkSelection::Engrave => {
                if self.has_text() || self.attachment.is_some() {
                    WizardStep::Ready
                } else {
                    WizardStep::ProvideContent
                }
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        self.step() == WizardStep::Ready
    }

    pub fn compile(&self) -> Result<GenerationPlan, WizardError> {
        let step = self.step();
        let selection = match (step, self.selection) {
            (WizardStep::Ready, Some(selection)) => selection,
            (WizardStep::ChooseWorkType, _) | (_, None) => return Err(WizardError::NoWorkType),
            (WizardStep::ChooseSubType, _) => {
                return Err(WizardError::Incomplete("choose a sub-type".to_string()))
            }
            (WizardStep::ChooseFont, _) => {
                return Err(WizardError::Incomplete("choose a font".to_string()))
            }
            (_, Some(selection)) => {
                return Err(WizardError::Incomplete(match selection {
                    WorkSelection::ThreeD(Some(ThreeDSubType::ExistingDesign)) => {
                        "attach the existing design".to_string()
                    }
                    WorkSelection::Cut(Some(CutSubType::Name))
                    | WorkSelection::ThreeD(Some(ThreeDSubType::NewDesign)) => {
                        "enter the text".to_string()
                    }
                    _ => "enter a description or attach an image".to_string(),
                }))
            }
        };

        if let Some(attachment) = &self.attachment {
            if selection.is_image_flow() {
                return Ok(GenerationPlan::VectorizeUpload(attachment.clone()));
            }
        }

        let text = self.text.trim();
        let (prompt, font) = match selection {
            WorkSelection::Cut(Some(CutSubType::Name)) => (text.to_string(), self.font),
            WorkSelection::Cut(Some(CutSubType::Figure)) => (
                format!(
                    "A simple figure of {} for laser cutting, like a silhouette or stencil.",
                    text
                ),
                None,
            ),
            WorkSelection::Cut(Some(CutSubType::Outline)) => {
                (format!("The outline of {} for laser cutting.", text), None)
            }
            WorkSelection::Cut(Some(CutSubType::Shape)) => (
                format!("An abstract shape based on \"{}\" for laser cutting.", text),
                None,
            ),
            WorkSelection::CutAndEngrave => (
                format!(
                    "A design of \"{}\" for laser cutting and engraving, with well-defined areas for each process.",
                    text
                ),
                None,
            ),
            WorkSelection::Engrave => (
                format!("A detailed design of \"{}\" for laser engraving.", text),
                None,
            ),
            WorkSelection::ThreeD(Some(ThreeDSubType::NewDesign)) => (
                format!(
                    "A design of {} that simulates a layered 3D effect for laser cutting.",
                    text
                ),
                None,
            ),
            // A ready selection always has its sub-type, and 3d+existing always
            // has an attachment, which took the upload path above.
            WorkSelection::Cut(None)
            | WorkSelection::ThreeD(None)
            | WorkSelection::ThreeD(Some(ThreeDSubType::ExistingDesign)) => {
                return Err(WizardError::Incomplete(format!(
                    "{} cannot be compiled into a design",
                    selection
                )))
            }
        };

        Ok(GenerationPlan::Design {
            prompt,
            user_facing: text.to_string(),
            font,
        })
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
