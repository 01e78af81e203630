//! Configuration type definitions
//!
//! Every section carries defaults, so an empty YAML document yields a usable
//! configuration pointed at the public Gemini endpoint. Canned replies live in
//! `MessagesConfig` because product copy is deployment data, not code.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::core_types::VectorizationSettings;
use crate::errors::KodexError;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct KodexConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub design: DesignConfig,
    #[serde(default)]
    pub chatbot: ChatbotConfig,
    #[serde(default)]
    pub booking: BookingConfig,
    #[serde(default)]
    pub messages: MessagesConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GatewayConfig {
    /// `gemini`, or a `custom: { base_url }` map.
    #[serde(default, with = "serde_yaml::with::singleton_map")]
    pub provider: GatewayProvider,
    #[serde(default)]
    pub models: ModelSet,
    #[serde(default)]
    pub parameters: ModelParameters,
    #[serde(default)]
    pub auth: GatewayAuth,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GatewayProvider {
    #[default]
    Gemini,
    /// Any endpoint speaking the Gemini REST dialect (proxies, test servers).
    Custom { base_url: String },
}

/// Models used per capability. Image generation needs a model that can
/// return image parts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelSet {
    #[serde(default = "default_chat_model")]
    pub chat: String,
    #[serde(default = "default_image_model")]
    pub image: String,
    #[serde(default = "default_vision_model")]
    pub vision: String,
}

impl Default for ModelSet {
    fn default() -> Self {
        Self {
            chat: default_chat_model(),
            image: default_image_model(),
            vision: default_vision_model(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelParameters {
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ModelParameters {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            top_p: default_top_p(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GatewayAuth {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_key_env: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DesignConfig {
    #[serde(default)]
    pub defaults: VectorizationSettings,
    #[serde(default)]
    pub intent_strategy: IntentStrategy,
}

/// How free chat text is routed when the caller does not say what it wants.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum IntentStrategy {
    /// Trust the caller; without an explicit intent the text is chat.
    #[default]
    Explicit,
    /// Ask the Gateway to classify the text.
    Classify,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatbotConfig {
    #[serde(default = "default_business_name")]
    pub business_name: String,
    #[serde(default)]
    pub knowledge: String,
    #[serde(default)]
    pub knowledge_file: Option<PathBuf>,
    #[serde(default = "default_history_window")]
    pub history_window: usize,
    #[serde(default = "default_chatbot_temperature")]
    pub temperature: f32,
}

impl Default for ChatbotConfig {
    fn default() -> Self {
        Self {
            business_name: default_business_name(),
            knowledge: String::new(),
            knowledge_file: None,
            history_window: default_history_window(),
            temperature: default_chatbot_temperature(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingConfig {
    #[serde(default = "default_deposit_ratio")]
    pub deposit_ratio: f64,
    #[serde(default = "default_unavailable_dates")]
    pub unavailable_dates: Vec<String>,
    #[serde(default = "default_packages")]
    pub packages: Vec<PackageConfig>,
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: usize,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            deposit_ratio: default_deposit_ratio(),
            unavailable_dates: default_unavailable_dates(),
            packages: default_packages(),
            max_tool_rounds: default_max_tool_rounds(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PackageConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
}

/// User-facing canned replies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesConfig {
    #[serde(default = "default_design_ready")]
    pub design_ready: String,
    #[serde(default = "default_no_image")]
    pub no_image: String,
    #[serde(default = "default_vectorize_failed")]
    pub vectorize_failed: String,
    #[serde(default = "default_design_error")]
    pub design_error: String,
    #[serde(default = "default_chat_unsure")]
    pub chat_unsure: String,
    #[serde(default = "default_chat_error")]
    pub chat_error: String,
    #[serde(default = "default_chatbot_error")]
    pub chatbot_error: String,
    #[serde(default = "default_upload_ready")]
    pub upload_ready: String,
    #[serde(default = "default_upload_failed")]
    pub upload_failed: String,
    #[serde(default = "default_booking_error")]
    pub booking_error: String,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            design_ready: default_design_ready(),
            no_image: default_no_image(),
            vectorize_failed: default_vectorize_failed(),
            design_error: default_design_error(),
            chat_unsure: default_chat_unsure(),
            chat_error: default_chat_error(),
            chatbot_error: default_chatbot_error(),
            upload_ready: default_upload_ready(),
            upload_failed: default_upload_failed(),
            booking_error: default_booking_error(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

impl KodexConfig {
    pub fn validate(&self) -> Result<(), KodexError> {
        let models = &self.gateway.models;
        for (role, model) in [
            ("chat", &models.chat),
            ("image", &models.image),
            ("vision", &models.vision),
        ] {
            if model.trim().is_empty() {
                return Err(KodexError::Config(format!(
                    "gateway.models.{} cannot be empty",
                    role
                )));
            }
        }

        if let GatewayProvider::Custom { base_url } = &self.gateway.provider {
            if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
                return Err(KodexError::Config(format!(
                    "Custom gateway base_url must be an http(s) URL, got '{}'",
                    base_url
                )));
            }
        }

        let params = &self.gateway.parameters;
        if !(0.0..=2.0).contains(&params.temperature) {
            return Err(KodexError::Config(
                "gateway.parameters.temperature must be between 0.0 and 2.0".to_string(),
            ));
        }
        if params.request_timeout_secs == 0 {
            return Err(KodexError::Config(
                "gateway.parameters.request_timeout_secs must be greater than 0".to_string(),
            ));
        }

        self.design
            .defaults
            .validate()
            .map_err(|e| KodexError::Config(format!("design.defaults: {}", e)))?;

        if self.chatbot.history_window == 0 {
            return Err(KodexError::Config(
                "chatbot.history_window must be greater than 0".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.chatbot.temperature) {
            return Err(KodexError::Config(
                "chatbot.temperature must be between 0.0 and 2.0".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.booking.deposit_ratio) {
            return Err(KodexError::Config(
                "booking.deposit_ratio must be between 0.0 and 1.0".to_string(),
            ));
        }
        if self.booking.max_tool_rounds == 0 {
            return Err(KodexError::Config(
                "booking.max_tool_rounds must be greater than 0".to_string(),
            ));
        }
        for date in &self.booking.unavailable_dates {
            chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| {
                KodexError::Config(format!(
                    "booking.unavailable_dates entry '{}' is not a YYYY-MM-DD date",
                    date
                ))
            })?;
        }
        for package in &self.booking.packages {
            if package.id.is_empty() || package.name.is_empty() {
                return Err(KodexError::Config(
                    "booking packages need both an id and a name".to_string(),
                ));
            }
            if package.price < 0.0 {
                return Err(KodexError::Config(format!(
                    "booking package '{}' has a negative price",
                    package.id
                )));
            }
        }

        Ok(())
    }
}

fn default_chat_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_image_model() -> String {
    "gemini-2.0-flash-preview-image-generation".to_string()
}

fn default_vision_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    8192
}

fn default_top_p() -> f32 {
    0.95
}

fn default_request_timeout_secs() -> u64 {
    90
}

fn default_business_name() -> String {
    "OBN Kodex".to_string()
}

fn default_history_window() -> usize {
    10
}

fn default_chatbot_temperature() -> f32 {
    0.3
}

fn default_deposit_ratio() -> f64 {
    0.30
}

fn default_max_tool_rounds() -> usize {
    5
}

fn default_unavailable_dates() -> Vec<String> {
    ["2025-08-15", "2025-09-01", "2025-10-31", "2025-12-24", "2025-12-25"]
        .iter()
        .map(|d| d.to_string())
        .collect()
}

fn default_packages() -> Vec<PackageConfig> {
    vec![
        PackageConfig {
            id: "pkg_1".to_string(),
            name: "Paquete Esencial".to_string(),
            description: "Incluye 3 bebidas a elegir para 50 personas.".to_string(),
            price: 4500.0,
        },
        PackageConfig {
            id: "pkg_2".to_string(),
            name: "Paquete Clásico".to_string(),
            description: "Barra de Mojitos especializada con 1 ronda (25 bebidas).".to_string(),
            price: 1500.0,
        },
        PackageConfig {
            id: "pkg_3".to_string(),
            name: "Paquete Premium".to_string(),
            description: "Barra de Mojitos especializada con 2 rondas (50 bebidas).".to_string(),
            price: 2800.0,
        },
        PackageConfig {
            id: "pkg_4".to_string(),
            name: "Vitroleros".to_string(),
            description: "Venta individual de vitroleros, nuestra opción más económica."
                .to_string(),
            price: 500.0,
        },
    ]
}

fn default_design_ready() -> String {
    "¡Claro! Aquí está tu diseño. Puedes pedirme ajustes en el chat.".to_string()
}

fn default_no_image() -> String {
    "Lo siento, no pude generar una imagen con esa descripción. ¿Podrías intentar con otra idea?"
        .to_string()
}

fn default_vectorize_failed() -> String {
    "Lo siento, pude generar la imagen pero fallé al vectorizarla. ¿Intentamos de nuevo?"
        .to_string()
}

fn default_design_error() -> String {
    "Lo siento, hubo un problema técnico al generar tu diseño. Esto puede ocurrir si la descripción es muy compleja o si hay un problema temporal. Por favor, intenta con una idea más simple o inténtalo de nuevo más tarde.".to_string()
}

fn default_chat_unsure() -> String {
    "No estoy seguro de cómo responder a eso. ¿Puedes reformularlo?".to_string()
}

fn default_chat_error() -> String {
    "Lo siento, estoy teniendo problemas para responder en este momento. Por favor, inténtalo de nuevo.".to_string()
}

fn default_chatbot_error() -> String {
    "Lo siento, ocurrió un error. Por favor, inténtalo de nuevo.".to_string()
}

fn default_upload_ready() -> String {
    "¡Imagen vectorizada! Puedes usar el chat para pedir ajustes, o exportarla.".to_string()
}

fn default_upload_failed() -> String {
    "Lo siento, ocurrió un error al vectorizar la imagen.".to_string()
}

fn default_booking_error() -> String {
    "Lo siento, no pude completar tu solicitud de reserva en este momento. Por favor, inténtalo de nuevo.".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}
