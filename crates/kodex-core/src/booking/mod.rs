//! Event-booking demo: beverage packages, date availability and pre-bookings
//!
//! Everything lives in memory. `EventService` is the mock store, `tools`
//! exposes it to Gateway function calling and `BookingAssistant` drives a
//! bounded tool-calling conversation on top of both.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub mod assistant;
pub mod service;
pub mod tools;

pub use assistant::BookingAssistant;
pub use service::EventService;
pub use tools::{booking_registry, CheckDateAvailabilityTool, GetBeveragePackagesTool, InitiateBookingTool};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BeveragePackage {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub client_name: String,
    pub client_email: String,
    pub client_phone: String,
    pub event_type: String,
    pub event_date: NaiveDate,
    pub guest_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_name: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    PendingDeposit,
    Confirmed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    pub booking_id: String,
    pub status: BookingStatus,
    pub total_cost: f64,
    pub deposit_amount: f64,
    pub confirmation_message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Availability {
    pub available: bool,
    pub message: String,
}

pub fn parse_event_date(value: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
}
