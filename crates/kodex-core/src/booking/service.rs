use chrono::{NaiveDate, Utc};
use std::collections::HashSet;
use tokio::sync::RwLock;

use super::{
    parse_event_date, Availability, BeveragePackage, BookingRequest, BookingResponse,
    BookingStatus,
};
use crate::config::BookingConfig;
use crate::errors::KodexError;

/// A created pre-booking, as kept by the in-memory store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredBooking {
    pub request: BookingRequest,
    pub response: BookingResponse,
}

pub struct EventService {
    packages: Vec<BeveragePackage>,
    unavailable_dates: HashSet<NaiveDate>,
    deposit_ratio: f64,
    bookings: RwLock<Vec<StoredBooking>>,
}

impl EventService {
    pub fn new(
        packages: Vec<BeveragePackage>,
        unavailable_dates: impl IntoIterator<Item = NaiveDate>,
        deposit_ratio: f64,
    ) -> Self {
        Self {
            packages,
            unavailable_dates: unavailable_dates.into_iter().collect(),
            deposit_ratio,
            bookings: RwLock::new(Vec::new()),
        }
    }

    pub fn from_config(config: &BookingConfig) -> Result<Self, KodexError> {
        let dates = config
            .unavailable_dates
            .iter()
            .map(|d| {
                parse_event_date(d).map_err(|e| {
                    KodexError::Config(format!("Invalid unavailable date '{}': {}", d, e))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let packages = config
            .packages
            .iter()
            .map(|p| BeveragePackage {
                id: p.id.clone(),
                name: p.name.clone(),
                description: p.description.clone(),
                price: p.price,
            })
            .collect();
        Ok(Self::new(packages, dates, config.deposit_ratio))
    }

    pub fn packages(&self) -> &[BeveragePackage] {
        &self.packages
    }

    pub fn deposit_ratio(&self) -> f64 {
        self.deposit_ratio
    }

    pub fn check_availability(&self, date: NaiveDate) -> Availability {
        let day = date.format(super::DATE_FORMAT);
        log::info!("Checking availability for {}", day);
        if self.unavailable_dates.contains(&date) {
            Availability {
                available: false,
                message: format!(
                    "Lo siento, la fecha {} no está disponible. ¿Te gustaría verificar otra?",
                    day
                ),
            }
        } else {
            Availability {
                available: true,
                message: format!(
                    "¡Buenas noticias! La fecha {} está disponible para tu evento.",
                    day
                ),
            }
        }
    }

    /// Finds a package by exact id or case-insensitive name.
    pub fn find_package(&self, id: Option<&str>, name: Option<&str>) -> Option<&BeveragePackage> {
        self.packages.iter().find(|p| {
            id.is_some_and(|id| p.id == id)
                || name.is_some_and(|name| p.name.to_lowercase() == name.trim().to_lowercase())
        })
    }

    pub async fn create_booking(
        &self,
        request: BookingRequest,
    ) -> Result<BookingResponse, KodexError> {
        if request.guest_count == 0 {
            return Err(KodexError::Booking(
                "guest count must be positive".to_string(),
            ));
        }
        if self.unavailable_dates.contains(&request.event_date) {
            return Err(KodexError::Booking(format!(
                "date {} is not available",
                request.event_date.format(super::DATE_FORMAT)
            )));
        }
        let package = self
            .find_package(request.package_id.as_deref(), request.package_name.as_deref())
            .ok_or_else(|| KodexError::Booking("Package not found".to_string()))?
            .clone();

        let mut bookings = self.bookings.write().await;
        let mut millis = Utc::now().timestamp_millis();
        while bookings
            .iter()
            .any(|b| b.response.booking_id == format!("BK-{}", millis))
        {
            millis += 1;
        }
        let booking_id = format!("BK-{}", millis);

        let total_cost = package.price;
        let deposit_amount = total_cost * self.deposit_ratio;
        let response = BookingResponse {
            confirmation_message: format!(
                "¡Excelente! Hemos creado tu pre-reserva con el ID {}. El costo total es de ${:.2} y se requiere un anticipo de ${:.2}. Nos pondremos en contacto contigo para confirmar el pago y los detalles finales.",
                booking_id, total_cost, deposit_amount
            ),
            booking_id,
            status: BookingStatus::PendingDeposit,
            total_cost,
            deposit_amount,
        };

        log::info!(
            "Created booking {} for {} ({})",
            response.booking_id,
            request.client_name,
            package.name
        );
        bookings.push(StoredBooking {
            request: BookingRequest {
                package_id: Some(package.id),
                ..request
            },
            response: response.clone(),
        });
        Ok(response)
    }

    pub async fn bookings(&self) -> Vec<StoredBooking> {
        self.bookings.read().await.clone()
    }
}
