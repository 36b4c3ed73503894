// src/services/registration_service.rs
// Backs the complaint, driver, vehicle and issue forms.
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing;

use crate::{
    errors::{FleetError as AppError, FleetResult},
    models::{
        complaint::{Complaint, ComplaintRequest, Issue, IssueRequest, TicketStatus},
        driver::{Driver, DriverLocationUpdate, DriverRegistration, MovementStatus, Vehicle, VehicleRegistration, VehicleStatus},
    },
    services::data_service::DataStore,
    utils::{
        geo::LatLng,
        id_generator::{IdGenerator, IdType, WithGeneratedId},
    },
    ValidationError,
};

#[async_trait]
pub trait RegistrationOperations: Send + Sync {
    async fn register_driver(&self, registration: DriverRegistration) -> Result<Driver, AppError>;
    async fn register_vehicle(&self, registration: VehicleRegistration) -> Result<Vehicle, AppError>;
    async fn update_driver_location(&self, update: DriverLocationUpdate) -> Result<Driver, AppError>;
    async fn submit_complaint(&self, request: ComplaintRequest) -> Result<Complaint, AppError>;
    async fn report_issue(&self, request: IssueRequest) -> Result<Issue, AppError>;
}

pub struct RegistrationService {
    store: Arc<DataStore>,
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn require(errors: &mut Vec<ValidationError>, field: &str, value: &str, message: &str) {
    if value.trim().is_empty() {
        errors.push(ValidationError {
            field: field.to_string(),
            message: message.to_string(),
        });
    }
}

impl RegistrationService {
    pub fn new(store: Arc<DataStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl RegistrationOperations for RegistrationService {
    async fn register_driver(&self, registration: DriverRegistration) -> Result<Driver, AppError> {
        let mut errors = Vec::new();
        require(&mut errors, "name", &registration.name, "Driver name is required");
        AppError::check(errors)?;

        let vehicle_id = blank_to_none(registration.vehicle_id);
        if let Some(vehicle_id) = &vehicle_id {
            if self.store.get_vehicle(vehicle_id).await.is_none() {
                return Err(AppError::VehicleNotFound(vehicle_id.clone()));
            }
        }

        let mut driver = Driver::new(String::new(), registration.name.trim());
        driver.phone_number = blank_to_none(registration.phone_number);
        driver.license_number = blank_to_none(registration.license_number);
        driver.vehicle_id = vehicle_id;
        driver.status = MovementStatus::Offline;
        driver.set_generated_id(IdType::Driver);

        self.store.upsert_driver(driver.clone()).await;
        tracing::info!("Driver registered successfully: {}", driver.id);
        Ok(driver)
    }

    async fn register_vehicle(&self, registration: VehicleRegistration) -> Result<Vehicle, AppError> {
        let mut errors = Vec::new();
        require(&mut errors, "license_plate", &registration.license_plate, "Plate is required");
        if !(registration.capacity_kg.is_finite() && registration.capacity_kg > 0.0) {
            errors.push(ValidationError {
                field: "capacity_kg".to_string(),
                message: "Capacity must be positive".to_string(),
            });
        }
        AppError::check(errors)?;

        let vehicle = Vehicle {
            id: String::new(),
            license_plate: registration.license_plate.trim().to_uppercase(),
            vehicle_type: registration.vehicle_type,
            fuel_type: registration.fuel_type,
            capacity_kg: registration.capacity_kg,
            status: VehicleStatus::Available,
            created_at: Utc::now(),
        }
        .with_generated_id(IdType::Vehicle);

        self.store.insert_vehicle_unique(vehicle.clone()).await?;
        tracing::info!("Vehicle registered: {} ({})", vehicle.id, vehicle.license_plate);
        Ok(vehicle)
    }

    async fn update_driver_location(&self, update: DriverLocationUpdate) -> Result<Driver, AppError> {
        let point = update.location.lat_lng();
        if !point.is_valid() {
            tracing::warn!("Ignoring invalid location for driver {}", update.driver_id);
            return Err(AppError::InvalidCoordinates { lat: point.lat, lng: point.lng });
        }

        tracing::debug!("Updating driver location: {}", update.driver_id);
        let moving = update.location.speed.is_some_and(|s| s > 1.0);
        self.store
            .update_driver(&update.driver_id, |driver| {
                driver.current_location = Some(update.location);
                driver.status = match driver.status {
                    MovementStatus::OnRoute | MovementStatus::OnBreak => driver.status,
                    _ if moving => MovementStatus::Moving,
                    _ => MovementStatus::Stationary,
                };
            })
            .await
    }

    async fn submit_complaint(&self, request: ComplaintRequest) -> Result<Complaint, AppError> {
        let mut errors = Vec::new();
        require(&mut errors, "complaint_type", &request.complaint_type, "Select a complaint type");
        require(&mut errors, "description", &request.description, "Describe the problem");
        AppError::check(errors)?;

        let location = match (request.lat, request.lng) {
            (Some(lat), Some(lng)) => {
                let point = LatLng::new(lat, lng);
                if point.is_valid() {
                    Some(point)
                } else {
                    tracing::warn!("Complaint location {}, {} discarded as invalid", lat, lng);
                    None
                }
            }
            _ => None,
        };

        let bin_id = blank_to_none(request.bin_id);
        // A complaint about a bin without a position inherits the bin's
        let location = match (location, bin_id.as_deref()) {
            (None, Some(bin_id)) => self.store.get_bin(bin_id).await.and_then(|b| b.position()),
            (location, _) => location,
        };

        let now = Utc::now();
        let mut complaint = Complaint {
            id: String::new(),
            reference: String::new(),
            complaint_type: request.complaint_type.trim().to_string(),
            description: request.description.trim().to_string(),
            priority: request.priority,
            status: TicketStatus::Open,
            bin_id,
            location,
            reporter_name: blank_to_none(request.reporter_name),
            reporter_phone: blank_to_none(request.reporter_phone),
            image_name: blank_to_none(request.image_name),
            created_at: now,
            updated_at: now,
        };
        complaint.set_generated_id(IdType::Complaint);

        self.store.add_complaint(complaint.clone()).await;
        tracing::info!("Complaint {} filed ({})", complaint.reference, complaint.complaint_type);
        Ok(complaint)
    }

    async fn report_issue(&self, request: IssueRequest) -> Result<Issue, AppError> {
        let mut errors = Vec::new();
        require(&mut errors, "issue_type", &request.issue_type, "Select an issue type");
        require(&mut errors, "description", &request.description, "Describe the issue");
        AppError::check(errors)?;

        let issue = Issue {
            id: IdGenerator::generate(IdType::Issue),
            issue_type: request.issue_type.trim().to_string(),
            description: request.description.trim().to_string(),
            priority: request.priority,
            status: TicketStatus::Open,
            reported_by: blank_to_none(request.reported_by),
            bin_id: blank_to_none(request.bin_id),
            vehicle_id: blank_to_none(request.vehicle_id),
            image_name: blank_to_none(request.image_name),
            created_at: Utc::now(),
        };
        self.store.add_issue(issue.clone()).await;
        tracing::info!("Issue {} reported", issue.id);
        Ok(issue)
    }
}

impl RegistrationService {
    /// Open complaints first, then newest.
    pub async fn complaint_queue(&self) -> FleetResult<Vec<Complaint>> {
        let mut complaints = self.store.list_complaints().await;
        complaints.sort_by(|a, b| {
            b.status
                .is_open()
                .cmp(&a.status.is_open())
                .then_with(|| b.priority.cmp(&a.priority))
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(complaints)
    }
}
