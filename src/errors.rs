use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Main error type for the binfleet dashboard service
#[derive(Debug)]
pub enum FleetError {
    // HTTP and API errors
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    InternalServer(String),

    // Network and HTTP client errors
    NetworkTimeout,
    NetworkConnection(String),
    HttpClient(String),
    UpstreamStatus { service: String, status: u16 },

    // Serialization and parsing errors
    JsonParsing(String),
    JsonSerialization(String),

    // Domain errors
    BinNotFound(String),
    DriverNotFound(String),
    RouteNotFound(String),
    VehicleNotFound(String),
    InvalidCoordinates { lat: f64, lng: f64 },
    InvalidRouteTransition { from: String, to: String },
    EmptyRoute,

    // Collaborator errors
    SensorNotConfigured,
    SensorUnavailable(String),
    OptimizerFailed(String),
    SyncFailed(String),

    // Validation errors
    ValidationFailed(Vec<ValidationError>),

    // Configuration and setup errors
    MissingEnvironmentVariable(String),
    InvalidConfiguration(String),

    ServiceUnavailable(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl fmt::Display for FleetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FleetError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            FleetError::NotFound(msg) => write!(f, "Not found: {}", msg),
            FleetError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            FleetError::InternalServer(msg) => write!(f, "Internal server error: {}", msg),

            FleetError::NetworkTimeout => write!(f, "Network request timed out"),
            FleetError::NetworkConnection(msg) => write!(f, "Network connection error: {}", msg),
            FleetError::HttpClient(msg) => write!(f, "HTTP client error: {}", msg),
            FleetError::UpstreamStatus { service, status } => {
                write!(f, "{} responded with status {}", service, status)
            }

            FleetError::JsonParsing(msg) => write!(f, "JSON parsing error: {}", msg),
            FleetError::JsonSerialization(msg) => write!(f, "JSON serialization error: {}", msg),

            FleetError::BinNotFound(id) => write!(f, "Bin not found: {}", id),
            FleetError::DriverNotFound(id) => write!(f, "Driver not found: {}", id),
            FleetError::RouteNotFound(id) => write!(f, "Route not found: {}", id),
            FleetError::VehicleNotFound(id) => write!(f, "Vehicle not found: {}", id),
            FleetError::InvalidCoordinates { lat, lng } => {
                write!(f, "Invalid coordinates: {}, {}", lat, lng)
            }
            FleetError::InvalidRouteTransition { from, to } => {
                write!(f, "Route cannot move from {} to {}", from, to)
            }
            FleetError::EmptyRoute => write!(f, "A route needs at least one bin"),

            FleetError::SensorNotConfigured => write!(f, "Findy not configured"),
            FleetError::SensorUnavailable(msg) => write!(f, "Sensor data unavailable: {}", msg),
            FleetError::OptimizerFailed(msg) => write!(f, "Route optimization failed: {}", msg),
            FleetError::SyncFailed(msg) => write!(f, "Sync failed: {}", msg),

            FleetError::ValidationFailed(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }

            FleetError::MissingEnvironmentVariable(var) => {
                write!(f, "Missing environment variable: {}", var)
            }
            FleetError::InvalidConfiguration(msg) => write!(f, "Invalid configuration: {}", msg),

            FleetError::ServiceUnavailable(service) => write!(f, "Service unavailable: {}", service),
        }
    }
}

impl std::error::Error for FleetError {}

impl IntoResponse for FleetError {
    fn into_response(self) -> Response {
        let (status, error_type, message, details) = match self {
            FleetError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            FleetError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            FleetError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None),

            FleetError::ValidationFailed(errors) => {
                let details = serde_json::to_value(&errors).ok();
                (StatusCode::BAD_REQUEST, "validation_failed", "Validation errors occurred".to_string(), details)
            }
            FleetError::InvalidCoordinates { lat, lng } => {
                (StatusCode::BAD_REQUEST, "invalid_coordinates", format!("Invalid coordinates: {}, {}", lat, lng), None)
            }
            FleetError::EmptyRoute => {
                (StatusCode::BAD_REQUEST, "empty_route", "A route needs at least one bin".to_string(), None)
            }

            FleetError::BinNotFound(id) => (StatusCode::NOT_FOUND, "bin_not_found", format!("Bin not found: {}", id), None),
            FleetError::DriverNotFound(id) => (StatusCode::NOT_FOUND, "driver_not_found", format!("Driver not found: {}", id), None),
            FleetError::RouteNotFound(id) => (StatusCode::NOT_FOUND, "route_not_found", format!("Route not found: {}", id), None),
            FleetError::VehicleNotFound(id) => (StatusCode::NOT_FOUND, "vehicle_not_found", format!("Vehicle not found: {}", id), None),

            FleetError::InvalidRouteTransition { from, to } => (
                StatusCode::CONFLICT,
                "invalid_route_transition",
                format!("Route cannot move from {} to {}", from, to),
                None,
            ),

            FleetError::ServiceUnavailable(service) => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable", format!("Service unavailable: {}", service), None)
            }
            FleetError::SensorNotConfigured => {
                (StatusCode::SERVICE_UNAVAILABLE, "sensor_not_configured", "Findy not configured".to_string(), None)
            }

            // All other errors are treated as internal server errors
            other => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", other.to_string(), None),
        };

        let error_response = ErrorResponse {
            error: error_type.to_string(),
            message,
            details,
        };

        (status, axum::Json(error_response)).into_response()
    }
}

// Convenience type alias for Results
pub type FleetResult<T> = Result<T, FleetError>;

impl From<reqwest::Error> for FleetError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FleetError::NetworkTimeout
        } else if err.is_connect() {
            FleetError::NetworkConnection(err.to_string())
        } else {
            FleetError::HttpClient(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FleetError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_syntax() {
            FleetError::JsonParsing(err.to_string())
        } else {
            FleetError::JsonSerialization(err.to_string())
        }
    }
}

// Helper functions for creating common errors
impl FleetError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        FleetError::BadRequest(msg.into())
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        FleetError::NotFound(resource.into())
    }

    pub fn validation_error(field: impl Into<String>, message: impl Into<String>) -> Self {
        FleetError::ValidationFailed(vec![ValidationError {
            field: field.into(),
            message: message.into(),
        }])
    }

    pub fn bin_not_found(bin_id: impl Into<String>) -> Self {
        FleetError::BinNotFound(bin_id.into())
    }

    pub fn driver_not_found(driver_id: impl Into<String>) -> Self {
        FleetError::DriverNotFound(driver_id.into())
    }

    pub fn route_not_found(route_id: impl Into<String>) -> Self {
        FleetError::RouteNotFound(route_id.into())
    }

    /// Collects several field problems into one `ValidationFailed`, or `Ok` when there are none.
    pub fn check(errors: Vec<ValidationError>) -> FleetResult<()> {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(FleetError::ValidationFailed(errors))
        }
    }
}
