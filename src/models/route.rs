// src/models/route.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum RouteStatus {
    Pending,     // Created, driver not started yet
    InProgress,  // Driver is working the route
    Completed,   // All stops done
    Cancelled,
}

impl RouteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteStatus::Pending => "pending",
            RouteStatus::InProgress => "in-progress",
            RouteStatus::Completed => "completed",
            RouteStatus::Cancelled => "cancelled",
        }
    }

    /// pending -> in-progress -> completed | cancelled, and pending -> cancelled.
    pub fn can_transition_to(&self, next: RouteStatus) -> bool {
        matches!(
            (self, next),
            (RouteStatus::Pending, RouteStatus::InProgress)
                | (RouteStatus::Pending, RouteStatus::Cancelled)
                | (RouteStatus::InProgress, RouteStatus::Completed)
                | (RouteStatus::InProgress, RouteStatus::Cancelled)
        )
    }

    pub fn is_active(&self) -> bool {
        matches!(self, RouteStatus::Pending | RouteStatus::InProgress)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum RoutePriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl RoutePriority {
    /// Priority implied by the fullest bin on a route.
    pub fn from_fill(max_fill: f64) -> Self {
        if max_fill >= 90.0 {
            RoutePriority::Urgent
        } else if max_fill >= 75.0 {
            RoutePriority::High
        } else if max_fill >= 50.0 {
            RoutePriority::Medium
        } else {
            RoutePriority::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RoutePriority::Low => "low",
            RoutePriority::Medium => "medium",
            RoutePriority::High => "high",
            RoutePriority::Urgent => "urgent",
        }
    }
}

/// Snapshot of a bin taken when the route was created.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RouteBinDetail {
    pub bin_id: String,
    pub lat: f64,
    pub lng: f64,
    pub fill_level: f64,
    pub address: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Route {
    pub id: String,
    pub driver_id: String,
    pub bin_ids: Vec<String>,
    pub bin_details: Vec<RouteBinDetail>,
    pub priority: RoutePriority,
    pub status: RouteStatus,
    pub assigned_by: Option<String>,
    pub notes: Option<String>,
    pub estimated_distance_km: Option<f64>,

    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,

    /// Whether the server accepted the route, or it only lives in the local store.
    #[serde(default)]
    pub persisted: bool,
}

// Request Models
#[derive(Debug, Serialize, Deserialize)]
pub struct RouteRequest {
    pub driver_id: String,
    pub bin_ids: Vec<String>,
    pub priority: Option<RoutePriority>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RouteStatusUpdate {
    pub status: RouteStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AssignmentRequest {
    pub driver_id: String,
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        use RouteStatus::*;
        assert!(Pending.can_transition_to(InProgress));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(InProgress.can_transition_to(Completed));
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Pending));
        assert!(!Cancelled.can_transition_to(InProgress));
    }

    #[test]
    fn test_status_wire_format() {
        let json = serde_json::to_string(&RouteStatus::InProgress).unwrap();
        assert_eq!(json, "\"in-progress\"");
    }

    #[test]
    fn test_priority_from_fill() {
        assert_eq!(RoutePriority::from_fill(95.0), RoutePriority::Urgent);
        assert_eq!(RoutePriority::from_fill(80.0), RoutePriority::High);
        assert_eq!(RoutePriority::from_fill(60.0), RoutePriority::Medium);
        assert_eq!(RoutePriority::from_fill(10.0), RoutePriority::Low);
    }
}
