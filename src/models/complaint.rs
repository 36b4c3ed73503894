use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::geo::LatLng;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::InProgress => "in-progress",
            TicketStatus::Resolved => "resolved",
            TicketStatus::Closed => "closed",
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, TicketStatus::Open | TicketStatus::InProgress)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum TicketPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl TicketPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketPriority::Low => "low",
            TicketPriority::Medium => "medium",
            TicketPriority::High => "high",
            TicketPriority::Urgent => "urgent",
        }
    }
}

impl Default for TicketPriority {
    fn default() -> Self {
        Self::Medium
    }
}

/// Citizen complaint, e.g. overflowing bin or missed pickup.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Complaint {
    pub id: String,
    pub reference: String,
    pub complaint_type: String,
    pub description: String,
    pub priority: TicketPriority,
    pub status: TicketStatus,
    pub bin_id: Option<String>,
    pub location: Option<LatLng>,
    pub reporter_name: Option<String>,
    pub reporter_phone: Option<String>,
    pub image_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ComplaintRequest {
    pub complaint_type: String,
    pub description: String,
    #[serde(default)]
    pub priority: TicketPriority,
    pub bin_id: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub reporter_name: Option<String>,
    pub reporter_phone: Option<String>,
    pub image_name: Option<String>,
}

/// Operational issue raised by a driver (damaged bin, blocked access, vehicle fault).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Issue {
    pub id: String,
    pub issue_type: String,
    pub description: String,
    pub priority: TicketPriority,
    pub status: TicketStatus,
    pub reported_by: Option<String>,
    pub bin_id: Option<String>,
    pub vehicle_id: Option<String>,
    pub image_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IssueRequest {
    pub issue_type: String,
    pub description: String,
    #[serde(default)]
    pub priority: TicketPriority,
    pub reported_by: Option<String>,
    pub bin_id: Option<String>,
    pub vehicle_id: Option<String>,
    pub image_name: Option<String>,
}
