// src/utils/id_generator.rs
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdType {
    Geofence,
    Asset,
    Dispatch,
    Inspection,
    WorkOrder,
    FuelTransaction,
    EvVehicle,
    Route,
    Complaint,
    Issue,
    Driver,
    Vehicle,
    Collection,
}

impl IdType {
    pub fn to_prefix(&self) -> &'static str {
        match self {
            IdType::Geofence => "geo",
            IdType::Asset => "asset",
            IdType::Dispatch => "dispatch",
            IdType::Inspection => "dvir",
            IdType::WorkOrder => "wo",
            IdType::FuelTransaction => "fuel",
            IdType::EvVehicle => "ev",
            IdType::Route => "route",
            IdType::Complaint => "cmp",
            IdType::Issue => "issue",
            IdType::Driver => "drv",
            IdType::Vehicle => "veh",
            IdType::Collection => "col",
        }
    }

    pub fn from_prefix(prefix: &str) -> Option<Self> {
        let id_type = match prefix {
            "geo" => IdType::Geofence,
            "asset" => IdType::Asset,
            "dispatch" => IdType::Dispatch,
            "dvir" => IdType::Inspection,
            "wo" => IdType::WorkOrder,
            "fuel" => IdType::FuelTransaction,
            "ev" => IdType::EvVehicle,
            "route" => IdType::Route,
            "cmp" => IdType::Complaint,
            "issue" => IdType::Issue,
            "drv" => IdType::Driver,
            "veh" => IdType::Vehicle,
            "col" => IdType::Collection,
            _ => return None,
        };
        Some(id_type)
    }
}

impl fmt::Display for IdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_prefix())
    }
}

// Last timestamp handed out; ids created within the same millisecond get bumped forward.
static LAST_ISSUED: AtomicI64 = AtomicI64::new(0);

pub struct IdGenerator;

impl IdGenerator {
    /// Generate a unique ID with format: {prefix}_{unix_millis}
    pub fn generate(id_type: IdType) -> String {
        Self::generate_with_timestamp(id_type, Utc::now())
    }

    /// Generate ID for a specific timestamp (useful for testing).
    ///
    /// The numeric part is strictly increasing per process, so it may run slightly
    /// ahead of `timestamp` under bursts.
    pub fn generate_with_timestamp(id_type: IdType, timestamp: DateTime<Utc>) -> String {
        let millis = Self::next_millis(timestamp.timestamp_millis());
        format!("{}_{}", id_type.to_prefix(), millis)
    }

    fn next_millis(candidate: i64) -> i64 {
        let mut last = LAST_ISSUED.load(Ordering::Relaxed);
        loop {
            let next = if candidate > last { candidate } else { last + 1 };
            match LAST_ISSUED.compare_exchange_weak(last, next, Ordering::SeqCst, Ordering::Relaxed) {
                Ok(_) => return next,
                Err(actual) => last = actual,
            }
        }
    }

    /// Parse an ID to extract its components
    pub fn parse_id(id: &str) -> Option<ParsedId> {
        let (prefix, millis) = id.rsplit_once('_')?;
        let id_type = IdType::from_prefix(prefix)?;

        if millis.is_empty() || !millis.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let millis = millis.parse::<i64>().ok()?;

        Some(ParsedId { id_type, millis })
    }

    /// Validate if an ID matches the expected format and type
    pub fn validate_id(id: &str, expected_type: Option<IdType>) -> bool {
        match Self::parse_id(id) {
            Some(parsed) => {
                if let Some(expected) = expected_type {
                    parsed.id_type == expected
                } else {
                    true
                }
            }
            None => false,
        }
    }

    pub fn parse_creation_date(id: &str) -> Option<DateTime<Utc>> {
        Self::parse_id(id).and_then(|parsed| parsed.to_datetime())
    }

    /// Short human-facing reference, e.g. `CMP-4F7QK2`.
    pub fn generate_reference(id_type: IdType) -> String {
        const ALPHABET: [char; 32] = [
            '2', '3', '4', '5', '6', '7', '8', '9', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H',
            'J', 'K', 'L', 'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z',
        ];
        format!(
            "{}-{}",
            id_type.to_prefix().to_uppercase(),
            nanoid::nanoid!(6, &ALPHABET)
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedId {
    pub id_type: IdType,
    pub millis: i64,
}

impl ParsedId {
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.millis).single()
    }
}

pub trait WithGeneratedId {
    fn set_generated_id(&mut self, id_type: IdType);

    fn with_generated_id(mut self, id_type: IdType) -> Self
    where
        Self: Sized,
    {
        self.set_generated_id(id_type);
        self
    }
}

impl WithGeneratedId for crate::models::driver::Driver {
    fn set_generated_id(&mut self, id_type: IdType) {
        self.id = IdGenerator::generate(id_type);
    }
}

impl WithGeneratedId for crate::models::driver::Vehicle {
    fn set_generated_id(&mut self, id_type: IdType) {
        self.id = IdGenerator::generate(id_type);
    }
}

impl WithGeneratedId for crate::models::complaint::Complaint {
    fn set_generated_id(&mut self, id_type: IdType) {
        self.id = IdGenerator::generate(id_type);
        self.reference = IdGenerator::generate_reference(id_type);
    }
}
