use serde::{Deserialize, Serialize};

use staylock_core::types::ConflictKind;

// ─── User-facing Messages ───────────────────────────────────────────────────

pub const BOOKED_MESSAGE: &str = "Property successfully booked";
pub const BOOKED_IN_THE_MEANTIME_MESSAGE: &str =
    "This property was booked by somebody else in the meantime";

/// Message shown when a probe is refused.
pub fn conflict_message(kind: ConflictKind, lease_minutes: u32) -> String {
    match kind {
        ConflictKind::AlreadyReserved => {
            "This property is already booked at this period of time".to_string()
        }
        ConflictKind::BeingLocked => format!(
            "This property is being booked by somebody else. Please wait {} minutes and try again",
            lease_minutes
        ),
    }
}

// ─── Validation Helpers ─────────────────────────────────────────────────────

fn require(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{} is required", field))
    } else {
        Ok(())
    }
}

// ─── Request Types ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct RegisterPropertyRequest {
    pub property_id: u64,
    pub name: String,
}

impl RegisterPropertyRequest {
    pub fn validate(&self) -> Result<(), String> {
        require("name", &self.name)
    }
}

#[derive(Deserialize)]
pub struct AvailabilityRequest {
    pub check_in_date: String,
    pub check_out_date: String,
    /// Token from an earlier probe in the same session, if any
    #[serde(default)]
    pub lock_token: Option<String>,
}

impl AvailabilityRequest {
    pub fn validate(&self) -> Result<(), String> {
        require("check_in_date", &self.check_in_date)?;
        require("check_out_date", &self.check_out_date)?;
        Ok(())
    }
}

#[derive(Deserialize)]
pub struct CreateReservationRequest {
    pub check_in_date: String,
    pub check_out_date: String,
    pub lock_token: String,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
}

impl CreateReservationRequest {
    pub fn validate(&self) -> Result<(), String> {
        require("check_in_date", &self.check_in_date)?;
        require("check_out_date", &self.check_out_date)?;
        require("lock_token", &self.lock_token)?;
        require("firstname", &self.firstname)?;
        require("lastname", &self.lastname)?;
        require("email", &self.email)?;
        if !self.email.contains('@') {
            return Err(format!("Invalid email '{}'", self.email));
        }
        Ok(())
    }
}

// ─── Response Types ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

#[derive(Serialize)]
pub struct PropertyInfo {
    pub property_id: u64,
    pub name: String,
}

#[derive(Serialize)]
pub struct EvictResponse {
    pub evicted: usize,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub properties: usize,
    pub lease_minutes: u32,
    pub version: String,
}
