//! Job data types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DispatchError;

/// Opaque job identifier, assigned on submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    /// Generates a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for JobId {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| DispatchError::InvalidInput(format!("invalid job id: {}", s)))
    }
}

// ============================================================================
// Item kind
// ============================================================================

/// What the job produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Burger,
    Steak,
}

impl ItemKind {
    /// Numeric menu id (1 = burger, 2 = steak).
    pub fn id(&self) -> u8 {
        match self {
            ItemKind::Burger => 1,
            ItemKind::Steak => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Burger => "burger",
            ItemKind::Steak => "steak",
        }
    }
}

impl TryFrom<u8> for ItemKind {
    type Error = DispatchError;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        match id {
            1 => Ok(ItemKind::Burger),
            2 => Ok(ItemKind::Steak),
            other => Err(DispatchError::InvalidInput(format!(
                "unknown item kind id: {}",
                other
            ))),
        }
    }
}

impl FromStr for ItemKind {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "burger" | "1" => Ok(ItemKind::Burger),
            "steak" | "2" => Ok(ItemKind::Steak),
            other => Err(DispatchError::InvalidInput(format!(
                "unknown item kind: {:?}",
                other
            ))),
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Priority class
// ============================================================================

/// Two-level scheduling tag. Decides who is picked up next, not execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityClass {
    #[serde(alias = "vip")]
    High,
    #[serde(alias = "regular")]
    Normal,
}

impl PriorityClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityClass::High => "high",
            PriorityClass::Normal => "normal",
        }
    }
}

impl FromStr for PriorityClass {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" | "vip" => Ok(PriorityClass::High),
            "normal" | "regular" => Ok(PriorityClass::Normal),
            other => Err(DispatchError::InvalidInput(format!(
                "unknown priority class: {:?}",
                other
            ))),
        }
    }
}

impl fmt::Display for PriorityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Stage
// ============================================================================

/// Lifecycle stage of a tracked job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStage {
    Queued,
    Executing,
    Done,
}

impl JobStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStage::Queued => "queued",
            JobStage::Executing => "executing",
            JobStage::Done => "done",
        }
    }
}

// ============================================================================
// Job
// ============================================================================

/// A submitted order. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    id: JobId,
    station_id: u32,
    item_kind: ItemKind,
    priority: PriorityClass,
    submitted_at: DateTime<Utc>,
}

impl Job {
    /// Creates a job stamped with a fresh id and the current time.
    pub fn new(station_id: u32, item_kind: ItemKind, priority: PriorityClass) -> Self {
        Self {
            id: JobId::new(),
            station_id,
            item_kind,
            priority,
            submitted_at: Utc::now(),
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn station_id(&self) -> u32 {
        self.station_id
    }

    pub fn item_kind(&self) -> ItemKind {
        self.item_kind
    }

    pub fn priority(&self) -> PriorityClass {
        self.priority
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }
}
