//! Health reporting types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::HEALTHY_SCORE_THRESHOLD;

/// Result of one subsystem self-check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Unhealthy(String),
    /// Subsystem is switched off by configuration; excluded from scoring.
    Disabled,
}

impl HealthStatus {
    pub fn unhealthy(reason: impl Into<String>) -> Self {
        Self::Unhealthy(reason.into())
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Healthy => f.write_str("healthy"),
            Self::Unhealthy(reason) => write!(f, "unhealthy: {reason}"),
            Self::Disabled => f.write_str("disabled"),
        }
    }
}

/// Named check result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
}

impl ComponentHealth {
    pub fn new(name: impl Into<String>, status: HealthStatus) -> Self {
        Self { name: name.into(), status }
    }
}

/// Aggregate of one supervisor poll
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub is_healthy: bool,
    /// `healthy / (total - disabled)`, 1.0 when nothing is scored.
    pub score: f64,
    pub components: Vec<ComponentHealth>,
    pub timestamp: DateTime<Utc>,
}

impl HealthReport {
    pub fn from_components(components: Vec<ComponentHealth>, timestamp: DateTime<Utc>) -> Self {
        let score = calculate_score(&components);
        Self { is_healthy: score >= HEALTHY_SCORE_THRESHOLD, score, components, timestamp }
    }

    pub fn unhealthy_components(&self) -> impl Iterator<Item = &ComponentHealth> {
        self.components.iter().filter(|c| matches!(c.status, HealthStatus::Unhealthy(_)))
    }
}

#[allow(clippy::cast_precision_loss)]
fn calculate_score(components: &[ComponentHealth]) -> f64 {
    let scored = components.iter().filter(|c| c.status != HealthStatus::Disabled).count();
    if scored == 0 {
        return 1.0;
    }
    let healthy = components.iter().filter(|c| c.status.is_healthy()).count();
    healthy as f64 / scored as f64
}
