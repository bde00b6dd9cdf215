//! The nine fixed wizard steps with their numbers, labels and routes.

use serde::{Deserialize, Serialize};

use crate::error::FormDataError;

/// Total number of steps in the wizard.
pub const TOTAL_STEPS: u8 = 9;

/// Minimum step number (1-based).
pub const MIN_STEP: u8 = 1;

/// Maximum step number (1-based).
pub const MAX_STEP: u8 = 9;

/// The nine steps of the tailor onboarding wizard, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StepKey {
    BasicInfo,
    Location,
    Specialties,
    Experience,
    Portfolio,
    ServiceDetails,
    Identity,
    Payout,
    Review,
}

impl StepKey {
    /// Every step in wizard order.
    pub const ALL: [StepKey; 9] = [
        Self::BasicInfo,
        Self::Location,
        Self::Specialties,
        Self::Experience,
        Self::Portfolio,
        Self::ServiceDetails,
        Self::Identity,
        Self::Payout,
        Self::Review,
    ];

    /// Convert a 1-based step number. Returns `None` outside [1, 9].
    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            MIN_STEP..=MAX_STEP => Some(Self::ALL[(n - 1) as usize]),
            _ => None,
        }
    }

    /// Convert to a 1-based step number.
    pub fn number(self) -> u8 {
        match self {
            Self::BasicInfo => 1,
            Self::Location => 2,
            Self::Specialties => 3,
            Self::Experience => 4,
            Self::Portfolio => 5,
            Self::ServiceDetails => 6,
            Self::Identity => 7,
            Self::Payout => 8,
            Self::Review => 9,
        }
    }

    /// Wire name used in form data and draft payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BasicInfo => "basicInfo",
            Self::Location => "location",
            Self::Specialties => "specialties",
            Self::Experience => "experience",
            Self::Portfolio => "portfolio",
            Self::ServiceDetails => "serviceDetails",
            Self::Identity => "identity",
            Self::Payout => "payout",
            Self::Review => "review",
        }
    }

    /// Human-readable label for the step.
    pub fn label(self) -> &'static str {
        match self {
            Self::BasicInfo => "Basic Info",
            Self::Location => "Location",
            Self::Specialties => "Specialties",
            Self::Experience => "Experience",
            Self::Portfolio => "Portfolio",
            Self::ServiceDetails => "Service Details",
            Self::Identity => "Identity",
            Self::Payout => "Payouts",
            Self::Review => "Review",
        }
    }

    /// Route path the step is displayed under.
    pub fn route(self) -> &'static str {
        match self {
            Self::BasicInfo => "/onboarding/basic-info",
            Self::Location => "/onboarding/location",
            Self::Specialties => "/onboarding/specialties",
            Self::Experience => "/onboarding/experience",
            Self::Portfolio => "/onboarding/portfolio",
            Self::ServiceDetails => "/onboarding/service-details",
            Self::Identity => "/onboarding/identity",
            Self::Payout => "/onboarding/payouts",
            Self::Review => "/onboarding/review",
        }
    }

    /// Look up the step displayed under `path`, ignoring a trailing slash.
    pub fn from_route(path: &str) -> Option<Self> {
        let path = match path.strip_suffix('/') {
            Some(trimmed) if !trimmed.is_empty() => trimmed,
            _ => path,
        };
        Self::ALL.into_iter().find(|step| step.route() == path)
    }

    /// The following step, or `None` on the last one.
    pub fn next(self) -> Option<Self> {
        Self::from_number(self.number() + 1)
    }

    /// The preceding step, or `None` on the first one.
    pub fn prev(self) -> Option<Self> {
        Self::from_number(self.number() - 1)
    }
}

impl std::str::FromStr for StepKey {
    type Err = FormDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|step| step.as_str() == s)
            .ok_or_else(|| FormDataError::UnknownStep(s.to_string()))
    }
}

impl std::fmt::Display for StepKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
