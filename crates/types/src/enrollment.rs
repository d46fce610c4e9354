use crate::region::RegionCode;
use crate::units::Timestamp;
use serde::{Deserialize, Serialize};

/// Enrollment details an identity verifier holds for a subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentData {
    /// When the subject enrolled with the verifier
    pub enrollment_date: Timestamp,
    /// Region the subject is enrolled in; drives eligibility and quotas
    pub region: RegionCode,
    /// Enrolling organisation
    pub org: String,
}

impl EnrollmentData {
    pub fn new(enrollment_date: Timestamp, region: RegionCode, org: impl Into<String>) -> Self {
        Self {
            enrollment_date,
            region,
            org: org.into(),
        }
    }
}
