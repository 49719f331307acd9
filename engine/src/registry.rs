//! The fixed set of entity-type stores.
//!
//! Every domain record lives in exactly one named store. The set is closed:
//! adding or removing a store is a schema revision, which means a new
//! migration in the client plus a bump of [`SCHEMA_VERSION`].

use crate::{error::Result, Error};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Version of the declared store set.
///
/// The client's migrations materialize this set; the two move together.
pub const SCHEMA_VERSION: u32 = 1;

/// A named partition of the local store, one per entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreName {
    Patients,
    Vitals,
    Consultations,
    Appointments,
    LabRequests,
    LabResults,
    Prescriptions,
    QueueEntries,
    Admissions,
    Announcements,
    VoiceNotes,
    Certificates,
    Referrals,
    DischargeSummaries,
    Drugs,
    Rosters,
}

impl StoreName {
    /// All declared stores, in declaration order.
    pub const ALL: [StoreName; 16] = [
        StoreName::Patients,
        StoreName::Vitals,
        StoreName::Consultations,
        StoreName::Appointments,
        StoreName::LabRequests,
        StoreName::LabResults,
        StoreName::Prescriptions,
        StoreName::QueueEntries,
        StoreName::Admissions,
        StoreName::Announcements,
        StoreName::VoiceNotes,
        StoreName::Certificates,
        StoreName::Referrals,
        StoreName::DischargeSummaries,
        StoreName::Drugs,
        StoreName::Rosters,
    ];

    /// Canonical string form, used in storage rows and on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreName::Patients => "patients",
            StoreName::Vitals => "vitals",
            StoreName::Consultations => "consultations",
            StoreName::Appointments => "appointments",
            StoreName::LabRequests => "lab_requests",
            StoreName::LabResults => "lab_results",
            StoreName::Prescriptions => "prescriptions",
            StoreName::QueueEntries => "queue_entries",
            StoreName::Admissions => "admissions",
            StoreName::Announcements => "announcements",
            StoreName::VoiceNotes => "voice_notes",
            StoreName::Certificates => "certificates",
            StoreName::Referrals => "referrals",
            StoreName::DischargeSummaries => "discharge_summaries",
            StoreName::Drugs => "drugs",
            StoreName::Rosters => "rosters",
        }
    }
}

impl fmt::Display for StoreName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoreName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        StoreName::ALL
            .iter()
            .find(|store| store.as_str() == s)
            .copied()
            .ok_or_else(|| Error::UnknownStore(s.to_string()))
    }
}
