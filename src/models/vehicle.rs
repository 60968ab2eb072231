use serde::{Deserialize, Serialize};

use crate::types::RecordId;

/// Columns that must be present in the CSV header, in their on-disk spelling.
pub const REQUIRED_COLUMNS: [&str; 7] = [
    "IdVehicleType",
    "Brand",
    "Model",
    "TheoricalConsumption",
    "IdCompany",
    "IdFuelMaster",
    "VolumeLimit"
];

/// Represents a single row from the input CSV file.
///
/// Values are kept exactly as read (after whitespace trimming) so the ledgers persist the source
/// payload. Numeric columns are only interpreted when the record is formatted for the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VehicleRecord {
    /// Remote identifier of the vehicle type.
    pub id_vehicle_type: String,
    pub brand: String,
    pub model: String,
    /// Expected consumption, must parse as a float.
    pub theorical_consumption: String,
    /// Remote identifier of the owning company.
    pub id_company: String,
    /// Remote identifier of the fuel master.
    pub id_fuel_master: String,
    /// Fuel volume limit, must parse as a float.
    pub volume_limit: String
}

impl VehicleRecord {
    pub fn record_id(&self) -> RecordId {
        RecordId::derive(
            &self.id_vehicle_type,
            &self.brand,
            &self.model,
            &self.id_company,
            &self.id_fuel_master
        )
    }

    /// Whether every required column carries a value. Incomplete rows are dropped at load time.
    pub fn is_complete(&self) -> bool {
        self.fields().iter().all(|(_, value)| !is_missing(value))
    }

    pub(crate) fn fields(&self) -> [(&'static str, &str); 7] {
        [
            (REQUIRED_COLUMNS[0], &self.id_vehicle_type),
            (REQUIRED_COLUMNS[1], &self.brand),
            (REQUIRED_COLUMNS[2], &self.model),
            (REQUIRED_COLUMNS[3], &self.theorical_consumption),
            (REQUIRED_COLUMNS[4], &self.id_company),
            (REQUIRED_COLUMNS[5], &self.id_fuel_master),
            (REQUIRED_COLUMNS[6], &self.volume_limit)
        ]
    }
}

/// Empty cells and literal nulls count as absent values.
pub(crate) fn is_missing(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value.eq_ignore_ascii_case("null")
}
