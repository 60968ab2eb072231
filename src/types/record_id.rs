use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::{Display, Formatter};

const SEPARATOR: &str = "_";

/// Stable business-key identity of a vehicle-class record.
///
/// Two rows that agree on vehicle type, company and fuel master, and whose brand and model only differ
/// in casing or surrounding whitespace, always produce the same id. This is the only deduplication key,
/// both inside a single CSV load and across runs through the ledgers.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn derive(id_vehicle_type: &str, brand: &str, model: &str, id_company: &str, id_fuel_master: &str) -> Self {
        let parts = [
            id_vehicle_type.to_string(),
            brand.trim().to_uppercase(),
            model.trim().to_uppercase(),
            id_company.to_string(),
            id_fuel_master.to_string()
        ];

        RecordId(parts.join(SEPARATOR))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RecordId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        RecordId(value.to_string())
    }
}
