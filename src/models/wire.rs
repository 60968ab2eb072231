use serde::{Deserialize, Serialize};

use crate::models::errors::FormatError;
use crate::models::VehicleRecord;
use crate::models::vehicle::is_missing;

/// Payload shape accepted by the remote vehicle-class endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireRecord {
    pub id_vehicle_type: String,
    pub brand: String,
    pub model: String,
    pub theorical_consumption: f64,
    pub id_company: String,
    /// Always exactly one element for records coming from the CSV.
    pub vehicles_classes_fuels_master: Vec<FuelVolumeLimit>
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FuelVolumeLimit {
    pub id_fuel_master: String,
    pub volume_limit: f64
}

impl WireRecord {
    /// Synthetic record used to probe connectivity and authorization.
    pub fn probe() -> Self {
        Self {
            id_vehicle_type: "test-id".to_string(),
            brand: "TEST".to_string(),
            model: "TEST".to_string(),
            theorical_consumption: 10.0,
            id_company: "test-company-id".to_string(),
            vehicles_classes_fuels_master: vec![FuelVolumeLimit {
                id_fuel_master: "test-fuel-id".to_string(),
                volume_limit: 50.0
            }]
        }
    }
}

impl TryFrom<&VehicleRecord> for WireRecord {
    type Error = FormatError;

    fn try_from(record: &VehicleRecord) -> Result<Self, Self::Error> {
        for (field, value) in record.fields() {
            if is_missing(value) {
                return Err(FormatError::MissingField { field });
            }
        }

        Ok(Self {
            id_vehicle_type: record.id_vehicle_type.clone(),
            brand: record.brand.clone(),
            model: record.model.clone(),
            theorical_consumption: parse_float("TheoricalConsumption", &record.theorical_consumption)?,
            id_company: record.id_company.clone(),
            vehicles_classes_fuels_master: vec![FuelVolumeLimit {
                id_fuel_master: record.id_fuel_master.clone(),
                volume_limit: parse_float("VolumeLimit", &record.volume_limit)?
            }]
        })
    }
}

fn parse_float(field: &'static str, value: &str) -> Result<f64, FormatError> {
    //NOTE: NaN and infinities parse fine but cannot be represented in JSON
    match value.trim().parse::<f64>() {
        Ok(number) if number.is_finite() => Ok(number),
        _ => Err(FormatError::InvalidNumber { field, value: value.to_string() })
    }
}
