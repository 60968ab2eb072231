mod errors;
mod status;
mod summary;
mod vehicle;
mod wire;

pub use errors::FormatError;
pub use status::ProcessingStatus;
pub use summary::{BatchSummary, RecordOutcome, RunSummary};
pub use vehicle::{REQUIRED_COLUMNS, VehicleRecord};
pub use wire::{FuelVolumeLimit, WireRecord};

/// Rounds to two decimal places, the precision used for reported seconds and percentages.
pub(crate) fn round_two_places(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
