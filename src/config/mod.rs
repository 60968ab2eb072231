mod errors;
mod settings;

pub use errors::ConfigError;
pub use settings::Settings;

pub const DEFAULT_BASE_URL: &str = "https://api-beta.ationet.com";
pub const DEFAULT_ENDPOINT: &str = "/VehiclesClass/";
pub const DEFAULT_CSV_PATH: &str = "clases_vehiculos.csv";
pub const DEFAULT_LOG_FILE: &str = "vehicle_sync.log";
