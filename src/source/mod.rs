mod csv_source;
mod errors;

pub use csv_source::CsvSource;
pub use errors::DataSourceError;
