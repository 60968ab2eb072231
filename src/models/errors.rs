use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FormatError {
    #[error("Format error: required field [{field}] is empty")]
    MissingField {
        field: &'static str
    },
    #[error("Format error: field [{field}] has non-numeric value [{value}]")]
    InvalidNumber {
        field: &'static str,
        value: String
    }
}
