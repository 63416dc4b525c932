use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Missing column in dataset: {0}")]
    MissingColumn(String),

    #[error("Row {row}: could not parse date '{value}'")]
    InvalidDate { row: usize, value: String },

    #[error("Row {row}: could not parse acquisition cost '{value}'")]
    InvalidCurrency { row: usize, value: String },

    #[error("Unknown page: {0} (try `campaign-dash pages`)")]
    UnknownPage(String),

    #[error("Unknown filter dimension: {0}")]
    UnknownDimension(String),

    #[error("Invalid date argument '{0}' (expected YYYY-MM-DD)")]
    BadDateArg(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, DashError>;
