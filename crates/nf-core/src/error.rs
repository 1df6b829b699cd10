#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("unknown theme: {0}")]
    UnknownTheme(String),
    #[error("invalid palette: {0}")]
    Palette(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
