#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Validation(String),
    #[error("Invalid username or password.")]
    Auth,
    #[error("Database connection failed: {0}")]
    StoreUnavailable(String),
    #[error("{0}")]
    Store(String),
    #[error("{0}")]
    InvalidDirectory(String),
}

impl Error {
    /// HTTP status code equivalent of the error
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Validation(_) => 400,
            Error::Auth => 401,
            Error::StoreUnavailable(_) => 503,
            Error::Store(_) | Error::InvalidDirectory(_) => 500,
        }
    }
}
