use thiserror::Error;

#[derive(Error, Debug)]
pub enum CirklError {
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("memory store lock poisoned")]
    LockPoisoned,
}

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        StoreError::LockPoisoned
    }
}
