use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Agent {0} not found")]
    NotFound(String),
}
