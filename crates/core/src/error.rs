use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CourierError {
    #[error("unknown channel: {0}")]
    UnknownChannel(String),

    #[error("invalid format {0:?}, needs to be \"html\" or \"text\"")]
    UnknownFormat(String),
}
