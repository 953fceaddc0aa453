use packed_struct::PackingError;
use thiserror::Error;

use super::transport::TransportError;

#[derive(Debug, Error)]
pub enum JoyConError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Joy-Con is not responding")]
    NotResponding,

    #[error("Malformed report: {0}")]
    Packing(#[from] PackingError),

    #[error("SPI read of {requested} bytes exceeds the {max} bytes a reply can carry")]
    SpiReadTooLarge { requested: u8, max: u8 },
}

pub type Result<T> = std::result::Result<T, JoyConError>;
