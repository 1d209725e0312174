use std::io;

use fenci_core::dict::DictError;
use fenci_core::hmm::ModelError;
use fenci_core::settings::SettingsError;

use crate::decode::DecodeError;

/// Error returned by every fallible public operation of the crate.
#[derive(Debug, thiserror::Error)]
pub enum FenciError {
    #[error("dictionary error: {0}")]
    Dict(#[from] DictError),

    #[error("model error: {0}")]
    Model(#[from] ModelError),

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),
}

pub type Result<T, E = FenciError> = std::result::Result<T, E>;
