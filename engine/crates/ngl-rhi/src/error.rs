//! RHI 错误

use crate::handles::RhiViewKind;
use crate::texture::RhiTextureUsage;

#[derive(Debug, thiserror::Error)]
pub enum RhiError {
    #[error("texture creation failed: {0}")]
    TextureCreation(String),

    #[error("invalid texture desc: {0}")]
    InvalidDesc(String),

    #[error("texture lacks usage {usage:?} required by a {kind:?} view")]
    MissingUsage { kind: RhiViewKind, usage: RhiTextureUsage },

    #[error("unknown texture handle")]
    UnknownTexture,
}

pub type RhiResult<T> = Result<T, RhiError>;
