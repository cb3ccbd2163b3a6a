//! RTG 错误

use crate::handle::RtgResourceHandle;
use ngl_rhi::RhiError;

#[derive(Debug, thiserror::Error)]
pub enum RtgError {
    #[error("node `{1}` records resource {0:?} more than once")]
    DuplicateAccess(RtgResourceHandle, String),

    #[error("resource {0:?} is used both as render target and depth target in the same frame")]
    RenderDepthConflict(RtgResourceHandle),

    #[error("builder has already been compiled; builders are single-use")]
    AlreadyCompiled,

    #[error("builder has not been compiled yet")]
    NotCompiled,

    #[error("builder has already been executed; builders are single-use")]
    AlreadyExecuted,

    #[error("resource {0:?} was never created or imported on this builder")]
    UnregisteredHandle(RtgResourceHandle),

    #[error("resource {0:?} was not recorded by this node")]
    HandleNotRecordedByNode(RtgResourceHandle),

    #[error("unknown task node id")]
    UnknownNode,

    #[error("external resource registration needs a texture or a swapchain")]
    InvalidExternalResource,

    #[error("resource {0:?} cannot be propagated: only internal resources bound by this graph can")]
    InvalidPropagation(RtgResourceHandle),

    #[error("resource {0:?} was not propagated by the previous frame")]
    NotPropagated(RtgResourceHandle),

    #[error("builder belongs to a different manager")]
    ManagerMismatch,

    #[error(transparent)]
    Rhi(#[from] RhiError),
}

pub type RtgResult<T> = Result<T, RtgError>;
