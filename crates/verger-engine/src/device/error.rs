/// What the frame loop should do after a surface error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Surface was configured again; try the next frame.
    Reconfigured,
    SkipFrame,
    /// Unrecoverable (out of memory); exit the event loop.
    Fatal,
}

impl SurfaceErrorAction {
    /// Maps a wgpu error to an action. `Lost`/`Outdated` assume the caller
    /// reconfigures the surface.
    pub(crate) fn from_error(err: &wgpu::SurfaceError) -> Self {
        match err {
            wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => Self::Reconfigured,
            wgpu::SurfaceError::OutOfMemory => Self::Fatal,
            wgpu::SurfaceError::Timeout | wgpu::SurfaceError::Other => Self::SkipFrame,
        }
    }
}
