use crate::error::{DecodeNoise, ScanError};

/// A single captured image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Region of the frame, centred, in which codes are searched for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QrBox {
    pub width: u32,
    pub height: u32,
}

/// Access to camera hardware. Acquiring hands out exclusive use of the camera until the
/// returned handle is released.
#[async_trait::async_trait]
pub trait CameraDevice: Send + Sync {
    async fn acquire(&self, render_target: &str) -> Result<Box<dyn Camera>, ScanError>;
}

#[async_trait::async_trait]
pub trait Camera: Send {
    async fn capture(&mut self) -> Result<Frame, ScanError>;

    /// Gives the hardware back. Must tolerate being called more than once.
    fn release(&mut self);
}

pub trait QrDecoder: Send + Sync {
    fn decode(&self, frame: &Frame, region: QrBox) -> Result<String, DecodeNoise>;
}

/// Owns an acquired camera and releases it when dropped, so every exit path of the
/// capture loop gives the hardware back.
pub(crate) struct CameraGuard {
    camera: Box<dyn Camera>,
}

impl CameraGuard {
    pub(crate) fn new(camera: Box<dyn Camera>) -> Self {
        Self { camera }
    }

    pub(crate) async fn capture(&mut self) -> Result<Frame, ScanError> {
        self.camera.capture().await
    }
}

impl Drop for CameraGuard {
    fn drop(&mut self) {
        log::debug!("releasing camera");
        self.camera.release();
    }
}
