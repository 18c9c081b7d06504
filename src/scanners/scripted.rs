use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
};

use crate::error::{DecodeNoise, ScanError};

use super::device::{Camera, CameraDevice, Frame, QrBox, QrDecoder};

const FRAME_WIDTH: u32 = 640;
const FRAME_HEIGHT: u32 = 480;

/// A camera that plays back a fixed list of payloads, one per frame, followed by blank
/// frames. An empty payload is a frame without a code.
#[derive(Debug, Clone)]
pub struct ScriptedDevice {
    payloads: Arc<Vec<String>>,
    available: bool,
    fail_after: Option<usize>,
    acquired: Arc<AtomicBool>,
    releases: Arc<AtomicUsize>,
}

impl ScriptedDevice {
    pub fn new<I, S>(payloads: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            payloads: Arc::new(payloads.into_iter().map(Into::into).collect()),
            available: true,
            fail_after: None,
            acquired: Arc::new(AtomicBool::new(false)),
            releases: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A device with no camera attached.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new(Vec::<String>::new())
        }
    }

    /// Makes the camera fail on the capture following the first `frames` frames.
    pub fn failing_after(mut self, frames: usize) -> Self {
        self.fail_after = Some(frames);
        self
    }

    pub fn is_acquired(&self) -> bool {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn release_count(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl CameraDevice for ScriptedDevice {
    async fn acquire(&self, render_target: &str) -> Result<Box<dyn Camera>, ScanError> {
        if !self.available {
            return Err(ScanError::HardwareUnavailable(format!(
                "no camera found for {render_target}"
            )));
        }
        if self
            .acquired
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ScanError::HardwareUnavailable(
                "camera already in use".to_string(),
            ));
        }
        Ok(Box::new(ScriptedCamera {
            frames: self.payloads.iter().cloned().collect(),
            captured: 0,
            fail_after: self.fail_after,
            acquired: self.acquired.clone(),
            releases: self.releases.clone(),
            released: false,
        }))
    }
}

struct ScriptedCamera {
    frames: VecDeque<String>,
    captured: usize,
    fail_after: Option<usize>,
    acquired: Arc<AtomicBool>,
    releases: Arc<AtomicUsize>,
    released: bool,
}

#[async_trait::async_trait]
impl Camera for ScriptedCamera {
    async fn capture(&mut self) -> Result<Frame, ScanError> {
        if self.released {
            return Err(ScanError::HardwareUnavailable("camera released".to_string()));
        }
        if self.fail_after.is_some_and(|limit| self.captured >= limit) {
            return Err(ScanError::HardwareUnavailable(
                "camera disconnected".to_string(),
            ));
        }
        self.captured += 1;
        let payload = self.frames.pop_front().unwrap_or_default();
        Ok(Frame {
            width: FRAME_WIDTH,
            height: FRAME_HEIGHT,
            pixels: payload.into_bytes(),
        })
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.acquired.store(false, Ordering::SeqCst);
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Reads the payload a [`ScriptedDevice`] wrote into the frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptedDecoder;

impl QrDecoder for ScriptedDecoder {
    fn decode(&self, frame: &Frame, _region: QrBox) -> Result<String, DecodeNoise> {
        match std::str::from_utf8(&frame.pixels) {
            Ok(text) if !text.is_empty() => Ok(text.to_string()),
            _ => Err(DecodeNoise),
        }
    }
}
