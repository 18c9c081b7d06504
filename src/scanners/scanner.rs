use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{
        mpsc::{self, error::TrySendError},
        oneshot,
    },
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};

use crate::{error::ScanError, models::scan::ScanEvent};

use super::device::{CameraDevice, CameraGuard, QrBox, QrDecoder};

const MAX_FPS: u32 = 60;
const PENDING_EVENTS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    pub qrbox: QrBox,
    pub fps: u32,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            qrbox: QrBox {
                width: 250,
                height: 250,
            },
            fps: 5,
        }
    }
}

impl ScanOptions {
    pub fn validate(&self) -> Result<(), ScanError> {
        if self.fps == 0 || self.fps > MAX_FPS {
            return Err(ScanError::InvalidOptions(format!(
                "fps must be between 1 and {MAX_FPS}, got {}",
                self.fps
            )));
        }
        if self.qrbox.width == 0 || self.qrbox.height == 0 {
            return Err(ScanError::InvalidOptions(format!(
                "scan box must not be empty, got {}x{}",
                self.qrbox.width, self.qrbox.height
            )));
        }
        Ok(())
    }

    fn frame_interval(&self) -> Duration {
        Duration::from_secs(1) / self.fps
    }
}

pub type ScanItem = Result<ScanEvent, ScanError>;

/// Drives a camera and a QR decoder, turning frames into decoded scan events.
pub struct Scanner<D, Q> {
    device: D,
    decoder: Arc<Q>,
}

impl<D, Q> Scanner<D, Q>
where
    D: CameraDevice,
    Q: QrDecoder + 'static,
{
    pub fn new(device: D, decoder: Q) -> Self {
        Self {
            device,
            decoder: Arc::new(decoder),
        }
    }

    /// Acquires the camera and starts capturing in the background. Only a failure to
    /// acquire the camera is reported here; frames without a code are skipped.
    pub async fn start(
        &self,
        render_target: &str,
        options: ScanOptions,
    ) -> Result<ScanHandle, ScanError> {
        options.validate()?;
        let camera = self.device.acquire(render_target).await.map_err(|e| {
            log::error!("unable to start scanning into {render_target}: {e}");
            e
        })?;
        log::info!(
            "scanning into {render_target} at {} fps, box {}x{}",
            options.fps,
            options.qrbox.width,
            options.qrbox.height
        );

        let (events, receiver) = mpsc::channel(PENDING_EVENTS);
        let (stop, stopped) = oneshot::channel();
        let task = tokio::spawn(capture_loop(
            CameraGuard::new(camera),
            self.decoder.clone(),
            options,
            events,
            stopped,
        ));
        Ok(ScanHandle {
            events: receiver,
            stop: Some(stop),
            task: Some(task),
        })
    }
}

async fn capture_loop<Q: QrDecoder>(
    mut camera: CameraGuard,
    decoder: Arc<Q>,
    options: ScanOptions,
    events: mpsc::Sender<ScanItem>,
    mut stopped: oneshot::Receiver<()>,
) {
    let mut ticks = interval(options.frame_interval());
    ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = &mut stopped => break,
            _ = ticks.tick() => {}
        }

        let frame = match camera.capture().await {
            Ok(frame) => frame,
            Err(e) => {
                log::error!("camera failed while scanning: {e}");
                // waits for room; a closed receiver or a stop request ends the wait
                tokio::select! {
                    _ = &mut stopped => {}
                    _ = events.send(Err(e)) => {}
                }
                break;
            }
        };
        let code = match decoder.decode(&frame, options.qrbox) {
            Ok(code) => code,
            Err(noise) => {
                log::trace!("{noise}");
                continue;
            }
        };

        log::debug!("decoded {code:?}");
        match events.try_send(Ok(ScanEvent::new(code))) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => log::trace!("scan consumer busy, dropping decode"),
            Err(TrySendError::Closed(_)) => break,
        }
    }
    // camera is released before `events` closes the stream
    drop(camera);
}

/// A running scan. Yields decoded codes until stopped; dropping the handle stops it too.
pub struct ScanHandle {
    events: mpsc::Receiver<ScanItem>,
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl ScanHandle {
    /// Next decoded code. `None` once the scan has been stopped.
    pub async fn next(&mut self) -> Option<ScanItem> {
        self.events.recv().await
    }

    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stops capturing and waits until the camera has been released. Calling it again
    /// is a no-op.
    pub async fn stop(&mut self) {
        self.events.close();
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                log::warn!("capture loop ended abnormally: {e}");
            }
            log::info!("scanning stopped");
        }
        while self.events.try_recv().is_ok() {}
    }
}

impl Drop for ScanHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
