use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
};

use anyhow::{Result, anyhow};
use crossbeam_channel::{Sender, TrySendError};
use nokhwa::{
    Camera,
    pixel_format::RgbFormat,
    query,
    utils::{ApiBackend, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType},
};

use super::{InitError, rgba_converter};
use crate::types::Frame;

// Built-in laptop cameras often reject YUYV even when it is advertised, so raw
// formats come first.
const PREFERRED_PIXEL_FORMATS: &[FrameFormat] = &[
    FrameFormat::RAWRGB,
    FrameFormat::RAWBGR,
    FrameFormat::GRAY,
    FrameFormat::YUYV,
    FrameFormat::NV12,
    FrameFormat::MJPEG,
];

fn requested_formats() -> [RequestedFormat<'static>; 3] {
    [
        RequestedFormat::with_formats(
            RequestedFormatType::AbsoluteHighestFrameRate,
            PREFERRED_PIXEL_FORMATS,
        ),
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate),
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::None),
    ]
}

#[derive(Clone, Debug)]
pub struct CameraDevice {
    pub index: u32,
    pub label: String,
}

/// Handle to the capture thread; dropping it stops and joins the thread.
#[derive(Debug)]
pub struct CameraStream {
    device: CameraDevice,
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl CameraStream {
    pub fn device(&self) -> &CameraDevice {
        &self.device
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for CameraStream {
    fn drop(&mut self) {
        self.shutdown();
    }
}

pub fn available_cameras() -> Result<Vec<CameraDevice>> {
    let cameras = query(ApiBackend::Auto)?;
    Ok(cameras
        .into_iter()
        .filter_map(|info| match info.index() {
            CameraIndex::Index(index) => Some(CameraDevice {
                index: *index,
                label: info.human_name(),
            }),
            CameraIndex::String(_) => None,
        })
        .collect())
}

fn open_camera(index: u32) -> Result<Camera> {
    let mut last_err = None;
    for requested in requested_formats() {
        match Camera::new(CameraIndex::Index(index), requested) {
            Ok(mut camera) => match camera.open_stream() {
                Ok(()) => return Ok(camera),
                Err(err) => last_err = Some(err.into()),
            },
            Err(err) => last_err = Some(err.into()),
        }
    }
    Err(last_err.unwrap_or_else(|| anyhow!("no supported pixel format")))
}

/// Opens camera `index` and forwards RGBA frames to `frame_tx` until the stream is dropped.
/// Frames are dropped while the receiver is still busy with the previous one.
pub fn start_camera_stream(index: u32, frame_tx: Sender<Frame>) -> Result<CameraStream, InitError> {
    let devices = available_cameras().map_err(|err| {
        log::error!("camera enumeration failed: {err:?}");
        InitError::NoCamera
    })?;
    if devices.is_empty() {
        return Err(InitError::NoCamera);
    }
    let device = devices
        .iter()
        .find(|d| d.index == index)
        .cloned()
        .unwrap_or_else(|| CameraDevice {
            index,
            label: format!("camera {index}"),
        });

    // Probe on this thread so an unusable device is reported before anything is spawned.
    // Some backends tie the handle to the opening thread, so the capture thread reopens it.
    drop(open_camera(index).map_err(|err| InitError::CameraOpen {
        index,
        reason: format!("{err:#}"),
    })?);
    log::info!("opened camera {} ({})", device.index, device.label);

    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = stop.clone();
    let handle = thread::Builder::new()
        .name("camera-capture".into())
        .spawn(move || capture_loop(index, &stop_flag, &frame_tx))
        .map_err(|err| InitError::CameraOpen {
            index,
            reason: err.to_string(),
        })?;

    Ok(CameraStream {
        device,
        stop,
        handle: Some(handle),
    })
}

fn capture_loop(index: u32, stop: &AtomicBool, frame_tx: &Sender<Frame>) {
    let mut camera = match open_camera(index) {
        Ok(camera) => camera,
        Err(err) => {
            log::error!("capture thread failed to reopen camera {index}: {err:?}");
            return;
        }
    };

    while !stop.load(Ordering::Relaxed) {
        let buffer = match camera.frame() {
            Ok(buffer) => buffer,
            Err(err) => {
                log::warn!("camera frame read failed: {err:?}");
                continue;
            }
        };
        let frame = match rgba_converter::convert_camera_frame(&buffer) {
            Ok(frame) => frame,
            Err(err) => {
                log::warn!("failed to decode camera frame: {err:?}");
                continue;
            }
        };
        if let Err(TrySendError::Disconnected(_)) = frame_tx.try_send(frame) {
            break;
        }
    }

    if let Err(err) = camera.stop_stream() {
        log::warn!("failed to stop camera {index}: {err:?}");
    }
}
