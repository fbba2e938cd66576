//! Camera capture module using nokhwa for cross-platform camera access
//!
//! The camera runs on a dedicated thread for the lifetime of the Scanner
//! screen. Frames are pulled continuously so a snapshot request can be
//! served from the freshest frame without waiting for the device; the
//! snapshot is encoded as JPEG and handed back over a channel.
//!
//! The thread owns the device exclusively. It exits, and thereby releases
//! the camera, on every path: stop request, snapshot delivery not required
//! (the stream keeps running until stopped), device error.

mod types;

pub(crate) use types::{CameraEvent, CameraHandle, CapturedImage, CaptureError};

use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::Camera;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tokio::sync::mpsc;
use tracing::{error, info};

/// JPEG quality for captured snapshots
const JPEG_QUALITY: u8 = 80;

/// Start camera capture on a dedicated thread
///
/// Opens the default camera and begins pulling frames. The returned
/// handle stops the thread (and releases the device); the receiver
/// yields a `Ready` event once the stream is open, `Frame` events for
/// requested snapshots, and `Error` if the device fails.
///
/// Open errors are reported through the channel rather than the return
/// value because device access can block on a permission prompt.
pub(crate) fn start_camera() -> (CameraHandle, mpsc::Receiver<CameraEvent>) {
    let is_active = Arc::new(AtomicBool::new(true));
    let capture_requested = Arc::new(AtomicBool::new(false));

    let (event_tx, event_rx) = mpsc::channel(16);

    let is_active_thread = is_active.clone();
    let capture_requested_thread = capture_requested.clone();

    let thread_handle = thread::spawn(move || {
        if let Err(e) = run_capture(is_active_thread, capture_requested_thread, &event_tx) {
            error!("Camera capture error: {}", e);
            let _ = event_tx.blocking_send(CameraEvent::Error(e.to_string()));
        }
    });

    let handle = CameraHandle {
        is_active,
        capture_requested,
        thread_handle: Some(thread_handle),
    };

    (handle, event_rx)
}

/// Run camera capture on the current thread (blocking)
fn run_capture(
    is_active: Arc<AtomicBool>,
    capture_requested: Arc<AtomicBool>,
    event_tx: &mpsc::Sender<CameraEvent>,
) -> Result<(), CaptureError> {
    let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestResolution);
    let mut camera = Camera::new(CameraIndex::Index(0), requested)
        .map_err(|e| CaptureError::NoDevice(e.to_string()))?;

    camera
        .open_stream()
        .map_err(|e| CaptureError::StreamError(e.to_string()))?;

    let resolution = camera.resolution();
    info!(
        "Camera stream open: {} ({}x{})",
        camera.info().human_name(),
        resolution.width(),
        resolution.height()
    );

    let _ = event_tx.blocking_send(CameraEvent::Ready {
        width: resolution.width(),
        height: resolution.height(),
    });

    while is_active.load(Ordering::SeqCst) {
        // frame() blocks until the device delivers, which paces this loop
        let frame = camera
            .frame()
            .map_err(|e| CaptureError::StreamError(e.to_string()))?;

        if capture_requested.swap(false, Ordering::SeqCst) {
            let decoded = frame
                .decode_image::<RgbFormat>()
                .map_err(|e| CaptureError::DecodeError(e.to_string()))?;

            let image = encode_jpeg(decoded.as_raw(), decoded.width(), decoded.height())?;
            let _ = event_tx.blocking_send(CameraEvent::Frame(image));
        }
    }

    // Dropping the camera releases the device; stop_stream makes it explicit
    let _ = camera.stop_stream();
    info!("Camera stream released");
    Ok(())
}

/// Encode raw RGB pixels as a JPEG blob
fn encode_jpeg(rgb: &[u8], width: u32, height: u32) -> Result<CapturedImage, CaptureError> {
    let mut bytes = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(Cursor::new(&mut bytes), JPEG_QUALITY);
    encoder
        .encode(rgb, width, height, ExtendedColorType::Rgb8)
        .map_err(|e| CaptureError::EncodeError(e.to_string()))?;

    Ok(CapturedImage {
        mime_type: "image/jpeg".to_string(),
        data: bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_jpeg_produces_jpeg_magic_bytes() {
        // 2x2 solid gray frame
        let rgb = vec![128u8; 2 * 2 * 3];
        let image = encode_jpeg(&rgb, 2, 2).expect("encode");
        assert_eq!(image.mime_type, "image/jpeg");
        assert_eq!(&image.data[..2], &[0xff, 0xd8]);
    }

    #[test]
    fn test_encode_jpeg_rejects_short_buffer() {
        let rgb = vec![0u8; 3];
        assert!(encode_jpeg(&rgb, 2, 2).is_err());
    }
}
