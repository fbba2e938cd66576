//! Camera capture types and error definitions

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::info;

/// A still image captured from the camera
///
/// Self-describing blob: the bytes are a complete encoded image and the
/// MIME type says which format. Serialized as base64 so history entries
/// survive a round-trip through JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct CapturedImage {
    /// MIME type of the encoded bytes (e.g. "image/jpeg")
    pub mime_type: String,
    /// Encoded image bytes
    #[serde(
        serialize_with = "serialize_base64",
        deserialize_with = "deserialize_base64"
    )]
    pub data: Vec<u8>,
}

impl CapturedImage {
    /// Base64 encoding of the image bytes, as the Gemini API expects
    pub(crate) fn to_base64(&self) -> String {
        BASE64_STANDARD.encode(&self.data)
    }
}

fn serialize_base64<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&BASE64_STANDARD.encode(bytes))
}

fn deserialize_base64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    let encoded = String::deserialize(deserializer)?;
    BASE64_STANDARD
        .decode(encoded.as_bytes())
        .map_err(serde::de::Error::custom)
}

/// Events emitted by the camera thread
#[derive(Debug, Clone)]
pub(crate) enum CameraEvent {
    /// The camera stream is open and delivering frames
    Ready { width: u32, height: u32 },
    /// A requested snapshot, encoded as JPEG
    Frame(CapturedImage),
    /// The camera could not be opened or the stream died
    Error(String),
}

/// Handle for controlling the camera from outside the capture thread
///
/// The camera stream is released whenever the handle is stopped or
/// dropped; the thread owns the device for exactly that window.
pub(crate) struct CameraHandle {
    pub(super) is_active: Arc<AtomicBool>,
    pub(super) capture_requested: Arc<AtomicBool>,
    pub(super) thread_handle: Option<JoinHandle<()>>,
}

impl CameraHandle {
    /// Ask the capture thread to snapshot its current frame
    pub(crate) fn request_capture(&self) {
        self.capture_requested.store(true, Ordering::SeqCst);
    }

    /// Stop capturing and release the camera
    pub(crate) fn stop(&mut self) {
        self.is_active.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
        info!("Camera capture stopped");
    }
}

impl Drop for CameraHandle {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            self.stop();
        }
    }
}

/// Errors that can occur during camera capture
#[derive(Debug, thiserror::Error)]
pub(crate) enum CaptureError {
    #[error("No camera device found: {0}")]
    NoDevice(String),

    #[error("Camera stream error: {0}")]
    StreamError(String),

    #[error("Frame decode error: {0}")]
    DecodeError(String),

    #[error("Frame encode error: {0}")]
    EncodeError(String),
}
