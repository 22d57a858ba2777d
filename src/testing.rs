//! Test doubles shared by unit tests.

use std::io::Cursor;
use std::thread;
use std::time::Duration;

use image::{ImageFormat, Rgba, RgbaImage};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::encode::Transcode;
use crate::error::EncodeError;
use crate::format::{Descriptor, Format};

/// Originals starting with these bytes fail to transcode.
pub const CORRUPT: &[u8] = b"corrupt";

/// Transcoder that counts calls per format and returns the derivative's
/// extension as its bytes.
#[derive(Default)]
pub struct CountingTranscoder {
    calls: Mutex<FxHashMap<Format, usize>>,
    delay: Option<Duration>,
}

impl CountingTranscoder {
    /// Sleep in every call, to make concurrent requests overlap.
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn count(&self, format: Format) -> usize {
        self.calls.lock().get(&format).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.calls.lock().values().sum()
    }
}

impl Transcode for CountingTranscoder {
    fn transcode(&self, source: &[u8], descriptor: &Descriptor) -> Result<Vec<u8>, EncodeError> {
        *self.calls.lock().entry(descriptor.format).or_default() += 1;
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
        if source.starts_with(CORRUPT) {
            return Err(EncodeError::Decode(image::ImageError::IoError(
                std::io::Error::new(std::io::ErrorKind::InvalidData, "corrupt input"),
            )));
        }
        Ok(descriptor.extension.as_bytes().to_vec())
    }
}

/// A small RGBA PNG with a transparent column.
pub fn sample_png() -> Vec<u8> {
    let img = RgbaImage::from_fn(8, 8, |x, y| {
        Rgba([(x * 30) as u8, (y * 30) as u8, 128, if x == 0 { 0 } else { 255 }])
    });
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}
