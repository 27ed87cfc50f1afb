// Copyright 2025 HEM Sp. z o.o.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageResult};

/// Encodes a rendered frame as JPEG and returns it base64 encoded, without
/// line wrapping. Alpha is dropped since JPEG cannot carry it.
pub fn encode_frame(frame: &DynamicImage, quality: u8) -> ImageResult<String> {
    let mut buffer = Vec::new();
    let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut buffer), quality.clamp(1, 100));
    frame.to_rgb8().write_with_encoder(encoder)?;
    Ok(STANDARD.encode(&buffer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn encodes_rgba_frame_as_jpeg() {
        let frame = DynamicImage::ImageRgba8(RgbaImage::from_pixel(16, 9, Rgba([200, 10, 10, 128])));
        let encoded = encode_frame(&frame, 90).unwrap();

        assert!(!encoded.contains('\n'));
        let bytes = STANDARD.decode(encoded).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);

        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 9));
    }

    #[test]
    fn out_of_range_quality_is_clamped() {
        let frame = DynamicImage::new_rgb8(4, 4);
        assert!(encode_frame(&frame, 0).is_ok());
    }
}
