use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageError};

use crate::backend::UploadFile;

pub const AVATAR_SIZE: u32 = 300;
const AVATAR_QUALITY: u8 = 90;

/// Decodes an uploaded picture and re-encodes it as a square JPEG avatar.
pub fn prepare_avatar(bytes: &[u8]) -> Result<UploadFile, ImageError> {
    let decoded = image::load_from_memory(bytes)?;
    let resized = decoded.resize_exact(AVATAR_SIZE, AVATAR_SIZE, FilterType::Triangle);
    let rgb = DynamicImage::ImageRgb8(resized.to_rgb8());

    let mut buffer = Cursor::new(Vec::new());
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buffer, AVATAR_QUALITY))?;

    Ok(UploadFile {
        name: "avatar.jpg".to_string(),
        content_type: "image/jpeg".to_string(),
        bytes: buffer.into_inner(),
    })
}
