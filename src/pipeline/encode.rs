//! Image encoding: rendered page → JPEG bytes → base64 `ImageData`.
//!
//! Scanned shipping bills are photographs of paper, so lossless PNG buys
//! nothing but size. JPEG at 90 % keeps the print legible for the model.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use tracing::debug;

/// One rendered, JPEG-encoded page.
#[derive(Clone, PartialEq, Eq)]
pub struct PageImage {
    /// 1-indexed page number within its document.
    pub page_num: usize,
    pub width: u32,
    pub height: u32,
    pub jpeg: Vec<u8>,
}

impl std::fmt::Debug for PageImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageImage")
            .field("page_num", &self.page_num)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("jpeg_bytes", &self.jpeg.len())
            .finish()
    }
}

/// Encode a rendered page as JPEG. `quality` is in `0.0..=1.0`.
pub fn encode_page(
    page_num: usize,
    img: &DynamicImage,
    quality: f32,
) -> Result<PageImage, image::ImageError> {
    let q = (quality.clamp(0.0, 1.0) * 100.0).round().max(1.0) as u8;

    // JPEG has no alpha channel.
    let rgb = img.to_rgb8();
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, q).encode_image(&rgb)?;

    debug!(
        "Encoded page {} ({}x{}) → {} bytes JPEG q{}",
        page_num,
        rgb.width(),
        rgb.height(),
        jpeg.len(),
        q
    );

    Ok(PageImage {
        page_num,
        width: rgb.width(),
        height: rgb.height(),
        jpeg,
    })
}

/// Wrap a page image for the multimodal API request body.
///
/// `detail: "high"` keeps small print (HAWB numbers, item tables) readable
/// for providers that tile images.
pub fn to_image_data(page: &PageImage) -> ImageData {
    ImageData::new(STANDARD.encode(&page.jpeg), "image/jpeg").with_detail("high")
}
