//! Image encoding: rendered page bitmap → base64 PNG [`PageImage`].
//!
//! The extraction endpoint embeds the payload in a `data:image/png;base64,`
//! URL for the vision model. PNG keeps rendered text crisp; JPEG artefacts
//! around small glyphs (answer labels, subscripts) hurt recognition.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use tracing::debug;

/// One rasterised page, ready to be sent to the extraction endpoint.
///
/// Consumed by exactly one extraction request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageImage {
    /// 1-indexed page number.
    pub page_num: usize,
    /// Base64 PNG without the `data:` prefix.
    pub image_base64: String,
    pub width: u32,
    pub height: u32,
}

/// Encode a rendered page as base64 PNG.
pub fn encode_page(page_num: usize, img: &DynamicImage) -> Result<PageImage, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    let image_base64 = STANDARD.encode(&buf);
    debug!(
        "Encoded page {} ({}x{}) → {} bytes base64",
        page_num,
        img.width(),
        img.height(),
        image_base64.len()
    );

    Ok(PageImage {
        page_num,
        image_base64,
        width: img.width(),
        height: img.height(),
    })
}
