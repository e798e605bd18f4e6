//! 視覺模型用的圖片前處理，以及 OCR 測試用的合成圖片。

use std::io::Cursor;

use ab_glyph::{FontRef, PxScale};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView, ImageFormat, Rgb, RgbImage};
use imageproc::drawing::{draw_text_mut, text_size};

use crate::domain::model::EncodedImage;
use crate::utils::error::Result;

/// 送進模型的 JPEG 品質
const JPEG_QUALITY: u8 = 85;

const PLACEHOLDER_SIZE: u32 = 100;

/// "lightblue"
const PLACEHOLDER_COLOR: Rgb<u8> = Rgb([173, 216, 230]);

const TEXT_FONT: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans-Bold.ttf");
const TEXT_SCALE: f32 = 40.0;
/// 文字左上角的位置
const TEXT_ORIGIN: (i32, i32) = (50, 80);
const TEXT_MIN_SIZE: (u32, u32) = (400, 200);

/// 解碼、把長邊縮到 `max_dimension` 以內，再轉成 JPEG 並做 base64
pub fn prepare_image(bytes: &[u8], max_dimension: u32) -> Result<EncodedImage> {
    let img = image::load_from_memory(bytes)?;
    let (w, h) = img.dimensions();

    let resized = if w > max_dimension || h > max_dimension {
        img.resize(
            max_dimension,
            max_dimension,
            image::imageops::FilterType::Lanczos3,
        )
    } else {
        img
    };

    let jpeg = encode_jpeg(&resized)?;
    Ok(EncodedImage {
        mime_type: "image/jpeg".to_string(),
        data_base64: STANDARD.encode(jpeg),
    })
}

fn encode_jpeg(img: &DynamicImage) -> Result<Vec<u8>> {
    let rgb = img.to_rgb8();
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY);
    rgb.write_with_encoder(encoder)?;
    Ok(buf)
}

/// 所有照片都抓不到時送出的佔位圖
pub fn placeholder_image() -> Result<EncodedImage> {
    let img = RgbImage::from_pixel(PLACEHOLDER_SIZE, PLACEHOLDER_SIZE, PLACEHOLDER_COLOR);
    let png = encode_png(&DynamicImage::ImageRgb8(img))?;
    Ok(EncodedImage {
        mime_type: "image/png".to_string(),
        data_base64: STANDARD.encode(png),
    })
}

/// 純白、沒有任何文字的 PNG
pub fn blank_png(width: u32, height: u32) -> Result<Vec<u8>> {
    let img = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
    encode_png(&DynamicImage::ImageRgb8(img))
}

/// 低對比的灰色雜訊圖，模擬模糊照片
pub fn noisy_png(width: u32, height: u32) -> Result<Vec<u8>> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        if y > height / 3 && y < height / 2 && (x / 4 + y) % 3 == 0 {
            Rgb([90, 90, 90])
        } else {
            Rgb([128, 128, 128])
        }
    });
    encode_png(&DynamicImage::ImageRgb8(img))
}

/// 白底黑字的 PNG，讓 OCR 端點有真正可讀的內容；畫布至少 400x200，字太長時加寬
pub fn text_png(text: &str) -> Result<Vec<u8>> {
    let font = FontRef::try_from_slice(TEXT_FONT)?;
    let scale = PxScale::from(TEXT_SCALE);
    let (text_w, text_h) = text_size(scale, &font, text);

    let (x, y) = TEXT_ORIGIN;
    let padding = x as u32;
    let width = TEXT_MIN_SIZE.0.max(x as u32 + text_w + padding);
    let height = TEXT_MIN_SIZE.1.max(y as u32 + text_h + padding);

    let mut img = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
    draw_text_mut(&mut img, Rgb([0, 0, 0]), x, y, scale, &font, text);
    encode_png(&DynamicImage::ImageRgb8(img))
}

fn encode_png(img: &DynamicImage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    Ok(buf)
}
