// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raster codec — decode, downscale, flatten, and re-encode in-memory images
// using the `image` crate.

use std::io::Cursor;

use image::codecs::gif::{GifDecoder, GifEncoder, Repeat};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilterType, PngEncoder};
use image::imageops::{self, FilterType};
use image::{
    AnimationDecoder, ColorType, DynamicImage, Frame, ImageDecoder, ImageReader, Rgba, RgbaImage,
};
use inkpost_core::error::{InkpostError, Result};
use tracing::{debug, instrument};

use super::{EncodeParams, ImageCodec, ImageInfo, OutputFormat};

/// GIF quantisation speed (1 = best quality, 30 = fastest).
const GIF_SPEED: i32 = 10;

/// Production [`ImageCodec`] built on `image`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RasterCodec;

impl ImageCodec for RasterCodec {
    #[instrument(skip(self, bytes), fields(data_len = bytes.len()))]
    fn probe(&self, bytes: &[u8]) -> Result<ImageInfo> {
        // Header only; pixel data is left undecoded.
        let decoder = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()?
            .into_decoder()
            .map_err(|err| InkpostError::CodecFailure(format!("failed to read image header: {err}")))?;
        let (width, height) = decoder.dimensions();
        let info = ImageInfo {
            width,
            height,
            has_alpha: decoder.color_type().has_alpha(),
        };
        debug!(width = info.width, height = info.height, has_alpha = info.has_alpha, "image probed");
        Ok(info)
    }

    #[instrument(skip(self, bytes), fields(data_len = bytes.len(), format = ?params.format, width = params.target_width))]
    fn encode(&self, bytes: &[u8], params: &EncodeParams) -> Result<Vec<u8>> {
        let out = match params.format {
            OutputFormat::Png => {
                let img = scale_to_width(decode(bytes)?, params.target_width);
                let img = match params.background {
                    Some(bg) if img.color().has_alpha() => flatten(&img, bg),
                    _ => img,
                };
                to_png(&img)?
            }
            OutputFormat::Jpeg { quality } => {
                let img = scale_to_width(decode(bytes)?, params.target_width);
                let img = match params.background {
                    Some(bg) if img.color().has_alpha() => flatten(&img, bg),
                    _ => img,
                };
                to_jpeg(&img, quality)?
            }
            OutputFormat::AnimatedGif => reencode_gif(bytes, params.target_width)?,
        };
        debug!(len = out.len(), "encode attempt complete");
        Ok(out)
    }
}

fn decode(bytes: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory(bytes)
        .map_err(|err| InkpostError::CodecFailure(format!("failed to decode image: {err}")))
}

/// Height that keeps the aspect ratio when `width` becomes `target`.
fn scaled(value: u32, width: u32, target: u32) -> u32 {
    ((u64::from(value) * u64::from(target)) / u64::from(width.max(1))).max(1) as u32
}

/// Downscale to `target_width`, preserving aspect ratio. Never upscales.
fn scale_to_width(img: DynamicImage, target_width: u32) -> DynamicImage {
    let (width, height) = (img.width(), img.height());
    if target_width == 0 || target_width >= width {
        return img;
    }
    let target_height = scaled(height, width, target_width);
    img.resize_exact(target_width, target_height, FilterType::Lanczos3)
}

/// Composite onto an opaque background.
fn flatten(img: &DynamicImage, background: [u8; 3]) -> DynamicImage {
    let [r, g, b] = background;
    let mut canvas = RgbaImage::from_pixel(img.width(), img.height(), Rgba([r, g, b, 255]));
    imageops::overlay(&mut canvas, &img.to_rgba8(), 0, 0);
    DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(canvas).to_rgb8())
}

fn to_png(img: &DynamicImage) -> Result<Vec<u8>> {
    // The PNG encoder only accepts 8/16-bit integer layouts.
    let img = match img.color() {
        ColorType::L8
        | ColorType::La8
        | ColorType::Rgb8
        | ColorType::Rgba8
        | ColorType::L16
        | ColorType::La16
        | ColorType::Rgb16
        | ColorType::Rgba16 => img.clone(),
        _ => DynamicImage::ImageRgba8(img.to_rgba8()),
    };
    let mut buffer = Vec::new();
    let encoder =
        PngEncoder::new_with_quality(&mut buffer, CompressionType::Best, PngFilterType::Adaptive);
    img.write_with_encoder(encoder)
        .map_err(|err| InkpostError::CodecFailure(format!("PNG encoding failed: {err}")))?;
    Ok(buffer)
}

fn to_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let rgb = img.to_rgb8();
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    rgb.write_with_encoder(encoder)
        .map_err(|err| InkpostError::CodecFailure(format!("JPEG encoding failed: {err}")))?;
    Ok(buffer)
}

/// Decode every frame, downscale each, and write a looping GIF.
fn reencode_gif(bytes: &[u8], target_width: u32) -> Result<Vec<u8>> {
    let decoder = GifDecoder::new(Cursor::new(bytes))
        .map_err(|err| InkpostError::CodecFailure(format!("failed to decode GIF: {err}")))?;
    let frames = decoder
        .into_frames()
        .collect_frames()
        .map_err(|err| InkpostError::CodecFailure(format!("failed to read GIF frames: {err}")))?;

    let canvas_width = frames.first().map(|f| f.buffer().width()).unwrap_or(0);
    let shrink = target_width > 0 && target_width < canvas_width;

    let frames: Vec<Frame> = frames
        .into_iter()
        .map(|frame| {
            if !shrink {
                return frame;
            }
            let (left, top, delay) = (frame.left(), frame.top(), frame.delay());
            let buffer = frame.into_buffer();
            let w = scaled(buffer.width(), canvas_width, target_width);
            let h = scaled(buffer.height(), canvas_width, target_width);
            let resized = imageops::resize(&buffer, w, h, FilterType::Triangle);
            Frame::from_parts(
                resized,
                scaled(left, canvas_width, target_width),
                scaled(top, canvas_width, target_width),
                delay,
            )
        })
        .collect();

    let mut buffer = Vec::new();
    {
        let mut encoder = GifEncoder::new_with_speed(&mut buffer, GIF_SPEED);
        encoder
            .set_repeat(Repeat::Infinite)
            .map_err(|err| InkpostError::CodecFailure(format!("GIF encoding failed: {err}")))?;
        encoder
            .encode_frames(frames)
            .map_err(|err| InkpostError::CodecFailure(format!("GIF encoding failed: {err}")))?;
    }
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Delay, Rgb, RgbImage};

    fn png_bytes(width: u32, height: u32, alpha: bool) -> Vec<u8> {
        let img = if alpha {
            DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
                Rgba([(x % 256) as u8, (y % 256) as u8, 90, (x % 2 * 255) as u8])
            }))
        } else {
            DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
                Rgb([(x % 256) as u8, (y % 256) as u8, 90])
            }))
        };
        to_png(&img).unwrap()
    }

    fn gif_bytes(width: u32, height: u32, frames: usize) -> Vec<u8> {
        let mut buffer = Vec::new();
        {
            let mut encoder = GifEncoder::new(&mut buffer);
            let frames = (0..frames).map(|i| {
                let img = RgbaImage::from_pixel(width, height, Rgba([(i * 60) as u8, 10, 200, 255]));
                Frame::from_parts(img, 0, 0, Delay::from_numer_denom_ms(100, 1))
            });
            encoder.encode_frames(frames).unwrap();
        }
        buffer
    }

    #[test]
    fn probe_reports_dimensions_and_alpha() {
        let info = RasterCodec.probe(&png_bytes(40, 30, true)).unwrap();
        assert_eq!(info, ImageInfo { width: 40, height: 30, has_alpha: true });
        assert!(!RasterCodec.probe(&png_bytes(10, 10, false)).unwrap().has_alpha);
    }

    #[test]
    fn corrupt_input_is_codec_failure() {
        assert!(matches!(
            RasterCodec.probe(b"definitely not an image"),
            Err(InkpostError::CodecFailure(_))
        ));
    }

    #[test]
    fn png_encode_downscales_with_aspect_ratio() {
        let out = RasterCodec
            .encode(&png_bytes(200, 100, false), &EncodeParams::png(80))
            .unwrap();
        let info = RasterCodec.probe(&out).unwrap();
        assert_eq!((info.width, info.height), (80, 40));
    }

    #[test]
    fn encode_never_upscales() {
        let out = RasterCodec
            .encode(&png_bytes(50, 50, false), &EncodeParams::png(500))
            .unwrap();
        assert_eq!(RasterCodec.probe(&out).unwrap().width, 50);
    }

    #[test]
    fn jpeg_flattens_alpha_onto_background() {
        // Left half fully transparent, right half opaque red.
        let img = DynamicImage::ImageRgba8(RgbaImage::from_fn(64, 64, |x, _| {
            if x < 32 { Rgba([0, 0, 0, 0]) } else { Rgba([200, 20, 20, 255]) }
        }));
        let out = RasterCodec
            .encode(
                &to_png(&img).unwrap(),
                &EncodeParams::jpeg(64, 90, Some([255, 255, 255])),
            )
            .unwrap();
        assert_eq!(&out[..2], &[0xFF, 0xD8]);
        assert!(!RasterCodec.probe(&out).unwrap().has_alpha);

        let decoded = image::load_from_memory(&out).unwrap().to_rgb8();
        let Rgb(pixel) = *decoded.get_pixel(8, 8);
        assert!(pixel.iter().all(|c| *c >= 245), "transparent area became {pixel:?}");
    }

    #[test]
    fn probe_reads_header_of_truncated_png() {
        let mut bytes = png_bytes(300, 200, false);
        bytes.truncate(bytes.len() / 2);
        let info = RasterCodec.probe(&bytes).unwrap();
        assert_eq!((info.width, info.height), (300, 200));
        assert!(matches!(
            RasterCodec.encode(&bytes, &EncodeParams::png(300)),
            Err(InkpostError::CodecFailure(_))
        ));
    }

    #[test]
    fn gif_reencode_keeps_frames() {
        let out = RasterCodec
            .encode(&gif_bytes(120, 60, 3), &EncodeParams::animated_gif(60))
            .unwrap();
        let frames = GifDecoder::new(Cursor::new(&out[..]))
            .unwrap()
            .into_frames()
            .collect_frames()
            .unwrap();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].buffer().width(), 60);
        assert_eq!(frames[0].buffer().height(), 30);
    }
}
