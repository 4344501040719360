//! Signature images: uploaded rasters, data URLs from the host and strokes
//! drawn on the signature pad.

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use image::{ImageFormat, Rgba, RgbaImage};
use imageproc::drawing::draw_filled_circle_mut;
use serde::{Deserialize, Serialize};

use crate::config::PadConfig;
use crate::error::{SignError, SignResult};

const INK: Rgba<u8> = Rgba([17, 24, 39, 255]);
const PAPER: Rgba<u8> = Rgba([255, 255, 255, 255]);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureSource {
    Drawn,
    Uploaded,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct StrokePoint {
    pub x: f32,
    pub y: f32,
}

pub type Stroke = Vec<StrokePoint>;

/// Encoded raster (PNG, JPEG, WebP) known to decode.
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureImage {
    bytes: Vec<u8>,
    source: SignatureSource,
    width: u32,
    height: u32,
}

impl SignatureImage {
    pub fn from_upload(bytes: Vec<u8>) -> SignResult<Self> {
        Self::decoded(bytes, SignatureSource::Uploaded)
    }

    /// Accepts `data:<mime>;base64,<payload>` or a bare base64 payload.
    pub fn from_data_url(data: &str, source: SignatureSource) -> SignResult<Self> {
        let trimmed = data.trim();
        let payload = match trimmed.strip_prefix("data:") {
            Some(rest) => rest
                .split_once(',')
                .map(|(_, payload)| payload)
                .ok_or_else(|| SignError::image_decode("data url has no payload"))?,
            None => trimmed,
        };
        let bytes = B64
            .decode(payload.as_bytes())
            .map_err(|e| SignError::image_decode(format!("base64:{e}")))?;
        Self::decoded(bytes, source)
    }

    /// Rasterise pad strokes to a PNG. Points outside the canvas are clipped.
    pub fn from_strokes(strokes: &[Stroke], pad: &PadConfig) -> SignResult<Self> {
        if strokes.iter().all(|s| s.is_empty()) {
            return Err(SignError::SignatureEmpty);
        }
        let mut canvas = RgbaImage::from_pixel(pad.width, pad.height, PAPER);
        let radius = pad.pen_radius.max(1);
        for stroke in strokes {
            let clamped: Vec<StrokePoint> = stroke
                .iter()
                .map(|p| clamp_point(*p, pad.width, pad.height, radius))
                .collect();
            draw_stroke(&mut canvas, &clamped, radius);
        }

        let mut out = Cursor::new(Vec::new());
        canvas
            .write_to(&mut out, ImageFormat::Png)
            .map_err(|e| SignError::Serialize {
                message: format!("signature_png:{e}"),
            })?;
        Ok(Self {
            bytes: out.into_inner(),
            source: SignatureSource::Drawn,
            width: pad.width,
            height: pad.height,
        })
    }

    fn decoded(bytes: Vec<u8>, source: SignatureSource) -> SignResult<Self> {
        if bytes.is_empty() {
            return Err(SignError::image_decode("empty input"));
        }
        let img = image::load_from_memory(&bytes).map_err(|e| SignError::image_decode(e.to_string()))?;
        Ok(Self {
            width: img.width(),
            height: img.height(),
            bytes,
            source,
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn source(&self) -> SignatureSource {
        self.source
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn to_data_url(&self) -> String {
        let mime = image::guess_format(&self.bytes)
            .map(|f| f.to_mime_type())
            .unwrap_or("image/png");
        format!("data:{mime};base64,{}", B64.encode(&self.bytes))
    }
}

/// Pull a point to within one pen radius of the canvas so segment length stays bounded.
fn clamp_point(point: StrokePoint, width: u32, height: u32, radius: i32) -> StrokePoint {
    let r = radius as f32;
    let clamp = |v: f32, max: u32| {
        if v.is_nan() {
            0.0
        } else {
            v.clamp(-r, max as f32 + r)
        }
    };
    StrokePoint {
        x: clamp(point.x, width),
        y: clamp(point.y, height),
    }
}

/// Stamp a pen dot every pixel along each segment.
fn draw_stroke(canvas: &mut RgbaImage, stroke: &[StrokePoint], radius: i32) {
    let Some(first) = stroke.first() else {
        return;
    };
    draw_filled_circle_mut(canvas, (first.x as i32, first.y as i32), radius, INK);
    for pair in stroke.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let dx = b.x - a.x;
        let dy = b.y - a.y;
        let steps = dx.abs().max(dy.abs()).ceil().max(1.0) as u32;
        for step in 1..=steps {
            let t = step as f32 / steps as f32;
            let center = ((a.x + dx * t) as i32, (a.y + dy * t) as i32);
            draw_filled_circle_mut(canvas, center, radius, INK);
        }
    }
}
