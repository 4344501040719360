//! Conversions between PDF point space (origin bottom-left) and screen space
//! (pixels or 0-100 percentages of the rendered page box, origin top-left).

use serde::{Deserialize, Serialize};

use crate::features::document::PageSize;

/// Smallest highlight box, as a percentage of the page, so short anchors stay clickable.
pub const MIN_HIGHLIGHT_WIDTH_PCT: f64 = 15.0;
pub const MIN_HIGHLIGHT_HEIGHT_PCT: f64 = 4.0;

const ZOOM_STEP: f64 = 0.3;
const MIN_ZOOM: f64 = 0.3;
const MAX_ZOOM: f64 = 4.0;

pub fn pdf_to_screen_percent(pdf_x: f64, pdf_y: f64, page: PageSize) -> (f64, f64) {
    if !page.is_valid() {
        return (0.0, 0.0);
    }
    (
        (pdf_x / page.width) * 100.0,
        ((page.height - pdf_y) / page.height) * 100.0,
    )
}

/// Click position inside the rendered page box to a PDF point.
pub fn screen_pixel_to_pdf_point(
    click_x: f64,
    click_y: f64,
    container_width: f64,
    container_height: f64,
    page: PageSize,
) -> (f64, f64) {
    if container_width <= 0.0 || container_height <= 0.0 || !page.is_valid() {
        return (0.0, 0.0);
    }
    let pdf_x = (click_x / container_width) * page.width;
    let pdf_y = page.height - (click_y / container_height) * page.height;
    (pdf_x, pdf_y)
}

/// Inverse of [`screen_pixel_to_pdf_point`].
pub fn pdf_point_to_screen_pixel(
    pdf_x: f64,
    pdf_y: f64,
    container_width: f64,
    container_height: f64,
    page: PageSize,
) -> (f64, f64) {
    if !page.is_valid() {
        return (0.0, 0.0);
    }
    (
        (pdf_x / page.width) * container_width,
        ((page.height - pdf_y) / page.height) * container_height,
    )
}

/// Pixel click straight to page percentages, through PDF point space.
pub fn percent_from_pixel(
    click_x: f64,
    click_y: f64,
    container_width: f64,
    container_height: f64,
    page: PageSize,
) -> (f64, f64) {
    let (pdf_x, pdf_y) =
        screen_pixel_to_pdf_point(click_x, click_y, container_width, container_height, page);
    pdf_to_screen_percent(pdf_x, pdf_y, page)
}

/// Highlight box size in page percentages, clamped to the minimum visible size.
pub fn highlight_box_percent(width: f64, height: f64, page: PageSize) -> (f64, f64) {
    if !page.is_valid() {
        return (MIN_HIGHLIGHT_WIDTH_PCT, MIN_HIGHLIGHT_HEIGHT_PCT);
    }
    (
        (width / page.width * 100.0).max(MIN_HIGHLIGHT_WIDTH_PCT),
        (height / page.height * 100.0).max(MIN_HIGHLIGHT_HEIGHT_PCT),
    )
}

/// Zoom and rotation of the rendered page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub scale: f64,
    pub rotation: u16,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            scale: 1.0,
            rotation: 0,
        }
    }
}

impl Viewport {
    pub fn rotate_clockwise(&mut self) {
        self.rotation = (self.rotation + 90) % 360;
    }

    pub fn zoom_in(&mut self) {
        self.scale = (self.scale + ZOOM_STEP).min(MAX_ZOOM);
    }

    pub fn zoom_out(&mut self) {
        self.scale = (self.scale - ZOOM_STEP).max(MIN_ZOOM);
    }

    pub fn actual_size(&mut self) {
        self.scale = 1.0;
    }

    pub fn fit_width(&mut self, container_width: f64, page: PageSize, cap: f64) {
        if container_width > 0.0 && page.is_valid() {
            self.scale = (container_width / page.width).min(cap);
        }
    }

    pub fn fit_height(&mut self, container_height: f64, page: PageSize, cap: f64) {
        if container_height > 0.0 && page.is_valid() {
            self.scale = (container_height / page.height).min(cap);
        }
    }

    pub fn fit_page(&mut self, container_width: f64, container_height: f64, page: PageSize, cap: f64) {
        if container_width > 0.0 && container_height > 0.0 && page.is_valid() {
            let scale_w = container_width / page.width;
            let scale_h = container_height / page.height;
            self.scale = scale_w.min(scale_h).min(cap);
        }
    }
}
