//! Placement resolver: turns either an accepted candidate or a manual click
//! into the single live [`SignaturePosition`].

use serde::Serialize;

use crate::error::{SignError, SignResult};
use crate::features::coords::{percent_from_pixel, Viewport};
use crate::features::document::PageSize;
use crate::features::scanner::PlaceholderCandidate;

/// Where the signature goes. `x`/`y` are page percentages (top-left origin).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SignaturePosition {
    pub x: f64,
    pub y: f64,
    pub scale: f64,
    pub rotation: u16,
    pub page: u32,
}

/// Drops the signature just below the anchor text.
pub fn position_from_candidate(candidate: &PlaceholderCandidate, page: PageSize) -> SignaturePosition {
    let offset = if page.is_valid() {
        candidate.height / page.height * 100.0
    } else {
        0.0
    };
    SignaturePosition {
        x: candidate.screen_x,
        y: candidate.screen_y + offset,
        scale: 1.0,
        rotation: 0,
        page: candidate.page_number,
    }
}

/// A tap on the rendered page, in pixels relative to the page box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasClick {
    pub x: f64,
    pub y: f64,
    pub container_width: f64,
    pub container_height: f64,
}

pub fn position_from_click(
    click: CanvasClick,
    page_number: u32,
    page: PageSize,
    viewport: Viewport,
) -> SignaturePosition {
    let (x, y) = percent_from_pixel(
        click.x,
        click.y,
        click.container_width,
        click.container_height,
        page,
    );
    SignaturePosition {
        x,
        y,
        scale: viewport.scale,
        rotation: viewport.rotation,
        page: page_number,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PlacementMode {
    #[default]
    Idle,
    PlacingManually,
    CandidateSelected { index: usize },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlacementResolver {
    mode: PlacementMode,
    position: Option<SignaturePosition>,
}

impl PlacementResolver {
    pub fn mode(&self) -> PlacementMode {
        self.mode
    }

    pub fn position(&self) -> Option<SignaturePosition> {
        self.position
    }

    pub fn is_placing(&self) -> bool {
        self.mode == PlacementMode::PlacingManually
    }

    /// Enter or leave manual placement. Entering needs a signature.
    pub fn toggle_manual(&mut self, has_signature: bool) -> SignResult<bool> {
        if self.is_placing() {
            self.mode = PlacementMode::Idle;
            return Ok(false);
        }
        if !has_signature {
            return Err(SignError::SignatureMissing);
        }
        self.mode = PlacementMode::PlacingManually;
        Ok(true)
    }

    pub fn cancel(&mut self) {
        if self.is_placing() {
            self.mode = PlacementMode::Idle;
        }
    }

    /// Ignored unless placing; one click places and leaves placement mode.
    pub fn click(
        &mut self,
        click: CanvasClick,
        page_number: u32,
        page: PageSize,
        viewport: Viewport,
    ) -> Option<SignaturePosition> {
        if !self.is_placing() {
            return None;
        }
        let position = position_from_click(click, page_number, page, viewport);
        tracing::info!(page = page_number, x = position.x, y = position.y, "manual placement");
        self.position = Some(position);
        self.mode = PlacementMode::Idle;
        Some(position)
    }

    pub fn accept_candidate(
        &mut self,
        index: usize,
        candidates: &[PlaceholderCandidate],
        page: PageSize,
        has_signature: bool,
    ) -> SignResult<SignaturePosition> {
        if !has_signature {
            return Err(SignError::SignatureMissing);
        }
        let candidate = candidates.get(index).ok_or(SignError::NoPlacement)?;
        let position = position_from_candidate(candidate, page);
        tracing::info!(
            page = position.page,
            x = position.x,
            y = position.y,
            label = %candidate.label,
            "candidate accepted"
        );
        self.position = Some(position);
        self.mode = PlacementMode::CandidateSelected { index };
        Ok(position)
    }

    /// Places on the first candidate only.
    pub fn place_all(
        &mut self,
        candidates: &[PlaceholderCandidate],
        page: PageSize,
        has_signature: bool,
    ) -> SignResult<SignaturePosition> {
        self.accept_candidate(0, candidates, page, has_signature)
    }

    /// The candidate list was replaced: forget the index, keep the position.
    pub fn release_candidate(&mut self) {
        if matches!(self.mode, PlacementMode::CandidateSelected { .. }) {
            self.mode = PlacementMode::Idle;
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// The position, when it belongs on `page`.
    pub fn visible_on(&self, page: u32) -> Option<SignaturePosition> {
        self.position.filter(|p| p.page == page)
    }
}
