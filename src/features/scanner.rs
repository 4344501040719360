//! Signature anchor detection over extracted text runs.

use serde::Serialize;

use crate::features::coords::pdf_to_screen_percent;
use crate::features::text_layout::{extract_layout, PageLayout, TextRun};

/// Canonical label for every signature anchor, whichever spelling matched.
pub const SIGNATURE_LABEL: &str = "Authorized Signature";
/// Default vertical tolerance (points) for runs on the same line.
pub const DEFAULT_LINE_TOLERANCE: f64 = 3.0;

/// Per-glyph width guess when a run reports no width.
const FALLBACK_GLYPH_WIDTH: f64 = 8.0;
const FALLBACK_RUN_HEIGHT: f64 = 20.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaceholderCandidate {
    pub label: String,
    pub original_text: String,
    /// Percent of page width.
    pub screen_x: f64,
    /// Percent of page height, top-left origin.
    pub screen_y: f64,
    /// Points.
    pub width: f64,
    /// Points.
    pub height: f64,
    pub page_number: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanMode {
    Signature,
    Search(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanOutcome {
    /// Candidates on the active page only.
    pub candidates: Vec<PlaceholderCandidate>,
    /// First page with a match; the viewer navigates there.
    pub first_match_page: Option<u32>,
}

impl ScanOutcome {
    /// Page the candidates belong to.
    pub fn active_page(&self, current_page: u32) -> u32 {
        self.first_match_page.unwrap_or(current_page)
    }
}

/// Extract and scan `bytes`. Extraction failures degrade to an empty outcome.
pub fn scan_document(bytes: &[u8], mode: &ScanMode, line_tolerance: f64) -> ScanOutcome {
    match extract_layout(bytes) {
        Ok(pages) => scan_pages(&pages, mode, line_tolerance),
        Err(err) => {
            tracing::warn!(error = %err, "placeholder scan failed, continuing without candidates");
            ScanOutcome::default()
        }
    }
}

pub fn scan_pages(pages: &[PageLayout], mode: &ScanMode, line_tolerance: f64) -> ScanOutcome {
    let found: Vec<PlaceholderCandidate> = match mode {
        ScanMode::Signature => pages
            .iter()
            .filter_map(|page| detect_on_page(page, line_tolerance))
            .collect(),
        ScanMode::Search(term) => search_pages(pages, term),
    };
    keep_first_page(found)
}

pub fn detect_placeholders(pages: &[PageLayout], line_tolerance: f64) -> ScanOutcome {
    scan_pages(pages, &ScanMode::Signature, line_tolerance)
}

pub fn search_text(pages: &[PageLayout], term: &str) -> ScanOutcome {
    scan_pages(pages, &ScanMode::Search(term.to_string()), DEFAULT_LINE_TOLERANCE)
}

fn keep_first_page(found: Vec<PlaceholderCandidate>) -> ScanOutcome {
    let first_match_page = found.first().map(|c| c.page_number);
    let candidates = match first_match_page {
        Some(page) => found.into_iter().filter(|c| c.page_number == page).collect(),
        None => Vec::new(),
    };
    ScanOutcome {
        candidates,
        first_match_page,
    }
}

fn is_authorized(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("authorised") || lower.contains("authorized")
}

fn is_signature(text: &str) -> bool {
    text.to_lowercase().contains("signature")
}

/// At most one anchor per page.
fn detect_on_page(page: &PageLayout, line_tolerance: f64) -> Option<PlaceholderCandidate> {
    let runs: Vec<&TextRun> = page.runs.iter().filter(|r| !r.text.trim().is_empty()).collect();

    let matched: Vec<&TextRun> = if let Some(anchor) = runs.iter().find(|r| is_signature(&r.text)) {
        let same_line: Vec<&TextRun> = runs
            .iter()
            .copied()
            .filter(|r| (r.pdf_y - anchor.pdf_y).abs() < line_tolerance)
            .collect();
        let authorized = same_line.iter().find(|r| is_authorized(&r.text));
        let signature = same_line.iter().find(|r| is_signature(&r.text));
        match (authorized, signature) {
            (Some(a), Some(s)) if !std::ptr::eq(*a, *s) => vec![*a, *s],
            _ => vec![*anchor],
        }
    } else {
        vec![*runs.iter().find(|r| is_authorized(&r.text))?]
    };

    Some(candidate_from_runs(page, &matched, SIGNATURE_LABEL))
}

fn search_pages(pages: &[PageLayout], term: &str) -> Vec<PlaceholderCandidate> {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    let label = term.trim();
    let mut found = Vec::new();
    for page in pages {
        for run in &page.runs {
            if run.text.trim().to_lowercase().contains(&needle) {
                found.push(candidate_from_runs(page, &[run], label));
            }
        }
    }
    found
}

fn run_width(run: &TextRun) -> f64 {
    if run.width > 0.0 {
        run.width
    } else {
        run.text.chars().count() as f64 * FALLBACK_GLYPH_WIDTH
    }
}

/// Span from the leftmost run's start to the rightmost run's end. Position and
/// `original_text` come from the leftmost run.
fn candidate_from_runs(page: &PageLayout, runs: &[&TextRun], label: &str) -> PlaceholderCandidate {
    let mut ordered: Vec<&TextRun> = runs.to_vec();
    ordered.sort_by(|a, b| a.pdf_x.total_cmp(&b.pdf_x));
    let first = ordered[0];
    let end_x = ordered
        .iter()
        .map(|r| r.pdf_x + run_width(r))
        .fold(f64::MIN, f64::max);
    let height = if first.height > 0.0 {
        first.height
    } else {
        FALLBACK_RUN_HEIGHT
    };
    let (screen_x, screen_y) = pdf_to_screen_percent(first.pdf_x, first.pdf_y, page.size);
    PlaceholderCandidate {
        label: label.to_string(),
        original_text: first.text.trim().to_string(),
        screen_x,
        screen_y,
        width: end_x - first.pdf_x,
        height,
        page_number: page.page_number,
    }
}
