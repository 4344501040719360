use std::sync::Arc;

use serde::Serialize;

use crate::config::SessionConfig;
use crate::error::{SignError, SignResult};
use crate::features::coords::Viewport;
use crate::features::document::{LoadedDocument, PageSize};
use crate::features::export::{compose, ExportResult};
use crate::features::placement::{CanvasClick, PlacementResolver, SignaturePosition};
use crate::features::scanner::{scan_document, PlaceholderCandidate, ScanMode, ScanOutcome};
use crate::features::signature_pad::SignatureImage;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum Screen {
    Home,
    Viewer,
}

/// Identifies one scan. Results carrying an older ticket are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanTicket {
    pub generation: u64,
    pub scan_seq: u64,
}

/// Everything a worker needs to scan without touching the session.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub ticket: ScanTicket,
    pub bytes: Arc<Vec<u8>>,
    pub mode: ScanMode,
    pub line_tolerance: f64,
}

impl ScanRequest {
    pub fn run(&self) -> ScanOutcome {
        scan_document(&self.bytes, &self.mode, self.line_tolerance)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportSummary {
    pub filename: String,
    pub size: usize,
    pub page: u32,
}

pub struct AppState {
    config: Arc<SessionConfig>,
    pub locale: String,
    pub document: Option<LoadedDocument>,
    generation: u64,
    scan_seq: u64,
    pub current_page: u32,
    pub viewport: Viewport,
    /// Candidates of the last applied scan; all on one page.
    pub candidates: Vec<PlaceholderCandidate>,
    pub search_term: Option<String>,
    pub show_areas: bool,
    pub scanning: bool,
    pub placement: PlacementResolver,
    pub signature: Option<SignatureImage>,
    pub last_error: Option<String>,
    pub last_export: Option<ExportSummary>,
}

impl AppState {
    pub fn new(config: Arc<SessionConfig>) -> Self {
        Self {
            locale: config.language.as_locale().to_string(),
            config,
            document: None,
            generation: 0,
            scan_seq: 0,
            current_page: 1,
            viewport: Viewport::default(),
            candidates: Vec::new(),
            search_term: None,
            show_areas: true,
            scanning: false,
            placement: PlacementResolver::default(),
            signature: None,
            last_error: None,
            last_export: None,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn current_screen(&self) -> Screen {
        if self.document.is_some() {
            Screen::Viewer
        } else {
            Screen::Home
        }
    }

    /// Back to an empty session. In-flight scans become stale.
    pub fn reset_runtime(&mut self) {
        let generation = self.generation + 1;
        let locale = std::mem::take(&mut self.locale);
        *self = Self::new(Arc::clone(&self.config));
        self.locale = locale;
        self.generation = generation;
    }

    pub fn current_ticket(&self) -> ScanTicket {
        ScanTicket {
            generation: self.generation,
            scan_seq: self.scan_seq,
        }
    }

    /// Replace the document and start the automatic placeholder scan.
    /// On failure the previous session is left as it was.
    pub fn load_document(&mut self, name: &str, bytes: Vec<u8>) -> SignResult<ScanRequest> {
        let generation = self.generation + 1;
        let document = LoadedDocument::parse(name, bytes, generation)?;
        tracing::info!(
            name,
            pages = document.page_count(),
            generation,
            "document loaded"
        );

        self.generation = generation;
        self.scan_seq = 0;
        self.document = Some(document);
        self.current_page = 1;
        self.viewport = Viewport::default();
        self.candidates.clear();
        self.search_term = None;
        self.placement.reset();
        self.last_export = None;
        self.last_error = None;
        self.begin_scan(ScanMode::Signature)
    }

    /// Start a re-scan. Any scan already running becomes stale.
    pub fn begin_scan(&mut self, mode: ScanMode) -> SignResult<ScanRequest> {
        let document = self.document.as_ref().ok_or(SignError::NoDocument)?;
        let bytes = Arc::clone(&document.bytes);
        self.scan_seq += 1;
        self.scanning = true;
        self.search_term = match &mode {
            ScanMode::Search(term) => Some(term.clone()),
            ScanMode::Signature => None,
        };
        tracing::debug!(
            generation = self.generation,
            scan_seq = self.scan_seq,
            "scan started"
        );
        Ok(ScanRequest {
            ticket: self.current_ticket(),
            bytes,
            mode,
            line_tolerance: self.config.viewer.line_tolerance,
        })
    }

    pub fn begin_search(&mut self, term: &str) -> SignResult<ScanRequest> {
        self.begin_scan(ScanMode::Search(term.trim().to_string()))
    }

    /// Install a finished scan. Returns false when the ticket is stale.
    pub fn apply_scan(&mut self, ticket: ScanTicket, outcome: ScanOutcome) -> bool {
        if ticket != self.current_ticket() {
            tracing::debug!(
                ?ticket,
                current = ?self.current_ticket(),
                "discarding stale scan result"
            );
            return false;
        }
        self.scanning = false;
        if let Some(page) = outcome.first_match_page {
            if page != self.current_page {
                tracing::info!(from = self.current_page, to = page, "navigating to first match");
                self.current_page = page;
            }
        }
        tracing::info!(candidates = outcome.candidates.len(), "scan applied");
        self.candidates = outcome.candidates;
        self.placement.release_candidate();
        true
    }

    pub fn page_count(&self) -> u32 {
        self.document.as_ref().map(|d| d.page_count()).unwrap_or(0)
    }

    pub fn current_page_size(&self) -> Option<PageSize> {
        self.document
            .as_ref()
            .and_then(|d| d.page_size(self.current_page))
    }

    /// Candidates on the page being shown.
    pub fn visible_candidates(&self) -> Vec<&PlaceholderCandidate> {
        self.candidates
            .iter()
            .filter(|c| c.page_number == self.current_page)
            .collect()
    }

    pub fn next_page(&mut self) {
        if self.current_page < self.page_count() {
            self.current_page += 1;
        }
    }

    pub fn prev_page(&mut self) {
        if self.current_page > 1 {
            self.current_page -= 1;
        }
    }

    pub fn goto_page(&mut self, page: u32) -> SignResult<()> {
        let page_count = self.page_count();
        if page == 0 || page > page_count {
            return Err(SignError::PageOutOfRange { page, page_count });
        }
        self.current_page = page;
        Ok(())
    }

    pub fn fit_width(&mut self, container_width: f64) {
        if let Some(size) = self.current_page_size() {
            let cap = self.config.viewer.max_fit_scale;
            self.viewport.fit_width(container_width, size, cap);
        }
    }

    pub fn fit_height(&mut self, container_height: f64) {
        if let Some(size) = self.current_page_size() {
            let cap = self.config.viewer.max_fit_scale;
            self.viewport.fit_height(container_height, size, cap);
        }
    }

    pub fn fit_page(&mut self, container_width: f64, container_height: f64) {
        if let Some(size) = self.current_page_size() {
            let cap = self.config.viewer.max_fit_scale;
            self.viewport
                .fit_page(container_width, container_height, size, cap);
        }
    }

    pub fn store_signature(&mut self, signature: SignatureImage) {
        tracing::info!(source = ?signature.source(), "signature stored");
        self.signature = Some(signature);
    }

    pub fn clear_signature(&mut self) {
        self.signature = None;
        self.placement.cancel();
    }

    pub fn toggle_placement(&mut self) -> SignResult<bool> {
        if self.document.is_none() {
            return Err(SignError::NoDocument);
        }
        let has_signature = self.signature.is_some();
        self.placement.toggle_manual(has_signature)
    }

    pub fn canvas_click(&mut self, click: CanvasClick) -> Option<SignaturePosition> {
        let size = self.current_page_size()?;
        self.placement
            .click(click, self.current_page, size, self.viewport)
    }

    /// Accept the `index`th visible candidate.
    pub fn accept_candidate(&mut self, index: usize) -> SignResult<SignaturePosition> {
        let size = self.current_page_size().ok_or(SignError::NoDocument)?;
        let visible: Vec<PlaceholderCandidate> =
            self.visible_candidates().into_iter().cloned().collect();
        let has_signature = self.signature.is_some();
        self.placement
            .accept_candidate(index, &visible, size, has_signature)
    }

    pub fn place_all(&mut self) -> SignResult<SignaturePosition> {
        let size = self.current_page_size().ok_or(SignError::NoDocument)?;
        let visible: Vec<PlaceholderCandidate> =
            self.visible_candidates().into_iter().cloned().collect();
        let has_signature = self.signature.is_some();
        self.placement.place_all(&visible, size, has_signature)
    }

    /// The position to draw on the current page, if any.
    pub fn visible_position(&self) -> Option<SignaturePosition> {
        self.placement.visible_on(self.current_page)
    }

    pub fn export(&mut self) -> SignResult<ExportResult> {
        let document = self.document.as_ref().ok_or(SignError::NoDocument)?;
        let signature = self.signature.as_ref().ok_or(SignError::SignatureMissing)?;
        let position = self.placement.position().ok_or(SignError::NoPlacement)?;
        let result = compose(
            &document.bytes,
            &document.name,
            signature.bytes(),
            &position,
            &self.config.export,
        )
        .inspect_err(|err| tracing::warn!(error = %err, "export failed"))?;
        self.last_export = Some(ExportSummary {
            filename: result.filename.clone(),
            size: result.bytes.len(),
            page: position.page,
        });
        Ok(result)
    }
}
