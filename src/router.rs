use crate::config::{load_session_config, SessionConfig};
use crate::error::{SignError, SignResult};
use crate::features::coords::highlight_box_percent;
use crate::features::placement::CanvasClick;
use crate::features::scanner::{ScanMode, ScanOutcome};
use crate::features::signature_pad::{SignatureImage, SignatureSource, Stroke};
use crate::i18n::update_locale;
use crate::state::{AppState, ScanRequest, ScanTicket, Screen};
use crate::ui::{
    Button as UiButton, Checkbox as UiCheckbox, Column as UiColumn, Highlight as UiHighlight,
    PageView as UiPageView, Progress as UiProgress, SignatureOverlay as UiSignatureOverlay,
    Text as UiText, TextInput as UiTextInput,
};
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use rust_i18n::t;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::{
    collections::HashMap,
    sync::{mpsc, Arc, Mutex, MutexGuard, OnceLock},
    thread,
};

#[cfg(test)]
use std::{
    sync::atomic::{AtomicBool, AtomicU64, Ordering},
    time::Duration,
};

struct GlobalState {
    ui: OnceLock<Mutex<AppState>>,
    worker: OnceLock<Option<WorkerRuntime>>,
    notifications: Mutex<Vec<WorkerResult>>,
}

impl GlobalState {
    const fn new() -> Self {
        Self {
            ui: OnceLock::new(),
            worker: OnceLock::new(),
            notifications: Mutex::new(Vec::new()),
        }
    }

    fn ui(&self) -> &Mutex<AppState> {
        self.ui
            .get_or_init(|| Mutex::new(AppState::new(Arc::new(startup_config()))))
    }

    fn ui_lock(&self) -> MutexGuard<'_, AppState> {
        self.ui().lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    #[cfg(test)]
    fn ui_try_lock(&self) -> Option<MutexGuard<'_, AppState>> {
        self.ui().try_lock().ok()
    }

    fn worker(&self) -> Option<&WorkerRuntime> {
        self.worker.get_or_init(WorkerRuntime::spawn).as_ref()
    }

    fn push_worker_result(&self, result: WorkerResult) {
        if let Ok(mut guard) = self.notifications.lock() {
            guard.push(result);
        }
    }

    fn drain_worker_results(&self) -> Vec<WorkerResult> {
        self.notifications
            .lock()
            .map(|mut q| q.drain(..).collect())
            .unwrap_or_default()
    }
}

fn startup_config() -> SessionConfig {
    load_session_config().unwrap_or_else(|err| {
        tracing::warn!(error = %err, "falling back to default session config");
        SessionConfig::default()
    })
}

struct WorkerRuntime {
    #[cfg_attr(test, allow(dead_code))]
    sender: mpsc::Sender<WorkerJob>,
}

impl WorkerRuntime {
    fn spawn() -> Option<Self> {
        let (tx, rx) = mpsc::channel::<WorkerJob>();
        let spawned = thread::Builder::new()
            .name("indusign-scan".into())
            .spawn(move || {
                while let Ok(job) = rx.recv() {
                    let result = run_worker_job(job);
                    STATE.push_worker_result(result);
                }
            });
        match spawned {
            Ok(_) => Some(Self { sender: tx }),
            Err(err) => {
                tracing::error!(error = %err, "failed to spawn scan worker, scanning inline");
                None
            }
        }
    }

    /// Gives the job back when the worker is gone.
    #[cfg(not(test))]
    fn enqueue(&self, job: WorkerJob) -> Result<(), WorkerJob> {
        self.sender.send(job).map_err(|e| e.0)
    }

    #[cfg(test)]
    fn enqueue(&self, job: WorkerJob) -> Result<(), WorkerJob> {
        if TEST_FORCE_ASYNC_WORKER.load(Ordering::SeqCst) {
            self.sender.send(job).map_err(|e| e.0)
        } else {
            let result = run_worker_job(job);
            STATE.push_worker_result(result);
            Ok(())
        }
    }
}

enum WorkerJob {
    Scan(ScanRequest),
}

enum WorkerResult {
    Scan {
        ticket: ScanTicket,
        outcome: ScanOutcome,
    },
}

fn run_worker_job(job: WorkerJob) -> WorkerResult {
    match job {
        WorkerJob::Scan(request) => {
            test_worker_delay();
            let outcome = request.run();
            WorkerResult::Scan {
                ticket: request.ticket,
                outcome,
            }
        }
    }
}

/// Hand a job to the worker, or run it inline when no worker thread exists.
fn enqueue_job(job: WorkerJob) {
    let job = match STATE.worker() {
        Some(worker) => match worker.enqueue(job) {
            Ok(()) => return,
            Err(job) => {
                tracing::warn!("scan worker stopped, scanning inline");
                job
            }
        },
        None => job,
    };
    STATE.push_worker_result(run_worker_job(job));
}

static STATE: GlobalState = GlobalState::new();

/// Serialises tests that drive the global session.
#[cfg(test)]
pub(crate) static TEST_MUTEX: Mutex<()> = Mutex::new(());

#[cfg(test)]
static TEST_FORCE_ASYNC_WORKER: AtomicBool = AtomicBool::new(false);

#[cfg(test)]
static TEST_WORKER_DELAY_MS: AtomicU64 = AtomicU64::new(0);

#[cfg(test)]
fn test_worker_delay() {
    let delay = TEST_WORKER_DELAY_MS.load(Ordering::SeqCst);
    if delay > 0 {
        thread::sleep(Duration::from_millis(delay));
    }
}

#[cfg(not(test))]
fn test_worker_delay() {}

#[derive(Deserialize, Default)]
struct Command {
    action: String,
    /// File name of an opened document.
    name: Option<String>,
    /// Base64 document bytes, or a signature data URL.
    data: Option<String>,
    strokes: Option<Vec<Stroke>>,
    bindings: Option<HashMap<String, String>>,
}

#[derive(Debug)]
enum Action {
    Init,
    Reset,
    DocumentLoad {
        name: String,
        data: Option<String>,
    },
    DetectPlaceholders,
    SearchText {
        term: String,
    },
    PageNext,
    PagePrev,
    PageGoto {
        page: Option<u32>,
    },
    Rotate,
    ZoomIn,
    ZoomOut,
    FitWidth {
        container_width: Option<f64>,
    },
    FitHeight {
        container_height: Option<f64>,
    },
    FitPage {
        container_width: Option<f64>,
        container_height: Option<f64>,
    },
    ActualSize,
    ToggleAreas {
        visible: Option<bool>,
    },
    SignatureStore {
        data: Option<String>,
    },
    SignatureUpload {
        data: Option<String>,
    },
    SignatureDraw {
        strokes: Vec<Stroke>,
    },
    SignatureClear,
    PlacementToggle,
    CanvasClick {
        click: Option<CanvasClick>,
    },
    CandidateClick {
        index: Option<usize>,
    },
    PlaceAll,
    Export,
    SetLocale {
        locale: String,
    },
}

fn parse_action(command: Command) -> Result<Action, String> {
    let Command {
        action,
        name,
        data,
        strokes,
        bindings,
    } = command;

    let bindings = bindings.unwrap_or_default();

    match action.as_str() {
        "init" => Ok(Action::Init),
        "reset" => Ok(Action::Reset),
        "document_load" => Ok(Action::DocumentLoad {
            name: name.unwrap_or_else(|| "document.pdf".into()),
            data,
        }),
        "detect_placeholders" => Ok(Action::DetectPlaceholders),
        "search_text" => Ok(Action::SearchText {
            term: bindings.get("search_term").cloned().unwrap_or_default(),
        }),
        "page_next" => Ok(Action::PageNext),
        "page_prev" => Ok(Action::PagePrev),
        "page_goto" => Ok(Action::PageGoto {
            page: parse_u32_binding(&bindings, "page"),
        }),
        "rotate" => Ok(Action::Rotate),
        "zoom_in" => Ok(Action::ZoomIn),
        "zoom_out" => Ok(Action::ZoomOut),
        "fit_width" => Ok(Action::FitWidth {
            container_width: parse_f64_binding(&bindings, "container_width"),
        }),
        "fit_height" => Ok(Action::FitHeight {
            container_height: parse_f64_binding(&bindings, "container_height"),
        }),
        "fit_page" => Ok(Action::FitPage {
            container_width: parse_f64_binding(&bindings, "container_width"),
            container_height: parse_f64_binding(&bindings, "container_height"),
        }),
        "actual_size" => Ok(Action::ActualSize),
        "toggle_areas" => Ok(Action::ToggleAreas {
            visible: parse_bool_binding(&bindings, "show_areas"),
        }),
        "signature_store" => Ok(Action::SignatureStore { data }),
        "signature_upload" => Ok(Action::SignatureUpload { data }),
        "signature_draw" => Ok(Action::SignatureDraw {
            strokes: strokes.unwrap_or_default(),
        }),
        "signature_clear" => Ok(Action::SignatureClear),
        "placement_toggle" => Ok(Action::PlacementToggle),
        "canvas_click" => Ok(Action::CanvasClick {
            click: parse_click(&bindings),
        }),
        "candidate_click" => Ok(Action::CandidateClick {
            index: parse_u32_binding(&bindings, "index").map(|i| i as usize),
        }),
        "place_all" => Ok(Action::PlaceAll),
        "export" => Ok(Action::Export),
        "set_locale" => Ok(Action::SetLocale {
            locale: bindings.get("locale").cloned().unwrap_or_default(),
        }),
        other => Err(format!("unknown_action:{other}")),
    }
}

fn parse_click(bindings: &HashMap<String, String>) -> Option<CanvasClick> {
    Some(CanvasClick {
        x: parse_f64_binding(bindings, "click_x")?,
        y: parse_f64_binding(bindings, "click_y")?,
        container_width: parse_f64_binding(bindings, "container_width")?,
        container_height: parse_f64_binding(bindings, "container_height")?,
    })
}

fn parse_u32_binding(bindings: &HashMap<String, String>, key: &str) -> Option<u32> {
    bindings.get(key).and_then(|v| v.trim().parse::<u32>().ok())
}

fn parse_f64_binding(bindings: &HashMap<String, String>, key: &str) -> Option<f64> {
    bindings
        .get(key)
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

fn parse_bool_binding(bindings: &HashMap<String, String>, key: &str) -> Option<bool> {
    bindings
        .get(key)
        .and_then(|v| match v.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        })
}

/// Payload returned for a successful export instead of a UI tree.
#[derive(Serialize)]
struct ExportPayload<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    filename: &'a str,
    mime: &'static str,
    size: usize,
    data: String,
}

/// Entry point for the host: one JSON command in, one JSON document out.
pub fn dispatch(input: &str) -> String {
    let response = std::panic::catch_unwind(|| {
        let command: Command = serde_json::from_str(input).map_err(|e| {
            tracing::warn!(error = %e, "rejecting malformed command");
            "invalid_input".to_string()
        })?;
        handle_command(command)
    });

    let value = match response {
        Ok(Ok(value)) => value,
        Ok(Err(err)) => error_ui(&err),
        Err(_) => error_ui("panic"),
    };
    value.to_string()
}

fn handle_command(command: Command) -> Result<Value, String> {
    let mut state = STATE.ui_lock();

    apply_worker_results(&mut state);
    tracing::debug!(action = %command.action, "dispatching");

    let action = match parse_action(command) {
        Ok(action) => action,
        Err(err) => {
            tracing::warn!(error = %err, "unrecognised command");
            state.last_error = Some("invalid_input".into());
            return Ok(render_ui(&state));
        }
    };

    // Every user action starts from a clean error slate.
    state.last_error = None;

    match action {
        Action::Init => {}
        Action::Reset => {
            state.reset_runtime();
        }
        Action::DocumentLoad { name, data } => {
            let loaded = data
                .ok_or_else(|| SignError::document_load("missing document data"))
                .and_then(|encoded| {
                    B64.decode(encoded.trim().as_bytes())
                        .map_err(|e| SignError::document_load(format!("base64:{e}")))
                })
                .and_then(|bytes| state.load_document(&name, bytes));
            match loaded {
                Ok(request) => {
                    enqueue_job(WorkerJob::Scan(request));
                    #[cfg(test)]
                    {
                        apply_worker_results(&mut state);
                    }
                }
                Err(err) => record_error(&mut state, err),
            }
        }
        Action::DetectPlaceholders => {
            let request = state.begin_scan(ScanMode::Signature);
            start_scan(&mut state, request);
        }
        Action::SearchText { term } => {
            let request = state.begin_search(&term);
            start_scan(&mut state, request);
        }
        Action::PageNext => state.next_page(),
        Action::PagePrev => state.prev_page(),
        Action::PageGoto { page } => {
            let page = page.unwrap_or(0);
            if let Err(err) = state.goto_page(page) {
                record_error(&mut state, err);
            }
        }
        Action::Rotate => state.viewport.rotate_clockwise(),
        Action::ZoomIn => state.viewport.zoom_in(),
        Action::ZoomOut => state.viewport.zoom_out(),
        Action::ActualSize => state.viewport.actual_size(),
        Action::FitWidth { container_width } => {
            if let Some(width) = container_width {
                state.fit_width(width);
            }
        }
        Action::FitHeight { container_height } => {
            if let Some(height) = container_height {
                state.fit_height(height);
            }
        }
        Action::FitPage {
            container_width,
            container_height,
        } => {
            if let (Some(width), Some(height)) = (container_width, container_height) {
                state.fit_page(width, height);
            }
        }
        Action::ToggleAreas { visible } => {
            state.show_areas = visible.unwrap_or(!state.show_areas);
        }
        Action::SignatureStore { data } => {
            store_signature(&mut state, data.as_deref(), SignatureSource::Drawn)
        }
        Action::SignatureUpload { data } => {
            store_signature(&mut state, data.as_deref(), SignatureSource::Uploaded)
        }
        Action::SignatureDraw { strokes } => {
            let drawn = SignatureImage::from_strokes(&strokes, &state.config().pad);
            match drawn {
                Ok(signature) => state.store_signature(signature),
                Err(err) => record_error(&mut state, err),
            }
        }
        Action::SignatureClear => state.clear_signature(),
        Action::PlacementToggle => {
            if let Err(err) = state.toggle_placement() {
                record_error(&mut state, err);
            }
        }
        Action::CanvasClick { click } => {
            if let Some(click) = click {
                state.canvas_click(click);
            }
        }
        Action::CandidateClick { index } => match index {
            Some(index) => {
                if let Err(err) = state.accept_candidate(index) {
                    record_error(&mut state, err);
                }
            }
            None => {
                tracing::warn!("candidate_click without a usable index");
                state.last_error = Some("invalid_input".into());
            }
        },
        Action::PlaceAll => {
            if let Err(err) = state.place_all() {
                record_error(&mut state, err);
            }
        }
        Action::Export => match state.export() {
            Ok(result) => {
                let payload = ExportPayload {
                    kind: "Export",
                    filename: &result.filename,
                    mime: "application/pdf",
                    size: result.bytes.len(),
                    data: B64.encode(&result.bytes),
                };
                return serde_json::to_value(payload).map_err(|e| format!("serialize_failed:{e}"));
            }
            Err(err) => record_error(&mut state, err),
        },
        Action::SetLocale { locale } => update_locale(&mut state, &locale),
    }

    Ok(render_ui(&state))
}

fn start_scan(state: &mut AppState, request: SignResult<ScanRequest>) {
    match request {
        Ok(request) => {
            enqueue_job(WorkerJob::Scan(request));
            #[cfg(test)]
            {
                apply_worker_results(state);
            }
        }
        Err(err) => record_error(state, err),
    }
}

fn store_signature(state: &mut AppState, data: Option<&str>, source: SignatureSource) {
    let decoded = data
        .ok_or_else(|| SignError::image_decode("missing signature data"))
        .and_then(|data| SignatureImage::from_data_url(data, source));
    match decoded {
        Ok(signature) => state.store_signature(signature),
        Err(err) => record_error(state, err),
    }
}

fn record_error(state: &mut AppState, err: SignError) {
    tracing::warn!(code = err.code(), error = %err, "action failed");
    state.last_error = Some(err.code().to_string());
}

fn apply_worker_results(state: &mut AppState) {
    let results = STATE.drain_worker_results();
    if results.is_empty() {
        return;
    }

    for result in results {
        match result {
            WorkerResult::Scan { ticket, outcome } => {
                state.apply_scan(ticket, outcome);
            }
        }
    }
}

fn error_ui(message: &str) -> Value {
    json!({
        "type": "Column",
        "padding": 24,
        "children": [
            { "type": "Text", "text": "Error", "size": 18.0 },
            { "type": "Text", "text": message }
        ]
    })
}

fn node<T: Serialize>(value: T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

fn error_text(code: &str, locale: &str) -> String {
    let text = match code {
        "scan_failed" => t!("errors.scan_failed", locale = locale),
        "document_load_failed" => t!("errors.document_load_failed", locale = locale),
        "image_decode_failed" => t!("errors.image_decode_failed", locale = locale),
        "page_out_of_range" => t!("errors.page_out_of_range", locale = locale),
        "no_document" => t!("errors.no_document", locale = locale),
        "no_placement" => t!("errors.no_placement", locale = locale),
        "signature_missing" => t!("errors.signature_missing", locale = locale),
        "signature_empty" => t!("errors.signature_empty", locale = locale),
        "serialize_failed" => t!("errors.serialize_failed", locale = locale),
        "config_failed" => t!("errors.config_failed", locale = locale),
        _ => t!("errors.invalid_input", locale = locale),
    };
    text.into_owned()
}

fn render_ui(state: &AppState) -> Value {
    match state.current_screen() {
        Screen::Home => render_home_screen(state),
        Screen::Viewer => render_viewer_screen(state),
    }
}

fn push_error(children: &mut Vec<Value>, state: &AppState) {
    if let Some(code) = state.last_error.as_deref() {
        let text = error_text(code, &state.locale);
        children.push(node(UiText::new(&text).size(14.0).content_description(code)));
    }
}

fn render_signature_section(children: &mut Vec<Value>, state: &AppState) {
    let locale = state.locale.as_str();
    let title = t!("signature.title", locale = locale);
    children.push(node(UiText::new(&title).size(16.0)));
    match state.signature.as_ref() {
        Some(_) => {
            let ready = t!("signature.ready", locale = locale);
            let clear = t!("signature.clear", locale = locale);
            children.push(node(UiText::new(&ready)));
            children.push(node(UiButton::new(&clear, "signature_clear")));
        }
        None => {
            let missing = t!("signature.missing", locale = locale);
            let upload = t!("signature.upload", locale = locale);
            children.push(node(UiText::new(&missing)));
            children.push(node(
                UiButton::new(&upload, "signature_upload").requires_file_picker(true),
            ));
        }
    }
}

fn render_home_screen(state: &AppState) -> Value {
    let locale = state.locale.as_str();
    let title = t!("app.title", locale = locale);
    let subtitle = t!("home.subtitle", locale = locale);
    let open = t!("home.open_pdf", locale = locale);

    let mut children = vec![
        node(UiText::new(&title).size(22.0)),
        node(UiText::new(&subtitle).size(14.0)),
        node(UiButton::new(&open, "document_load").requires_file_picker(true)),
    ];
    render_signature_section(&mut children, state);
    push_error(&mut children, state);
    node(UiColumn::new(children).padding(24))
}

fn render_viewer_screen(state: &AppState) -> Value {
    let locale = state.locale.as_str();
    let mut children = Vec::new();

    if let Some(document) = state.document.as_ref() {
        children.push(node(UiText::new(&document.name).size(20.0)));
    }
    let page_of = t!(
        "viewer.page_of",
        locale = locale,
        current = state.current_page,
        total = state.page_count()
    );
    children.push(node(UiText::new(&page_of).size(14.0)));

    let prev = t!("viewer.prev", locale = locale);
    let next = t!("viewer.next", locale = locale);
    let rotate = t!("viewer.rotate", locale = locale);
    let zoom_in = t!("viewer.zoom_in", locale = locale);
    let zoom_out = t!("viewer.zoom_out", locale = locale);
    let fit_width = t!("viewer.fit_width", locale = locale);
    let fit_height = t!("viewer.fit_height", locale = locale);
    let fit_page = t!("viewer.fit_page", locale = locale);
    let actual_size = t!("viewer.actual_size", locale = locale);
    children.push(node(UiColumn::new(vec![
        node(UiButton::new(&prev, "page_prev").enabled(state.current_page > 1)),
        node(UiButton::new(&next, "page_next").enabled(state.current_page < state.page_count())),
        node(UiButton::new(&rotate, "rotate")),
        node(UiButton::new(&zoom_in, "zoom_in")),
        node(UiButton::new(&zoom_out, "zoom_out")),
        node(UiButton::new(&fit_width, "fit_width")),
        node(UiButton::new(&fit_height, "fit_height")),
        node(UiButton::new(&fit_page, "fit_page")),
        node(UiButton::new(&actual_size, "actual_size")),
    ])
    .content_description("viewer_controls")));

    let search_hint = t!("viewer.search_hint", locale = locale);
    let search = t!("viewer.search", locale = locale);
    let detect = t!("viewer.detect", locale = locale);
    let mut input = UiTextInput::new("search_term")
        .hint(&search_hint)
        .action_on_submit("search_text");
    if let Some(term) = state.search_term.as_deref() {
        input = input.text(term);
    }
    children.push(node(input));
    children.push(node(UiButton::new(&search, "search_text")));
    children.push(node(UiButton::new(&detect, "detect_placeholders")));

    let scanning = t!("viewer.scanning", locale = locale);
    if state.scanning {
        children.push(node(UiProgress::new().text(&scanning)));
    }

    let show_areas = t!("viewer.show_areas", locale = locale);
    children.push(node(
        UiCheckbox::new(&show_areas, "show_areas")
            .checked(state.show_areas)
            .action("toggle_areas"),
    ));

    if let Some(view) = render_page_view(state) {
        children.push(view);
    }

    let visible = state.visible_candidates();
    let use_candidate = t!("viewer.use_candidate", locale = locale);
    if !state.scanning {
        let summary = if visible.is_empty() {
            t!("viewer.no_candidates", locale = locale)
        } else {
            t!("viewer.candidates_found", locale = locale, count = visible.len())
        };
        children.push(node(UiText::new(&summary)));
    }
    for (index, candidate) in visible.iter().enumerate() {
        children.push(node(UiText::new(&candidate.original_text).size(12.0)));
        children.push(node(
            UiButton::new(&use_candidate, "candidate_click").binding("index", index.to_string()),
        ));
    }

    let place_all = t!("viewer.place_all", locale = locale);
    if visible.len() > 1 {
        children.push(node(UiButton::new(&place_all, "place_all")));
    }

    let placing = state.placement.is_placing();
    let toggle_label = if placing {
        t!("viewer.cancel_placement", locale = locale)
    } else {
        t!("viewer.place_manually", locale = locale)
    };
    children.push(node(UiButton::new(&toggle_label, "placement_toggle")));
    let placing_hint = t!("viewer.placing_hint", locale = locale);
    if placing {
        children.push(node(UiText::new(&placing_hint).size(12.0)));
    }

    let placed = state
        .placement
        .position()
        .map(|p| t!("viewer.placed", locale = locale, page = p.page));
    if let Some(placed) = placed.as_deref() {
        children.push(node(UiText::new(placed).size(12.0)));
    }

    render_signature_section(&mut children, state);

    let export = t!("viewer.export", locale = locale);
    let can_export = state.signature.is_some() && state.placement.position().is_some();
    children.push(node(UiButton::new(&export, "export")
            .id("export_button")
            .enabled(can_export)));

    let exported = state
        .last_export
        .as_ref()
        .map(|e| t!("viewer.exported", locale = locale, filename = e.filename));
    if let Some(exported) = exported.as_deref() {
        children.push(node(UiText::new(exported).size(12.0)));
    }

    push_error(&mut children, state);
    node(UiColumn::new(children).padding(16))
}

fn render_page_view(state: &AppState) -> Option<Value> {
    let size = state.current_page_size()?;
    let mut overlays = Vec::new();
    if state.show_areas {
        for (index, candidate) in state.visible_candidates().into_iter().enumerate() {
            let (width, height) = highlight_box_percent(candidate.width, candidate.height, size);
            overlays.push(node(
                UiHighlight::new(
                    candidate.screen_x,
                    candidate.screen_y,
                    width,
                    height,
                    &candidate.label,
                )
                .binding("index", index.to_string()),
            ));
        }
    }
    if let (Some(position), Some(signature)) = (state.visible_position(), state.signature.as_ref()) {
        overlays.push(node(
            UiSignatureOverlay::new(position.x, position.y, signature.to_data_url())
                .transform(position.scale, position.rotation),
        ));
    }

    let mut view = UiPageView::new(state.current_page, state.page_count(), size.width, size.height)
        .viewport(state.viewport.scale, state.viewport.rotation)
        .children(overlays);
    if state.placement.is_placing() {
        view = view.clickable("canvas_click");
    }
    Some(node(view))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::signature_pad::StrokePoint;
    use crate::test_support::{pdf_with_pages, png_bytes, show_text, PageSpec};
    use std::time::Instant;

    fn make_command(action: &str) -> Command {
        Command {
            action: action.into(),
            ..Command::default()
        }
    }

    fn with_bindings(action: &str, pairs: &[(&str, &str)]) -> Command {
        let mut command = make_command(action);
        command.bindings = Some(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
        command
    }

    fn reset_state() {
        TEST_FORCE_ASYNC_WORKER.store(false, Ordering::SeqCst);
        TEST_WORKER_DELAY_MS.store(0, Ordering::SeqCst);
        // Let a worker left busy by an earlier test finish before the reset.
        STATE.drain_worker_results();
        handle_command(make_command("reset")).expect("reset command should succeed");
        handle_command(with_bindings("set_locale", &[("locale", "en")])).unwrap();
    }

    fn contract_pdf() -> Vec<u8> {
        pdf_with_pages(&[
            PageSpec::letter(&show_text(72.0, 700.0, 12.0, "Rental agreement")),
            PageSpec::letter(&format!(
                "{}{}",
                show_text(100.0, 500.0, 12.0, "Authorised"),
                show_text(165.0, 500.0, 12.0, "Signature")
            )),
        ])
    }

    fn load_command(name: &str, bytes: &[u8]) -> Command {
        let mut command = make_command("document_load");
        command.name = Some(name.into());
        command.data = Some(B64.encode(bytes));
        command
    }

    fn upload_signature() -> Value {
        let mut command = make_command("signature_upload");
        command.data = Some(format!("data:image/png;base64,{}", B64.encode(png_bytes(4, 2))));
        handle_command(command).expect("signature upload should succeed")
    }

    fn extract_texts(ui: &Value) -> Vec<String> {
        fn walk(node: &Value, acc: &mut Vec<String>) {
            if let Some(text) = node.get("text").and_then(|t| t.as_str()) {
                acc.push(text.to_string());
            }
            if let Some(children) = node.get("children").and_then(|c| c.as_array()) {
                for child in children {
                    walk(child, acc);
                }
            }
        }

        let mut out = Vec::new();
        walk(ui, &mut out);
        out
    }

    fn find_nodes<'a>(ui: &'a Value, kind: &str) -> Vec<&'a Value> {
        fn walk<'a>(node: &'a Value, kind: &str, acc: &mut Vec<&'a Value>) {
            if node.get("type").and_then(|t| t.as_str()) == Some(kind) {
                acc.push(node);
            }
            if let Some(children) = node.get("children").and_then(|c| c.as_array()) {
                for child in children {
                    walk(child, kind, acc);
                }
            }
        }

        let mut out = Vec::new();
        walk(ui, kind, &mut out);
        out
    }

    fn assert_contains_text(ui: &Value, needle: &str) {
        let texts = extract_texts(ui);
        assert!(
            texts.iter().any(|t| t.contains(needle)),
            "expected UI to contain text with `{needle}`, found: {texts:?}"
        );
    }

    #[test]
    fn init_renders_home_with_open_button() {
        let _guard = TEST_MUTEX.lock().unwrap();
        reset_state();

        let ui = handle_command(make_command("init")).unwrap();
        assert_contains_text(&ui, "IndusSign");
        let buttons = find_nodes(&ui, "Button");
        assert!(buttons
            .iter()
            .any(|b| b["action"] == "document_load" && b["requires_file_picker"] == true));
    }

    #[test]
    fn loading_a_contract_jumps_to_signature_page() {
        let _guard = TEST_MUTEX.lock().unwrap();
        reset_state();

        let ui = handle_command(load_command("contract.pdf", &contract_pdf())).unwrap();
        assert_contains_text(&ui, "contract.pdf");
        assert_contains_text(&ui, "Page 2 of 2");
        assert_contains_text(&ui, "1 signature area(s) on this page");

        let highlights = find_nodes(&ui, "Highlight");
        assert_eq!(highlights.len(), 1);
        assert_eq!(highlights[0]["label"], "Authorized Signature");
        let width = highlights[0]["width"].as_f64().unwrap();
        assert!(width >= 15.0);
    }

    #[test]
    fn invalid_document_keeps_previous_session() {
        let _guard = TEST_MUTEX.lock().unwrap();
        reset_state();

        handle_command(load_command("contract.pdf", &contract_pdf())).unwrap();
        let ui = handle_command(load_command("broken.pdf", b"not a pdf")).unwrap();
        assert_contains_text(&ui, "contract.pdf");
        assert_contains_text(&ui, "could not be opened as a PDF");

        let state = STATE.ui_lock();
        assert_eq!(state.last_error.as_deref(), Some("document_load_failed"));
        assert_eq!(state.candidates.len(), 1);
    }

    #[test]
    fn scan_runs_off_the_ui_mutex() {
        let _guard = TEST_MUTEX.lock().unwrap();
        reset_state();

        TEST_FORCE_ASYNC_WORKER.store(true, Ordering::SeqCst);
        TEST_WORKER_DELAY_MS.store(200, Ordering::SeqCst);

        let start = Instant::now();
        let ui = handle_command(load_command("contract.pdf", &contract_pdf())).unwrap();
        assert!(
            start.elapsed() < Duration::from_millis(150),
            "dispatch held the UI mutex for too long"
        );
        assert!(!find_nodes(&ui, "Progress").is_empty());
        assert!(
            STATE.ui_try_lock().is_some(),
            "state mutex should be free while worker runs"
        );

        thread::sleep(Duration::from_millis(300));
        let refreshed = handle_command(make_command("init")).unwrap();
        assert!(find_nodes(&refreshed, "Progress").is_empty());
        assert_eq!(find_nodes(&refreshed, "Highlight").len(), 1);

        TEST_FORCE_ASYNC_WORKER.store(false, Ordering::SeqCst);
        TEST_WORKER_DELAY_MS.store(0, Ordering::SeqCst);
    }

    #[test]
    fn last_load_wins_over_slow_scan() {
        let _guard = TEST_MUTEX.lock().unwrap();
        reset_state();

        TEST_FORCE_ASYNC_WORKER.store(true, Ordering::SeqCst);
        TEST_WORKER_DELAY_MS.store(100, Ordering::SeqCst);

        handle_command(load_command("contract.pdf", &contract_pdf())).unwrap();
        let plain = pdf_with_pages(&[PageSpec::letter(&show_text(72.0, 700.0, 12.0, "Memo"))]);
        handle_command(load_command("memo.pdf", &plain)).unwrap();

        thread::sleep(Duration::from_millis(400));
        let ui = handle_command(make_command("init")).unwrap();
        assert_contains_text(&ui, "memo.pdf");
        assert_contains_text(&ui, "Page 1 of 1");
        assert!(find_nodes(&ui, "Highlight").is_empty());

        let state = STATE.ui_lock();
        assert!(state.candidates.is_empty());
        assert!(!state.scanning);
        drop(state);

        TEST_FORCE_ASYNC_WORKER.store(false, Ordering::SeqCst);
        TEST_WORKER_DELAY_MS.store(0, Ordering::SeqCst);
    }

    #[test]
    fn candidate_click_requires_signature() {
        let _guard = TEST_MUTEX.lock().unwrap();
        reset_state();

        handle_command(load_command("contract.pdf", &contract_pdf())).unwrap();
        let ui = handle_command(with_bindings("candidate_click", &[("index", "0")])).unwrap();
        assert_contains_text(&ui, "Create a signature first");
        assert!(find_nodes(&ui, "SignatureOverlay").is_empty());
    }

    #[test]
    fn candidate_click_without_index_is_rejected() {
        let _guard = TEST_MUTEX.lock().unwrap();
        reset_state();

        handle_command(load_command("contract.pdf", &contract_pdf())).unwrap();
        upload_signature();
        for bindings in [vec![], vec![("index", "first")]] {
            let ui = handle_command(with_bindings("candidate_click", &bindings)).unwrap();
            assert_contains_text(&ui, "The request could not be understood");
            assert!(find_nodes(&ui, "SignatureOverlay").is_empty());
        }
        assert!(STATE.ui_lock().placement.position().is_none());
    }

    #[test]
    fn sign_and_export_round_trip() {
        let _guard = TEST_MUTEX.lock().unwrap();
        reset_state();

        handle_command(load_command("contract.pdf", &contract_pdf())).unwrap();
        upload_signature();
        let ui = handle_command(with_bindings("candidate_click", &[("index", "0")])).unwrap();
        let overlays = find_nodes(&ui, "SignatureOverlay");
        assert_eq!(overlays.len(), 1);
        assert!(overlays[0]["image"]
            .as_str()
            .unwrap()
            .starts_with("data:image/png;base64,"));

        let payload = handle_command(make_command("export")).unwrap();
        assert_eq!(payload["type"], "Export");
        assert_eq!(payload["filename"], "signed_contract.pdf");
        let bytes = B64.decode(payload["data"].as_str().unwrap()).unwrap();
        assert_eq!(payload["size"].as_u64().unwrap() as usize, bytes.len());
        let doc = lopdf::Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 2);

        let after = handle_command(make_command("init")).unwrap();
        assert_contains_text(&after, "Saved signed_contract.pdf");
    }

    #[test]
    fn export_without_placement_reports_error() {
        let _guard = TEST_MUTEX.lock().unwrap();
        reset_state();

        handle_command(load_command("contract.pdf", &contract_pdf())).unwrap();
        upload_signature();
        let ui = handle_command(make_command("export")).unwrap();
        assert_eq!(ui["type"], "Column");
        assert_contains_text(&ui, "Place the signature before downloading");
    }

    #[test]
    fn manual_placement_from_canvas_click() {
        let _guard = TEST_MUTEX.lock().unwrap();
        reset_state();

        handle_command(load_command("contract.pdf", &contract_pdf())).unwrap();
        let mut draw = make_command("signature_draw");
        draw.strokes = Some(vec![vec![
            StrokePoint { x: 10.0, y: 10.0 },
            StrokePoint { x: 80.0, y: 40.0 },
        ]]);
        handle_command(draw).unwrap();

        let ui = handle_command(make_command("placement_toggle")).unwrap();
        let views = find_nodes(&ui, "PageView");
        assert_eq!(views[0]["click_action"], "canvas_click");

        let ui = handle_command(with_bindings(
            "canvas_click",
            &[
                ("click_x", "306"),
                ("click_y", "396"),
                ("container_width", "612"),
                ("container_height", "792"),
            ],
        ))
        .unwrap();
        let overlays = find_nodes(&ui, "SignatureOverlay");
        assert_eq!(overlays.len(), 1);
        assert!((overlays[0]["x"].as_f64().unwrap() - 50.0).abs() < 1e-9);
        assert!((overlays[0]["y"].as_f64().unwrap() - 50.0).abs() < 1e-9);
        assert!(find_nodes(&ui, "PageView")[0]["click_action"].is_null());
    }

    #[test]
    fn empty_drawing_is_reported() {
        let _guard = TEST_MUTEX.lock().unwrap();
        reset_state();

        let mut draw = make_command("signature_draw");
        draw.strokes = Some(Vec::new());
        let ui = handle_command(draw).unwrap();
        assert_contains_text(&ui, "The signature pad is empty");
    }

    #[test]
    fn search_replaces_candidates() {
        let _guard = TEST_MUTEX.lock().unwrap();
        reset_state();

        handle_command(load_command("contract.pdf", &contract_pdf())).unwrap();
        let ui = handle_command(with_bindings("search_text", &[("search_term", "rental")])).unwrap();
        assert_contains_text(&ui, "Page 1 of 2");
        let highlights = find_nodes(&ui, "Highlight");
        assert_eq!(highlights.len(), 1);
        assert_eq!(highlights[0]["label"], "rental");
    }

    #[test]
    fn viewer_controls_update_viewport() {
        let _guard = TEST_MUTEX.lock().unwrap();
        reset_state();

        handle_command(load_command("contract.pdf", &contract_pdf())).unwrap();
        handle_command(make_command("rotate")).unwrap();
        handle_command(make_command("zoom_in")).unwrap();
        let ui = handle_command(with_bindings("toggle_areas", &[("show_areas", "false")])).unwrap();
        let view = find_nodes(&ui, "PageView")[0];
        assert_eq!(view["rotation"], 90);
        assert!((view["scale"].as_f64().unwrap() - 1.3).abs() < 1e-9);
        assert!(find_nodes(&ui, "Highlight").is_empty());

        let ui = handle_command(with_bindings("fit_width", &[("container_width", "306")])).unwrap();
        assert!((find_nodes(&ui, "PageView")[0]["scale"].as_f64().unwrap() - 0.5).abs() < 1e-9);

        let ui = handle_command(with_bindings("page_goto", &[("page", "9")])).unwrap();
        assert_contains_text(&ui, "That page does not exist");
    }

    #[test]
    fn hindi_locale_is_rendered() {
        let _guard = TEST_MUTEX.lock().unwrap();
        reset_state();

        let ui = handle_command(with_bindings("set_locale", &[("locale", "hi-IN")])).unwrap();
        assert_contains_text(&ui, "PDF खोलें");
        handle_command(with_bindings("set_locale", &[("locale", "en")])).unwrap();
    }

    #[test]
    fn unknown_action_is_reported_in_ui() {
        let _guard = TEST_MUTEX.lock().unwrap();
        reset_state();

        let ui = handle_command(make_command("teleport")).unwrap();
        assert_contains_text(&ui, "The request could not be understood");
    }

    #[test]
    fn dispatch_rejects_malformed_json() {
        let _guard = TEST_MUTEX.lock().unwrap();
        reset_state();

        let out: Value = serde_json::from_str(&dispatch("{not json")).unwrap();
        assert_contains_text(&out, "invalid_input");

        let ok: Value = serde_json::from_str(&dispatch(r#"{"action":"init"}"#)).unwrap();
        assert_eq!(ok["type"], "Column");
    }
}
