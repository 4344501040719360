use std::sync::Arc;

use lopdf::{Dictionary, Document, Object, ObjectId};
use serde::Serialize;

use crate::error::{SignError, SignResult};

/// Fallback when neither the page nor its ancestors carry a MediaBox (A4).
const DEFAULT_PAGE_SIZE: PageSize = PageSize {
    width: 595.0,
    height: 842.0,
};

/// Page box in PDF points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_valid(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// MediaBox with its lower-left origin, used to normalise run coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub llx: f64,
    pub lly: f64,
    pub size: PageSize,
}

/// A document chosen by the host. Replaced wholesale on the next load.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub name: String,
    pub bytes: Arc<Vec<u8>>,
    pub page_sizes: Vec<PageSize>,
    pub generation: u64,
}

impl LoadedDocument {
    /// Parse `bytes` once to validate them and record page geometry.
    pub fn parse(name: &str, bytes: Vec<u8>, generation: u64) -> SignResult<Self> {
        let doc = open_document(&bytes)?;
        let page_sizes = doc
            .get_pages()
            .values()
            .map(|page_id| page_box(&doc, *page_id).map(|b| b.size))
            .collect::<SignResult<Vec<_>>>()?;
        if page_sizes.is_empty() {
            return Err(SignError::document_load("document has no pages"));
        }
        Ok(Self {
            name: name.to_string(),
            bytes: Arc::new(bytes),
            page_sizes,
            generation,
        })
    }

    pub fn page_count(&self) -> u32 {
        self.page_sizes.len() as u32
    }

    /// Size of a 1-based page.
    pub fn page_size(&self, page: u32) -> Option<PageSize> {
        page.checked_sub(1)
            .and_then(|idx| self.page_sizes.get(idx as usize))
            .copied()
    }
}

pub fn open_document(bytes: &[u8]) -> SignResult<Document> {
    if bytes.is_empty() {
        return Err(SignError::document_load("empty input"));
    }
    Document::load_mem(bytes).map_err(|e| SignError::document_load(format!("pdf_parse_failed:{e}")))
}

/// Walk up the page tree until a MediaBox is found.
pub fn page_box(doc: &Document, page_id: ObjectId) -> SignResult<PageBox> {
    let mut current = Some(page_id);
    while let Some(id) = current {
        let dict = doc
            .get_object(id)
            .and_then(|o| o.as_dict())
            .map_err(|_| SignError::document_load("page_missing_dict"))?;
        if let Some(found) = extract_media_box(doc, dict) {
            return Ok(found);
        }
        current = dict.get(b"Parent").and_then(|p| p.as_reference()).ok();
    }
    Ok(PageBox {
        llx: 0.0,
        lly: 0.0,
        size: DEFAULT_PAGE_SIZE,
    })
}

fn extract_media_box(doc: &Document, dict: &Dictionary) -> Option<PageBox> {
    let raw = dict.get(b"MediaBox").ok()?;
    let arr = resolve(doc, raw)?.as_array().ok()?;
    if arr.len() != 4 {
        return None;
    }
    let llx = obj_to_f64(resolve(doc, &arr[0])?)?;
    let lly = obj_to_f64(resolve(doc, &arr[1])?)?;
    let urx = obj_to_f64(resolve(doc, &arr[2])?)?;
    let ury = obj_to_f64(resolve(doc, &arr[3])?)?;
    let size = PageSize::new((urx - llx).abs(), (ury - lly).abs());
    if !size.is_valid() {
        return None;
    }
    Some(PageBox {
        llx: llx.min(urx),
        lly: lly.min(ury),
        size,
    })
}

/// Follow a single level of indirection.
pub fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Look up `key` on the page or the nearest ancestor that defines it.
pub fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = Some(page_id);
    while let Some(id) = current {
        let dict = doc.get_object(id).and_then(|o| o.as_dict()).ok()?;
        if let Ok(found) = dict.get(key) {
            return Some(found);
        }
        current = dict.get(b"Parent").and_then(|p| p.as_reference()).ok();
    }
    None
}

pub fn obj_to_f64(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(f) => Some((*f).into()),
        _ => None,
    }
}
