//! Stamp the signature image onto a page and serialise the signed document.

use std::path::{Path, PathBuf};

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use serde::Serialize;

use crate::config::ExportConfig;
use crate::error::{SignError, SignResult};
use crate::features::document::{inherited, open_document, page_box, resolve, PageBox};
use crate::features::placement::SignaturePosition;

const XOBJECT_PREFIX: &str = "ImSig";

#[derive(Debug, Clone, PartialEq)]
pub struct ExportResult {
    pub bytes: Vec<u8>,
    pub filename: String,
}

impl ExportResult {
    /// Write into `dir` under [`ExportResult::filename`].
    pub fn write_to_dir(&self, dir: &Path) -> SignResult<PathBuf> {
        let path = dir.join(&self.filename);
        std::fs::write(&path, &self.bytes).map_err(|e| SignError::Serialize {
            message: format!("write_failed:{e}"),
        })?;
        Ok(path)
    }
}

/// Where the stamp lands, in PDF points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StampRect {
    pub x: f64,
    /// Y of the position itself; the image hangs below it.
    pub top: f64,
    pub bottom: f64,
    pub width: f64,
    pub height: f64,
}

/// Percent position to PDF points. Rotation and scale are not applied.
pub fn placement_rect(position: &SignaturePosition, page: PageBox, config: &ExportConfig) -> StampRect {
    let x = page.llx + position.x / 100.0 * page.size.width;
    let top = page.lly + page.size.height - position.y / 100.0 * page.size.height;
    StampRect {
        x,
        top,
        bottom: top - config.signature_height,
        width: config.signature_width,
        height: config.signature_height,
    }
}

pub fn export_filename(original: &str) -> String {
    format!("signed_{original}")
}

/// Embed `signature` on `position.page` and return the full signed document.
pub fn compose(
    pdf: &[u8],
    name: &str,
    signature: &[u8],
    position: &SignaturePosition,
    config: &ExportConfig,
) -> SignResult<ExportResult> {
    if signature.is_empty() {
        return Err(SignError::image_decode("empty input"));
    }
    let img = image::load_from_memory(signature)
        .map_err(|e| SignError::image_decode(e.to_string()))?
        .to_rgba8();

    let mut doc = open_document(pdf)?;
    let pages = doc.get_pages();
    let page_count = pages.len() as u32;
    let page_id = *pages
        .get(&position.page)
        .ok_or(SignError::PageOutOfRange {
            page: position.page,
            page_count,
        })?;
    let rect = placement_rect(position, page_box(&doc, page_id)?, config);

    let (img_w, img_h) = img.dimensions();
    let mut rgb = Vec::with_capacity((img_w * img_h * 3) as usize);
    let mut alpha = Vec::with_capacity((img_w * img_h) as usize);
    for pixel in img.pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
        alpha.push(pixel[3]);
    }

    let smask_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => img_w as i64,
            "Height" => img_h as i64,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
        },
        alpha,
    ));
    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => img_w as i64,
            "Height" => img_h as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "SMask" => smask_id,
        },
        rgb,
    ));

    let xobject_name = register_xobject(&mut doc, page_id, image_id)?;
    let stamp = format!(
        "Q\nq {} 0 0 {} {} {} cm /{} Do Q\n",
        pdf_number(rect.width),
        pdf_number(rect.height),
        pdf_number(rect.x),
        pdf_number(rect.bottom),
        xobject_name
    );
    wrap_contents(&mut doc, page_id, stamp.into_bytes())?;

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).map_err(|e| SignError::Serialize {
        message: e.to_string(),
    })?;
    tracing::info!(
        page = position.page,
        x = rect.x,
        y = rect.bottom,
        size = bytes.len(),
        "signed document composed"
    );
    Ok(ExportResult {
        bytes,
        filename: export_filename(name),
    })
}

/// Content-stream number: at most four decimals, no trailing zeros.
fn pdf_number(value: f64) -> String {
    let fixed = format!("{value:.4}");
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "" | "-0" => "0".to_string(),
        other => other.to_string(),
    }
}

fn resolved_dict(doc: &Document, obj: &Object) -> Option<Dictionary> {
    resolve(doc, obj)?.as_dict().ok().cloned()
}

/// Copy the page's (possibly inherited) resources onto the page as a direct
/// dictionary and add the image under a free `ImSig*` name.
fn register_xobject(doc: &mut Document, page_id: ObjectId, image_id: ObjectId) -> SignResult<String> {
    let mut resources = inherited(doc, page_id, b"Resources")
        .and_then(|obj| resolved_dict(doc, obj))
        .unwrap_or_default();
    let mut xobjects = match resources.get(b"XObject") {
        Ok(obj) => resolved_dict(doc, obj)
            .ok_or_else(|| SignError::document_load("signature_xobject_invalid"))?,
        Err(_) => Dictionary::new(),
    };

    let name = (0..)
        .map(|i| {
            if i == 0 {
                XOBJECT_PREFIX.to_string()
            } else {
                format!("{XOBJECT_PREFIX}{i}")
            }
        })
        .find(|candidate| !xobjects.has(candidate.as_bytes()))
        .unwrap_or_else(|| XOBJECT_PREFIX.to_string());
    xobjects.set(name.as_bytes().to_vec(), image_id);
    resources.set("XObject", xobjects);

    let page_dict = doc
        .get_object_mut(page_id)
        .and_then(|o| o.as_dict_mut())
        .map_err(|_| SignError::document_load("signature_page_missing_dict"))?;
    page_dict.set("Resources", resources);
    Ok(name)
}

/// `q` + existing content + `stamp`; `stamp` starts with the closing `Q`.
fn wrap_contents(doc: &mut Document, page_id: ObjectId, stamp: Vec<u8>) -> SignResult<()> {
    let existing: Vec<Object> = {
        let page_dict = doc
            .get_object(page_id)
            .and_then(|o| o.as_dict())
            .map_err(|_| SignError::document_load("signature_page_missing_dict"))?;
        match page_dict.get(b"Contents") {
            Ok(Object::Reference(id)) => match doc.get_object(*id) {
                Ok(Object::Array(parts)) => parts.clone(),
                _ => vec![Object::Reference(*id)],
            },
            Ok(Object::Array(parts)) => parts.clone(),
            _ => Vec::new(),
        }
    };

    let open_id = doc.add_object(Stream::new(dictionary! {}, b"q\n".to_vec()));
    let stamp_id = doc.add_object(Stream::new(dictionary! {}, stamp));
    let mut contents = Vec::with_capacity(existing.len() + 2);
    contents.push(Object::Reference(open_id));
    contents.extend(existing);
    contents.push(Object::Reference(stamp_id));

    let page_dict = doc
        .get_object_mut(page_id)
        .and_then(|o| o.as_dict_mut())
        .map_err(|_| SignError::document_load("signature_page_missing_dict"))?;
    page_dict.set("Contents", contents);
    Ok(())
}
