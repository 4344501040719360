//! In-memory PDF and image fixtures shared by the unit tests.

use std::io::Cursor;

use image::{ImageFormat, Rgba, RgbaImage};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

pub struct PageSpec {
    pub width: f64,
    pub height: f64,
    pub content: String,
}

impl PageSpec {
    pub fn letter(content: &str) -> Self {
        Self::sized(612.0, 792.0, content)
    }

    pub fn sized(width: f64, height: f64, content: &str) -> Self {
        Self {
            width,
            height,
            content: content.to_string(),
        }
    }
}

/// `BT /F1 <size> Tf <x> <y> Td (<text>) Tj ET`
pub fn show_text(x: f64, y: f64, size: f64, text: &str) -> String {
    format!("BT /F1 {size} Tf {x} {y} Td ({text}) Tj ET\n")
}

/// Helvetica with every printable glyph 500/1000 em wide.
fn add_font(doc: &mut Document) -> ObjectId {
    let widths: Vec<Object> = (32..=126).map(|_| Object::Integer(500)).collect();
    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "FirstChar" => 32,
        "LastChar" => 126,
        "Widths" => widths,
    })
}

fn media_box(width: f64, height: f64) -> Object {
    Object::Array(vec![
        0.into(),
        0.into(),
        Object::Real(width as f32),
        Object::Real(height as f32),
    ])
}

fn finish(mut doc: Document, pages_id: ObjectId, pages: Object) -> Vec<u8> {
    doc.objects.insert(pages_id, pages);
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).expect("failed to save test PDF");
    buf
}

pub fn pdf_with_pages(specs: &[PageSpec]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = add_font(&mut doc);

    let mut kids: Vec<Object> = Vec::new();
    for spec in specs {
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            spec.content.clone().into_bytes(),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => media_box(spec.width, spec.height),
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    finish(
        doc,
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    )
}

pub fn pdf_with_inherited_media_box(width: f64, height: f64) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
    });
    finish(
        doc,
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::from(page_id)],
            "Count" => 1,
            "MediaBox" => media_box(width, height),
        }),
    )
}

/// Single letter page whose fonts live on the Pages node instead of the page.
pub fn pdf_with_inherited_resources(content: &str) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = add_font(&mut doc);
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.as_bytes().to_vec()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    finish(
        doc,
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::from(page_id)],
            "Count" => 1,
            "MediaBox" => media_box(612.0, 792.0),
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
        }),
    )
}

/// Single letter page with `/F1` (Helvetica) and `/F2` built by `font`.
pub fn pdf_with_font(content: &str, font: impl FnOnce(&mut Document) -> ObjectId) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let helvetica = add_font(&mut doc);
    let custom = font(&mut doc);
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.as_bytes().to_vec()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => media_box(612.0, 792.0),
        "Contents" => content_id,
        "Resources" => dictionary! {
            "Font" => dictionary! { "F1" => helvetica, "F2" => custom },
        },
    });
    finish(
        doc,
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::from(page_id)],
            "Count" => 1,
        }),
    )
}

/// Type0 Identity-H font, 500/1000 em per glyph, whose `/ToUnicode` maps CID `n` to the
/// `n`th char of `text` (1-based).
pub fn identity_h_font(doc: &mut Document, text: &str) -> ObjectId {
    let entries: String = text
        .chars()
        .enumerate()
        .map(|(i, c)| format!("<{:04X}> <{:04X}>\n", i + 1, u32::from(c)))
        .collect();
    let cmap = format!(
        "/CIDInit /ProcSet findresource begin\n12 dict begin\nbegincmap\n\
         1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n\
         {} beginbfchar\n{entries}endbfchar\nendcmap\nend\nend\n",
        text.chars().count()
    );
    let cmap_id = doc.add_object(Stream::new(dictionary! {}, cmap.into_bytes()));
    let descendant = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "CIDFontType2",
        "BaseFont" => "Calibri",
        "DW" => 500,
    });
    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type0",
        "BaseFont" => "Calibri",
        "Encoding" => "Identity-H",
        "DescendantFonts" => vec![Object::from(descendant)],
        "ToUnicode" => cmap_id,
    })
}

/// Two-byte hex string of CIDs `1..=count`, e.g. `<00010002>`.
pub fn cid_hex(count: usize) -> String {
    let cids: String = (1..=count).map(|cid| format!("{cid:04X}")).collect();
    format!("<{cids}>")
}

/// Simple font whose `/Differences` assign `names` to codes starting at `first`.
pub fn differences_font(doc: &mut Document, first: i64, names: &[&str]) -> ObjectId {
    let mut differences = vec![Object::Integer(first)];
    differences.extend(names.iter().map(|n| Object::Name(n.as_bytes().to_vec())));
    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "SubsetSerif",
        "Encoding" => dictionary! {
            "Type" => "Encoding",
            "Differences" => differences,
        },
    })
}

/// Semi-transparent dark PNG.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([20, 30, 40, 200]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png)
        .expect("failed to encode test PNG");
    out.into_inner()
}
