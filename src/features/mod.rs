//! Engine stages, leaf first: text runs, anchor scan, coordinate mapping,
//! placement and export, plus the document and signature inputs they share.

pub mod coords;
pub mod document;
pub mod export;
pub mod font_encoding;
pub mod placement;
pub mod scanner;
pub mod signature_pad;
pub mod text_layout;
