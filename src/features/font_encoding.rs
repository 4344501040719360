//! Font code to Unicode mapping: `/ToUnicode` CMaps and simple-font `/Encoding /Differences`.

use std::collections::BTreeMap;

use lopdf::{Document, Object};

use crate::features::document::resolve;

/// Largest `bfrange` expanded, in codes.
const MAX_RANGE_SPAN: u32 = 0xFFFF;

const GLYPH_NAMES: &[(&str, char)] = &[
    ("space", ' '),
    ("nbspace", ' '),
    ("nonbreakingspace", ' '),
    ("exclam", '!'),
    ("quotedbl", '"'),
    ("numbersign", '#'),
    ("dollar", '$'),
    ("percent", '%'),
    ("ampersand", '&'),
    ("quotesingle", '\''),
    ("quoteleft", '\u{2018}'),
    ("quoteright", '\u{2019}'),
    ("parenleft", '('),
    ("parenright", ')'),
    ("asterisk", '*'),
    ("plus", '+'),
    ("comma", ','),
    ("hyphen", '-'),
    ("period", '.'),
    ("slash", '/'),
    ("zero", '0'),
    ("one", '1'),
    ("two", '2'),
    ("three", '3'),
    ("four", '4'),
    ("five", '5'),
    ("six", '6'),
    ("seven", '7'),
    ("eight", '8'),
    ("nine", '9'),
    ("colon", ':'),
    ("semicolon", ';'),
    ("less", '<'),
    ("equal", '='),
    ("greater", '>'),
    ("question", '?'),
    ("at", '@'),
    ("bracketleft", '['),
    ("backslash", '\\'),
    ("bracketright", ']'),
    ("underscore", '_'),
    ("endash", '\u{2013}'),
    ("emdash", '\u{2014}'),
    ("bullet", '\u{2022}'),
];

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Hex(Vec<u8>),
    Open,
    Close,
    Word(String),
}

fn is_delimiter(b: u8) -> bool {
    b.is_ascii_whitespace() || matches!(b, b'<' | b'>' | b'[' | b']' | b'(' | b')' | b'/' | b'%')
}

fn tokenize(data: &[u8]) -> Vec<Token> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < data.len() {
        match data[i] {
            b'%' => {
                while i < data.len() && data[i] != b'\n' && data[i] != b'\r' {
                    i += 1;
                }
            }
            b'<' | b'>' if data.get(i + 1) == Some(&data[i]) => {
                out.push(Token::Word(String::from_utf8_lossy(&data[i..i + 2]).into_owned()));
                i += 2;
            }
            b'<' => {
                let end = data[i + 1..]
                    .iter()
                    .position(|b| *b == b'>')
                    .map_or(data.len(), |p| i + 1 + p);
                out.push(Token::Hex(hex_bytes(&data[i + 1..end])));
                i = end + 1;
            }
            b'[' => {
                out.push(Token::Open);
                i += 1;
            }
            b']' => {
                out.push(Token::Close);
                i += 1;
            }
            b'(' => {
                let mut depth = 0usize;
                let start = i;
                while i < data.len() {
                    match data[i] {
                        b'\\' => i += 1,
                        b'(' => depth += 1,
                        b')' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                    i += 1;
                }
                let end = (i + 1).min(data.len());
                out.push(Token::Word(String::from_utf8_lossy(&data[start..end]).into_owned()));
                i = end;
            }
            b if b.is_ascii_whitespace() || b == b'>' || b == b')' => i += 1,
            _ => {
                let start = i;
                i += 1;
                while i < data.len() && !is_delimiter(data[i]) {
                    i += 1;
                }
                out.push(Token::Word(String::from_utf8_lossy(&data[start..i]).into_owned()));
            }
        }
    }
    out
}

/// Hex digits to bytes; an odd trailing digit is padded with 0.
fn hex_bytes(raw: &[u8]) -> Vec<u8> {
    let digits: Vec<u8> = raw
        .iter()
        .filter_map(|b| (*b as char).to_digit(16))
        .map(|d| d as u8)
        .collect();
    digits
        .chunks(2)
        .map(|pair| match pair {
            [hi, lo] => hi << 4 | lo,
            [hi] => hi << 4,
            _ => 0,
        })
        .collect()
}

fn code_of(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .take(4)
        .fold(0u32, |acc, b| acc << 8 | u32::from(*b))
}

pub(crate) fn utf16_be(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks(2)
        .map(|pair| match pair {
            [hi, lo] => u16::from_be_bytes([*hi, *lo]),
            [single] => u16::from(*single),
            _ => 0,
        })
        .collect();
    char::decode_utf16(units)
        .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

/// `base` with its last char moved `offset` code points forward.
fn shifted(base: &str, offset: u32) -> Option<String> {
    let mut chars: Vec<char> = base.chars().collect();
    let last = chars.pop()?;
    chars.push(char::from_u32(u32::from(last) + offset)?);
    Some(chars.into_iter().collect())
}

/// Read the `bfchar` and `bfrange` sections of a `/ToUnicode` CMap.
pub fn parse_to_unicode(data: &[u8]) -> BTreeMap<u32, String> {
    let tokens = tokenize(data);
    let mut map = BTreeMap::new();
    let mut iter = tokens.iter();
    while let Some(token) = iter.next() {
        let Token::Word(word) = token else {
            continue;
        };
        match word.as_str() {
            "beginbfchar" => {
                while let Some(Token::Hex(src)) = iter.next() {
                    if let Some(Token::Hex(dst)) = iter.next() {
                        map.insert(code_of(src), utf16_be(dst));
                    }
                }
            }
            "beginbfrange" => loop {
                let (Some(Token::Hex(lo)), Some(Token::Hex(hi))) = (iter.next(), iter.next()) else {
                    break;
                };
                let lo = code_of(lo);
                let hi = code_of(hi).min(lo.saturating_add(MAX_RANGE_SPAN));
                match iter.next() {
                    Some(Token::Hex(dst)) => {
                        let base = utf16_be(dst);
                        for code in lo..=hi {
                            if let Some(text) = shifted(&base, code - lo) {
                                map.insert(code, text);
                            }
                        }
                    }
                    Some(Token::Open) => {
                        let mut code = lo;
                        while let Some(Token::Hex(dst)) = iter.next() {
                            if code <= hi {
                                map.insert(code, utf16_be(dst));
                            }
                            code = code.saturating_add(1);
                        }
                    }
                    _ => break,
                }
            },
            _ => {}
        }
    }
    map
}

/// Code overrides from an `/Encoding` dictionary's `/Differences` array.
pub fn differences(doc: &Document, encoding: &Object) -> BTreeMap<u32, char> {
    let mut out = BTreeMap::new();
    let Some(entries) = resolve(doc, encoding)
        .and_then(|e| e.as_dict().ok())
        .and_then(|d| d.get(b"Differences").ok())
        .and_then(|d| resolve(doc, d))
        .and_then(|d| d.as_array().ok())
    else {
        return out;
    };
    let mut next: Option<u32> = None;
    for entry in entries {
        match resolve(doc, entry) {
            Some(Object::Integer(code)) => {
                next = u32::try_from(*code).ok().filter(|c| *c <= 255);
            }
            Some(Object::Name(name)) => {
                if let Some(code) = next {
                    if let Some(ch) = glyph_name_char(name) {
                        out.insert(code, ch);
                    }
                    next = (code < 255).then_some(code + 1);
                }
            }
            _ => {}
        }
    }
    out
}

/// Unicode for an Adobe glyph name: single letters, `uniXXXX`, `uXXXX[XX]` and common
/// punctuation and digit names. Suffixes such as `.sc` are ignored.
pub fn glyph_name_char(name: &[u8]) -> Option<char> {
    let name = std::str::from_utf8(name).ok()?;
    let base = name.split('.').next().unwrap_or(name);
    if let Some(hex) = base.strip_prefix("uni") {
        return hex
            .get(..4)
            .and_then(|h| u32::from_str_radix(h, 16).ok())
            .and_then(char::from_u32);
    }
    if let Some(hex) = base.strip_prefix('u') {
        if (4..=6).contains(&hex.len()) && hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return u32::from_str_radix(hex, 16).ok().and_then(char::from_u32);
        }
    }
    let mut chars = base.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if c.is_ascii_alphabetic() {
            return Some(c);
        }
    }
    GLYPH_NAMES
        .iter()
        .find(|(glyph, _)| *glyph == base)
        .map(|(_, ch)| *ch)
}
