//! Result-document text extraction.
//!
//! Award results arrive as PDFs, plain-text/CSV files, or ZIP archives that
//! bundle several of those, sometimes an archive inside an archive. A
//! corrupt entry contributes nothing rather than failing the record: the
//! caller's minimum-text gate then routes it to the terminal confirmed-empty
//! state instead of leaving it perpetually pending.

use std::io::{Cursor, Read};

use tracing::warn;

/// Archives nested deeper than this are abandoned.
const MAX_ARCHIVE_DEPTH: usize = 3;

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const PDF_MAGIC: &[u8] = b"%PDF";

/// Extract all text reachable from one downloaded document.
pub fn document_text(bytes: &[u8], name_hint: &str) -> String {
    collect_text(bytes, name_hint, 0)
}

fn collect_text(bytes: &[u8], name_hint: &str, depth: usize) -> String {
    if bytes.starts_with(ZIP_MAGIC) {
        if depth >= MAX_ARCHIVE_DEPTH {
            warn!(name = name_hint, depth, "archive nesting limit reached");
            return String::new();
        }
        return archive_text(bytes, name_hint, depth);
    }

    if bytes.starts_with(PDF_MAGIC) || has_extension(name_hint, "pdf") {
        return pdf_text(bytes, name_hint);
    }

    plain_text(bytes)
}

fn archive_text(bytes: &[u8], name_hint: &str, depth: usize) -> String {
    let mut archive = match zip::ZipArchive::new(Cursor::new(bytes)) {
        Ok(archive) => archive,
        Err(err) => {
            warn!(name = name_hint, error = %err, "unreadable archive");
            return String::new();
        }
    };

    let mut out = String::new();
    for index in 0..archive.len() {
        let mut entry = match archive.by_index(index) {
            Ok(entry) => entry,
            Err(err) => {
                warn!(name = name_hint, index, error = %err, "unreadable archive entry");
                continue;
            }
        };
        if entry.is_dir() {
            continue;
        }
        let entry_name = entry.name().to_string();
        let mut entry_bytes = Vec::new();
        if let Err(err) = entry.read_to_end(&mut entry_bytes) {
            warn!(name = %entry_name, error = %err, "archive entry read failed");
            continue;
        }
        let text = collect_text(&entry_bytes, &entry_name, depth + 1);
        if !text.is_empty() {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&text);
        }
    }
    out
}

fn pdf_text(bytes: &[u8], name_hint: &str) -> String {
    match pdf_extract::extract_text_from_mem(bytes) {
        Ok(text) => text,
        Err(err) => {
            warn!(name = name_hint, error = %err, "pdf text extraction failed");
            String::new()
        }
    }
}

/// Plain entries are UTF-8 when we are lucky and Shift_JIS when we are not.
fn plain_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            let (text, _, had_errors) = encoding_rs::SHIFT_JIS.decode(bytes);
            if had_errors {
                // Binary we do not recognize; there is no text to offer.
                String::new()
            } else {
                text.into_owned()
            }
        }
    }
}

fn has_extension(name: &str, ext: &str) -> bool {
    name.rsplit('.')
        .next()
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}
