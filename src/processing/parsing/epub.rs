//! EPUB text extraction.
//!
//! The container manifest points at the OPF package; its spine gives the reading order of the
//! chapter documents, which are stripped of markup and joined in that order.

use std::borrow::Cow;
use std::collections::HashMap;
use std::io::{Cursor, Read};

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use zip::ZipArchive;

use super::markup::{decode_entities, strip_tags};
use crate::processing::types::ParseError;

const CONTAINER_PATH: &str = "META-INF/container.xml";

type Archive<'a> = ZipArchive<Cursor<&'a [u8]>>;

pub(crate) fn extract_text(bytes: &[u8]) -> Result<String, ParseError> {
    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).map_err(|err| ParseError::Epub(err.to_string()))?;

    let container = read_entry(&mut archive, CONTAINER_PATH)?;
    let package_path = find_package_path(&container)
        .ok_or_else(|| ParseError::Epub("container.xml names no rootfile".to_string()))?;
    let package = read_entry(&mut archive, &package_path)?;
    let chapters = reading_order(&package, &package_path)?;

    let mut texts = Vec::with_capacity(chapters.len());
    for chapter in chapters {
        match read_entry(&mut archive, &chapter) {
            Ok(markup) => texts.push(chapter_text(&markup)),
            Err(error) => {
                tracing::warn!(chapter = %chapter, error = %error, "Skipping unreadable EPUB chapter");
            }
        }
    }

    Ok(texts.join(" "))
}

fn read_entry(archive: &mut Archive<'_>, name: &str) -> Result<String, ParseError> {
    let mut entry = archive
        .by_name(name)
        .map_err(|err| ParseError::Epub(format!("{name}: {err}")))?;
    let mut bytes = Vec::new();
    entry.read_to_end(&mut bytes)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn find_package_path(container: &str) -> Option<String> {
    let mut reader = Reader::from_str(container);
    loop {
        match reader.read_event() {
            Ok(Event::Start(element) | Event::Empty(element))
                if element.local_name().as_ref() == b"rootfile" =>
            {
                if let Some(path) = attribute(&element, b"full-path") {
                    return Some(path);
                }
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}

/// Resolve the spine of an OPF package into archive paths, in reading order.
fn reading_order(package: &str, package_path: &str) -> Result<Vec<String>, ParseError> {
    let mut manifest = HashMap::new();
    let mut spine = Vec::new();

    let mut reader = Reader::from_str(package);
    loop {
        match reader.read_event() {
            Ok(Event::Start(element) | Event::Empty(element)) => {
                match element.local_name().as_ref() {
                    b"item" => {
                        if let (Some(id), Some(href)) =
                            (attribute(&element, b"id"), attribute(&element, b"href"))
                        {
                            manifest.insert(id, href);
                        }
                    }
                    b"itemref" => {
                        if let Some(idref) = attribute(&element, b"idref") {
                            spine.push(idref);
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(err) => return Err(ParseError::Epub(format!("{package_path}: {err}"))),
            _ => {}
        }
    }

    let base = package_path
        .rfind('/')
        .map(|index| &package_path[..index])
        .unwrap_or("");

    Ok(spine
        .into_iter()
        .filter_map(|idref| {
            let href = manifest.get(&idref);
            if href.is_none() {
                tracing::debug!(idref = %idref, "Spine entry missing from manifest");
            }
            href.map(|href| resolve_href(base, href))
        })
        .collect())
}

fn attribute(element: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == key)
        .and_then(|attr| attr.unescape_value().ok())
        .map(|value| value.into_owned())
}

/// Archive entry name for a manifest `href`: fragment dropped, percent-escapes decoded.
fn resolve_href(base: &str, href: &str) -> String {
    let href = href.split('#').next().unwrap_or(href);
    let decoded = urlencoding::decode(href).unwrap_or(Cow::Borrowed(href));
    let href = decoded.as_ref();
    let mut segments: Vec<&str> = base.split('/').filter(|segment| !segment.is_empty()).collect();
    for segment in href.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

fn chapter_text(markup: &str) -> String {
    let body = body_of(markup);
    let text = strip_tags(body, " ");
    decode_entities(&text)
}

fn body_of(markup: &str) -> &str {
    let Some(open) = markup.find("<body") else {
        return markup;
    };
    let Some(open_end) = markup[open..].find('>') else {
        return markup;
    };
    let start = open + open_end + 1;
    let end = markup[start..]
        .rfind("</body>")
        .map(|index| start + index)
        .unwrap_or(markup.len());
    &markup[start..end]
}
