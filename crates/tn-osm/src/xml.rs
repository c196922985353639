//! OSM XML (`.osm`) reader.
//!
//! Reads `<node>` and `<way>` elements (with their `<nd ref>` and
//! `<tag k v>` children) into a [`RawDocument`].  Relations, bounds, and node
//! tags are skipped; nothing downstream uses them.

use std::collections::HashMap;
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use tn_core::{OsmNodeId, OwnerId, WayId};

use crate::document::{EntityMeta, RawDocument, RawNode, RawWay};
use crate::{IngestError, IngestResult};

/// Read an `.osm` XML file from disk.
pub fn read_osm_xml_file(path: &Path) -> IngestResult<RawDocument> {
    let text = std::fs::read_to_string(path)?;
    read_osm_xml(&text)
}

/// Parse an OSM XML document held in memory.
///
/// # Errors
///
/// [`IngestError::MalformedDocument`] on XML syntax errors and on entities
/// whose `id`, `lat`, `lon`, or `ref` attributes are missing or not numbers.
/// Absent `changeset`/`timestamp` attributes are *not* an error here; they
/// surface at ingestion.
pub fn read_osm_xml(text: &str) -> IngestResult<RawDocument> {
    let mut reader = Reader::from_str(text);
    reader.trim_text(true);

    let mut doc = RawDocument::default();
    let mut current_way: Option<RawWay> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            IngestError::MalformedDocument(format!(
                "XML error at byte {}: {e}",
                reader.buffer_position()
            ))
        })?;

        match event {
            Event::Eof => break,
            Event::Start(e) => open_element(&e, false, &mut doc, &mut current_way)?,
            Event::Empty(e) => open_element(&e, true, &mut doc, &mut current_way)?,
            Event::End(e) => {
                if e.name().as_ref() == b"way" {
                    if let Some(way) = current_way.take() {
                        doc.ways.push(way);
                    }
                }
            }
            _ => {}
        }
    }

    if current_way.is_some() {
        return Err(IngestError::MalformedDocument("unterminated <way> element".into()));
    }

    log::debug!(
        "read OSM XML: {} nodes, {} ways",
        doc.nodes.len(),
        doc.ways.len()
    );
    Ok(doc)
}

// ── Element handlers ──────────────────────────────────────────────────────────

fn open_element(
    e: &BytesStart<'_>,
    self_closing: bool,
    doc: &mut RawDocument,
    current_way: &mut Option<RawWay>,
) -> IngestResult<()> {
    match e.name().as_ref() {
        b"node" => {
            let attrs = attributes(e)?;
            doc.nodes.push(RawNode {
                id:   required(&attrs, "node", "id")?,
                lon:  required(&attrs, "node", "lon")?,
                lat:  required(&attrs, "node", "lat")?,
                meta: meta(&attrs),
            });
        }
        b"way" => {
            let attrs = attributes(e)?;
            let way = RawWay {
                id:    WayId(required(&attrs, "way", "id")?),
                owner: optional::<i64>(&attrs, "uid").map(OwnerId),
                refs:  Vec::new(),
                tags:  HashMap::new(),
                meta:  meta(&attrs),
            };
            if self_closing {
                doc.ways.push(way);
            } else {
                *current_way = Some(way);
            }
        }
        b"nd" => {
            if let Some(way) = current_way.as_mut() {
                let attrs = attributes(e)?;
                way.refs.push(OsmNodeId(required(&attrs, "nd", "ref")?));
            }
        }
        b"tag" => {
            // Node and relation tags are not needed.
            if let Some(way) = current_way.as_mut() {
                let mut attrs = attributes(e)?;
                if let (Some(k), Some(v)) = (attrs.remove("k"), attrs.remove("v")) {
                    way.tags.insert(k, v);
                }
            }
        }
        _ => {}
    }
    Ok(())
}

// ── Attribute helpers ─────────────────────────────────────────────────────────

fn attributes(e: &BytesStart<'_>) -> IngestResult<HashMap<String, String>> {
    let mut out = HashMap::new();
    for attr in e.attributes().with_checks(false) {
        let attr = attr.map_err(|err| IngestError::MalformedDocument(err.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| IngestError::MalformedDocument(err.to_string()))?
            .into_owned();
        out.insert(key, value);
    }
    Ok(out)
}

fn required<T: std::str::FromStr>(
    attrs: &HashMap<String, String>,
    element: &str,
    key: &str,
) -> IngestResult<T> {
    let raw = attrs.get(key).ok_or_else(|| {
        IngestError::MalformedDocument(format!("<{element}> without {key:?} attribute"))
    })?;
    raw.trim().parse::<T>().map_err(|_| {
        IngestError::MalformedDocument(format!("<{element}> has invalid {key}={raw:?}"))
    })
}

fn optional<T: std::str::FromStr>(attrs: &HashMap<String, String>, key: &str) -> Option<T> {
    attrs.get(key).and_then(|v| v.trim().parse::<T>().ok())
}

fn meta(attrs: &HashMap<String, String>) -> EntityMeta {
    EntityMeta {
        changeset: optional::<i64>(attrs, "changeset"),
        timestamp: attrs.get("timestamp").cloned(),
    }
}
