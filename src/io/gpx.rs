//! GPX 1.1 waypoint reading and writing.
//!
//! Only `wpt` elements directly under the root are read, together with their
//! `name` and `desc` children. Everything else in the document is ignored.

use crate::error::{ConvertError, MarkupError, Result};
use crate::waypoint::Waypoint;
use quick_xml::encoding::Decoder;
use quick_xml::escape::{resolve_predefined_entity, unescape};
use quick_xml::events::{BytesDecl, BytesEnd, BytesRef, BytesStart, BytesText, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::{NsReader, Writer};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// GPX 1.1 namespace; waypoint elements must be bound to it.
pub const GPX_NS: &str = "http://www.topografix.com/GPX/1/1";

/// Garmin extensions namespace declared on generated documents.
pub const GPXX_NS: &str = "http://www.garmin.com/xmlschemas/GpxExtensions/v3";

/// Value of the `creator` attribute on generated documents.
pub const CREATOR: &str = "waypoint-convert";

const GPX_ROOT: &str = "gpx";
const GPX_VERSION: &str = "1.1";
const WAYPOINT: &str = "wpt";
const WAYPOINT_NAME: &str = "name";
const WAYPOINT_DESC: &str = "desc";

/// Reads every waypoint from a GPX document.
#[derive(Debug, Clone)]
pub struct GpxReader {
    path: PathBuf,
}

impl GpxReader {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ConvertError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        Ok(GpxReader {
            path: path.to_path_buf(),
        })
    }

    /// Parses the whole document. Any malformed markup fails the read.
    pub fn parse(&self) -> Result<Vec<Waypoint>> {
        info!(path = %self.path.display(), "Parsing GPX");

        let content = fs::read(&self.path).map_err(|source| ConvertError::Io {
            path: self.path.clone(),
            source,
        })?;

        let waypoints = parse_document(&content).map_err(|source| ConvertError::Markup {
            path: self.path.clone(),
            source,
        })?;
        debug!(count = waypoints.len(), "Read waypoints");

        Ok(waypoints)
    }
}

// A `wpt` whose children are still being read.
struct PendingWaypoint {
    waypoint: Waypoint,
    name: Option<String>,
    desc: Option<String>,
}

impl PendingWaypoint {
    // Later `name`/`desc` children overwrite earlier ones.
    fn set_label(&mut self, tag: &[u8], text: Option<String>) {
        match tag {
            b"name" => self.name = text,
            b"desc" => self.desc = text,
            _ => {}
        }
    }

    fn finish(self) -> Waypoint {
        self.waypoint
            .with_name(self.name)
            .with_description(self.desc)
    }
}

fn is_label(tag: &[u8]) -> bool {
    tag == WAYPOINT_NAME.as_bytes() || tag == WAYPOINT_DESC.as_bytes()
}

// Bytes are decoded using the BOM or the declared encoding.
fn parse_document(content: &[u8]) -> std::result::Result<Vec<Waypoint>, MarkupError> {
    let mut reader = NsReader::from_reader(content);

    let mut waypoints = Vec::new();
    let mut pending: Option<PendingWaypoint> = None;
    // Number of currently open elements.
    let mut depth = 0usize;
    let mut seen_root = false;

    loop {
        let (ns, event) = reader.read_resolved_event()?;
        let in_gpx =
            matches!(ns, ResolveResult::Bound(Namespace(uri)) if uri == GPX_NS.as_bytes());

        match event {
            Event::Start(e) => {
                if depth == 0 && seen_root {
                    return Err(MarkupError::MultipleRoots);
                }
                seen_root = true;
                let tag = e.local_name();
                if depth == 1 && in_gpx && tag.as_ref() == WAYPOINT.as_bytes() {
                    let decoder = reader.decoder();
                    pending = Some(PendingWaypoint {
                        waypoint: waypoint_from_element(&e, decoder, waypoints.len())?,
                        name: None,
                        desc: None,
                    });
                } else if depth == 2 && in_gpx && is_label(tag.as_ref()) {
                    if let Some(wpt) = pending.as_mut() {
                        // Consumes the matching end tag, so depth is unchanged.
                        let text = read_label_text(&mut reader)?;
                        wpt.set_label(tag.as_ref(), text);
                        continue;
                    }
                }
                depth += 1;
            }
            Event::Empty(e) => {
                if depth == 0 && seen_root {
                    return Err(MarkupError::MultipleRoots);
                }
                seen_root = true;
                let tag = e.local_name();
                if depth == 1 && in_gpx && tag.as_ref() == WAYPOINT.as_bytes() {
                    let decoder = reader.decoder();
                    waypoints.push(waypoint_from_element(&e, decoder, waypoints.len())?);
                } else if depth == 2 && in_gpx {
                    if let Some(wpt) = pending.as_mut() {
                        wpt.set_label(tag.as_ref(), None);
                    }
                }
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                if depth == 1 {
                    if let Some(wpt) = pending.take() {
                        waypoints.push(wpt.finish());
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_root {
        return Err(MarkupError::NoRoot);
    }
    if depth != 0 {
        return Err(MarkupError::Unclosed);
    }

    Ok(waypoints)
}

// Reads a `name`/`desc` body up to its end tag. Text, CDATA and references
// before the first child element form the label; comments are dropped.
// Empty text means no label.
fn read_label_text(
    reader: &mut NsReader<&[u8]>,
) -> std::result::Result<Option<String>, MarkupError> {
    let mut text = String::new();
    let mut depth = 0usize;
    let mut seen_child = false;

    loop {
        let decoder = reader.decoder();
        match reader.read_event()? {
            Event::Text(t) if depth == 0 && !seen_child => {
                let decoded = decoder.decode(&t).map_err(quick_xml::Error::from)?;
                let unescaped = unescape(&decoded).map_err(quick_xml::Error::from)?;
                text.push_str(&unescaped);
            }
            Event::CData(c) if depth == 0 && !seen_child => {
                text.push_str(&decoder.decode(&c).map_err(quick_xml::Error::from)?);
            }
            Event::GeneralRef(r) if depth == 0 && !seen_child => {
                text.push_str(&resolve_reference(&r, decoder)?);
            }
            Event::Start(_) => {
                seen_child = true;
                depth += 1;
            }
            Event::Empty(_) => seen_child = true,
            Event::End(_) => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
            Event::Eof => return Err(MarkupError::Unclosed),
            _ => {}
        }
    }

    Ok((!text.is_empty()).then_some(text))
}

fn resolve_reference(
    reference: &BytesRef<'_>,
    decoder: Decoder,
) -> std::result::Result<String, MarkupError> {
    if let Some(ch) = reference
        .resolve_char_ref()
        .map_err(quick_xml::Error::from)?
    {
        return Ok(ch.to_string());
    }

    let name = decoder.decode(reference).map_err(quick_xml::Error::from)?;
    resolve_predefined_entity(&name)
        .map(str::to_string)
        .ok_or_else(|| MarkupError::UnknownEntity {
            name: name.into_owned(),
        })
}

fn waypoint_from_element(
    element: &BytesStart<'_>,
    decoder: Decoder,
    index: usize,
) -> std::result::Result<Waypoint, MarkupError> {
    let mut lat = None;
    let mut lon = None;
    for attr in element.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let value = || -> std::result::Result<String, MarkupError> {
            let decoded = decoder.decode(&attr.value).map_err(quick_xml::Error::from)?;
            Ok(unescape(&decoded)
                .map_err(quick_xml::Error::from)?
                .into_owned())
        };
        match attr.key.as_ref() {
            b"lat" => lat = Some(value()?),
            b"lon" => lon = Some(value()?),
            _ => {}
        }
    }

    let lat = lat.ok_or(MarkupError::MissingAttribute {
        index,
        attribute: "lat",
    })?;
    let lon = lon.ok_or(MarkupError::MissingAttribute {
        index,
        attribute: "lon",
    })?;

    Waypoint::from_text(&lat, &lon).map_err(|source| MarkupError::Waypoint { index, source })
}

/// Writes waypoints as a GPX 1.1 document.
#[derive(Debug, Clone)]
pub struct GpxWriter {
    path: PathBuf,
}

impl GpxWriter {
    pub fn new(path: impl AsRef<Path>) -> Self {
        GpxWriter {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn generate(&self, waypoints: &[Waypoint]) -> Result<usize> {
        info!(path = %self.path.display(), "Generating GPX");

        let document = render_document(waypoints).map_err(|source| ConvertError::Render {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, document).map_err(|source| ConvertError::Io {
            path: self.path.clone(),
            source,
        })?;

        Ok(waypoints.len())
    }
}

fn render_document(waypoints: &[Waypoint]) -> quick_xml::Result<Vec<u8>> {
    let mut xml = Writer::new_with_indent(Vec::new(), b' ', 2);

    xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut root = BytesStart::new(GPX_ROOT);
    root.push_attribute(("xmlns", GPX_NS));
    root.push_attribute(("xmlns:gpxx", GPXX_NS));
    root.push_attribute(("version", GPX_VERSION));
    root.push_attribute(("creator", CREATOR));
    xml.write_event(Event::Start(root))?;

    for waypoint in waypoints {
        write_waypoint(&mut xml, waypoint)?;
    }

    xml.write_event(Event::End(BytesEnd::new(GPX_ROOT)))?;

    let mut document = xml.into_inner();
    document.push(b'\n');
    Ok(document)
}

fn write_waypoint(xml: &mut Writer<Vec<u8>>, waypoint: &Waypoint) -> quick_xml::Result<()> {
    let lat = waypoint.latitude().to_string();
    let lon = waypoint.longitude().to_string();

    let mut wpt = BytesStart::new(WAYPOINT);
    wpt.push_attribute(("lat", lat.as_str()));
    wpt.push_attribute(("lon", lon.as_str()));

    // Absent and empty labels produce no child element.
    let labels: Vec<(&str, &str)> = [
        (WAYPOINT_NAME, waypoint.name()),
        (WAYPOINT_DESC, waypoint.description()),
    ]
    .into_iter()
    .filter_map(|(tag, text)| text.filter(|t| !t.is_empty()).map(|t| (tag, t)))
    .collect();

    if labels.is_empty() {
        xml.write_event(Event::Empty(wpt))?;
        return Ok(());
    }

    xml.write_event(Event::Start(wpt))?;
    for (tag, text) in labels {
        xml.write_event(Event::Start(BytesStart::new(tag)))?;
        xml.write_event(Event::Text(BytesText::new(text)))?;
        xml.write_event(Event::End(BytesEnd::new(tag)))?;
    }
    xml.write_event(Event::End(BytesEnd::new(WAYPOINT)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(body: &str) -> String {
        format!(r#"<?xml version="1.0"?><gpx xmlns="{GPX_NS}" version="1.1">{body}</gpx>"#)
    }

    fn parse(content: &str) -> std::result::Result<Vec<Waypoint>, MarkupError> {
        parse_document(content.as_bytes())
    }

    #[test]
    fn reads_waypoint_without_description() {
        let waypoints =
            parse(&doc(r#"<wpt lat="45.2" lon="10.5"><name>Spot</name></wpt>"#)).unwrap();

        assert_eq!(waypoints.len(), 1);
        assert_eq!(waypoints[0].latitude(), 45.2);
        assert_eq!(waypoints[0].longitude(), 10.5);
        assert_eq!(waypoints[0].name(), Some("Spot"));
        assert_eq!(waypoints[0].description(), None);
    }

    #[test]
    fn last_duplicate_label_wins() {
        let waypoints = parse(&doc(
            r#"<wpt lat="1" lon="2"><name>first</name><desc>d</desc><name>second</name></wpt>"#,
        ))
        .unwrap();
        assert_eq!(waypoints[0].name(), Some("second"));
        assert_eq!(waypoints[0].description(), Some("d"));
    }

    #[test]
    fn unescapes_text_and_attributes() {
        let waypoints = parse(&doc(
            r#"<wpt lat=" 1.5" lon="2"><name>Fish &amp; Chips</name><desc><![CDATA[<b>x</b>]]></desc></wpt>"#,
        ))
        .unwrap();
        assert_eq!(waypoints[0].latitude(), 1.5);
        assert_eq!(waypoints[0].name(), Some("Fish & Chips"));
        assert_eq!(waypoints[0].description(), Some("<b>x</b>"));
    }

    #[test]
    fn ignores_foreign_and_nested_elements() {
        let body = r#"
            <metadata><name>not a waypoint</name></metadata>
            <wpt lat="1" lon="2">
              <extensions><name>nested</name></extensions>
              <other:name xmlns:other="urn:other">foreign</other:name>
            </wpt>
            <rte><wpt lat="9" lon="9"/></rte>
            <wpt lat="3" lon="4"/>
        "#;
        let waypoints = parse(&doc(body)).unwrap();

        assert_eq!(waypoints.len(), 2);
        assert_eq!(waypoints[0].name(), None);
        assert_eq!(waypoints[1].latitude(), 3.0);
    }

    #[test]
    fn empty_labels_are_absent() {
        let waypoints = parse(&doc(
            r#"<wpt lat="1" lon="2"><name></name><desc/></wpt>"#,
        ))
        .unwrap();
        assert_eq!(waypoints[0].name(), None);
        assert_eq!(waypoints[0].description(), None);
    }

    #[test]
    fn unqualified_waypoints_are_ignored() {
        let waypoints = parse(r#"<gpx><wpt lat="1" lon="2"/></gpx>"#).unwrap();
        assert!(waypoints.is_empty());
    }

    #[test]
    fn malformed_documents_fail() {
        assert!(matches!(
            parse(&doc(r#"<wpt lat="1" lon="2"></name>"#)),
            Err(MarkupError::Xml(_))
        ));
        assert!(matches!(parse(""), Err(MarkupError::NoRoot)));
        assert!(parse(&format!(r#"<gpx xmlns="{GPX_NS}"><wpt lat="1" lon="2">"#)).is_err());
    }

    #[test]
    fn bad_coordinates_fail_the_document() {
        assert!(matches!(
            parse(&doc(r#"<wpt lat="1" lon="2"/><wpt lat="north" lon="2"/>"#)),
            Err(MarkupError::Waypoint { index: 1, .. })
        ));
        assert!(matches!(
            parse(&doc(r#"<wpt lon="2"/>"#)),
            Err(MarkupError::MissingAttribute {
                index: 0,
                attribute: "lat"
            })
        ));
    }

    #[test]
    fn byte_order_mark_is_skipped() {
        let content = format!(
            "\u{FEFF}{}",
            doc(r#"<wpt lat="1" lon="2"><name>ééé</name></wpt><wpt lat="3" lon="4"><name>Spot</name></wpt>"#)
        );
        let waypoints = parse(&content).unwrap();

        assert_eq!(waypoints[0].name(), Some("ééé"));
        assert_eq!(waypoints[1].name(), Some("Spot"));
    }

    #[test]
    fn label_text_skips_comments_and_child_elements() {
        let waypoints = parse(&doc(
            r#"<wpt lat="1" lon="2"><name>Spot<!-- draft --></name><desc>Lake<b>bold</b> tail</desc></wpt>"#,
        ))
        .unwrap();
        assert_eq!(waypoints[0].name(), Some("Spot"));
        assert_eq!(waypoints[0].description(), Some("Lake"));

        let only_comment =
            parse(&doc(r#"<wpt lat="1" lon="2"><name><!-- none --></name></wpt>"#)).unwrap();
        assert_eq!(only_comment[0].name(), None);
    }

    #[test]
    fn label_text_joins_text_references_and_cdata() {
        let waypoints = parse(&doc(
            r#"<wpt lat="1" lon="2"><name> a &amp; b </name><desc>x &lt; <![CDATA[<b>]]> caf&#233;</desc></wpt>"#,
        ))
        .unwrap();
        assert_eq!(waypoints[0].name(), Some(" a & b "));
        assert_eq!(waypoints[0].description(), Some("x < <b> café"));
    }

    #[test]
    fn undefined_entity_fails_the_document() {
        assert!(matches!(
            parse(&doc(r#"<wpt lat="1" lon="2"><name>&nbsp;</name></wpt>"#)),
            Err(MarkupError::UnknownEntity { name }) if name == "nbsp"
        ));
    }

    #[test]
    fn second_root_fails_the_document() {
        let content = format!("{}<gpx/>", doc(r#"<wpt lat="1" lon="2"/>"#));
        assert!(matches!(parse(&content), Err(MarkupError::MultipleRoots)));

        let content = format!(r#"{}<wpt lat="3" lon="4"></wpt>"#, doc(""));
        assert!(matches!(parse(&content), Err(MarkupError::MultipleRoots)));
    }

    #[test]
    fn declared_encoding_is_honoured() {
        let mut content = format!(
            r#"<?xml version="1.0" encoding="ISO-8859-1"?><gpx xmlns="{GPX_NS}"><wpt lat="1" lon="2"><name>Caf"#
        )
        .into_bytes();
        content.push(0xE9);
        content.extend_from_slice(b"</name></wpt></gpx>");

        let waypoints = parse_document(&content).unwrap();
        assert_eq!(waypoints[0].name(), Some("Café"));
    }

    #[test]
    fn undeclared_non_utf8_text_fails_the_document() {
        let mut content =
            format!(r#"<gpx xmlns="{GPX_NS}"><wpt lat="1" lon="2"><name>Caf"#).into_bytes();
        content.push(0xE9);
        content.extend_from_slice(b"</name></wpt></gpx>");

        assert!(matches!(parse_document(&content), Err(MarkupError::Xml(_))));
    }

    #[test]
    fn renders_header_and_optional_children() {
        let waypoints = vec![
            Waypoint::new(45.2, 10.5)
                .unwrap()
                .with_name(Some("A & B".to_string()))
                .with_description(Some(String::new())),
            Waypoint::new(-1.0, 2.0).unwrap(),
        ];
        let rendered = String::from_utf8(render_document(&waypoints).unwrap()).unwrap();

        assert!(rendered.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(rendered.contains(&format!(
            r#"<gpx xmlns="{GPX_NS}" xmlns:gpxx="{GPXX_NS}" version="1.1" creator="{CREATOR}">"#
        )));
        assert!(rendered.contains(r#"<wpt lat="45.2" lon="10.5">"#));
        assert!(rendered.contains("<name>A &amp; B</name>"));
        assert!(!rendered.contains("<desc>"));
        assert!(rendered.contains(r#"<wpt lat="-1" lon="2"/>"#));

        let reparsed = parse(&rendered).unwrap();
        assert_eq!(reparsed[0].name(), Some("A & B"));
        assert_eq!(reparsed[0].description(), None);
        assert_eq!(reparsed[1], waypoints[1]);
    }
}
