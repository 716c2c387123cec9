//! DOCX document parser.
//!
//! A DOCX file is a zip package. Relationship, style and core-property parts
//! are small and flat, so they are scanned with `quick-xml` events. The main
//! document part is loaded into a `roxmltree` tree and walked in body order,
//! which is what keeps `<<IMAGE>>` and `<<TABLE>>` markers at their exact
//! reading-order position.

use std::collections::HashMap;
use std::io::{Cursor, Read};

use chrono::{DateTime, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::{NsReader, Reader};
use regex::Regex;
use roxmltree::Node;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::{Error, Result};
use crate::model::{
    DocumentImage, Metadata, SectionNode, SectionTreeBuilder, SourceType, TableRecord, TextPayload,
    UnifiedDocument, IMAGE_MARKER, TABLE_MARKER,
};

use super::options::{ErrorMode, ParseOptions};

const NS_W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_MC: &str = "http://schemas.openxmlformats.org/markup-compatibility/2006";
const NS_CP: &str = "http://schemas.openxmlformats.org/package/2006/metadata/core-properties";
const NS_DC: &str = "http://purl.org/dc/elements/1.1/";
const NS_DCTERMS: &str = "http://purl.org/dc/terms/";

const DEFAULT_MAIN_PART: &str = "word/document.xml";
const OFFICE_DOCUMENT_REL: &str = "/officeDocument";
const IMAGE_REL: &str = "/image";

static HEADING_LEVEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("valid regex"));

/// DOCX document parser.
#[derive(Debug, Clone, Default)]
pub struct DocxParser {
    options: ParseOptions,
}

impl DocxParser {
    /// Create a parser with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a parser with custom options.
    pub fn with_options(options: ParseOptions) -> Self {
        Self { options }
    }

    /// Parse a DOCX package into a unified document.
    ///
    /// Fails with [`Error::InvalidDocx`] when the package cannot be opened
    /// or its main document part is missing or malformed. Problems with a
    /// single image never fail the parse.
    pub fn parse(&self, data: &[u8]) -> Result<UnifiedDocument> {
        let mut package = Package::open(data)?;

        let main_part = package.main_part()?;
        log::debug!("DOCX main part: {}", main_part);
        let xml = package
            .read_string(&main_part)?
            .ok_or_else(|| Error::InvalidDocx(format!("missing main part {}", main_part)))?;

        let relationships =
            self.read_part(&mut package, &rels_path_for(&main_part), parse_relationships)?;
        let styles = self.read_part(&mut package, "word/styles.xml", parse_style_names)?;
        let metadata = self.read_part(&mut package, "docProps/core.xml", parse_core_properties)?;

        let tree = roxmltree::Document::parse(&xml)
            .map_err(|e| Error::InvalidDocx(format!("{}: {}", main_part, e)))?;
        let body = tree
            .root_element()
            .children()
            .find(|n| is_w(*n, "body"))
            .ok_or_else(|| Error::InvalidDocx(format!("{} has no body", main_part)))?;

        let walk = BodyWalk::run(body, &styles);

        let images = if self.options.extract_images {
            let base_dir = parent_dir(&main_part);
            self.extract_images(&mut package, &relationships, base_dir, &walk.image_refs)
        } else {
            Vec::new()
        };

        log::debug!(
            "DOCX: {} stream entries, {} tables, {} images",
            walk.stream.len(),
            walk.tables.len(),
            images.len()
        );

        Ok(UnifiedDocument::new(
            SourceType::Docx,
            metadata,
            walk.sections,
            TextPayload::from_paragraphs(walk.stream),
            walk.tables,
            images,
        ))
    }

    /// Read and parse an optional part. A missing part yields the default.
    fn read_part<T: Default>(
        &self,
        package: &mut Package<'_>,
        name: &str,
        parse: fn(&str) -> Result<T>,
    ) -> Result<T> {
        let parsed = package
            .read_string(name)
            .and_then(|xml| xml.map_or_else(|| Ok(T::default()), |xml| parse(&xml)));
        self.degrade_or(parsed, name)
    }

    fn degrade_or<T: Default>(&self, result: Result<T>, part: &str) -> Result<T> {
        match result {
            Ok(value) => Ok(value),
            Err(e) => match self.options.error_mode {
                ErrorMode::Strict => Err(e),
                ErrorMode::Lenient => {
                    log::warn!("Ignoring unreadable {}: {}", part, e);
                    Ok(T::default())
                }
            },
        }
    }

    fn extract_images(
        &self,
        package: &mut Package<'_>,
        relationships: &[Relationship],
        base_dir: &str,
        referenced: &HashMap<String, usize>,
    ) -> Vec<DocumentImage> {
        let mut images = Vec::new();

        for rel in relationships.iter().filter(|r| r.is_image()) {
            let target = resolve_target(base_dir, &rel.target);
            let mut image = match package.read_bytes(&target) {
                Ok(Some(bytes)) => self.decode_image(&rel.id, &bytes),
                Ok(None) => {
                    log::warn!("Image part {} for {} is missing", target, rel.id);
                    DocumentImage::placeholder(image_id(&rel.id)).with_meta("size_bytes", 0)
                }
                Err(e) => {
                    log::warn!("Image part {} for {} unreadable: {}", target, rel.id, e);
                    DocumentImage::placeholder(image_id(&rel.id)).with_meta("size_bytes", 0)
                }
            };

            image = image
                .with_meta("relationship_id", rel.id.clone())
                .with_meta("target", target);
            if let Some(&index) = referenced.get(&rel.id) {
                image = image.with_meta("stream_index", index);
            }
            images.push(image);
        }

        images
    }

    fn decode_image(&self, rel_id: &str, bytes: &[u8]) -> DocumentImage {
        let mut image = match probe_image(bytes) {
            Ok((mime, width, height)) => {
                DocumentImage::new(image_id(rel_id), mime).with_dimensions(width, height)
            }
            Err(e) => {
                log::warn!("Image {} kept as placeholder: {}", rel_id, e);
                DocumentImage::placeholder(image_id(rel_id))
            }
        };
        if self.options.include_image_data {
            image = image.with_payload(bytes);
        }
        image.with_meta("size_bytes", bytes.len())
    }
}

fn image_id(rel_id: &str) -> String {
    format!("docx-image-{}", rel_id)
}

/// Read the format and pixel size of an encoded image.
fn probe_image(bytes: &[u8]) -> Result<(String, u32, u32)> {
    let reader = image::ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    let format = reader
        .format()
        .ok_or_else(|| Error::ImageDecode("unrecognized image format".to_string()))?;
    let (width, height) = reader.into_dimensions()?;
    Ok((format.to_mime_type().to_string(), width, height))
}

// ---------------------------------------------------------------------------
// Package access
// ---------------------------------------------------------------------------

struct Package<'a> {
    archive: ZipArchive<Cursor<&'a [u8]>>,
}

impl<'a> Package<'a> {
    fn open(data: &'a [u8]) -> Result<Self> {
        let archive = ZipArchive::new(Cursor::new(data))
            .map_err(|e| Error::InvalidDocx(format!("not a zip package: {}", e)))?;
        Ok(Self { archive })
    }

    fn read_bytes(&mut self, name: &str) -> Result<Option<Vec<u8>>> {
        let name = name.trim_start_matches('/');
        let mut file = match self.archive.by_name(name) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut bytes = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut bytes)?;
        Ok(Some(bytes))
    }

    fn read_string(&mut self, name: &str) -> Result<Option<String>> {
        match self.read_bytes(name)? {
            Some(bytes) => decode_part(&bytes)
                .map(Some)
                .map_err(|e| Error::InvalidDocx(format!("{} is not readable text: {}", name, e))),
            None => Ok(None),
        }
    }

    /// Locate the main document part through the package relationships.
    fn main_part(&mut self) -> Result<String> {
        let Some(rels) = self.read_string("_rels/.rels")? else {
            return Ok(DEFAULT_MAIN_PART.to_string());
        };
        let main = parse_relationships(&rels)
            .ok()
            .and_then(|rels| {
                rels.into_iter()
                    .find(|r| r.rel_type.ends_with(OFFICE_DOCUMENT_REL) && !r.external)
            })
            .map(|r| resolve_target("", &r.target));
        Ok(main.unwrap_or_else(|| DEFAULT_MAIN_PART.to_string()))
    }
}

/// XML parts are UTF-8 unless they open with a UTF-16 byte-order mark.
fn decode_part(bytes: &[u8]) -> std::result::Result<String, String> {
    match bytes {
        [0xFF, 0xFE, rest @ ..] => {
            String::from_utf16(&utf16_units(rest, u16::from_le_bytes)).map_err(|e| e.to_string())
        }
        [0xFE, 0xFF, rest @ ..] => {
            String::from_utf16(&utf16_units(rest, u16::from_be_bytes)).map_err(|e| e.to_string())
        }
        [0xEF, 0xBB, 0xBF, rest @ ..] | rest => std::str::from_utf8(rest)
            .map(str::to_string)
            .map_err(|e| e.to_string()),
    }
}

fn utf16_units(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> Vec<u16> {
    bytes.chunks_exact(2).map(|c| unit([c[0], c[1]])).collect()
}

/// Relationships part that belongs to a given part.
fn rels_path_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}

fn parent_dir(part: &str) -> &str {
    part.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// Resolve a relationship target against the source part's directory.
fn resolve_target(base_dir: &str, target: &str) -> String {
    let joined = match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None if base_dir.is_empty() => target.to_string(),
        None => format!("{}/{}", base_dir, target),
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
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

// ---------------------------------------------------------------------------
// Flat parts (quick-xml)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
struct Relationship {
    id: String,
    rel_type: String,
    target: String,
    external: bool,
}

impl Relationship {
    fn is_image(&self) -> bool {
        self.rel_type.ends_with(IMAGE_REL) && !self.external
    }
}

fn attr_value(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .map(|a| String::from_utf8_lossy(&a.value).to_string())
}

/// Parse a relationships part, keeping document order.
fn parse_relationships(xml: &str) -> Result<Vec<Relationship>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut relationships = Vec::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Empty(e) | Event::Start(e) if e.name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(target)) = (attr_value(&e, b"Id"), attr_value(&e, b"Target"))
                {
                    relationships.push(Relationship {
                        id,
                        rel_type: attr_value(&e, b"Type").unwrap_or_default(),
                        target,
                        external: attr_value(&e, b"TargetMode")
                            .is_some_and(|m| m.eq_ignore_ascii_case("External")),
                    });
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(relationships)
}

fn attr_local(e: &BytesStart<'_>, local: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == local)
        .map(|a| String::from_utf8_lossy(&a.value).to_string())
}

fn bound_namespace<'a>(ns: &ResolveResult<'a>) -> Option<&'a [u8]> {
    match ns {
        ResolveResult::Bound(Namespace(uri)) => Some(*uri),
        _ => None,
    }
}

/// Map paragraph style ids to their display names.
///
/// Elements are matched by namespace, so any prefix bound to the
/// WordprocessingML namespace is accepted.
fn parse_style_names(xml: &str) -> Result<HashMap<String, String>> {
    let mut reader = NsReader::from_str(xml);
    reader.trim_text(true);

    let mut names = HashMap::new();
    let mut current: Option<String> = None;
    let mut buf = Vec::new();
    loop {
        let (ns, event) = reader.read_resolved_event_into(&mut buf)?;
        let in_w = bound_namespace(&ns) == Some(NS_W.as_bytes());
        match event {
            Event::Start(e) if in_w && e.local_name().as_ref() == b"style" => {
                current = attr_local(&e, b"styleId");
            }
            Event::Empty(e) if in_w && e.local_name().as_ref() == b"name" => {
                if let (Some(id), Some(name)) = (current.as_ref(), attr_local(&e, b"val")) {
                    names.insert(id.clone(), name);
                }
            }
            Event::End(e) if in_w && e.local_name().as_ref() == b"style" => current = None,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(names)
}

/// Read `docProps/core.xml` into metadata.
fn parse_core_properties(xml: &str) -> Result<Metadata> {
    let mut reader = NsReader::from_str(xml);
    reader.trim_text(true);

    let mut metadata = Metadata::new();
    let mut current: Option<&'static str> = None;
    let mut buf = Vec::new();
    loop {
        let (ns, event) = reader.read_resolved_event_into(&mut buf)?;
        match event {
            Event::Start(e) => {
                current = bound_namespace(&ns)
                    .and_then(|uri| core_key(uri, e.local_name().as_ref()));
            }
            Event::Text(e) => {
                if let Some(key) = current {
                    let text = e.unescape()?.to_string();
                    match key {
                        "created" | "modified" => metadata.set_text(key, Some(normalize_date(&text))),
                        _ => metadata.set_text(key, Some(text)),
                    }
                }
            }
            Event::End(_) => current = None,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(metadata)
}

fn core_key(namespace: &[u8], local: &[u8]) -> Option<&'static str> {
    let key = if namespace == NS_DC.as_bytes() {
        match local {
            b"creator" => "author",
            b"description" => "comments",
            b"subject" => "subject",
            b"title" => "title",
            _ => return None,
        }
    } else if namespace == NS_DCTERMS.as_bytes() {
        match local {
            b"created" => "created",
            b"modified" => "modified",
            _ => return None,
        }
    } else if namespace == NS_CP.as_bytes() {
        match local {
            b"lastModifiedBy" => "last_modified_by",
            b"category" => "category",
            b"keywords" => "keywords",
            _ => return None,
        }
    } else {
        return None;
    };
    Some(key)
}

/// W3CDTF timestamps become RFC 3339 in UTC; anything else is kept as is.
fn normalize_date(raw: &str) -> String {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| {
            dt.with_timezone(&Utc)
                .to_rfc3339_opts(SecondsFormat::Secs, true)
        })
        .unwrap_or_else(|_| raw.to_string())
}

// ---------------------------------------------------------------------------
// Body walk (roxmltree)
// ---------------------------------------------------------------------------

fn is_w(node: Node<'_, '_>, local: &str) -> bool {
    node.is_element() && node.tag_name().name() == local && node.tag_name().namespace() == Some(NS_W)
}

/// Classification of a top-level body child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ElementKind {
    Heading(u8),
    BodyText,
    Table,
    Ignored,
}

fn element_kind(node: Node<'_, '_>, styles: &HashMap<String, String>) -> ElementKind {
    if is_w(node, "tbl") {
        return ElementKind::Table;
    }
    if !is_w(node, "p") {
        return ElementKind::Ignored;
    }

    let style_id = node
        .children()
        .find(|n| is_w(*n, "pPr"))
        .and_then(|ppr| ppr.children().find(|n| is_w(*n, "pStyle")))
        .and_then(|s| s.attribute((NS_W, "val")));
    let Some(style_id) = style_id else {
        return ElementKind::BodyText;
    };
    let name = styles.get(style_id).map(String::as_str).unwrap_or(style_id);

    if name.to_lowercase().starts_with("heading") {
        ElementKind::Heading(heading_level(name))
    } else {
        ElementKind::BodyText
    }
}

/// First number in a heading style name, 1 when there is none.
fn heading_level(style_name: &str) -> u8 {
    HEADING_LEVEL
        .find(style_name)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(1)
}

/// Text of one paragraph, with and without image markers.
#[derive(Debug, Default)]
struct ParagraphContent {
    plain: String,
    marked: String,
    image_refs: Vec<String>,
}

impl ParagraphContent {
    fn collect(paragraph: Node<'_, '_>) -> Self {
        let mut content = Self::default();
        content.walk(paragraph);
        content
    }

    fn walk(&mut self, container: Node<'_, '_>) {
        for child in container.children().filter(|n| n.is_element()) {
            if child.tag_name().namespace() != Some(NS_W) {
                continue;
            }
            match child.tag_name().name() {
                "r" => self.run(child),
                "hyperlink" | "ins" | "smartTag" | "fldSimple" | "sdt" | "sdtContent"
                | "customXml" => self.walk(child),
                _ => {}
            }
        }
    }

    fn run(&mut self, run: Node<'_, '_>) {
        let mut has_drawing = false;
        for child in run.children().filter(|n| n.is_element()) {
            let tag = child.tag_name();
            match (tag.namespace(), tag.name()) {
                (Some(NS_W), "t") => self.push_text(child.text().unwrap_or("")),
                (Some(NS_W), "tab") => self.push_text("\t"),
                (Some(NS_W), "br") | (Some(NS_W), "cr") => self.push_text("\n"),
                (Some(NS_W), "drawing") | (Some(NS_W), "pict") | (Some(NS_MC), "AlternateContent") => {
                    has_drawing = true;
                    self.collect_refs(child);
                }
                _ => {}
            }
        }
        if has_drawing {
            self.marked.push('\n');
            self.marked.push_str(IMAGE_MARKER);
            self.marked.push('\n');
        }
    }

    fn push_text(&mut self, text: &str) {
        self.plain.push_str(text);
        self.marked.push_str(text);
    }

    fn collect_refs(&mut self, drawing: Node<'_, '_>) {
        for node in drawing.descendants().filter(|n| n.is_element()) {
            let rel = node
                .attribute((NS_R, "embed"))
                .or_else(|| node.attribute((NS_R, "id")));
            if let Some(rel) = rel {
                if !self.image_refs.iter().any(|r| r == rel) {
                    self.image_refs.push(rel.to_string());
                }
            }
        }
    }
}

/// Everything produced by one pass over the body.
#[derive(Debug, Default)]
struct BodyWalk {
    stream: Vec<String>,
    sections: Vec<SectionNode>,
    tables: Vec<TableRecord>,
    image_refs: HashMap<String, usize>,
}

impl BodyWalk {
    fn run(body: Node<'_, '_>, styles: &HashMap<String, String>) -> Self {
        let mut walk = Self::default();
        let mut tree = SectionTreeBuilder::new();

        for child in body.children().filter(|n| n.is_element()) {
            match element_kind(child, styles) {
                ElementKind::Table => {
                    let id = format!("table-{}", walk.tables.len() + 1);
                    walk.tables.push(TableRecord::from_grid(id, table_grid(child)));
                    walk.stream.push(TABLE_MARKER.to_string());
                }
                ElementKind::Heading(level) => {
                    let content = ParagraphContent::collect(child);
                    let title = content.plain.trim();
                    if !title.is_empty() {
                        tree.open(title, level);
                    }
                    walk.push_paragraph(content);
                }
                ElementKind::BodyText => {
                    let content = ParagraphContent::collect(child);
                    let text = content.plain.trim();
                    if !text.is_empty() {
                        tree.push_paragraph(text);
                    }
                    walk.push_paragraph(content);
                }
                ElementKind::Ignored => {}
            }
        }

        walk.sections = tree.finish();
        walk
    }

    fn push_paragraph(&mut self, content: ParagraphContent) {
        let entry = content.marked.trim();
        if entry.is_empty() {
            return;
        }
        let index = self.stream.len();
        for rel in content.image_refs {
            self.image_refs.entry(rel).or_insert(index);
        }
        self.stream.push(entry.to_string());
    }
}

/// Cell text grid of a table; spanned cells are repeated per grid column.
fn table_grid(table: Node<'_, '_>) -> Vec<Vec<String>> {
    table
        .children()
        .filter(|n| is_w(*n, "tr"))
        .map(|row| {
            let mut cells = Vec::new();
            for cell in row.children().filter(|n| is_w(*n, "tc")) {
                let text = cell_text(cell);
                for _ in 1..grid_span(cell) {
                    cells.push(text.clone());
                }
                cells.push(text);
            }
            cells
        })
        .collect()
}

fn grid_span(cell: Node<'_, '_>) -> usize {
    cell.children()
        .find(|n| is_w(*n, "tcPr"))
        .and_then(|pr| pr.children().find(|n| is_w(*n, "gridSpan")))
        .and_then(|span| span.attribute((NS_W, "val")))
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(1)
        .max(1)
}

/// Paragraph text of a cell; a nested table becomes a table marker.
fn cell_text(cell: Node<'_, '_>) -> String {
    let parts: Vec<String> = cell
        .children()
        .filter_map(|child| {
            if is_w(child, "p") {
                Some(ParagraphContent::collect(child).plain)
            } else if is_w(child, "tbl") {
                Some(TABLE_MARKER.to_string())
            } else {
                None
            }
        })
        .collect();
    parts.join("\n").trim().to_string()
}
