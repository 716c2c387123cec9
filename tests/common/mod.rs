//! Fixture builders shared by the integration tests.
//!
//! Both builders produce real packages in memory: DOCX through `zip`, PDF
//! through `lopdf`, so the parsers see the same structures they meet in
//! files written by word processors.

#![allow(dead_code)]

use std::io::{Cursor, Write};

use image::{ImageFormat, Rgb, RgbImage};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const IMAGE_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

/// A small PNG with the given dimensions.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| Rgb([(x * 40) as u8, (y * 40) as u8, 128]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

/// Builds a WordprocessingML package body by body element.
#[derive(Default)]
pub struct DocxBuilder {
    body: String,
    images: Vec<(String, String, Vec<u8>)>,
    core: Option<String>,
    overrides: Vec<(String, Vec<u8>)>,
}

impl DocxBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn heading(self, level: u8, text: &str) -> Self {
        self.styled(&format!("Heading{}", level), text)
    }

    /// A paragraph carrying the paragraph style `style_id`.
    pub fn styled(mut self, style_id: &str, text: &str) -> Self {
        self.body.push_str(&format!(
            r#"<w:p><w:pPr><w:pStyle w:val="{}"/></w:pPr><w:r><w:t>{}</w:t></w:r></w:p>"#,
            style_id,
            escape(text)
        ));
        self
    }

    pub fn paragraph(mut self, text: &str) -> Self {
        self.body.push_str(&format!(
            r#"<w:p><w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
            escape(text)
        ));
        self
    }

    /// A paragraph whose only run is a drawing of `rel_id`.
    pub fn image(mut self, rel_id: &str) -> Self {
        self.body.push_str(&format!(
            concat!(
                r#"<w:p><w:r><w:drawing><wp:inline><a:graphic><a:graphicData>"#,
                r#"<pic:pic><pic:blipFill><a:blip r:embed="{}"/></pic:blipFill></pic:pic>"#,
                r#"</a:graphicData></a:graphic></wp:inline></w:drawing></w:r></w:p>"#
            ),
            rel_id
        ));
        self
    }

    pub fn table(mut self, rows: &[&[&str]]) -> Self {
        self.body.push_str("<w:tbl>");
        for row in rows {
            self.body.push_str("<w:tr>");
            for cell in *row {
                self.body.push_str(&format!(
                    "<w:tc><w:p><w:r><w:t>{}</w:t></w:r></w:p></w:tc>",
                    escape(cell)
                ));
            }
            self.body.push_str("</w:tr>");
        }
        self.body.push_str("</w:tbl>");
        self
    }

    /// Register an image part under `word/media/{name}`.
    pub fn media(mut self, rel_id: &str, name: &str, bytes: Vec<u8>) -> Self {
        self.images.push((rel_id.to_string(), name.to_string(), bytes));
        self
    }

    pub fn core(mut self, title: &str, author: &str, created: &str) -> Self {
        self.core = Some(format!(
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
                r#"<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" "#,
                r#"xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" "#,
                r#"xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">"#,
                r#"<dc:title>{}</dc:title><dc:creator>{}</dc:creator>"#,
                r#"<dcterms:created xsi:type="dcterms:W3CDTF">{}</dcterms:created>"#,
                r#"</cp:coreProperties>"#
            ),
            escape(title),
            escape(author),
            created
        ));
        self
    }

    /// Replace the bytes of a generated part, e.g. `word/styles.xml`.
    pub fn override_part(mut self, name: &str, bytes: Vec<u8>) -> Self {
        self.overrides.push((name.to_string(), bytes));
        self
    }

    pub fn document_xml(&self) -> String {
        format!(
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
                r#"<w:document xmlns:w="{}" xmlns:r="{}" "#,
                r#"xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing" "#,
                r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#,
                r#"xmlns:pic="http://schemas.openxmlformats.org/drawingml/2006/picture">"#,
                r#"<w:body>{}<w:sectPr/></w:body></w:document>"#
            ),
            W_NS, R_NS, self.body
        )
    }

    pub fn build(&self) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();

        let overrides = &self.overrides;
        let mut part = |name: &str, data: &[u8]| {
            let data = overrides
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, bytes)| bytes.as_slice())
                .unwrap_or(data);
            zip.start_file(name, options).unwrap();
            zip.write_all(data).unwrap();
        };

        part("[Content_Types].xml", CONTENT_TYPES.as_bytes());
        part("_rels/.rels", PACKAGE_RELS.as_bytes());
        part("word/document.xml", self.document_xml().as_bytes());
        part("word/styles.xml", STYLES.as_bytes());

        let mut rels = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        rels.push_str(
            r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#,
        );
        for (rel_id, name, _) in &self.images {
            rels.push_str(&format!(
                r#"<Relationship Id="{}" Type="{}" Target="media/{}"/>"#,
                rel_id, IMAGE_REL, name
            ));
        }
        rels.push_str("</Relationships>");
        part("word/_rels/document.xml.rels", rels.as_bytes());

        for (_, name, bytes) in &self.images {
            part(&format!("word/media/{}", name), bytes);
        }
        if let Some(core) = &self.core {
            part("docProps/core.xml", core.as_bytes());
        }

        zip.finish().unwrap().into_inner()
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

const CONTENT_TYPES: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
    r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
    r#"<Default Extension="xml" ContentType="application/xml"/>"#,
    r#"<Default Extension="png" ContentType="image/png"/>"#,
    r#"<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>"#,
    r#"</Types>"#
);

const PACKAGE_RELS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>"#,
    r#"<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>"#,
    r#"</Relationships>"#
);

const STYLES: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
    r#"<w:style w:type="paragraph" w:styleId="Normal"><w:name w:val="Normal"/></w:style>"#,
    r#"<w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/></w:style>"#,
    r#"<w:style w:type="paragraph" w:styleId="Heading2"><w:name w:val="heading 2"/></w:style>"#,
    r#"<w:style w:type="paragraph" w:styleId="Heading3"><w:name w:val="heading 3"/></w:style>"#,
    r#"</w:styles>"#
);

/// One line of text placed at an absolute baseline.
#[derive(Clone)]
pub struct TextRun {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub size: f32,
}

/// An RGB image XObject painted into a rectangle.
#[derive(Clone, Copy)]
pub struct ImageBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Clone, Default)]
pub struct PdfPage {
    pub runs: Vec<TextRun>,
    pub image: Option<ImageBox>,
    pub contents: Option<Object>,
}

impl PdfPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, x: f32, y: f32, size: f32, text: &str) -> Self {
        self.runs.push(TextRun {
            text: text.to_string(),
            x,
            y,
            size,
        });
        self
    }

    /// Use `contents` as the page's `/Contents` entry instead of the
    /// generated content stream.
    pub fn contents(mut self, contents: Object) -> Self {
        self.contents = Some(contents);
        self
    }

    pub fn image(mut self, x: f32, y: f32, width: f32, height: f32) -> Self {
        self.image = Some(ImageBox {
            x,
            y,
            width,
            height,
        });
        self
    }
}

/// Builds a letter-size PDF with a Helvetica font and optional images.
#[derive(Default)]
pub struct PdfBuilder {
    pages: Vec<PdfPage>,
    title: Option<String>,
    author: Option<String>,
    created: Option<String>,
}

impl PdfBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, page: PdfPage) -> Self {
        self.pages.push(page);
        self
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn author(mut self, author: &str) -> Self {
        self.author = Some(author.to_string());
        self
    }

    /// Raw `CreationDate` value, e.g. `D:20240115093000+02'00'`.
    pub fn created(mut self, date: &str) -> Self {
        self.created = Some(date.to_string());
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });

        let mut kids = Vec::new();
        for page in &self.pages {
            let mut operations = Vec::new();
            for run in &page.runs {
                operations.push(Operation::new("BT", vec![]));
                operations.push(Operation::new("Tf", vec!["F1".into(), run.size.into()]));
                operations.push(Operation::new("Td", vec![run.x.into(), run.y.into()]));
                operations.push(Operation::new(
                    "Tj",
                    vec![Object::string_literal(run.text.as_str())],
                ));
                operations.push(Operation::new("ET", vec![]));
            }

            let mut resources = dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            };

            if let Some(image) = page.image {
                let samples: Vec<u8> = [255u8, 0, 0, 0, 255, 0, 0, 0, 255, 255, 255, 255].to_vec();
                let image_id = doc.add_object(Stream::new(
                    dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Image",
                        "Width" => 2,
                        "Height" => 2,
                        "ColorSpace" => "DeviceRGB",
                        "BitsPerComponent" => 8,
                    },
                    samples,
                ));
                resources.set("XObject", dictionary! { "Im1" => image_id });

                operations.push(Operation::new("q", vec![]));
                operations.push(Operation::new(
                    "cm",
                    vec![
                        image.width.into(),
                        0.into(),
                        0.into(),
                        image.height.into(),
                        image.x.into(),
                        image.y.into(),
                    ],
                ));
                operations.push(Operation::new("Do", vec![Object::Name(b"Im1".to_vec())]));
                operations.push(Operation::new("Q", vec![]));
            }

            let contents = match &page.contents {
                Some(contents) => contents.clone(),
                None => {
                    let content = Content { operations };
                    let stream = Stream::new(dictionary! {}, content.encode().unwrap());
                    Object::Reference(doc.add_object(stream))
                }
            };

            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Contents" => contents,
                "Resources" => resources,
            });
            kids.push(Object::from(page_id));
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let has_info = self.title.is_some() || self.author.is_some() || self.created.is_some();
        let mut info = lopdf::Dictionary::new();
        if let Some(title) = &self.title {
            info.set("Title", Object::string_literal(title.as_str()));
        }
        if let Some(author) = &self.author {
            info.set("Author", Object::string_literal(author.as_str()));
        }
        if let Some(created) = &self.created {
            info.set("CreationDate", Object::string_literal(created.as_str()));
        }
        if has_info {
            let info_id = doc.add_object(info);
            doc.trailer.set("Info", info_id);
        }

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }
}

/// Body lines at 12pt, one per 16pt of vertical space, starting at `y`.
pub fn prose(mut page: PdfPage, y: f32, lines: &[&str]) -> PdfPage {
    for (i, line) in lines.iter().enumerate() {
        page = page.text(72.0, y - 16.0 * i as f32, 12.0, line);
    }
    page
}
