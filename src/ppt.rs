//! PPT Report Generator Module
//! Writes the dashboard as a PowerPoint deck, one slide per section.
//!
//! The package is assembled directly as ZIP/XML parts: each slide carries a
//! title, the section chart as an embedded PNG (when it has one) and the
//! section prose underneath.

use crate::charts::{RenderError, StaticChartRenderer};
use crate::dashboard::{Dashboard, Section, SectionId};
use rayon::prelude::*;
use std::fs::File;
use std::io::{Seek, Write};
use std::path::Path;
use thiserror::Error;
use zip::write::FileOptions;
use zip::ZipWriter;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("Chart rendering failed: {0}")]
    Render(#[from] RenderError),
}

/// Content of one exported slide.
#[derive(Debug, Clone)]
pub struct ReportSlide {
    pub title: String,
    /// PNG bytes with their pixel size
    pub image: Option<(Vec<u8>, u32, u32)>,
    pub notes: String,
}

impl ReportSlide {
    /// Build a slide for a section, rendering its chart when it has a static image.
    pub fn from_section(section: &Section, width: u32, height: u32) -> Result<Self, RenderError> {
        let image = match &section.chart {
            Some(chart) if chart.is_renderable() => Some((
                StaticChartRenderer::render_png(chart, width, height)?,
                width,
                height,
            )),
            _ => None,
        };

        let title = section.display_title();

        // headings not used as the slide title lead the notes
        let headings = section
            .headings
            .iter()
            .map(|h| h.text.clone())
            .filter(|text| *text != title);
        let prose = [&section.lead, &section.commentary]
            .into_iter()
            .filter(|n| !n.is_empty())
            .map(|n| n.plain_text());
        let notes = headings.chain(prose).collect::<Vec<_>>().join("\n");

        Ok(Self {
            title,
            image,
            notes,
        })
    }
}

/// PPT generator for dashboard reports
pub struct PptGenerator;

/// 914400 EMU = 1 inch
const EMU_PER_INCH: i64 = 914400;
/// 13.333 x 7.5 inch widescreen slide
const SLIDE_WIDTH: i64 = 12192000;
const SLIDE_HEIGHT: i64 = 6858000;

const MARGIN: i64 = EMU_PER_INCH / 2;
const TITLE_TOP: i64 = EMU_PER_INCH / 4;
const TITLE_HEIGHT: i64 = EMU_PER_INCH * 3 / 4;
const IMAGE_TOP: i64 = TITLE_TOP + TITLE_HEIGHT;
const NOTES_HEIGHT: i64 = EMU_PER_INCH * 3 / 2;

const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_P: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
const NS_PKG_REL: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const REL_TYPE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;
const EMPTY_GROUP: &str = r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>"#;

/// Escape text for XML element content and attribute values.
pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// One relationship entry; short kinds live under the officeDocument namespace.
fn rel(id: usize, kind: &str, target: &str) -> (String, String, String) {
    let kind = if kind.starts_with("http") {
        kind.to_string()
    } else {
        format!("{REL_TYPE}/{kind}")
    };
    (format!("rId{id}"), kind, target.to_string())
}

fn relationships(entries: &[(String, String, String)]) -> String {
    let mut xml = format!(r#"{XML_DECL}<Relationships xmlns="{NS_PKG_REL}">"#);
    for (id, kind, target) in entries {
        xml.push_str(&format!(
            r#"<Relationship Id="{id}" Type="{kind}" Target="{target}"/>"#
        ));
    }
    xml.push_str("</Relationships>");
    xml
}

impl PptGenerator {
    /// Render every section and write the deck. Returns the number of slides.
    pub fn export_dashboard(
        dashboard: &Dashboard,
        output_path: &Path,
        width: u32,
        height: u32,
    ) -> Result<usize, ExportError> {
        let slides = dashboard
            .sections
            .par_iter()
            .map(|section| ReportSlide::from_section(section, width, height))
            .collect::<Result<Vec<_>, _>>()?;

        let title = dashboard
            .section(SectionId::Intro)
            .map(Section::display_title)
            .unwrap_or_else(|| "Startup funding dashboard".to_string());

        Self::generate_report(&slides, output_path, &title)?;
        Ok(slides.len())
    }

    /// Write slides to a .pptx file.
    pub fn generate_report(
        slides: &[ReportSlide],
        output_path: &Path,
        title: &str,
    ) -> Result<(), ExportError> {
        let file = File::create(output_path)?;
        Self::write_package(file, slides, title)?;

        let images = slides.iter().filter(|s| s.image.is_some()).count();
        tracing::info!(
            path = %output_path.display(),
            slides = slides.len(),
            images,
            "report written"
        );
        Ok(())
    }

    fn write_package<W: Write + Seek>(
        writer: W,
        slides: &[ReportSlide],
        title: &str,
    ) -> Result<(), ExportError> {
        let mut zip = ZipWriter::new(writer);
        let options = FileOptions::default();
        let slide_count = slides.len();

        let part = |zip: &mut ZipWriter<W>, name: &str, body: &[u8]| -> Result<(), ExportError> {
            zip.start_file(name, options)?;
            zip.write_all(body)?;
            Ok(())
        };

        part(&mut zip, "[Content_Types].xml", Self::content_types_xml(slide_count).as_bytes())?;
        part(&mut zip, "_rels/.rels", Self::root_rels_xml().as_bytes())?;
        part(
            &mut zip,
            "ppt/_rels/presentation.xml.rels",
            Self::presentation_rels_xml(slide_count).as_bytes(),
        )?;
        part(
            &mut zip,
            "ppt/presentation.xml",
            Self::presentation_xml(slide_count).as_bytes(),
        )?;

        let mut image_index = 0;
        for (idx, slide) in slides.iter().enumerate() {
            let number = idx + 1;
            let media = match &slide.image {
                Some((bytes, _, _)) => {
                    image_index += 1;
                    part(
                        &mut zip,
                        &format!("ppt/media/image{image_index}.png"),
                        bytes,
                    )?;
                    Some(image_index)
                }
                None => None,
            };
            part(
                &mut zip,
                &format!("ppt/slides/_rels/slide{number}.xml.rels"),
                Self::slide_rels_xml(media).as_bytes(),
            )?;
            part(
                &mut zip,
                &format!("ppt/slides/slide{number}.xml"),
                Self::slide_xml(slide).as_bytes(),
            )?;
        }

        part(
            &mut zip,
            "ppt/slideLayouts/slideLayout1.xml",
            Self::slide_layout_xml().as_bytes(),
        )?;
        part(
            &mut zip,
            "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
            relationships(&[rel(1, "slideMaster", "../slideMasters/slideMaster1.xml")]).as_bytes(),
        )?;
        part(
            &mut zip,
            "ppt/slideMasters/slideMaster1.xml",
            Self::slide_master_xml().as_bytes(),
        )?;
        part(
            &mut zip,
            "ppt/slideMasters/_rels/slideMaster1.xml.rels",
            relationships(&[
                rel(1, "slideLayout", "../slideLayouts/slideLayout1.xml"),
                rel(2, "theme", "../theme/theme1.xml"),
            ])
            .as_bytes(),
        )?;
        part(&mut zip, "ppt/theme/theme1.xml", Self::theme_xml().as_bytes())?;
        part(&mut zip, "docProps/core.xml", Self::core_props_xml(title).as_bytes())?;
        part(
            &mut zip,
            "docProps/app.xml",
            Self::app_props_xml(slide_count).as_bytes(),
        )?;

        zip.finish()?;
        Ok(())
    }

    fn content_types_xml(slide_count: usize) -> String {
        const OOXML: &str = "application/vnd.openxmlformats-officedocument";
        let mut xml = format!(
            r#"{XML_DECL}<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="png" ContentType="image/png"/>"#
        );
        let overrides = [
            ("/ppt/presentation.xml", format!("{OOXML}.presentationml.presentation.main+xml")),
            ("/ppt/slideMasters/slideMaster1.xml", format!("{OOXML}.presentationml.slideMaster+xml")),
            ("/ppt/slideLayouts/slideLayout1.xml", format!("{OOXML}.presentationml.slideLayout+xml")),
            ("/ppt/theme/theme1.xml", format!("{OOXML}.theme+xml")),
            (
                "/docProps/core.xml",
                "application/vnd.openxmlformats-package.core-properties+xml".to_string(),
            ),
            ("/docProps/app.xml", format!("{OOXML}.extended-properties+xml")),
        ];
        for (part, kind) in overrides {
            xml.push_str(&format!(r#"<Override PartName="{part}" ContentType="{kind}"/>"#));
        }
        for i in 1..=slide_count {
            xml.push_str(&format!(
                r#"<Override PartName="/ppt/slides/slide{i}.xml" ContentType="{OOXML}.presentationml.slide+xml"/>"#
            ));
        }
        xml.push_str("</Types>");
        xml
    }

    fn root_rels_xml() -> String {
        relationships(&[
            rel(1, "officeDocument", "ppt/presentation.xml"),
            rel(
                2,
                "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties",
                "docProps/core.xml",
            ),
            rel(3, "extended-properties", "docProps/app.xml"),
        ])
    }

    /// rId1 is the master, rId2 the theme, slides follow from rId3.
    fn presentation_rels_xml(slide_count: usize) -> String {
        let mut entries = vec![
            rel(1, "slideMaster", "slideMasters/slideMaster1.xml"),
            rel(2, "theme", "theme/theme1.xml"),
        ];
        for i in 1..=slide_count {
            entries.push(rel(i + 2, "slide", &format!("slides/slide{i}.xml")));
        }
        relationships(&entries)
    }

    fn presentation_xml(slide_count: usize) -> String {
        let slide_ids: String = (1..=slide_count)
            .map(|i| format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 255 + i, i + 2))
            .collect();
        format!(
            r#"{XML_DECL}<p:presentation xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}"><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst><p:sldIdLst>{slide_ids}</p:sldIdLst><p:sldSz cx="{SLIDE_WIDTH}" cy="{SLIDE_HEIGHT}"/><p:notesSz cx="{SLIDE_HEIGHT}" cy="{SLIDE_WIDTH}"/></p:presentation>"#
        )
    }

    fn slide_rels_xml(image: Option<usize>) -> String {
        let mut entries = vec![rel(1, "slideLayout", "../slideLayouts/slideLayout1.xml")];
        if let Some(index) = image {
            entries.push(rel(2, "image", &format!("../media/image{index}.png")));
        }
        relationships(&entries)
    }

    /// Image box scaled to fit between the title and the notes, centered.
    fn image_frame(width: u32, height: u32, has_notes: bool) -> (i64, i64, i64, i64) {
        let max_w = SLIDE_WIDTH - 2 * MARGIN;
        let bottom = if has_notes {
            SLIDE_HEIGHT - NOTES_HEIGHT - MARGIN / 2
        } else {
            SLIDE_HEIGHT - MARGIN
        };
        let max_h = bottom - IMAGE_TOP;
        let aspect = width.max(1) as f64 / height.max(1) as f64;

        let (mut w, mut h) = (max_w, (max_w as f64 / aspect) as i64);
        if h > max_h {
            h = max_h;
            w = (max_h as f64 * aspect) as i64;
        }
        ((SLIDE_WIDTH - w) / 2, IMAGE_TOP, w, h)
    }

    fn text_box(id: usize, name: &str, frame: (i64, i64, i64, i64), size: u32, bold: bool, text: &str) -> String {
        let (x, y, w, h) = frame;
        let b = if bold { "1" } else { "0" };
        let paragraphs: String = text
            .lines()
            .map(|line| {
                format!(
                    r#"<a:p><a:r><a:rPr lang="en-US" sz="{size}" b="{b}" dirty="0"/><a:t>{}</a:t></a:r></a:p>"#,
                    escape_xml(line)
                )
            })
            .collect();
        format!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="{name}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr><a:xfrm><a:off x="{x}" y="{y}"/><a:ext cx="{w}" cy="{h}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom><a:noFill/></p:spPr><p:txBody><a:bodyPr wrap="square"><a:normAutofit/></a:bodyPr><a:lstStyle/>{paragraphs}</p:txBody></p:sp>"#
        )
    }

    fn slide_xml(slide: &ReportSlide) -> String {
        let has_notes = !slide.notes.trim().is_empty();
        let mut shapes = Self::text_box(
            2,
            "Title",
            (MARGIN, TITLE_TOP, SLIDE_WIDTH - 2 * MARGIN, TITLE_HEIGHT),
            2800,
            true,
            &slide.title,
        );

        if let Some((_, w, h)) = &slide.image {
            let (x, y, cx, cy) = Self::image_frame(*w, *h, has_notes);
            shapes.push_str(&format!(
                r#"<p:pic><p:nvPicPr><p:cNvPr id="3" name="Chart"/><p:cNvPicPr><a:picLocks noChangeAspect="1"/></p:cNvPicPr><p:nvPr/></p:nvPicPr><p:blipFill><a:blip r:embed="rId2"/><a:stretch><a:fillRect/></a:stretch></p:blipFill><p:spPr><a:xfrm><a:off x="{x}" y="{y}"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr></p:pic>"#
            ));
        }

        if has_notes {
            let top = if slide.image.is_some() {
                SLIDE_HEIGHT - NOTES_HEIGHT - MARGIN / 2
            } else {
                IMAGE_TOP
            };
            shapes.push_str(&Self::text_box(
                4,
                "Notes",
                (MARGIN, top, SLIDE_WIDTH - 2 * MARGIN, SLIDE_HEIGHT - top - MARGIN / 2),
                1400,
                false,
                &slide.notes,
            ));
        }

        format!(
            r#"{XML_DECL}<p:sld xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}"><p:cSld><p:spTree>{EMPTY_GROUP}{shapes}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#
        )
    }

    fn slide_layout_xml() -> String {
        format!(
            r#"{XML_DECL}<p:sldLayout xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}" type="blank" preserve="1"><p:cSld name="Blank"><p:spTree>{EMPTY_GROUP}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>"#
        )
    }

    fn slide_master_xml() -> String {
        format!(
            r#"{XML_DECL}<p:sldMaster xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}"><p:cSld><p:bg><p:bgRef idx="1001"><a:schemeClr val="bg1"/></p:bgRef></p:bg><p:spTree>{EMPTY_GROUP}</p:spTree></p:cSld><p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/><p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/></p:sldLayoutIdLst></p:sldMaster>"#
        )
    }

    /// Minimal theme: plain colors, one font, flat fill/line/effect styles.
    fn theme_xml() -> String {
        let colors: String = [
            ("dk1", "000000"),
            ("lt1", "FFFFFF"),
            ("dk2", "2C3E50"),
            ("lt2", "ECF0F1"),
            ("accent1", "3498DB"),
            ("accent2", "E74C3C"),
            ("accent3", "2ECC71"),
            ("accent4", "F39C12"),
            ("accent5", "9B59B6"),
            ("accent6", "1ABC9C"),
            ("hlink", "2980B9"),
            ("folHlink", "8E44AD"),
        ]
        .iter()
        .map(|(name, rgb)| format!(r#"<a:{name}><a:srgbClr val="{rgb}"/></a:{name}>"#))
        .collect();
        let fill = r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#;
        let line = format!(r#"<a:ln w="9525">{fill}</a:ln>"#);
        let effect = "<a:effectStyle><a:effectLst/></a:effectStyle>";
        format!(
            r#"{XML_DECL}<a:theme xmlns:a="{NS_A}" name="Dashboard"><a:themeElements><a:clrScheme name="Dashboard">{colors}</a:clrScheme><a:fontScheme name="Dashboard"><a:majorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont><a:minorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont></a:fontScheme><a:fmtScheme name="Dashboard"><a:fillStyleLst>{fill}{fill}{fill}</a:fillStyleLst><a:lnStyleLst>{line}{line}{line}</a:lnStyleLst><a:effectStyleLst>{effect}{effect}{effect}</a:effectStyleLst><a:bgFillStyleLst>{fill}{fill}{fill}</a:bgFillStyleLst></a:fmtScheme></a:themeElements></a:theme>"#
        )
    }

    fn core_props_xml(title: &str) -> String {
        format!(
            r#"{XML_DECL}<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/"><dc:title>{}</dc:title><dc:creator>Startup Explorer</dc:creator><cp:revision>1</cp:revision></cp:coreProperties>"#,
            escape_xml(title)
        )
    }

    fn app_props_xml(slide_count: usize) -> String {
        format!(
            r#"{XML_DECL}<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties"><Application>Startup Explorer</Application><PresentationFormat>Widescreen</PresentationFormat><Slides>{slide_count}</Slides></Properties>"#
        )
    }
}
