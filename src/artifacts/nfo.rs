use super::{cover_extension, ArtifactError, SidecarWriter};
use crate::api::Metadata;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::debug;

const DURATION_UNIT: &str = "分鐘";

/// Kodi-style `<movie>` NFO writer
#[derive(Debug, Clone, Default)]
pub struct NfoWriter;

impl SidecarWriter for NfoWriter {
    fn generate_sidecar(&self, metadata: &Metadata, output_path: &Path) -> Result<(), ArtifactError> {
        let content = render_nfo(metadata)?;
        fs::write(output_path, content)?;
        debug!(path = ?output_path, "NFO written");
        Ok(())
    }
}

/// Render the NFO document for `metadata`
pub fn render_nfo(metadata: &Metadata) -> Result<String, ArtifactError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 4);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))
        .map_err(xml_err)?;
    writer
        .write_event(Event::Start(BytesStart::new("movie")))
        .map_err(xml_err)?;

    let ext = cover_extension(&metadata.cover_url);
    let poster = format!("poster{}", ext);
    let fanart = format!("fanart{}", ext);
    let year: String = metadata.release_date.chars().take(4).collect();
    let runtime = metadata.duration.replace(DURATION_UNIT, "");

    text_element(&mut writer, "title", &metadata.title)?;
    text_element(&mut writer, "sorttitle", &metadata.code)?;
    text_element(&mut writer, "num", &metadata.code)?;
    text_element(&mut writer, "studio", &metadata.maker)?;
    text_element(&mut writer, "release", &metadata.release_date)?;
    text_element(&mut writer, "premiered", &metadata.release_date)?;
    text_element(&mut writer, "year", &year)?;
    text_element(&mut writer, "runtime", runtime.trim())?;
    text_element(&mut writer, "rating", &metadata.rating)?;
    text_element(&mut writer, "mpaa", "NC-17")?;
    text_element(&mut writer, "country", "JP")?;
    text_element(&mut writer, "poster", &poster)?;
    text_element(&mut writer, "thumb", &poster)?;
    text_element(&mut writer, "fanart", &fanart)?;

    for actor in &metadata.actors {
        writer
            .write_event(Event::Start(BytesStart::new("actor")))
            .map_err(xml_err)?;
        text_element(&mut writer, "name", actor)?;
        text_element(&mut writer, "role", actor)?;
        writer
            .write_event(Event::End(BytesEnd::new("actor")))
            .map_err(xml_err)?;
    }

    for category in &metadata.categories {
        text_element(&mut writer, "tag", category)?;
    }
    for category in &metadata.categories {
        text_element(&mut writer, "genre", category)?;
    }

    let series = if metadata.series.is_empty() {
        "----"
    } else {
        metadata.series.as_str()
    };
    text_element(&mut writer, "set", series)?;
    text_element(&mut writer, "cover", &metadata.cover_url)?;

    writer
        .write_event(Event::End(BytesEnd::new("movie")))
        .map_err(xml_err)?;

    let mut bytes = writer.into_inner();
    bytes.write_all(b"\n")?;

    String::from_utf8(bytes).map_err(|e| ArtifactError::Xml(e.to_string()))
}

fn text_element<W: Write>(writer: &mut Writer<W>, name: &str, text: &str) -> Result<(), ArtifactError> {
    writer
        .create_element(name)
        .write_text_content(BytesText::new(text))
        .map_err(xml_err)?;
    Ok(())
}

fn xml_err<E: std::fmt::Display>(err: E) -> ArtifactError {
    ArtifactError::Xml(err.to_string())
}
