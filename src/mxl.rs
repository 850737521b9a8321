//! MXL file handler — reads compressed MusicXML (.mxl) archives.
//!
//! An .mxl file is a ZIP archive containing:
//!   - META-INF/container.xml  — declares the root MusicXML file path
//!   - <rootfile>.xml          — the actual MusicXML content (e.g., score.xml)
//!   - (optional) other files  — images, sounds, etc.

use std::io::{Cursor, Read};
use zip::ZipArchive;

use crate::error::{Error, Result};
use crate::parser::{self, ImportedScore};

/// Read and import a .mxl file from raw bytes.
pub fn parse_mxl(data: &[u8], slug: &str) -> Result<ImportedScore> {
    let xml = extract_musicxml_from_mxl(data)?;
    parser::parse_musicxml(&xml, slug)
}

/// Extract the MusicXML content string from .mxl bytes.
pub fn extract_musicxml_from_mxl(data: &[u8]) -> Result<String> {
    let mut archive = ZipArchive::new(Cursor::new(data))?;

    let root_file_path = find_root_file(&mut archive)?;
    log::debug!("reading MusicXML root file '{root_file_path}' from archive");

    let mut xml = String::new();
    archive.by_name(&root_file_path)?.read_to_string(&mut xml)?;
    Ok(xml)
}

/// Root file named by META-INF/container.xml, or else the first MusicXML
/// file outside META-INF.
fn find_root_file(archive: &mut ZipArchive<Cursor<&[u8]>>) -> Result<String> {
    let container_xml = match archive.by_name("META-INF/container.xml") {
        Ok(mut file) => {
            let mut xml = String::new();
            file.read_to_string(&mut xml)?;
            Some(xml)
        }
        Err(_) => None,
    };

    if let Some(xml) = container_xml {
        let doc = roxmltree::Document::parse(&xml)?;
        if let Some(path) = doc
            .descendants()
            .filter(|n| n.has_tag_name("rootfile"))
            .find_map(|n| n.attribute("full-path"))
        {
            return Ok(path.to_string());
        }
        log::warn!("container.xml names no rootfile, searching the archive");
    }

    let names: Vec<String> = archive.file_names().map(String::from).collect();
    let found = names
        .iter()
        .find(|name| {
            !name.starts_with("META-INF/")
                && (name.ends_with(".xml") || name.ends_with(".musicxml"))
        })
        .cloned();
    found.ok_or(Error::MissingRootFile(names))
}
