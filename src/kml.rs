//! Just enough KML to put colored incident markers on a map.
//!
//! Output is streamed. A document is a set of marker styles followed by one folder of placemarks,
//! and the caller is responsible for closing the folder.

use crate::{geo::Coord, SkaiNetResult};
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

const ICON_HREF: &str = "http://maps.google.com/mapfiles/kml/shapes/placemark_circle.png";

/// A KML document being written to disk.
pub struct KmlFile(BufWriter<File>);

impl KmlFile {
    /// Create the file and write the document header.
    pub fn new<P: AsRef<Path>>(pth: P) -> SkaiNetResult<Self> {
        let f = File::create(pth.as_ref())?;
        let mut new = KmlFile(BufWriter::new(f));
        new.start_document()?;
        Ok(new)
    }

    /// Close the document and flush everything to disk.
    pub fn finish(mut self) -> SkaiNetResult<()> {
        self.finish_document()?;
        self.0.flush()?;
        Ok(())
    }
}

impl KmlWriter for KmlFile {
    fn output(&mut self) -> &mut dyn Write {
        &mut self.0
    }
}

/// Write KML into memory, mostly useful for testing.
impl KmlWriter for Vec<u8> {
    fn output(&mut self) -> &mut dyn Write {
        self
    }
}

/// One marker on the map.
#[derive(Debug, Clone, Copy)]
pub struct Placemark<'a> {
    pub name: &'a str,
    /// HTML, written inside a CDATA section.
    pub description: &'a str,
    /// The id given to `write_marker_style`, without the '#'.
    pub style_id: &'a str,
    pub position: Coord,
}

/// Escape the characters that have special meaning in XML text.
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Convert a CSS "#rrggbb" color into KML's "aabbggrr" order, fully opaque.
pub fn kml_color(css_hex: &str) -> String {
    let hex = css_hex.trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return "ffffffff".to_owned();
    }

    let (r, g, b) = (&hex[0..2], &hex[2..4], &hex[4..6]);
    format!("ff{}{}{}", b, g, r).to_lowercase()
}

pub trait KmlWriter {
    fn output(&mut self) -> &mut dyn Write;

    fn start_document(&mut self) -> SkaiNetResult<()> {
        writeln!(self.output(), r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
        writeln!(self.output(), r#"<kml xmlns="http://www.opengis.net/kml/2.2">"#)?;
        writeln!(self.output(), "<Document>")?;
        Ok(())
    }

    fn finish_document(&mut self) -> SkaiNetResult<()> {
        writeln!(self.output(), "</Document>\n</kml>")?;
        Ok(())
    }

    /**
     * Define a circle marker style that placemarks can refer to by `style_id`.
     *
     * #Arguments
     * * style_id - the id placemarks use, without the '#'.
     * * css_color - the marker color as "#rrggbb".
     */
    fn write_marker_style(&mut self, style_id: &str, css_color: &str) -> SkaiNetResult<()> {
        writeln!(
            self.output(),
            "<Style id=\"{}\"><IconStyle><color>{}</color><scale>1</scale>\
             <Icon><href>{}</href></Icon></IconStyle></Style>",
            escape(style_id),
            kml_color(css_color),
            ICON_HREF
        )?;
        Ok(())
    }

    /// Open a folder, shown expanded.
    fn start_folder(&mut self, name: &str) -> SkaiNetResult<()> {
        writeln!(self.output(), "<Folder>\n<name>{}</name>\n<open>1</open>", escape(name))?;
        Ok(())
    }

    fn finish_folder(&mut self) -> SkaiNetResult<()> {
        writeln!(self.output(), "</Folder>")?;
        Ok(())
    }

    fn write_placemark(&mut self, mark: &Placemark) -> SkaiNetResult<()> {
        let out = self.output();

        writeln!(out, "<Placemark>")?;
        writeln!(out, "<name>{}</name>", escape(mark.name))?;
        writeln!(
            out,
            "<description><![CDATA[{}]]></description>",
            mark.description.replace("]]>", "]]&gt;")
        )?;
        writeln!(out, "<styleUrl>#{}</styleUrl>", escape(mark.style_id))?;
        // KML wants longitude first.
        writeln!(
            out,
            "<Point><coordinates>{},{},0</coordinates></Point>",
            mark.position.longitude, mark.position.latitude
        )?;
        writeln!(out, "</Placemark>")?;

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(escape("a < b & c"), "a &lt; b &amp; c");
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn test_kml_color() {
        assert_eq!(kml_color("#ef4444"), "ff4444ef");
        assert_eq!(kml_color("#10B981"), "ff81b910");
        assert_eq!(kml_color("red"), "ffffffff");
    }

    #[test]
    fn test_placemark() {
        let mut buf: Vec<u8> = vec![];
        buf.write_placemark(&Placemark {
            name: "A & B",
            description: "<b>hi</b>",
            style_id: "Critical",
            position: Coord::new(1.5, 2.5),
        })
        .unwrap();

        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("<name>A &amp; B</name>"));
        assert!(text.contains("<![CDATA[<b>hi</b>]]>"));
        assert!(text.contains("<styleUrl>#Critical</styleUrl>"));
        assert!(text.contains("<coordinates>2.5,1.5,0</coordinates>"));
    }

    #[test]
    fn test_marker_style() {
        let mut buf: Vec<u8> = vec![];
        buf.write_marker_style("Warning", "#f59e0b").unwrap();

        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains(r#"<Style id="Warning">"#));
        assert!(text.contains("<color>ff0b9ef5</color>"));
    }

    #[test]
    fn test_file_is_closed_on_finish() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.kml");

        let mut kml = KmlFile::new(&path).unwrap();
        kml.start_folder("empty").unwrap();
        kml.finish_folder().unwrap();
        kml.finish().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("<?xml"));
        assert!(text.trim_end().ends_with("</kml>"));
    }
}
