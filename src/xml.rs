//! XML helpers shared by the resource handlers.

use std::path::Path;

use quick_xml::events::{BytesDecl, BytesStart, Event};
use quick_xml::{Reader, Writer};

use crate::{IsapiError, IsapiResult};

fn xml_err(e: impl std::fmt::Display) -> IsapiError {
    IsapiError::Xml(e.to_string())
}

/// An XML document returned by the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    raw: String,
}

impl XmlDocument {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    /// Reads a document previously written with [`XmlDocument::save_pretty`]
    /// or supplied by hand (e.g. a bulk settings template).
    pub async fn load(path: impl AsRef<Path>) -> IsapiResult<Self> {
        let raw = tokio::fs::read_to_string(path.as_ref()).await?;
        Ok(Self { raw })
    }

    /// The document exactly as the device sent it.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn into_string(self) -> String {
        self.raw
    }

    /// Returns the document indented by four spaces with blank lines removed.
    pub fn pretty(&self) -> IsapiResult<String> {
        pretty_print(&self.raw)
    }

    /// Writes the pretty-printed document to `path`, replacing any existing
    /// file.
    pub async fn save_pretty(&self, path: impl AsRef<Path>) -> IsapiResult<()> {
        let path = path.as_ref();
        let pretty = self.pretty()?;
        tokio::fs::write(path, pretty).await?;
        log::info!("saved XML document to {}", path.display());
        Ok(())
    }

    /// Returns the text of the first element named `local_name`, ignoring
    /// namespaces.
    pub fn text_of(&self, local_name: &str) -> IsapiResult<Option<String>> {
        let mut reader = Reader::from_str(&self.raw);
        reader.config_mut().trim_text(true);
        loop {
            match reader.read_event().map_err(xml_err)? {
                Event::Start(e) if e.local_name().as_ref() == local_name.as_bytes() => {
                    return match reader.read_event().map_err(xml_err)? {
                        Event::Text(t) => Ok(Some(t.unescape().map_err(xml_err)?.into_owned())),
                        Event::CData(c) => {
                            Ok(Some(String::from_utf8_lossy(&c.into_inner()).into_owned()))
                        }
                        _ => Ok(Some(String::new())),
                    };
                }
                Event::Empty(e) if e.local_name().as_ref() == local_name.as_bytes() => {
                    return Ok(Some(String::new()));
                }
                Event::Eof => return Ok(None),
                _ => {}
            }
        }
    }

    /// Returns attribute `attribute` of the first element named `local_name`,
    /// ignoring namespaces on both.
    pub fn attribute_of(&self, local_name: &str, attribute: &str) -> IsapiResult<Option<String>> {
        let mut reader = Reader::from_str(&self.raw);
        loop {
            match reader.read_event().map_err(xml_err)? {
                Event::Start(e) | Event::Empty(e)
                    if e.local_name().as_ref() == local_name.as_bytes() =>
                {
                    return find_attribute(&e, attribute);
                }
                Event::Eof => return Ok(None),
                _ => {}
            }
        }
    }

    /// Splits the comma separated options attribute of `local_name`.
    ///
    /// Returns an empty list when the element or the attribute is missing or
    /// empty.
    pub fn options(&self, local_name: &str, attribute: &str) -> IsapiResult<Vec<String>> {
        match self.attribute_of(local_name, attribute)? {
            Some(opts) if !opts.is_empty() => Ok(opts.split(',').map(str::to_string).collect()),
            Some(_) => {
                log::warn!("element {local_name} has an empty {attribute} attribute");
                Ok(Vec::new())
            }
            None => {
                log::warn!("no {local_name} element with a {attribute} attribute in document");
                Ok(Vec::new())
            }
        }
    }
}

impl std::fmt::Display for XmlDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

fn find_attribute(element: &BytesStart<'_>, attribute: &str) -> IsapiResult<Option<String>> {
    for attr in element.attributes() {
        let attr = attr.map_err(xml_err)?;
        if attr.key.local_name().as_ref() == attribute.as_bytes() {
            return Ok(Some(attr.unescape_value().map_err(xml_err)?.into_owned()));
        }
    }
    Ok(None)
}

/// Re-indents `xml` with four spaces per level and drops blank lines.
///
/// Elements without content are collapsed to `<tag/>`. A declaration is
/// added when the input has none.
pub fn pretty_print(xml: &str) -> IsapiResult<String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 4);
    let mut pending: Option<BytesStart<'static>> = None;
    let mut seen_first = false;

    loop {
        let event = reader.read_event().map_err(xml_err)?;
        if !seen_first {
            seen_first = true;
            if !matches!(event, Event::Decl(_)) {
                writer
                    .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
                    .map_err(xml_err)?;
            }
        }

        match event {
            Event::Eof => break,
            Event::End(end) => match pending.take() {
                Some(start) => writer.write_event(Event::Empty(start)).map_err(xml_err)?,
                None => writer.write_event(Event::End(end)).map_err(xml_err)?,
            },
            other => {
                if let Some(start) = pending.take() {
                    writer.write_event(Event::Start(start)).map_err(xml_err)?;
                }
                match other {
                    Event::Start(start) => pending = Some(start.into_owned()),
                    event => writer.write_event(event).map_err(xml_err)?,
                }
            }
        }
    }
    if let Some(start) = pending.take() {
        return Err(IsapiError::Xml(format!(
            "unclosed element {}",
            String::from_utf8_lossy(start.name().as_ref())
        )));
    }

    let pretty = String::from_utf8(writer.into_inner()).map_err(xml_err)?;
    Ok(pretty
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n"))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const CHANNELS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ImageChannellist version="2.0" xmlns="http://www.hikvision.com/ver20/XMLSchema">


<ImageChannel>
<id>1</id>
<Shutter><ShutterLevel opt="1/1,1/3,1/120,1/100000">1/120</ShutterLevel></Shutter>
<Color><brightnessLevel>50</brightnessLevel><note></note></Color>
</ImageChannel>
</ImageChannellist>"#;

    #[test]
    fn pretty_print_indents_and_drops_blank_lines() {
        let pretty = pretty_print(CHANNELS).unwrap();
        let expected = r#"<?xml version="1.0" encoding="UTF-8"?>
<ImageChannellist version="2.0" xmlns="http://www.hikvision.com/ver20/XMLSchema">
    <ImageChannel>
        <id>1</id>
        <Shutter>
            <ShutterLevel opt="1/1,1/3,1/120,1/100000">1/120</ShutterLevel>
        </Shutter>
        <Color>
            <brightnessLevel>50</brightnessLevel>
            <note/>
        </Color>
    </ImageChannel>
</ImageChannellist>"#;
        assert_eq!(pretty, expected);
    }

    #[test]
    fn pretty_print_adds_missing_declaration() {
        let pretty = pretty_print("<EIS><enabled>true</enabled></EIS>").unwrap();
        assert!(pretty.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<EIS>"));
    }

    #[test]
    fn pretty_print_rejects_broken_documents() {
        assert!(pretty_print("<Color><brightnessLevel>1</Color>").is_err());
    }

    #[test]
    fn options_are_split_in_document_order() {
        let doc = XmlDocument::new(CHANNELS);
        assert_eq!(
            doc.options("ShutterLevel", "opt").unwrap(),
            vec!["1/1", "1/3", "1/120", "1/100000"]
        );
        assert!(doc.options("GainLevel", "opt").unwrap().is_empty());
    }

    #[test]
    fn text_lookup_ignores_namespaces() {
        let doc = XmlDocument::new(CHANNELS);
        assert_eq!(doc.text_of("brightnessLevel").unwrap().as_deref(), Some("50"));
        assert_eq!(doc.text_of("ShutterLevel").unwrap().as_deref(), Some("1/120"));
        assert_eq!(doc.text_of("note").unwrap().as_deref(), Some(""));
        assert_eq!(doc.text_of("missing").unwrap(), None);
    }
}
