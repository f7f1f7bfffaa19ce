//! Repository metadata descriptor (`repomd.xml`) parsing.

use crate::error::{ErrorKind, Result};
use crate::repo::DbName;
use exn::{OptionExt, ResultExt};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::BTreeMap;

/// The `type` to `href` entries of a descriptor.
///
/// ```xml
/// <repomd>
///   <data type="primary_db">
///     <checksum type="sha256">...</checksum>
///     <location href="repodata/abc-primary.sqlite.xz"/>
///   </data>
/// </repomd>
/// ```
///
/// An element carrying a `type` attribute opens an entry; the first `href`
/// found inside it is the entry's location. Entries without a location are
/// dropped, and a repeated type keeps its first location.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Descriptor {
    locations: BTreeMap<String, String>,
}

impl Descriptor {
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);
        let mut locations = BTreeMap::new();
        // Type of the entry being read, and the depth of its element.
        let mut open: Option<(String, usize)> = None;
        let mut depth = 0usize;
        loop {
            let event = reader
                .read_event()
                .or_raise(|| ErrorKind::InvalidDescriptor(format!("at byte {}", reader.buffer_position())))?;
            match event {
                Event::Start(element) => {
                    depth += 1;
                    if let Some((kind, _)) = &open {
                        if let Some(href) = attribute(&element, b"href")? {
                            locations.entry(kind.clone()).or_insert(href);
                        }
                    } else {
                        open = attribute(&element, b"type")?.map(|kind| (kind, depth));
                    }
                },
                Event::Empty(element) => {
                    if let Some((kind, _)) = &open
                        && let Some(href) = attribute(&element, b"href")?
                    {
                        locations.entry(kind.clone()).or_insert(href);
                    }
                },
                Event::End(_) => {
                    if open.as_ref().is_some_and(|(_, at)| *at == depth) {
                        open = None;
                    }
                    depth = depth.saturating_sub(1);
                },
                Event::Eof => break,
                _ => {},
            }
        }
        Ok(Self { locations })
    }

    /// Relative download location of the SQLite flavour of `name`.
    pub fn location(&self, name: DbName) -> Result<&str> {
        let kind = name.descriptor_type();
        self.locations.get(&kind).map(String::as_str).ok_or_raise(|| ErrorKind::MissingMetadataEntry(kind))
    }
}

fn attribute(element: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>> {
    let invalid = || ErrorKind::InvalidDescriptor(String::from_utf8_lossy(element.name().as_ref()).into_owned());
    let Some(attr) = element.try_get_attribute(name).or_raise(invalid)? else {
        return Ok(None);
    };
    Ok(Some(attr.unescape_value().or_raise(invalid)?.into_owned()))
}
