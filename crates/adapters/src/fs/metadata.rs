use std::collections::BTreeSet;
use std::fs;
use std::io::Cursor;
use std::path::Path;

use photo_sorter_application::ApplicationError;
use regex::bytes::Regex as BytesRegex;
use tracing::debug;

const XP_KEYWORDS: u16 = 0x9C9E;
const PHOTOSHOP_MARKER: &[u8] = b"Photoshop 3.0\0";
const IPTC_RESOURCE_ID: u16 = 0x0404;

// Element categories that mark a hierarchical tag as a person.
const HIERARCHY_PERSON_MARKERS: &[&str] = &["people", "person", "人"];
const TAGS_LIST_PERSON_MARKERS: &[&str] = &["people", "person", "人物"];

lazy_static::lazy_static! {
    static ref XMP_PACKET: BytesRegex =
        BytesRegex::new(r"(?s)<x:xmpmeta.*?</x:xmpmeta>").expect("valid XMP packet pattern");
}

/// Labels found in one file's embedded metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonTags {
    pub persons: BTreeSet<String>,
    pub keywords: BTreeSet<String>,
}

/// Reads EXIF, XMP and IPTC labels. Only an unreadable file is an error;
/// missing or malformed metadata blocks just contribute nothing.
pub fn read_person_tags(path: &Path) -> Result<PersonTags, ApplicationError> {
    let data = fs::read(path)
        .map_err(|error| ApplicationError::Io(format!("{}: {error}", path.display())))?;
    Ok(person_tags_from_bytes(&data))
}

pub(crate) fn person_tags_from_bytes(data: &[u8]) -> PersonTags {
    let mut tags = PersonTags::default();
    tags.keywords.extend(exif_keywords(data));
    if let Some(packet) = XMP_PACKET.find(data) {
        let xml = String::from_utf8_lossy(packet.as_bytes());
        collect_xmp(&xml, &mut tags);
    }
    tags.keywords.extend(iptc_keywords(data));

    // Without explicit person entries every keyword is a candidate.
    if tags.persons.is_empty() {
        tags.persons = tags.keywords.clone();
    }
    tags
}

fn exif_keywords(data: &[u8]) -> Vec<String> {
    let exif = match exif::Reader::new().read_from_container(&mut Cursor::new(data)) {
        Ok(exif) => exif,
        Err(error) => {
            debug!(%error, "no usable EXIF block");
            return Vec::new();
        }
    };
    let tag = exif::Tag(exif::Context::Tiff, XP_KEYWORDS);
    let Some(field) = exif.get_field(tag, exif::In::PRIMARY) else {
        return Vec::new();
    };
    let exif::Value::Byte(bytes) = &field.value else {
        return Vec::new();
    };

    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    split_labels(String::from_utf16_lossy(&units).trim_end_matches('\0'), ';')
}

/// Walks the packet by local element name so any namespace prefix works.
fn collect_xmp(xml: &str, tags: &mut PersonTags) {
    let doc = match roxmltree::Document::parse(xml) {
        Ok(doc) => doc,
        Err(error) => {
            debug!(%error, "unparsable XMP packet");
            return;
        }
    };

    for node in doc.descendants().filter(|node| node.is_element()) {
        match node.tag_name().name() {
            "subject" => tags.keywords.extend(list_items(node)),
            "RegionList" | "Regions" | "RegionInfo" => collect_region_names(node, &mut tags.persons),
            // Lightroom: People|Family|Name
            "hierarchicalSubject" => tags.persons.extend(
                list_items(node)
                    .iter()
                    .filter_map(|item| categorized_leaf(item, '|', HIERARCHY_PERSON_MARKERS)),
            ),
            // digiKam: People/Name
            "TagsList" => tags.persons.extend(
                list_items(node)
                    .iter()
                    .filter_map(|item| categorized_leaf(item, '/', TAGS_LIST_PERSON_MARKERS)),
            ),
            _ => {}
        }
    }
}

fn list_items(node: roxmltree::Node<'_, '_>) -> Vec<String> {
    node.descendants()
        .filter(|child| child.tag_name().name() == "li")
        .filter_map(|child| child.text())
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Face regions name people either in `Name`/`PersonDisplayName` elements
/// or in name-like attributes.
fn collect_region_names(region: roxmltree::Node<'_, '_>, persons: &mut BTreeSet<String>) {
    for node in region.descendants().filter(|node| node.is_element()) {
        if matches!(node.tag_name().name(), "Name" | "PersonDisplayName") {
            if let Some(name) = node.text().map(str::trim).filter(|name| !name.is_empty()) {
                persons.insert(name.to_string());
            }
        }

        for attribute in node.attributes() {
            let key = attribute.name().to_lowercase();
            let value = attribute.value().trim();
            if (key.contains("name") || key.contains("person"))
                && !value.is_empty()
                && value != "true"
                && value != "false"
            {
                persons.insert(value.to_string());
            }
        }
    }
}

/// Last segment of `category<sep>...<sep>leaf` when the category names people.
fn categorized_leaf(item: &str, separator: char, markers: &[&str]) -> Option<String> {
    let mut parts = item.split(separator);
    let category = parts.next()?.to_lowercase();
    let leaf = parts.last()?.trim();
    let is_person = markers.iter().any(|marker| category.contains(marker));
    (is_person && !leaf.is_empty()).then(|| leaf.to_string())
}

fn split_labels(text: &str, separator: char) -> Vec<String> {
    text.split(separator)
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(str::to_string)
        .collect()
}

/// Keywords (record 2, dataset 25) from the IPTC block inside a Photoshop
/// APP13 segment.
fn iptc_keywords(data: &[u8]) -> Vec<String> {
    let Some(start) = data
        .windows(PHOTOSHOP_MARKER.len())
        .position(|window| window == PHOTOSHOP_MARKER)
    else {
        return Vec::new();
    };

    let mut keywords = Vec::new();
    let resources = &data[start + PHOTOSHOP_MARKER.len()..];
    let mut pos = 0;
    while let Some(header) = resources.get(pos..pos + 7) {
        if &header[..4] != b"8BIM" {
            pos += 1;
            continue;
        }
        let resource_id = u16::from_be_bytes([header[4], header[5]]);
        // Pascal name, padded so length byte plus name is even.
        let name_len = usize::from(header[6]);
        let size_at = pos + 6 + (name_len + 2) / 2 * 2;
        let Some(size) = resources.get(size_at..size_at + 4) else {
            break;
        };
        let size = u32::from_be_bytes([size[0], size[1], size[2], size[3]]) as usize;
        let body_at = size_at + 4;
        let Some(body) = resources.get(body_at..body_at + size) else {
            break;
        };
        if resource_id == IPTC_RESOURCE_ID {
            keywords.extend(iptc_records(body));
        }
        pos = body_at + size + size % 2;
    }
    keywords
}

fn iptc_records(block: &[u8]) -> Vec<String> {
    let mut keywords = Vec::new();
    let mut pos = 0;
    while let Some(header) = block.get(pos..pos + 5) {
        if header[0] != 0x1C {
            pos += 1;
            continue;
        }
        let (record, dataset) = (header[1], header[2]);
        let len = usize::from(u16::from_be_bytes([header[3], header[4]]));
        let Some(value) = block.get(pos + 5..pos + 5 + len) else {
            break;
        };
        if record == 2 && dataset == 25 {
            let keyword = match std::str::from_utf8(value) {
                Ok(text) => text.trim().to_string(),
                Err(_) => value.iter().map(|&byte| char::from(byte)).collect::<String>().trim().to_string(),
            };
            if !keyword.is_empty() {
                keywords.push(keyword);
            }
        }
        pos += 5 + len;
    }
    keywords
}
