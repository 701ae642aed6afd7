//! Null-safe access to parsed eJP documents

pub mod tree;

pub use tree::{line_number_at, parse_document, Element, XmlNode};

/// Descendant text of `node`, or `default` when the node is missing or has no text
pub fn get_xml_text(node: Option<&Element>, default: Option<&str>) -> Option<String> {
    match node.map(Element::text) {
        Some(text) if !text.is_empty() => Some(text),
        _ => default.map(str::to_string),
    }
}

pub fn get_and_decode_xml_text(node: Option<&Element>, default: Option<&str>) -> Option<String> {
    get_xml_text(node, default).map(|text| decode_html_entities(&text))
}

/// Text of the first child at `path`. A missing child yields `default`, a
/// present but empty child yields `""`.
pub fn get_xml_child_text(parent: &Element, path: &str, default: Option<&str>) -> Option<String> {
    match parent.find(path) {
        Some(child) => get_xml_text(Some(child), Some("")),
        None => default.map(str::to_string),
    }
}

pub fn get_and_decode_xml_child_text(
    parent: &Element,
    path: &str,
    default: Option<&str>,
) -> Option<String> {
    get_xml_child_text(parent, path, default).map(|text| decode_html_entities(&text))
}

/// Attribute value, with absence read as empty text
pub fn get_xml_attribute(node: &Element, name: &str) -> String {
    node.attribute(name).unwrap_or_default().to_string()
}

pub fn decode_html_entities(text: &str) -> String {
    html_escape::decode_html_entities(text).into_owned()
}

/// Applies `transform` to every node at `path`, keeping document order
pub fn extract_list<T, F>(parent: &Element, path: &str, transform: F) -> Vec<T>
where
    F: FnMut(&Element) -> T,
{
    parent.find_all(path).into_iter().map(transform).collect()
}

pub fn try_extract_list<T, E, F>(parent: &Element, path: &str, transform: F) -> Result<Vec<T>, E>
where
    F: FnMut(&Element) -> Result<T, E>,
{
    parent.find_all(path).into_iter().map(transform).collect()
}
