use std::collections::HashMap;

use quick_xml::Reader;
use quick_xml::events::Event;

/// Minimal materialized XML tree. The parsers are handed a full buffer
/// (§9 "the contract to callers is a finite materialized sequence"), so
/// building the whole tree once and walking it is simpler and no less
/// correct than a hand-rolled streaming path matcher.
#[derive(Debug, Clone, Default)]
pub struct XmlNode {
    pub name: String,
    pub attrs: HashMap<String, String>,
    pub text: String,
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    /// First child element with this tag name, if any.
    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Trimmed text content of the first child with this tag name.
    pub fn child_text(&self, name: &str) -> Option<String> {
        self.child(name)
            .map(|c| c.text.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

pub fn parse_xml_tree(text: &str) -> Result<XmlNode, String> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlNode> = Vec::new();
    let mut root: Option<XmlNode> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = local_name(&e);
                let attrs = read_attrs(&e, reader.decoder());
                stack.push(XmlNode {
                    name,
                    attrs,
                    text: String::new(),
                    children: Vec::new(),
                });
            }
            Ok(Event::Empty(e)) => {
                let name = local_name(&e);
                let attrs = read_attrs(&e, reader.decoder());
                let node = XmlNode {
                    name,
                    attrs,
                    text: String::new(),
                    children: Vec::new(),
                };
                attach(&mut stack, &mut root, node);
            }
            Ok(Event::End(_)) => {
                if let Some(node) = stack.pop() {
                    attach(&mut stack, &mut root, node);
                }
            }
            Ok(Event::Text(e)) => {
                if let Some(top) = stack.last_mut() {
                    let decoded = e.unescape().unwrap_or_default();
                    top.text.push_str(&decoded);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => return Err(format!("XML parse error at position {}: {err}", reader.buffer_position())),
        }
        buf.clear();
    }

    root.ok_or_else(|| "document has no root element".to_string())
}

fn attach(stack: &mut Vec<XmlNode>, root: &mut Option<XmlNode>, node: XmlNode) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => *root = Some(node),
    }
}

fn local_name(start: &quick_xml::events::BytesStart) -> String {
    let qname = start.name();
    let bytes = qname.local_name();
    String::from_utf8_lossy(bytes.as_ref()).into_owned()
}

fn read_attrs(start: &quick_xml::events::BytesStart, decoder: quick_xml::encoding::Decoder) -> HashMap<String, String> {
    let mut attrs = HashMap::new();
    for attr in start.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr.decode_and_unescape_value(decoder).unwrap_or_default().into_owned();
        attrs.insert(key, value);
    }
    attrs
}

/// Walks a dotted path like `products.product` from the document root
/// downward, returning every matching node at the final segment (§4.1.2).
pub fn find_items<'a>(root: &'a XmlNode, path: &[String]) -> Vec<&'a XmlNode> {
    if path.is_empty() || root.name != path[0] {
        return Vec::new();
    }
    let mut current: Vec<&XmlNode> = vec![root];
    for segment in &path[1..] {
        current = current
            .into_iter()
            .flat_map(|n| n.children.iter().filter(move |c| &c.name == segment))
            .collect();
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_elements() {
        let xml = "<products><product><naziv>Kruh</naziv><cijena>5,99</cijena></product></products>";
        let tree = parse_xml_tree(xml).unwrap();
        assert_eq!(tree.name, "products");
        let path = vec!["products".to_string(), "product".to_string()];
        let items = find_items(&tree, &path);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].child_text("naziv").as_deref(), Some("Kruh"));
    }

    #[test]
    fn reads_attributes() {
        let xml = "<products poslovnica=\"PJ50-1\"><product/></products>";
        let tree = parse_xml_tree(xml).unwrap();
        assert_eq!(tree.attrs.get("poslovnica").map(String::as_str), Some("PJ50-1"));
    }
}
