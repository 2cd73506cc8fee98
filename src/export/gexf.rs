//! GEXF 1.2 export, readable by Gephi and networkx.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::borrow::Cow;
use std::io::Write;

use super::{xml_error, ExportError};
use crate::graph::CitationGraph;

const GEXF_NAMESPACE: &str = "http://gexf.net/1.2";
const GEXF_VERSION: &str = "1.2";

/// Node attribute columns: (id, title, type)
const NODE_ATTRIBUTES: [(&str, &str, &str); 6] = [
    ("0", "authors", "string"),
    ("1", "venue", "string"),
    ("2", "type", "string"),
    ("3", "year", "string"),
    ("4", "doi", "string"),
    ("5", "seed", "boolean"),
];

/// Write `graph` as a directed GEXF document.
///
/// Each node carries its title as `label` plus the attribute columns above;
/// edges only carry their endpoints. The output contains no timestamps, so the
/// same graph always serializes to the same bytes.
pub fn write_gexf<W: Write>(graph: &CitationGraph, out: W) -> Result<(), ExportError> {
    let mut writer = Writer::new_with_indent(out, b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml_error)?;

    let mut root = BytesStart::new("gexf");
    root.push_attribute(("xmlns", GEXF_NAMESPACE));
    root.push_attribute(("version", GEXF_VERSION));
    start(&mut writer, root)?;

    start(&mut writer, BytesStart::new("meta"))?;
    start(&mut writer, BytesStart::new("creator"))?;
    writer
        .write_event(Event::Text(BytesText::new(concat!(
            env!("CARGO_PKG_NAME"),
            " ",
            env!("CARGO_PKG_VERSION")
        ))))
        .map_err(xml_error)?;
    end(&mut writer, "creator")?;
    end(&mut writer, "meta")?;

    let mut graph_tag = BytesStart::new("graph");
    graph_tag.push_attribute(("mode", "static"));
    graph_tag.push_attribute(("defaultedgetype", "directed"));
    start(&mut writer, graph_tag)?;

    let mut attributes = BytesStart::new("attributes");
    attributes.push_attribute(("class", "node"));
    start(&mut writer, attributes)?;
    for (id, title, kind) in NODE_ATTRIBUTES {
        let mut attribute = BytesStart::new("attribute");
        attribute.push_attribute(("id", id));
        attribute.push_attribute(("title", title));
        attribute.push_attribute(("type", kind));
        empty(&mut writer, attribute)?;
    }
    end(&mut writer, "attributes")?;

    start(&mut writer, BytesStart::new("nodes"))?;
    for (id, work) in graph.nodes() {
        let node_id = id.to_string();
        let mut node = BytesStart::new("node");
        node.push_attribute(("id", node_id.as_str()));
        node.push_attribute(("label", xml_text(&work.title).as_ref()));
        start(&mut writer, node)?;

        let authors = work.authors.to_string();
        let seed = if work.is_seed { "true" } else { "false" };
        let values = [
            authors.as_str(),
            work.venue.as_str(),
            work.work_type.as_str(),
            work.year.as_str(),
            work.doi.as_str(),
            seed,
        ];

        start(&mut writer, BytesStart::new("attvalues"))?;
        for ((attribute_id, _, _), value) in NODE_ATTRIBUTES.iter().zip(values) {
            let mut attvalue = BytesStart::new("attvalue");
            attvalue.push_attribute(("for", *attribute_id));
            attvalue.push_attribute(("value", xml_text(value).as_ref()));
            empty(&mut writer, attvalue)?;
        }
        end(&mut writer, "attvalues")?;
        end(&mut writer, "node")?;
    }
    end(&mut writer, "nodes")?;

    start(&mut writer, BytesStart::new("edges"))?;
    for (index, edge) in graph.edges().enumerate() {
        let edge_id = index.to_string();
        let source = edge.source.to_string();
        let target = edge.target.to_string();

        let mut tag = BytesStart::new("edge");
        tag.push_attribute(("id", edge_id.as_str()));
        tag.push_attribute(("source", source.as_str()));
        tag.push_attribute(("target", target.as_str()));
        empty(&mut writer, tag)?;
    }
    end(&mut writer, "edges")?;

    end(&mut writer, "graph")?;
    end(&mut writer, "gexf")?;

    writer.into_inner().flush()?;
    Ok(())
}

/// Serialize `graph` to GEXF bytes
pub fn to_gexf_bytes(graph: &CitationGraph) -> Result<Vec<u8>, ExportError> {
    let mut buffer = Vec::new();
    write_gexf(graph, &mut buffer)?;
    Ok(buffer)
}

/// Drop characters XML 1.0 does not allow, even escaped
fn xml_text(text: &str) -> Cow<'_, str> {
    fn allowed(c: char) -> bool {
        matches!(c, '\t' | '\n' | '\r') || (c >= ' ' && c != '\u{FFFE}' && c != '\u{FFFF}')
    }

    if text.chars().all(allowed) {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(text.chars().filter(|&c| allowed(c)).collect())
    }
}

fn start<W: Write>(writer: &mut Writer<W>, tag: BytesStart<'_>) -> Result<(), ExportError> {
    writer.write_event(Event::Start(tag)).map_err(xml_error)
}

fn empty<W: Write>(writer: &mut Writer<W>, tag: BytesStart<'_>) -> Result<(), ExportError> {
    writer.write_event(Event::Empty(tag)).map_err(xml_error)
}

fn end<W: Write>(writer: &mut Writer<W>, name: &str) -> Result<(), ExportError> {
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(xml_error)
}
