use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{AnalysisError, AnalysisResult};

pub type NodeId = usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element(String),
    Text(String),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// Arena-backed element tree. Nodes are stored in document order, so walking
/// the arena front to back visits elements in the order their start tags appear.
#[derive(Debug, Clone, Default)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Document {
    /// Parse XML bytes into a tree. Whitespace-only text is kept as-is so that
    /// element text matches the source exactly.
    pub fn parse(bytes: &[u8]) -> AnalysisResult<Self> {
        let mut reader = Reader::from_reader(bytes);
        reader.config_mut().trim_text(false);

        let mut doc = Document::default();
        let mut open: Vec<NodeId> = Vec::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => {
                    let tag = tag_name(e.name().as_ref())?;
                    let id = doc.push(NodeKind::Element(tag), open.last().copied());
                    open.push(id);
                }
                Event::Empty(e) => {
                    let tag = tag_name(e.name().as_ref())?;
                    doc.push(NodeKind::Element(tag), open.last().copied());
                }
                Event::End(_) => {
                    open.pop();
                }
                Event::Text(e) => {
                    // Text outside the root element (prolog whitespace) is dropped.
                    if let Some(&parent) = open.last() {
                        let text = e.unescape()?.into_owned();
                        doc.push(NodeKind::Text(text), Some(parent));
                    }
                }
                Event::CData(e) => {
                    if let Some(&parent) = open.last() {
                        let text = String::from_utf8(e.into_inner().into_owned())
                            .map_err(|err| AnalysisError::Parse(err.to_string()))?;
                        doc.push(NodeKind::Text(text), Some(parent));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if let Some(&unclosed) = open.last() {
            return Err(AnalysisError::Parse(format!(
                "unclosed element <{}>",
                doc.tag(unclosed).unwrap_or_default()
            )));
        }

        Ok(doc)
    }

    fn push(&mut self, kind: NodeKind, parent: Option<NodeId>) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node {
            kind,
            parent,
            children: Vec::new(),
        });
        if let Some(p) = parent {
            self.nodes[p].children.push(id);
        }
        id
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id].kind {
            NodeKind::Element(tag) => Some(tag),
            NodeKind::Text(_) => None,
        }
    }

    /// All elements with the given tag, in document order.
    pub fn elements_named<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = NodeId> + 'a {
        (0..self.nodes.len()).filter(move |&id| self.tag(id) == Some(tag))
    }

    /// Direct children of `id` carrying the given tag, in document order.
    pub fn child_elements_named<'a>(
        &'a self,
        id: NodeId,
        tag: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.nodes[id]
            .children
            .iter()
            .copied()
            .filter(move |&child| self.tag(child) == Some(tag))
    }

    /// Concatenated text of every text node below `id`, in document order.
    pub fn text(&self, id: NodeId) -> String {
        let mut out = String::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let node = &self.nodes[current];
            match &node.kind {
                NodeKind::Text(t) => out.push_str(t),
                NodeKind::Element(_) => stack.extend(node.children.iter().rev()),
            }
        }
        out
    }
}

fn tag_name(raw: &[u8]) -> AnalysisResult<String> {
    std::str::from_utf8(raw)
        .map(str::to_string)
        .map_err(|e| AnalysisError::Parse(e.to_string()))
}
