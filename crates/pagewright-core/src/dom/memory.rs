//! Headless in-memory document.
//!
//! An arena of nodes addressed by [`NodeId`]. The arena only grows: removed
//! subtrees are detached rather than freed, so a stale id can never alias a
//! newer node.

use super::markup::{self, MarkupNode};
use super::{Document, InsertPosition, NodeId};
use crate::error::DomError;
use std::cell::RefCell;

const ROOT: usize = 0;

#[derive(Debug, Clone)]
enum NodeKind {
	Root,
	Element {
		tag: String,
		attributes: Vec<(String, String)>,
	},
	Text(String),
	Comment(String),
}

#[derive(Debug, Clone)]
struct NodeData {
	kind: NodeKind,
	parent: Option<usize>,
	children: Vec<usize>,
}

#[derive(Debug)]
struct Arena {
	nodes: Vec<NodeData>,
}

impl Arena {
	fn new() -> Self {
		Self {
			nodes: vec![NodeData {
				kind: NodeKind::Root,
				parent: None,
				children: Vec::new(),
			}],
		}
	}

	fn get(&self, node: NodeId) -> Option<&NodeData> {
		usize::try_from(node.raw())
			.ok()
			.and_then(|index| self.nodes.get(index))
	}

	fn index_of(&self, node: NodeId) -> Result<usize, DomError> {
		let index = usize::try_from(node.raw()).map_err(|_| DomError::Detached(node.raw()))?;
		if index < self.nodes.len() && self.is_attached(index) {
			Ok(index)
		} else {
			Err(DomError::Detached(node.raw()))
		}
	}

	fn is_attached(&self, mut index: usize) -> bool {
		loop {
			if index == ROOT {
				return true;
			}
			match self.nodes[index].parent {
				Some(parent) => index = parent,
				None => return false,
			}
		}
	}

	/// Builds arena nodes for a parsed fragment, unattached, returning their indices.
	fn build(&mut self, parsed: Vec<MarkupNode>, parent: Option<usize>) -> Vec<usize> {
		parsed
			.into_iter()
			.map(|node| {
				let index = self.nodes.len();
				match node {
					MarkupNode::Element(el) => {
						self.nodes.push(NodeData {
							kind: NodeKind::Element {
								tag: el.tag,
								attributes: el.attributes,
							},
							parent,
							children: Vec::new(),
						});
						let children = self.build(el.children, Some(index));
						self.nodes[index].children = children;
					}
					MarkupNode::Text(text) => self.nodes.push(NodeData {
						kind: NodeKind::Text(text),
						parent,
						children: Vec::new(),
					}),
					MarkupNode::Comment(body) => self.nodes.push(NodeData {
						kind: NodeKind::Comment(body),
						parent,
						children: Vec::new(),
					}),
				}
				index
			})
			.collect()
	}

	fn detach_children(&mut self, index: usize) {
		let children = std::mem::take(&mut self.nodes[index].children);
		for child in children {
			self.nodes[child].parent = None;
		}
	}

	fn descendants(&self, index: usize, out: &mut Vec<usize>) {
		for &child in &self.nodes[index].children {
			out.push(child);
			self.descendants(child, out);
		}
	}

	fn is_element(&self, index: usize) -> bool {
		matches!(self.nodes[index].kind, NodeKind::Element { .. })
	}

	fn attribute(&self, index: usize, name: &str) -> Option<&str> {
		match &self.nodes[index].kind {
			NodeKind::Element { attributes, .. } => attributes
				.iter()
				.find(|(key, _)| key == name)
				.map(|(_, value)| value.as_str()),
			_ => None,
		}
	}

	fn write_html(&self, index: usize, out: &mut String) {
		match &self.nodes[index].kind {
			NodeKind::Root => self.write_children(index, out),
			NodeKind::Text(text) => out.push_str(&markup::escape_text(text)),
			NodeKind::Comment(body) => {
				out.push_str("<!--");
				out.push_str(body);
				out.push_str("-->");
			}
			NodeKind::Element { tag, attributes } => {
				out.push('<');
				out.push_str(tag);
				for (name, value) in attributes {
					out.push(' ');
					out.push_str(name);
					out.push_str("=\"");
					out.push_str(&markup::escape_attribute(value));
					out.push('"');
				}
				out.push('>');
				if markup::VOID_ELEMENTS.contains(&tag.as_str()) {
					return;
				}
				self.write_content(index, out);
				out.push_str("</");
				out.push_str(tag);
				out.push('>');
			}
		}
	}

	fn write_children(&self, index: usize, out: &mut String) {
		for &child in &self.nodes[index].children {
			self.write_html(child, out);
		}
	}

	/// Writes the children of `index`, unescaped inside raw-text elements.
	fn write_content(&self, index: usize, out: &mut String) {
		let raw = match &self.nodes[index].kind {
			NodeKind::Element { tag, .. } => markup::RAW_TEXT_ELEMENTS.contains(&tag.as_str()),
			_ => false,
		};
		if !raw {
			self.write_children(index, out);
			return;
		}
		for &child in &self.nodes[index].children {
			match &self.nodes[child].kind {
				NodeKind::Text(text) => out.push_str(text),
				_ => self.write_html(child, out),
			}
		}
	}

	fn write_text(&self, index: usize, out: &mut String) {
		match &self.nodes[index].kind {
			NodeKind::Text(text) => out.push_str(text),
			NodeKind::Comment(_) => {}
			NodeKind::Root | NodeKind::Element { .. } => {
				for &child in &self.nodes[index].children {
					self.write_text(child, out);
				}
			}
		}
	}
}

/// In-memory [`Document`] implementation.
///
/// # Example
///
/// ```
/// use pagewright_core::dom::{Document, MemoryDocument};
///
/// let doc = MemoryDocument::parse(r#"<main id="main"><div data-init="greeter"></div></main>"#).unwrap();
/// let found = doc.query_attribute("data-init", Some("greeter"), None);
/// assert_eq!(found.len(), 1);
/// ```
#[derive(Debug)]
pub struct MemoryDocument {
	arena: RefCell<Arena>,
}

impl Default for MemoryDocument {
	fn default() -> Self {
		Self::new()
	}
}

impl MemoryDocument {
	/// Creates an empty document.
	pub fn new() -> Self {
		Self {
			arena: RefCell::new(Arena::new()),
		}
	}

	/// Creates a document whose body is the given markup.
	pub fn parse(markup: &str) -> Result<Self, DomError> {
		let doc = Self::new();
		doc.replace_children(doc.root(), markup)?;
		Ok(doc)
	}

	/// The document root. It is not an element and never matches queries.
	pub fn root(&self) -> NodeId {
		NodeId::new(ROOT as u64)
	}

	/// Serializes the whole document.
	pub fn to_html(&self) -> String {
		let arena = self.arena.borrow();
		let mut out = String::new();
		arena.write_children(ROOT, &mut out);
		out
	}

	/// Returns an element's lowercased tag name.
	pub fn tag_name(&self, node: NodeId) -> Option<String> {
		let arena = self.arena.borrow();
		match &arena.get(node)?.kind {
			NodeKind::Element { tag, .. } => Some(tag.clone()),
			_ => None,
		}
	}

	/// Sets or overwrites an attribute on an element.
	pub fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> Result<(), DomError> {
		let mut arena = self.arena.borrow_mut();
		let index = arena.index_of(node)?;
		match &mut arena.nodes[index].kind {
			NodeKind::Element { attributes, .. } => {
				match attributes.iter_mut().find(|(key, _)| key == name) {
					Some((_, existing)) => *existing = value.to_string(),
					None => attributes.push((name.to_string(), value.to_string())),
				}
				Ok(())
			}
			_ => Err(DomError::Operation(format!(
				"node {} is not an element",
				node
			))),
		}
	}

	/// Number of attached nodes, the root excluded.
	pub fn attached_count(&self) -> usize {
		let arena = self.arena.borrow();
		let mut all = Vec::new();
		arena.descendants(ROOT, &mut all);
		all.len()
	}
}

impl Document for MemoryDocument {
	fn query_attribute(
		&self,
		attr: &str,
		value: Option<&str>,
		scope: Option<NodeId>,
	) -> Vec<NodeId> {
		let arena = self.arena.borrow();

		let mut candidates = Vec::new();
		match scope {
			Some(scope) => {
				let Ok(index) = arena.index_of(scope) else {
					return Vec::new();
				};
				candidates.push(index);
				arena.descendants(index, &mut candidates);
			}
			None => arena.descendants(ROOT, &mut candidates),
		}

		candidates
			.into_iter()
			.filter(|&index| arena.is_element(index))
			.filter(|&index| match (arena.attribute(index, attr), value) {
				(Some(actual), Some(expected)) => actual == expected,
				(Some(_), None) => true,
				(None, _) => false,
			})
			.map(|index| NodeId::new(index as u64))
			.collect()
	}

	fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
		let arena = self.arena.borrow();
		let index = arena.index_of(node).ok()?;
		arena.attribute(index, name).map(str::to_string)
	}

	fn element_by_id(&self, id: &str) -> Option<NodeId> {
		self.query_attribute("id", Some(id), None).into_iter().next()
	}

	fn inner_html(&self, node: NodeId) -> Option<String> {
		let arena = self.arena.borrow();
		let index = arena.index_of(node).ok()?;
		let mut out = String::new();
		arena.write_content(index, &mut out);
		Some(out)
	}

	fn text_content(&self, node: NodeId) -> Option<String> {
		let arena = self.arena.borrow();
		let index = arena.index_of(node).ok()?;
		let mut out = String::new();
		arena.write_text(index, &mut out);
		Some(out)
	}

	fn replace_children(&self, node: NodeId, markup: &str) -> Result<(), DomError> {
		let parsed = markup::parse_fragment(markup)?;
		let mut arena = self.arena.borrow_mut();
		let index = arena.index_of(node)?;

		arena.detach_children(index);
		let children = arena.build(parsed, Some(index));
		arena.nodes[index].children = children;
		Ok(())
	}

	fn insert_markup(
		&self,
		anchor: NodeId,
		markup: &str,
		position: InsertPosition,
	) -> Result<Vec<NodeId>, DomError> {
		let parsed = markup::parse_fragment(markup)?;
		let mut arena = self.arena.borrow_mut();
		let anchor_index = arena.index_of(anchor)?;

		let (parent, at) = match position {
			InsertPosition::Prepend => (anchor_index, 0),
			InsertPosition::Append => (anchor_index, arena.nodes[anchor_index].children.len()),
			InsertPosition::Before => {
				let parent = arena.nodes[anchor_index].parent.ok_or_else(|| {
					DomError::Operation("cannot insert before the document root".to_string())
				})?;
				let at = arena.nodes[parent]
					.children
					.iter()
					.position(|&child| child == anchor_index)
					.ok_or(DomError::Detached(anchor.raw()))?;
				(parent, at)
			}
		};

		let inserted = arena.build(parsed, Some(parent));
		arena.nodes[parent]
			.children
			.splice(at..at, inserted.iter().copied());

		Ok(inserted
			.into_iter()
			.filter(|&index| arena.is_element(index))
			.map(|index| NodeId::new(index as u64))
			.collect())
	}

	fn remove_node(&self, node: NodeId) -> Result<(), DomError> {
		let mut arena = self.arena.borrow_mut();
		let index = arena.index_of(node)?;
		let parent = arena.nodes[index].parent.ok_or_else(|| {
			DomError::Operation("cannot remove the document root".to_string())
		})?;

		arena.nodes[parent].children.retain(|&child| child != index);
		arena.nodes[index].parent = None;
		Ok(())
	}

	fn contains(&self, node: NodeId) -> bool {
		self.arena.borrow().index_of(node).is_ok()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::{fixture, rstest};

	#[fixture]
	fn page() -> MemoryDocument {
		MemoryDocument::parse(
			r#"<header data-init="page-title">Title</header><main id="main"><article id="contentArea" data-cid="42"><p data-init="greeter">Hi</p></article></main>"#,
		)
		.unwrap()
	}

	#[rstest]
	fn test_query_by_attribute(page: MemoryDocument) {
		assert_eq!(page.query_attribute("data-init", None, None).len(), 2);
		assert_eq!(
			page.query_attribute("data-init", Some("greeter"), None).len(),
			1
		);
		assert!(page.query_attribute("data-init", Some("nope"), None).is_empty());
	}

	#[rstest]
	fn test_query_scope_includes_scope_node(page: MemoryDocument) {
		let main = page.element_by_id("main").unwrap();
		let found = page.query_attribute("data-init", None, Some(main));
		assert_eq!(found.len(), 1);

		let article = page.element_by_id("contentArea").unwrap();
		let found = page.query_attribute("data-cid", None, Some(article));
		assert_eq!(found, vec![article]);
	}

	#[rstest]
	fn test_replace_children_detaches_old_nodes(page: MemoryDocument) {
		let main = page.element_by_id("main").unwrap();
		let old = page.query_attribute("data-init", Some("greeter"), None)[0];

		page.replace_children(main, r#"<p data-init="greeter">New</p>"#)
			.unwrap();

		let new = page.query_attribute("data-init", Some("greeter"), None)[0];
		assert_ne!(old, new);
		assert!(!page.contains(old));
		assert!(page.contains(new));
		assert_eq!(page.text_content(main).as_deref(), Some("New"));
	}

	#[rstest]
	fn test_inner_html_round_trip(page: MemoryDocument) {
		let article = page.element_by_id("contentArea").unwrap();
		assert_eq!(
			page.inner_html(article).as_deref(),
			Some(r#"<p data-init="greeter">Hi</p>"#)
		);
	}

	#[rstest]
	#[case(InsertPosition::Prepend, r#"<i id="x"></i><article id="contentArea""#)]
	#[case(InsertPosition::Append, r#"</article><i id="x"></i>"#)]
	fn test_insert_markup_positions(
		page: MemoryDocument,
		#[case] position: InsertPosition,
		#[case] expected: &str,
	) {
		let main = page.element_by_id("main").unwrap();
		let inserted = page
			.insert_markup(main, r#"<i id="x"></i>"#, position)
			.unwrap();

		assert_eq!(inserted.len(), 1);
		assert!(page.inner_html(main).unwrap().contains(expected));
	}

	#[rstest]
	fn test_insert_before(page: MemoryDocument) {
		let article = page.element_by_id("contentArea").unwrap();
		page.insert_markup(article, "<hr>", InsertPosition::Before)
			.unwrap();

		let main = page.element_by_id("main").unwrap();
		assert!(
			page.inner_html(main)
				.unwrap()
				.starts_with("<hr><article")
		);
	}

	#[rstest]
	fn test_insert_returns_only_elements(page: MemoryDocument) {
		let main = page.element_by_id("main").unwrap();
		let inserted = page
			.insert_markup(main, "text<b>bold</b><!-- c -->", InsertPosition::Append)
			.unwrap();
		assert_eq!(inserted.len(), 1);
		assert_eq!(page.tag_name(inserted[0]).as_deref(), Some("b"));
	}

	#[rstest]
	fn test_remove_node(page: MemoryDocument) {
		let article = page.element_by_id("contentArea").unwrap();
		let greeter = page.query_attribute("data-init", Some("greeter"), None)[0];

		page.remove_node(article).unwrap();

		assert!(!page.contains(article));
		assert!(!page.contains(greeter));
		assert_eq!(
			page.remove_node(article),
			Err(DomError::Detached(article.raw()))
		);
	}

	#[rstest]
	fn test_root_cannot_be_removed(page: MemoryDocument) {
		assert!(matches!(
			page.remove_node(page.root()),
			Err(DomError::Operation(_))
		));
	}

	#[rstest]
	fn test_set_attribute(page: MemoryDocument) {
		let main = page.element_by_id("main").unwrap();
		page.set_attribute(main, "data-init", "late").unwrap();
		assert_eq!(page.attribute(main, "data-init").as_deref(), Some("late"));
	}

	#[rstest]
	fn test_inline_script_serializes_verbatim() {
		let script = r#"<script id="boot">if (a < b && c) {}</script>"#;
		let doc = MemoryDocument::parse(&format!(r#"<div id="contentArea">{}</div>"#, script))
			.unwrap();
		let area = doc.element_by_id("contentArea").unwrap();
		let boot = doc.element_by_id("boot").unwrap();

		let html = doc.inner_html(area).unwrap();
		assert_eq!(html, script);
		assert_eq!(doc.inner_html(boot).as_deref(), Some("if (a < b && c) {}"));

		let reparsed = MemoryDocument::parse(&html).unwrap();
		assert_eq!(
			reparsed.text_content(reparsed.root()).as_deref(),
			Some("if (a < b && c) {}")
		);
	}

	#[rstest]
	fn test_plain_text_still_escaped() {
		let doc = MemoryDocument::parse(r#"<p id="p">a &lt; b &amp; c</p>"#).unwrap();
		let p = doc.element_by_id("p").unwrap();
		assert_eq!(doc.inner_html(p).as_deref(), Some("a &lt; b &amp; c"));
	}

	#[rstest]
	fn test_malformed_swap_keeps_old_content(page: MemoryDocument) {
		let main = page.element_by_id("main").unwrap();
		let before = page.inner_html(main);
		assert!(page.replace_children(main, "<div>").is_err());
		assert_eq!(page.inner_html(main), before);
	}
}
