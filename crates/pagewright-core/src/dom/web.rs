//! Browser document adapter.
//!
//! Node ids live in a side table: a `WeakMap` from element to id, so that
//! nothing is written onto DOM nodes, plus an id to element map for the
//! reverse lookup. Entries for disconnected elements are pruned after every
//! mutation.

use super::{Document, InsertPosition, NodeId};
use crate::error::DomError;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use wasm_bindgen::{JsCast, JsValue};

/// [`Document`] over the live browser document.
pub struct WebDocument {
	document: web_sys::Document,
	ids: js_sys::WeakMap,
	elements: RefCell<HashMap<u64, web_sys::Element>>,
	next_id: Cell<u64>,
}

impl std::fmt::Debug for WebDocument {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("WebDocument")
			.field("tracked", &self.elements.borrow().len())
			.finish()
	}
}

impl WebDocument {
	/// Wraps `window.document`.
	pub fn new() -> Result<Self, DomError> {
		let document = web_sys::window()
			.and_then(|w| w.document())
			.ok_or_else(|| DomError::Operation("document is not available".to_string()))?;
		Ok(Self::from_document(document))
	}

	/// Wraps a specific document.
	pub fn from_document(document: web_sys::Document) -> Self {
		Self {
			document,
			ids: js_sys::WeakMap::new(),
			elements: RefCell::new(HashMap::new()),
			next_id: Cell::new(1),
		}
	}

	/// Returns the id of `element`, issuing one on first sight.
	pub fn id_of(&self, element: &web_sys::Element) -> NodeId {
		let key: &js_sys::Object = element.unchecked_ref();
		let raw = match self.ids.get(key).as_f64() {
			Some(existing) => existing as u64,
			None => {
				let issued = self.next_id.get();
				self.next_id.set(issued + 1);
				self.ids.set(key, &JsValue::from_f64(issued as f64));
				issued
			}
		};
		self.elements.borrow_mut().insert(raw, element.clone());
		NodeId::new(raw)
	}

	/// Returns the connected element behind `node`.
	pub fn element(&self, node: NodeId) -> Option<web_sys::Element> {
		self.elements
			.borrow()
			.get(&node.raw())
			.filter(|el| el.is_connected())
			.cloned()
	}

	fn require(&self, node: NodeId) -> Result<web_sys::Element, DomError> {
		self.element(node).ok_or(DomError::Detached(node.raw()))
	}

	fn prune(&self) {
		self.elements.borrow_mut().retain(|_, el| el.is_connected());
	}

	fn collect(&self, list: web_sys::NodeList, out: &mut Vec<NodeId>) {
		for index in 0..list.length() {
			if let Some(element) = list.get(index).and_then(|n| n.dyn_into::<web_sys::Element>().ok()) {
				out.push(self.id_of(&element));
			}
		}
	}

	fn element_children(parent: &web_sys::Element) -> Vec<web_sys::Element> {
		let children = parent.children();
		(0..children.length())
			.filter_map(|index| children.item(index))
			.collect()
	}
}

fn selector(attr: &str, value: Option<&str>) -> String {
	match value {
		Some(value) => format!(
			"[{}=\"{}\"]",
			attr,
			value.replace('\\', "\\\\").replace('"', "\\\"")
		),
		None => format!("[{}]", attr),
	}
}

fn js_error(value: JsValue) -> DomError {
	DomError::Operation(
		value
			.as_string()
			.unwrap_or_else(|| format!("{:?}", value)),
	)
}

impl Document for WebDocument {
	fn query_attribute(
		&self,
		attr: &str,
		value: Option<&str>,
		scope: Option<NodeId>,
	) -> Vec<NodeId> {
		let selector = selector(attr, value);
		let mut found = Vec::new();

		match scope {
			Some(scope) => {
				let Some(root) = self.element(scope) else {
					return found;
				};
				if root.matches(&selector).unwrap_or(false) {
					found.push(scope);
				}
				if let Ok(list) = root.query_selector_all(&selector) {
					self.collect(list, &mut found);
				}
			}
			None => {
				if let Ok(list) = self.document.query_selector_all(&selector) {
					self.collect(list, &mut found);
				}
			}
		}

		found
	}

	fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
		self.element(node)?.get_attribute(name)
	}

	fn element_by_id(&self, id: &str) -> Option<NodeId> {
		self.document
			.get_element_by_id(id)
			.map(|el| self.id_of(&el))
	}

	fn inner_html(&self, node: NodeId) -> Option<String> {
		self.element(node).map(|el| el.inner_html())
	}

	fn text_content(&self, node: NodeId) -> Option<String> {
		self.element(node).and_then(|el| el.text_content())
	}

	fn replace_children(&self, node: NodeId, markup: &str) -> Result<(), DomError> {
		self.require(node)?.set_inner_html(markup);
		self.prune();
		Ok(())
	}

	fn insert_markup(
		&self,
		anchor: NodeId,
		markup: &str,
		position: InsertPosition,
	) -> Result<Vec<NodeId>, DomError> {
		let anchor_el = self.require(anchor)?;

		let inserted = match position {
			InsertPosition::Prepend | InsertPosition::Append => {
				let before = anchor_el.child_element_count() as usize;
				let where_ = if position == InsertPosition::Prepend {
					"afterbegin"
				} else {
					"beforeend"
				};
				anchor_el
					.insert_adjacent_html(where_, markup)
					.map_err(js_error)?;

				let children = Self::element_children(&anchor_el);
				let added = children.len().saturating_sub(before);
				if position == InsertPosition::Prepend {
					children[..added].to_vec()
				} else {
					children[children.len() - added..].to_vec()
				}
			}
			InsertPosition::Before => {
				let parent = anchor_el.parent_element().ok_or_else(|| {
					DomError::Operation("cannot insert before an element without parent".to_string())
				})?;
				let before = parent.child_element_count() as usize;
				anchor_el
					.insert_adjacent_html("beforebegin", markup)
					.map_err(js_error)?;

				let added = (parent.child_element_count() as usize).saturating_sub(before);
				let mut siblings = Vec::with_capacity(added);
				let mut cursor = anchor_el.previous_element_sibling();
				while let Some(sibling) = cursor {
					if siblings.len() == added {
						break;
					}
					cursor = sibling.previous_element_sibling();
					siblings.push(sibling);
				}
				siblings.reverse();
				siblings
			}
		};

		Ok(inserted.iter().map(|el| self.id_of(el)).collect())
	}

	fn remove_node(&self, node: NodeId) -> Result<(), DomError> {
		self.require(node)?.remove();
		self.prune();
		Ok(())
	}

	fn contains(&self, node: NodeId) -> bool {
		self.element(node).is_some()
	}
}
