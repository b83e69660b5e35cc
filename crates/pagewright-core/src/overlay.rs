//! Single modal overlay slot.

use crate::dom::{Document, NodeId};
use crate::error::DomError;
use std::cell::Cell;

/// Holds at most one active overlay element.
#[derive(Debug, Default)]
pub struct OverlaySlot {
	current: Cell<Option<NodeId>>,
}

impl OverlaySlot {
	/// Creates an empty slot.
	pub fn new() -> Self {
		Self::default()
	}

	/// Makes `node` the active overlay and returns the previous one.
	///
	/// The previous overlay is left in the document; the caller decides what
	/// happens to it.
	pub fn open(&self, node: NodeId) -> Option<NodeId> {
		self.current.replace(Some(node))
	}

	/// The active overlay.
	pub fn current(&self) -> Option<NodeId> {
		self.current.get()
	}

	/// Empties the slot without touching the document.
	pub fn take(&self) -> Option<NodeId> {
		self.current.take()
	}

	/// Empties the slot and removes the overlay from the document.
	///
	/// An overlay that is already detached is not an error.
	pub fn destroy(&self, doc: &dyn Document) -> Result<Option<NodeId>, DomError> {
		let Some(node) = self.current.take() else {
			return Ok(None);
		};

		if doc.contains(node) {
			doc.remove_node(node)?;
		}
		Ok(Some(node))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::dom::MemoryDocument;
	use rstest::rstest;

	#[rstest]
	fn test_open_returns_previous() {
		let slot = OverlaySlot::new();
		assert_eq!(slot.open(NodeId::new(1)), None);
		assert_eq!(slot.open(NodeId::new(2)), Some(NodeId::new(1)));
		assert_eq!(slot.current(), Some(NodeId::new(2)));
		assert_eq!(slot.take(), Some(NodeId::new(2)));
		assert_eq!(slot.current(), None);
	}

	#[rstest]
	fn test_destroy_removes_node() {
		let doc = MemoryDocument::parse(r#"<div class="overlay" id="o"></div>"#).unwrap();
		let node = doc.element_by_id("o").unwrap();
		let slot = OverlaySlot::new();
		slot.open(node);

		assert_eq!(slot.destroy(&doc), Ok(Some(node)));
		assert!(!doc.contains(node));
		assert_eq!(slot.destroy(&doc), Ok(None));
	}

	#[rstest]
	fn test_destroy_detached_overlay() {
		let doc = MemoryDocument::parse(r#"<div id="o"></div>"#).unwrap();
		let node = doc.element_by_id("o").unwrap();
		doc.remove_node(node).unwrap();

		let slot = OverlaySlot::new();
		slot.open(node);
		assert_eq!(slot.destroy(&doc), Ok(Some(node)));
	}
}
