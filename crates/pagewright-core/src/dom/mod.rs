//! DOM abstraction layer
//!
//! The runtime never touches a browser document directly. Everything it needs
//! (attribute queries, region swaps, markup insertion) goes through the
//! [`Document`] trait, which has two implementations:
//!
//! - [`MemoryDocument`]: a headless arena tree, used on native targets and in tests.
//! - `WebDocument` (wasm32 only): a `web-sys` adapter over the live document.
//!
//! Nodes are referred to by [`NodeId`]. Ids are issued by the adapter and are
//! never reused, so a node recreated by a content swap always gets a fresh id.

pub mod markup;
mod memory;
#[cfg(target_arch = "wasm32")]
mod web;

pub use memory::MemoryDocument;
#[cfg(target_arch = "wasm32")]
pub use web::WebDocument;

use crate::error::DomError;
use std::fmt;

/// Identity of a node issued by a [`Document`] adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
	/// Wraps a raw id.
	pub const fn new(raw: u64) -> Self {
		Self(raw)
	}

	/// Returns the raw id.
	pub const fn raw(self) -> u64 {
		self.0
	}
}

impl fmt::Display for NodeId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

/// Where [`Document::insert_markup`] places new content relative to an anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPosition {
	/// As the anchor's previous siblings.
	Before,
	/// As the anchor's first children.
	Prepend,
	/// As the anchor's last children.
	Append,
}

impl InsertPosition {
	/// Maps the legacy numeric offset: `-1` before, `0` prepend, anything else append.
	pub fn from_offset(offset: i32) -> Self {
		match offset {
			-1 => Self::Before,
			0 => Self::Prepend,
			_ => Self::Append,
		}
	}
}

/// DOM query and mutation capability consumed by the runtime.
///
/// Methods take `&self`; adapters use interior mutability so that element
/// handlers can mutate the document while the runtime holds a shared handle.
pub trait Document {
	/// Returns element nodes carrying `attr`, in document order.
	///
	/// With `value`, only nodes whose attribute equals it exactly. With
	/// `scope`, only the scope node itself and its descendants.
	fn query_attribute(&self, attr: &str, value: Option<&str>, scope: Option<NodeId>)
	-> Vec<NodeId>;

	/// Returns an attribute value.
	fn attribute(&self, node: NodeId, name: &str) -> Option<String>;

	/// Finds an element by its `id` attribute.
	fn element_by_id(&self, id: &str) -> Option<NodeId>;

	/// Serializes a node's children.
	fn inner_html(&self, node: NodeId) -> Option<String>;

	/// Concatenated text of a node's descendants.
	fn text_content(&self, node: NodeId) -> Option<String>;

	/// Replaces a node's children with parsed markup.
	fn replace_children(&self, node: NodeId, markup: &str) -> Result<(), DomError>;

	/// Inserts parsed markup relative to `anchor`, returning the inserted
	/// top-level element nodes.
	fn insert_markup(
		&self,
		anchor: NodeId,
		markup: &str,
		position: InsertPosition,
	) -> Result<Vec<NodeId>, DomError>;

	/// Detaches a node from the document.
	fn remove_node(&self, node: NodeId) -> Result<(), DomError>;

	/// Whether a node is still attached to the document.
	fn contains(&self, node: NodeId) -> bool;
}
