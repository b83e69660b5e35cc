//! Element lifecycle registry
//!
//! Maps markers (values of the init attribute) to element handlers and
//! invokes each handler at most once per element.
//!
//! ## Resolution
//!
//! A marker maps to a [`HandlerRef`]:
//!
//! - [`HandlerRef::Named`] is looked up in the [`HandlerTable`] when an
//!   element is found, so handlers may be defined after registration.
//! - [`HandlerRef::Direct`] carries the handler itself.
//!
//! ## Visited elements
//!
//! The registry keeps its own set of visited [`NodeId`]s instead of flagging
//! DOM nodes. An element is marked visited *before* its handler runs, so a
//! handler that triggers another scan never sees its own element again. An
//! element whose marker or handler cannot be resolved is still marked.

use crate::dom::NodeId;
use crate::error::HandlerError;
use crate::lifecycle::CoreSignal;
use crate::runtime::Runtime;
use std::borrow::Borrow;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

/// Value of the init attribute naming a behavior.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Marker(String);

impl Marker {
	/// Wraps a marker value.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the marker value.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl From<&str> for Marker {
	fn from(value: &str) -> Self {
		Self::new(value)
	}
}

impl From<String> for Marker {
	fn from(value: String) -> Self {
		Self(value)
	}
}

impl Borrow<str> for Marker {
	fn borrow(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for Marker {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// Name of a handler in the [`HandlerTable`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerName(String);

impl HandlerName {
	/// Wraps a handler name.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Derives the conventional handler name of a marker.
	pub fn from_marker(marker: &Marker) -> Self {
		Self(kebab_to_camel(marker.as_str()))
	}

	/// Returns the name.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl From<&str> for HandlerName {
	fn from(value: &str) -> Self {
		Self::new(value)
	}
}

impl Borrow<str> for HandlerName {
	fn borrow(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for HandlerName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// Converts `kebab-case` to `camelCase`.
///
/// Only a hyphen followed by a lowercase ASCII letter is folded; any other
/// hyphen is kept.
///
/// # Example
///
/// ```
/// use pagewright_core::registry::kebab_to_camel;
///
/// assert_eq!(kebab_to_camel("instant-toc"), "instantToc");
/// assert_eq!(kebab_to_camel("page-title"), "pageTitle");
/// ```
pub fn kebab_to_camel(input: &str) -> String {
	let mut out = String::with_capacity(input.len());
	let mut chars = input.chars().peekable();

	while let Some(c) = chars.next() {
		match (c, chars.peek()) {
			('-', Some(next)) if next.is_ascii_lowercase() => {
				out.push(next.to_ascii_uppercase());
				chars.next();
			}
			_ => out.push(c),
		}
	}

	out
}

/// What a handler receives for the element it initializes.
#[derive(Clone)]
pub struct ElementContext {
	node: NodeId,
	marker: Marker,
	runtime: Runtime,
}

impl ElementContext {
	pub(crate) fn new(node: NodeId, marker: Marker, runtime: Runtime) -> Self {
		Self {
			node,
			marker,
			runtime,
		}
	}

	/// The element being initialized.
	pub fn node(&self) -> NodeId {
		self.node
	}

	/// The marker that selected the element.
	pub fn marker(&self) -> &Marker {
		&self.marker
	}

	/// The owning runtime.
	pub fn runtime(&self) -> &Runtime {
		&self.runtime
	}

	/// Reads an attribute of the element.
	pub fn attribute(&self, name: &str) -> Option<String> {
		self.runtime.document().attribute(self.node, name)
	}

	/// Reads a `data-*` attribute of the element by its suffix.
	pub fn data(&self, key: &str) -> Option<String> {
		self.attribute(&format!("data-{}", key))
	}

	/// Runs `teardown` once, right before the next content swap.
	pub fn bind_teardown(&self, teardown: impl Fn() + 'static) {
		self.runtime.bind_teardown(teardown);
	}
}

impl fmt::Debug for ElementContext {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ElementContext")
			.field("node", &self.node)
			.field("marker", &self.marker)
			.finish_non_exhaustive()
	}
}

/// Element behavior invoked once per element.
pub type ElementHandler = Rc<dyn Fn(&ElementContext) -> Result<(), HandlerError>>;

/// How a marker resolves to its handler.
#[derive(Clone)]
pub enum HandlerRef {
	/// Looked up in the handler table at invocation time.
	Named(HandlerName),
	/// Bound at registration time.
	Direct(ElementHandler),
}

impl fmt::Debug for HandlerRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			HandlerRef::Named(name) => f.debug_tuple("Named").field(name).finish(),
			HandlerRef::Direct(_) => f.write_str("Direct(..)"),
		}
	}
}

/// Named element handlers.
#[derive(Default)]
pub struct HandlerTable {
	handlers: HashMap<HandlerName, ElementHandler>,
}

impl HandlerTable {
	/// Creates an empty table.
	pub fn new() -> Self {
		Self::default()
	}

	/// Inserts or replaces a handler, returning the previous one.
	pub fn define(&mut self, name: HandlerName, handler: ElementHandler) -> Option<ElementHandler> {
		self.handlers.insert(name, handler)
	}

	/// Looks up a handler.
	pub fn get(&self, name: &str) -> Option<ElementHandler> {
		self.handlers.get(name).cloned()
	}

	/// Whether a handler is defined under `name`.
	pub fn contains(&self, name: &str) -> bool {
		self.handlers.contains_key(name)
	}

	/// Number of defined handlers.
	pub fn len(&self) -> usize {
		self.handlers.len()
	}

	/// Returns true if no handler is defined.
	pub fn is_empty(&self) -> bool {
		self.handlers.is_empty()
	}
}

impl fmt::Debug for HandlerTable {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_set().entries(self.handlers.keys()).finish()
	}
}

/// A handler error caught during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerFault {
	/// The element whose handler failed.
	pub node: NodeId,
	/// The element's marker.
	pub marker: Marker,
	/// The returned error.
	pub error: HandlerError,
}

/// Outcome of [`ElementRegistry::scan`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
	/// Elements whose handler ran, failing or not.
	pub invoked: Vec<NodeId>,
	/// Elements marked visited without a resolvable handler.
	pub skipped: Vec<NodeId>,
	/// Handler errors, in scan order.
	pub faults: Vec<HandlerFault>,
}

impl ScanReport {
	/// Whether every invoked handler succeeded.
	pub fn is_clean(&self) -> bool {
		self.faults.is_empty()
	}

	/// Appends another report.
	pub fn merge(&mut self, other: ScanReport) {
		self.invoked.extend(other.invoked);
		self.skipped.extend(other.skipped);
		self.faults.extend(other.faults);
	}
}

/// Marker mappings, named handlers and the visited set.
#[derive(Debug)]
pub struct ElementRegistry {
	init_attribute: String,
	markers: RefCell<HashMap<Marker, HandlerRef>>,
	handlers: RefCell<HandlerTable>,
	visited: RefCell<HashSet<NodeId>>,
}

impl ElementRegistry {
	/// Creates a registry scanning `init_attribute`.
	pub fn new(init_attribute: impl Into<String>) -> Self {
		Self {
			init_attribute: init_attribute.into(),
			markers: RefCell::new(HashMap::new()),
			handlers: RefCell::new(HandlerTable::new()),
			visited: RefCell::new(HashSet::new()),
		}
	}

	/// The scanned attribute.
	pub fn init_attribute(&self) -> &str {
		&self.init_attribute
	}

	/// Maps `marker` to a handler reference.
	///
	/// Returns `true` when an earlier mapping was overwritten.
	pub fn insert(&self, marker: Marker, handler: HandlerRef) -> bool {
		let replaced = self
			.markers
			.borrow_mut()
			.insert(marker.clone(), handler)
			.is_some();
		if replaced {
			crate::warn_log!(
				"Marker '{}' was registered more than once; the last registration wins",
				marker
			);
		}
		replaced
	}

	/// Maps `marker` to a named handler: `alias` when given, otherwise the
	/// camel-cased marker.
	pub fn insert_named(&self, marker: Marker, alias: Option<&str>) -> bool {
		let name = match alias {
			Some(alias) if !alias.is_empty() => HandlerName::new(alias),
			_ => HandlerName::from_marker(&marker),
		};
		self.insert(marker, HandlerRef::Named(name))
	}

	/// Defines a named handler.
	pub fn define(&self, name: impl Into<HandlerName>, handler: ElementHandler) {
		self.handlers.borrow_mut().define(name.into(), handler);
	}

	/// Whether `marker` has a mapping.
	pub fn is_registered(&self, marker: &str) -> bool {
		self.markers.borrow().contains_key(marker)
	}

	/// Whether a named handler exists.
	pub fn is_defined(&self, name: &str) -> bool {
		self.handlers.borrow().contains(name)
	}

	/// Whether `node` was already visited.
	pub fn is_visited(&self, node: NodeId) -> bool {
		self.visited.borrow().contains(&node)
	}

	/// Number of visited elements still tracked.
	pub fn visited_count(&self) -> usize {
		self.visited.borrow().len()
	}

	/// Drops visited entries for elements no longer in the document.
	pub fn prune(&self, contains: impl Fn(NodeId) -> bool) -> usize {
		let mut visited = self.visited.borrow_mut();
		let before = visited.len();
		visited.retain(|node| contains(*node));
		before - visited.len()
	}

	fn resolve(&self, marker: &str) -> Option<ElementHandler> {
		let handler_ref = self.markers.borrow().get(marker).cloned()?;
		match handler_ref {
			HandlerRef::Direct(handler) => Some(handler),
			HandlerRef::Named(name) => self.handlers.borrow().get(name.as_str()),
		}
	}

	/// Initializes unvisited elements.
	///
	/// Selects elements carrying the init attribute, optionally restricted to
	/// `marker` and to the subtree of `scope` (the scope element included).
	/// Handler errors are logged and collected; scanning continues. Emits
	/// [`CoreSignal::ElementsReady`] when done.
	pub fn scan(&self, runtime: &Runtime, marker: Option<&Marker>, scope: Option<NodeId>) -> ScanReport {
		let nodes = runtime.document().query_attribute(
			&self.init_attribute,
			marker.map(Marker::as_str),
			scope,
		);

		let report = self.visit(runtime, nodes);
		runtime.signals().emit(CoreSignal::ElementsReady);
		report
	}

	/// Initializes the unvisited elements among `nodes`, in order, without
	/// emitting [`CoreSignal::ElementsReady`].
	pub(crate) fn visit(&self, runtime: &Runtime, nodes: Vec<NodeId>) -> ScanReport {
		let doc = runtime.document();
		let mut report = ScanReport::default();
		for node in nodes {
			// An earlier handler may have removed it.
			if !doc.contains(node) || !self.visited.borrow_mut().insert(node) {
				continue;
			}

			let marker = Marker::new(doc.attribute(node, &self.init_attribute).unwrap_or_default());
			let Some(handler) = self.resolve(marker.as_str()) else {
				crate::debug_log!("No handler resolved for marker '{}' on {}", marker, node);
				report.skipped.push(node);
				continue;
			};

			let context = ElementContext::new(node, marker.clone(), runtime.clone());
			report.invoked.push(node);
			if let Err(error) = handler(&context) {
				crate::warn_log!("Handler for marker '{}' failed on {}: {}", marker, node, error);
				report.faults.push(HandlerFault {
					node,
					marker,
					error,
				});
			}
		}
		report
	}
}
