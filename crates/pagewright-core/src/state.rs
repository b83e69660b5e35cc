//! Page state snapshot
//!
//! Holds where the current content came from, what the content area looks
//! like, and a free-form key/value map shared between element handlers.
//! Values are explicit: `0`, `""` and `false` are stored values, absence is
//! `None`.

use crate::dom::Document;
use crate::error::StateError;
use crate::lifecycle::{LifecycleBus, Phase, SubscriptionId};
use crate::observable::Observable;
use crate::settings::RuntimeSettings;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;

/// Value stored in the snapshot.
pub type StateValue = serde_json::Value;

/// How the current content arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavigationOrigin {
	/// Full page load by the browser.
	#[default]
	Fresh,
	/// Soft navigation started by a link click.
	#[serde(rename = "click")]
	ClientNav,
	/// Soft navigation started by history traversal.
	#[serde(rename = "popstate")]
	HistoryNav,
}

impl NavigationOrigin {
	/// Returns the origin name.
	pub fn as_str(&self) -> &'static str {
		match self {
			NavigationOrigin::Fresh => "fresh",
			NavigationOrigin::ClientNav => "click",
			NavigationOrigin::HistoryNav => "popstate",
		}
	}

	/// The lifecycle phase that announces a navigation of this origin.
	pub fn trigger_phase(&self) -> Option<Phase> {
		match self {
			NavigationOrigin::Fresh => None,
			NavigationOrigin::ClientNav => Some(Phase::Click),
			NavigationOrigin::HistoryNav => Some(Phase::Popstate),
		}
	}
}

impl fmt::Display for NavigationOrigin {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Facts about the primary content region.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentInfo {
	/// Id of the content area element.
	pub area_id: String,
	/// Pristine markup captured by [`StateSnapshot::register_area`].
	pub html: Option<String>,
	/// Content id read from the content id carrier.
	pub content_id: Option<String>,
	/// Permalink read from the permalink carrier.
	pub permalink: Option<String>,
}

/// Well-known snapshot keys.
pub mod keys {
	/// Navigation origin, read-only.
	pub const ORIGIN: &str = "origin";
	/// Captured content area markup.
	pub const CONTENT_HTML: &str = "content_html";
	/// Current content id.
	pub const CONTENT_ID: &str = "content_id";
	/// Current permalink.
	pub const PERMALINK: &str = "permalink";
	/// Content area element id.
	pub const CONTENT_AREA: &str = "content_area";
}

/// Shared page state.
#[derive(Debug)]
pub struct StateSnapshot {
	origin: Observable<NavigationOrigin>,
	content: RefCell<ContentInfo>,
	values: RefCell<BTreeMap<String, StateValue>>,
	permalink_attribute: String,
	content_id_attribute: String,
}

impl StateSnapshot {
	/// Creates a snapshot for a freshly loaded page.
	pub fn new(settings: &RuntimeSettings) -> Self {
		Self {
			origin: Observable::new("state", keys::ORIGIN, NavigationOrigin::Fresh),
			content: RefCell::new(ContentInfo {
				area_id: settings.content_area_id.clone(),
				..Default::default()
			}),
			values: RefCell::new(BTreeMap::new()),
			permalink_attribute: settings.permalink_attribute.clone(),
			content_id_attribute: settings.content_id_attribute.clone(),
		}
	}

	/// Subscribes the origin tracking listeners to `bus`.
	pub fn attach(&self, bus: &LifecycleBus) -> [SubscriptionId; 2] {
		let click = self.origin.clone();
		let popstate = self.origin.clone();
		[
			bus.on(
				Phase::Click,
				move || click.set(NavigationOrigin::ClientNav),
				false,
			),
			bus.on(
				Phase::Popstate,
				move || popstate.set(NavigationOrigin::HistoryNav),
				false,
			),
		]
	}

	/// The observable navigation origin.
	///
	/// Observers may subscribe to it; writes belong to the lifecycle listeners.
	pub fn origin(&self) -> &Observable<NavigationOrigin> {
		&self.origin
	}

	/// Current navigation origin.
	pub fn loaded_from(&self) -> NavigationOrigin {
		self.origin.get()
	}

	/// Whether the current content arrived through `origin`.
	pub fn is_loaded_from(&self, origin: NavigationOrigin) -> bool {
		self.origin.get() == origin
	}

	/// Returns a copy of the content information.
	pub fn content(&self) -> ContentInfo {
		self.content.borrow().clone()
	}

	/// Captures the markup of the content area.
	///
	/// With `area_id`, that id becomes the content area. Returns whether the
	/// area was found; when it is not, the captured markup is cleared.
	pub fn register_area(&self, doc: &dyn Document, area_id: Option<&str>) -> bool {
		let mut content = self.content.borrow_mut();
		if let Some(id) = area_id.filter(|id| !id.is_empty()) {
			content.area_id = id.to_string();
		}

		content.html = doc
			.element_by_id(&content.area_id)
			.and_then(|area| doc.inner_html(area));
		content.html.is_some()
	}

	/// Re-reads the permalink and content id carriers.
	pub fn refresh_info(&self, doc: &dyn Document) {
		let first_value = |attr: &str| {
			doc.query_attribute(attr, None, None)
				.into_iter()
				.next()
				.and_then(|node| doc.attribute(node, attr))
		};

		let content_id = first_value(&self.content_id_attribute);
		let permalink = first_value(&self.permalink_attribute);

		let mut content = self.content.borrow_mut();
		content.content_id = content_id;
		content.permalink = permalink;
	}

	/// Reads a value.
	pub fn get(&self, key: &str) -> Option<StateValue> {
		let content = self.content.borrow();
		match key {
			keys::ORIGIN => Some(StateValue::from(self.origin.get().as_str())),
			keys::CONTENT_HTML => content.html.clone().map(StateValue::from),
			keys::CONTENT_ID => content.content_id.clone().map(StateValue::from),
			keys::PERMALINK => content.permalink.clone().map(StateValue::from),
			keys::CONTENT_AREA => Some(StateValue::from(content.area_id.clone())),
			_ => self.values.borrow().get(key).cloned(),
		}
	}

	/// Writes a value.
	///
	/// Well-known content keys accept strings (and `null` for the optional
	/// ones). `origin` is read-only.
	pub fn set(&self, key: &str, value: impl Into<StateValue>) -> Result<(), StateError> {
		let value = value.into();
		match key {
			keys::ORIGIN => Err(StateError::ReadOnly(key.to_string())),
			keys::CONTENT_AREA => {
				let id = as_string(key, value)?.ok_or_else(|| StateError::InvalidValue {
					field: key.to_string(),
					expected: "a string",
				})?;
				self.content.borrow_mut().area_id = id;
				Ok(())
			}
			keys::CONTENT_HTML => {
				self.content.borrow_mut().html = as_string(key, value)?;
				Ok(())
			}
			keys::CONTENT_ID => {
				self.content.borrow_mut().content_id = as_string(key, value)?;
				Ok(())
			}
			keys::PERMALINK => {
				self.content.borrow_mut().permalink = as_string(key, value)?;
				Ok(())
			}
			_ => {
				self.values.borrow_mut().insert(key.to_string(), value);
				Ok(())
			}
		}
	}

	/// Removes a free-form value, returning it.
	pub fn remove(&self, key: &str) -> Result<Option<StateValue>, StateError> {
		match key {
			keys::ORIGIN | keys::CONTENT_AREA => Err(StateError::ReadOnly(key.to_string())),
			keys::CONTENT_HTML => Ok(self.content.borrow_mut().html.take().map(StateValue::from)),
			keys::CONTENT_ID => Ok(self
				.content
				.borrow_mut()
				.content_id
				.take()
				.map(StateValue::from)),
			keys::PERMALINK => Ok(self
				.content
				.borrow_mut()
				.permalink
				.take()
				.map(StateValue::from)),
			_ => Ok(self.values.borrow_mut().remove(key)),
		}
	}
}

fn as_string(field: &str, value: StateValue) -> Result<Option<String>, StateError> {
	match value {
		StateValue::Null => Ok(None),
		StateValue::String(s) => Ok(Some(s)),
		_ => Err(StateError::InvalidValue {
			field: field.to_string(),
			expected: "a string or null",
		}),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::dom::MemoryDocument;
	use rstest::{fixture, rstest};
	use serde_json::json;

	#[fixture]
	fn snapshot() -> StateSnapshot {
		StateSnapshot::new(&RuntimeSettings::default())
	}

	#[rstest]
	#[case(json!(0))]
	#[case(json!(""))]
	#[case(json!(false))]
	#[case(json!(null))]
	fn test_falsy_values_are_stored(snapshot: StateSnapshot, #[case] value: StateValue) {
		snapshot.set("flag", value.clone()).unwrap();
		assert_eq!(snapshot.get("flag"), Some(value));
	}

	#[rstest]
	fn test_absent_key(snapshot: StateSnapshot) {
		assert_eq!(snapshot.get("missing"), None);
		assert_eq!(snapshot.remove("missing").unwrap(), None);
	}

	#[rstest]
	fn test_origin_is_read_only(snapshot: StateSnapshot) {
		assert_eq!(
			snapshot.set(keys::ORIGIN, "click"),
			Err(StateError::ReadOnly("origin".to_string()))
		);
		assert_eq!(snapshot.get(keys::ORIGIN), Some(json!("fresh")));
	}

	#[rstest]
	fn test_origin_follows_bus(snapshot: StateSnapshot) {
		let bus = LifecycleBus::new();
		snapshot.attach(&bus);

		assert!(snapshot.is_loaded_from(NavigationOrigin::Fresh));
		bus.emit(Phase::Click);
		assert!(snapshot.is_loaded_from(NavigationOrigin::ClientNav));
		bus.emit(Phase::Popstate);
		assert_eq!(snapshot.loaded_from(), NavigationOrigin::HistoryNav);
	}

	#[rstest]
	fn test_well_known_keys(snapshot: StateSnapshot) {
		snapshot.set(keys::PERMALINK, "/posts/1").unwrap();
		assert_eq!(snapshot.content().permalink.as_deref(), Some("/posts/1"));
		assert_eq!(snapshot.get(keys::CONTENT_AREA), Some(json!("contentArea")));

		assert!(matches!(
			snapshot.set(keys::CONTENT_ID, 7),
			Err(StateError::InvalidValue { .. })
		));
	}

	#[rstest]
	fn test_register_area_and_refresh_info(snapshot: StateSnapshot) {
		let doc = MemoryDocument::parse(
			r#"<main id="main"><article id="contentArea" data-cid="12"><p>Body</p></article><link data-permalink="https://example.com/12"></main>"#,
		)
		.unwrap();

		assert!(snapshot.register_area(&doc, None));
		snapshot.refresh_info(&doc);

		let content = snapshot.content();
		assert_eq!(content.html.as_deref(), Some("<p>Body</p>"));
		assert_eq!(content.content_id.as_deref(), Some("12"));
		assert_eq!(content.permalink.as_deref(), Some("https://example.com/12"));
	}

	#[rstest]
	fn test_register_custom_area(snapshot: StateSnapshot) {
		let doc = MemoryDocument::parse(r#"<div id="post">x</div>"#).unwrap();
		assert!(snapshot.register_area(&doc, Some("post")));
		assert_eq!(snapshot.content().area_id, "post");

		let empty = MemoryDocument::new();
		assert!(!snapshot.register_area(&empty, None));
		assert_eq!(snapshot.content().html, None);
	}

	#[rstest]
	fn test_register_area_keeps_inline_script(snapshot: StateSnapshot) {
		let doc = MemoryDocument::parse(
			r#"<div id="contentArea"><script>if (a < b && c) {}</script></div>"#,
		)
		.unwrap();

		assert!(snapshot.register_area(&doc, None));
		assert_eq!(
			snapshot.content().html.as_deref(),
			Some("<script>if (a < b && c) {}</script>")
		);
	}

	#[rstest]
	fn test_refresh_info_clears_missing_carriers(snapshot: StateSnapshot) {
		snapshot.set(keys::CONTENT_ID, "3").unwrap();
		snapshot.refresh_info(&MemoryDocument::new());
		assert_eq!(snapshot.get(keys::CONTENT_ID), None);
	}
}
