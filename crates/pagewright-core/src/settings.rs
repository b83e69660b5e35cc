//! Runtime settings.
//!
//! Settings are plain serde data so they can come from a TOML file shipped
//! with the theme, from a JSON object embedded by the server, or be built in
//! code. Every field has a default, so partial documents are valid.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Default marker attribute scanned by the element registry.
pub const DEFAULT_INIT_ATTRIBUTE: &str = "data-init";

/// Default attribute carrying declarative resource requests.
pub const DEFAULT_REQUIRE_ATTRIBUTE: &str = "data-require";

/// Settings consumed by [`Runtime`](crate::runtime::Runtime).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
	/// Attribute whose value names the marker of an element.
	pub init_attribute: String,
	/// Attribute whose value lists resources to load for an element.
	pub require_attribute: String,
	/// Id of the region replaced by soft navigation.
	pub main_container_id: String,
	/// Id of the primary content region.
	pub content_area_id: String,
	/// Attribute carrying the current page's permalink.
	pub permalink_attribute: String,
	/// Attribute carrying the current page's content id.
	pub content_id_attribute: String,
	/// Upper bound for a soft navigation request.
	pub request_timeout_ms: u64,
	/// Delay before a soft redirect starts.
	pub redirect_grace_ms: u64,
	/// How long flash messages stay up, and the delay before a hard reload
	/// that follows one.
	pub flash_delay_ms: u64,
	/// Selectors the host wires to soft navigation.
	pub nav_targets: Vec<String>,
	/// Enables verbose diagnostics.
	pub debug: bool,
}

impl Default for RuntimeSettings {
	fn default() -> Self {
		Self {
			init_attribute: DEFAULT_INIT_ATTRIBUTE.to_string(),
			require_attribute: DEFAULT_REQUIRE_ATTRIBUTE.to_string(),
			main_container_id: "main".to_string(),
			content_area_id: "contentArea".to_string(),
			permalink_attribute: "data-permalink".to_string(),
			content_id_attribute: "data-cid".to_string(),
			request_timeout_ms: 8000,
			redirect_grace_ms: 325,
			flash_delay_ms: 2000,
			nav_targets: vec![r#"a:not([target="_blank"])"#.to_string()],
			debug: false,
		}
	}
}

impl RuntimeSettings {
	/// Creates default settings.
	pub fn new() -> Self {
		Self::default()
	}

	/// Parses settings from a TOML document.
	///
	/// # Example
	///
	/// ```
	/// use pagewright_core::settings::RuntimeSettings;
	///
	/// let settings = RuntimeSettings::from_toml_str(r#"
	/// main_container_id = "pjax-container"
	/// request_timeout_ms = 5000
	/// "#).unwrap();
	/// assert_eq!(settings.main_container_id, "pjax-container");
	/// assert_eq!(settings.init_attribute, "data-init");
	/// ```
	pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
		let settings: Self = toml::from_str(source)?;
		settings.validate()?;
		Ok(settings)
	}

	/// Parses settings from a JSON object.
	pub fn from_json_str(source: &str) -> Result<Self, ConfigError> {
		let settings: Self = serde_json::from_str(source)?;
		settings.validate()?;
		Ok(settings)
	}

	/// Reads settings from a JSON object stored on `window[global_name]`.
	///
	/// A missing global yields the defaults.
	#[cfg(target_arch = "wasm32")]
	pub fn from_window(global_name: &str) -> Result<Self, ConfigError> {
		let window = web_sys::window().ok_or(ConfigError::Invalid {
			field: "window",
			reason: "window is not available".to_string(),
		})?;

		let global = js_sys::Reflect::get(&window, &global_name.into()).map_err(|_| {
			ConfigError::Invalid {
				field: "window",
				reason: format!("cannot read window.{}", global_name),
			}
		})?;

		if global.is_undefined() || global.is_null() {
			return Ok(Self::default());
		}

		let json = js_sys::JSON::stringify(&global)
			.ok()
			.and_then(|s| s.as_string())
			.ok_or(ConfigError::Invalid {
				field: "window",
				reason: format!("window.{} is not serializable", global_name),
			})?;

		Self::from_json_str(&json)
	}

	/// Non-WASM version that returns the defaults.
	#[cfg(not(target_arch = "wasm32"))]
	pub fn from_window(_global_name: &str) -> Result<Self, ConfigError> {
		Ok(Self::default())
	}

	/// Appends a soft-navigation target selector.
	///
	/// Meant to run before the host wires link interception.
	pub fn add_nav_target(&mut self, selector: impl Into<String>) {
		self.nav_targets.push(selector.into());
	}

	/// Returns the nav target selectors joined into one selector list.
	pub fn nav_selector(&self) -> String {
		self.nav_targets.join(", ")
	}

	/// Checks that ids are non-empty and attributes are `data-*` names.
	pub fn validate(&self) -> Result<(), ConfigError> {
		check_data_attribute("init_attribute", &self.init_attribute)?;
		check_data_attribute("require_attribute", &self.require_attribute)?;
		check_data_attribute("permalink_attribute", &self.permalink_attribute)?;
		check_data_attribute("content_id_attribute", &self.content_id_attribute)?;
		check_non_empty("main_container_id", &self.main_container_id)?;
		check_non_empty("content_area_id", &self.content_area_id)?;

		if self.request_timeout_ms == 0 {
			return Err(ConfigError::Invalid {
				field: "request_timeout_ms",
				reason: "must be greater than zero".to_string(),
			});
		}

		Ok(())
	}
}

fn check_non_empty(field: &'static str, value: &str) -> Result<(), ConfigError> {
	if value.trim().is_empty() {
		return Err(ConfigError::Invalid {
			field,
			reason: "cannot be empty".to_string(),
		});
	}
	Ok(())
}

fn check_data_attribute(field: &'static str, value: &str) -> Result<(), ConfigError> {
	let valid = value
		.strip_prefix("data-")
		.is_some_and(|rest| !rest.is_empty() && rest.chars().all(is_attribute_char));

	if !valid {
		return Err(ConfigError::Invalid {
			field,
			reason: format!("'{}' is not a data-* attribute name", value),
		});
	}
	Ok(())
}

fn is_attribute_char(c: char) -> bool {
	c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_'
}
