//! Server responses to asynchronous form submissions
//!
//! A JSON response may carry a message to flash, an action and a redirect
//! target. [`ServerResponse::directives`] turns it into an ordered list of
//! effects which [`Runtime::handle_server_response`](crate::runtime::Runtime::handle_server_response)
//! carries out.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Shortest time a flash message stays visible.
pub const MIN_FLASH_DURATION: Duration = Duration::from_millis(500);

/// Follow-up requested by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResponseAction {
	/// Go back one history entry.
	GoBack,
	/// Reload the current content softly.
	Refresh,
	/// Full reload, to `redirect` when given.
	Tough,
	/// Any action this runtime does not know.
	#[serde(other)]
	Unknown,
}

/// JSON body returned by form endpoints.
///
/// # Example
///
/// ```
/// use pagewright_core::response::{ResponseAction, ServerResponse};
///
/// let response = ServerResponse::from_json(
///     r#"{"success": true, "message": "Saved", "action": "refresh"}"#,
/// ).unwrap();
/// assert_eq!(response.action, Some(ResponseAction::Refresh));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerResponse {
	/// Whether the submission succeeded.
	pub success: bool,
	/// Message to flash.
	pub message: Option<String>,
	/// Follow-up action.
	pub action: Option<ResponseAction>,
	/// Redirect target.
	pub redirect: Option<String>,
	/// Delay in milliseconds before a full reload that follows a message.
	pub delay: Option<u64>,
}

/// One effect derived from a [`ServerResponse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseDirective {
	/// Show a message.
	Flash {
		/// Message text.
		message: String,
		/// How long it stays up.
		duration: Duration,
	},
	/// Go back one history entry.
	HistoryBack,
	/// Soft reload of the current location.
	SoftRefresh,
	/// Full reload, optionally to another url, optionally after a delay.
	HardReload {
		/// Target url; the current location when absent.
		target: Option<String>,
		/// Wait before reloading.
		delay: Option<Duration>,
	},
	/// Soft navigation to a url.
	SoftRedirect(String),
}

impl ServerResponse {
	/// Parses a JSON response body.
	pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
		serde_json::from_str(body)
	}

	fn flash_message(&self) -> Option<&str> {
		self.message.as_deref().filter(|m| !m.is_empty())
	}

	fn redirect_target(&self) -> Option<&str> {
		self.redirect.as_deref().filter(|r| !r.is_empty())
	}

	/// Derives the effects in execution order.
	///
	/// A full reload is delayed only when a message is flashed first, by
	/// `delay` or else `flash_delay`. With the `tough` action, `redirect` is
	/// the reload target and does not also trigger a soft redirect.
	pub fn directives(&self, flash_delay: Duration) -> Vec<ResponseDirective> {
		let mut directives = Vec::new();

		let flashed = match self.flash_message() {
			Some(message) => {
				directives.push(ResponseDirective::Flash {
					message: message.to_string(),
					duration: flash_delay.max(MIN_FLASH_DURATION),
				});
				true
			}
			None => false,
		};

		match self.action {
			Some(ResponseAction::GoBack) => directives.push(ResponseDirective::HistoryBack),
			Some(ResponseAction::Refresh) => directives.push(ResponseDirective::SoftRefresh),
			Some(ResponseAction::Tough) => directives.push(ResponseDirective::HardReload {
				target: self.redirect_target().map(str::to_string),
				delay: flashed
					.then(|| self.delay.map(Duration::from_millis).unwrap_or(flash_delay)),
			}),
			Some(ResponseAction::Unknown) | None => {}
		}

		if self.action != Some(ResponseAction::Tough) {
			if let Some(target) = self.redirect_target() {
				directives.push(ResponseDirective::SoftRedirect(target.to_string()));
			}
		}

		directives
	}
}
