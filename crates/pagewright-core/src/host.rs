//! Host capability
//!
//! Effects the runtime asks of its environment but does not implement itself:
//! flashing a message, history traversal, full reloads and timers.

use futures::future::LocalBoxFuture;
use std::time::Duration;

/// Environment effects used by navigation and response handling.
pub trait Host {
	/// Shows a transient message for `duration`.
	fn flash(&self, message: &str, duration: Duration);

	/// Goes one step back in history with a full load.
	fn history_back(&self);

	/// Reloads the page, or loads `target` with a full navigation.
	fn hard_reload(&self, target: Option<&str>);

	/// The current location.
	fn current_url(&self) -> String;

	/// Completes after `duration`.
	fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()>;
}

#[cfg(target_arch = "wasm32")]
pub use web::WebHost;

#[cfg(target_arch = "wasm32")]
mod web {
	use super::Host;
	use futures::future::{FutureExt, LocalBoxFuture};
	use std::time::Duration;

	/// [`Host`] backed by `window`.
	///
	/// Flash messages go to the console; themes that render them replace this
	/// host with their own.
	#[derive(Debug, Default, Clone, Copy)]
	pub struct WebHost;

	impl WebHost {
		/// Creates a host.
		pub fn new() -> Self {
			Self
		}
	}

	impl Host for WebHost {
		fn flash(&self, message: &str, _duration: Duration) {
			web_sys::console::info_1(&message.into());
		}

		fn history_back(&self) {
			if let Some(history) = web_sys::window().and_then(|w| w.history().ok()) {
				let _ = history.go_with_delta(-1);
			}
		}

		fn hard_reload(&self, target: Option<&str>) {
			let Some(window) = web_sys::window() else {
				return;
			};
			let location = window.location();
			let result = match target {
				Some(url) => location.set_href(url),
				None => location.reload(),
			};
			if result.is_err() {
				crate::error_log!("Hard reload to {:?} was refused", target);
			}
		}

		fn current_url(&self) -> String {
			web_sys::window()
				.and_then(|w| w.location().href().ok())
				.unwrap_or_default()
		}

		fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
			let millis = u32::try_from(duration.as_millis()).unwrap_or(u32::MAX);
			gloo_timers::future::TimeoutFuture::new(millis).boxed_local()
		}
	}
}
