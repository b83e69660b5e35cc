//! Soft navigation transport
//!
//! A soft navigation fetches the markup of the swap container for a url and
//! replaces the container's children with it. The transport is a capability:
//! [`SoftNavigator`] returns the markup, the runtime drives the lifecycle
//! around it (see [`Runtime::navigate`](crate::runtime::Runtime::navigate)).

use crate::error::NavigationError;
use crate::state::NavigationOrigin;
use async_trait::async_trait;
use std::time::Duration;

/// A soft navigation about to be fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationRequest {
	/// Target url.
	pub url: String,
	/// What triggered the navigation.
	pub origin: NavigationOrigin,
	/// Id of the container whose markup is wanted.
	pub container_id: String,
	/// Upper bound for the request.
	pub timeout: Duration,
}

/// How a navigation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
	/// The new content is live.
	Swapped {
		/// The url that was loaded.
		url: String,
	},
	/// A newer navigation started while this one was fetching; nothing was
	/// swapped.
	Superseded,
}

impl NavigationOutcome {
	/// Whether content was swapped.
	pub fn is_swapped(&self) -> bool {
		matches!(self, NavigationOutcome::Swapped { .. })
	}
}

/// Fetches container markup for soft navigations.
#[async_trait(?Send)]
pub trait SoftNavigator {
	/// Returns the inner markup of the request's container at its url.
	async fn fetch(&self, request: &NavigationRequest) -> Result<String, NavigationError>;
}

#[cfg(target_arch = "wasm32")]
pub use web::{FetchNavigator, bind_browser_navigation};

#[cfg(target_arch = "wasm32")]
mod web {
	use super::{NavigationOutcome, NavigationRequest, SoftNavigator};
	use crate::error::NavigationError;
	use crate::runtime::{Runtime, WeakRuntime};
	use crate::state::NavigationOrigin;
	use async_trait::async_trait;
	use futures::future::{Either, FutureExt, select};
	use wasm_bindgen::JsCast;
	use wasm_bindgen::prelude::*;

	/// [`SoftNavigator`] that fetches full pages with `reqwest` and extracts
	/// the container with the browser's `DOMParser`.
	///
	/// Requests carry the `X-PJAX` and `X-PJAX-Container` headers so servers
	/// may answer with the container alone.
	#[derive(Debug, Clone, Default)]
	pub struct FetchNavigator {
		client: reqwest::Client,
	}

	impl FetchNavigator {
		/// Creates a navigator with a default client.
		pub fn new() -> Self {
			Self::default()
		}

		async fn load(&self, request: &NavigationRequest) -> Result<String, NavigationError> {
			let failed = |reason: String| NavigationError::Request {
				url: request.url.clone(),
				reason,
			};

			let response = self
				.client
				.get(&request.url)
				.header("X-PJAX", "true")
				.header("X-PJAX-Container", format!("#{}", request.container_id))
				.send()
				.await
				.map_err(|e| failed(e.to_string()))?;

			if !response.status().is_success() {
				return Err(failed(format!("HTTP {}", response.status())));
			}

			let body = response.text().await.map_err(|e| failed(e.to_string()))?;
			extract_container(&body, &request.container_id)
		}
	}

	#[async_trait(?Send)]
	impl SoftNavigator for FetchNavigator {
		async fn fetch(&self, request: &NavigationRequest) -> Result<String, NavigationError> {
			let millis = u32::try_from(request.timeout.as_millis()).unwrap_or(u32::MAX);
			let timeout = gloo_timers::future::TimeoutFuture::new(millis).boxed_local();

			match select(self.load(request).boxed_local(), timeout).await {
				Either::Left((result, _)) => result,
				Either::Right(_) => Err(NavigationError::Timeout {
					url: request.url.clone(),
					timeout_ms: u64::from(millis),
				}),
			}
		}
	}

	fn extract_container(body: &str, container_id: &str) -> Result<String, NavigationError> {
		let parser = web_sys::DomParser::new().map_err(|_| {
			NavigationError::ContainerNotFound(container_id.to_string())
		})?;
		let parsed = parser
			.parse_from_string(body, web_sys::SupportedType::TextHtml)
			.map_err(|_| NavigationError::ContainerNotFound(container_id.to_string()))?;

		parsed
			.get_element_by_id(container_id)
			.map(|container| container.inner_html())
			.ok_or_else(|| NavigationError::ContainerNotFound(container_id.to_string()))
	}

	/// Routes same-origin clicks on the configured nav targets, and history
	/// traversal, through [`Runtime::navigate`].
	///
	/// Clicks with a modifier key, or on links to another origin, keep the
	/// browser's default behavior.
	pub fn bind_browser_navigation(runtime: &Runtime) -> Result<(), NavigationError> {
		let window = web_sys::window().ok_or_else(|| NavigationError::Request {
			url: String::new(),
			reason: "window is not available".to_string(),
		})?;
		let document = window.document().ok_or_else(|| NavigationError::Request {
			url: String::new(),
			reason: "document is not available".to_string(),
		})?;

		let selector = runtime.settings().nav_selector();
		let weak = runtime.downgrade();
		let on_click = Closure::wrap(Box::new(move |event: web_sys::Event| {
			let Some(url) = soft_link_target(&event, &selector) else {
				return;
			};
			event.prevent_default();
			spawn_navigation(weak.clone(), url, NavigationOrigin::ClientNav);
		}) as Box<dyn FnMut(_)>);

		let weak = runtime.downgrade();
		let on_popstate = Closure::wrap(Box::new(move |_event: web_sys::Event| {
			let Some(runtime) = weak.upgrade() else {
				return;
			};
			let url = runtime.host().current_url();
			spawn_navigation(weak.clone(), url, NavigationOrigin::HistoryNav);
		}) as Box<dyn FnMut(_)>);

		document
			.add_event_listener_with_callback("click", on_click.as_ref().unchecked_ref())
			.map_err(|_| NavigationError::Request {
				url: String::new(),
				reason: "cannot listen for clicks".to_string(),
			})?;
		window
			.add_event_listener_with_callback("popstate", on_popstate.as_ref().unchecked_ref())
			.map_err(|_| NavigationError::Request {
				url: String::new(),
				reason: "cannot listen for popstate".to_string(),
			})?;

		// Listeners live as long as the page.
		on_click.forget();
		on_popstate.forget();
		Ok(())
	}

	fn soft_link_target(event: &web_sys::Event, selector: &str) -> Option<String> {
		let mouse = event.dyn_ref::<web_sys::MouseEvent>()?;
		if mouse.ctrl_key() || mouse.meta_key() || mouse.shift_key() || mouse.alt_key() || mouse.button() != 0 {
			return None;
		}

		let target = event.target()?.dyn_into::<web_sys::Element>().ok()?;
		let anchor = target
			.closest(selector)
			.ok()??
			.dyn_into::<web_sys::HtmlAnchorElement>()
			.ok()?;

		let location = web_sys::window()?.location();
		if anchor.origin() != location.origin().ok()? {
			return None;
		}
		Some(anchor.href())
	}

	fn spawn_navigation(weak: WeakRuntime, url: String, origin: NavigationOrigin) {
		wasm_bindgen_futures::spawn_local(async move {
			let Some(runtime) = weak.upgrade() else {
				return;
			};
			match runtime.navigate(&url, origin).await {
				Ok(NavigationOutcome::Swapped { url }) if origin == NavigationOrigin::ClientNav => {
					if let Some(history) = web_sys::window().and_then(|w| w.history().ok()) {
						let _ = history.push_state_with_url(&JsValue::NULL, "", Some(&url));
					}
				}
				Ok(_) => {}
				Err(error) => {
					crate::warn_log!("Soft navigation to {} failed, loading it fully: {}", url, error);
					runtime.host().hard_reload(Some(&url));
				}
			}
		});
	}
}
