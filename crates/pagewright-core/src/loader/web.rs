//! Browser asset installer.

use super::{AssetInstaller, AssetKind, AssetRef};
use crate::error::LoadError;
use async_trait::async_trait;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

/// Installs assets by appending `<script>` and `<link>` elements to `<head>`.
///
/// A script completes when the browser has executed it; a stylesheet when its
/// `load` event fires. An `error` event fails the install.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebInstaller;

impl WebInstaller {
	/// Creates an installer.
	pub fn new() -> Self {
		Self
	}

	fn create_element(asset: &AssetRef) -> Result<web_sys::Element, LoadError> {
		let document = web_sys::window()
			.and_then(|w| w.document())
			.ok_or_else(|| install_error(asset, "document is not available"))?;

		match asset.kind {
			AssetKind::Script => {
				let script: web_sys::HtmlScriptElement = document
					.create_element("script")
					.map_err(|e| install_error(asset, &describe(&e)))?
					.unchecked_into();
				script.set_src(&asset.url);
				// Keep execution in insertion order.
				script.set_async(false);
				Ok(script.into())
			}
			AssetKind::Stylesheet => {
				let link: web_sys::HtmlLinkElement = document
					.create_element("link")
					.map_err(|e| install_error(asset, &describe(&e)))?
					.unchecked_into();
				link.set_rel("stylesheet");
				link.set_type("text/css");
				link.set_href(&asset.url);
				Ok(link.into())
			}
		}
	}
}

#[async_trait(?Send)]
impl AssetInstaller for WebInstaller {
	async fn install(&self, asset: &AssetRef) -> Result<(), LoadError> {
		let element = Self::create_element(asset)?;
		let head = web_sys::window()
			.and_then(|w| w.document())
			.and_then(|d| d.head())
			.ok_or_else(|| install_error(asset, "document has no <head>"))?;

		let target = element.clone();
		let settled = js_sys::Promise::new(&mut |resolve, reject| {
			let on_load = Closure::once_into_js(move || {
				let _ = resolve.call0(&JsValue::UNDEFINED);
			});
			let on_error = Closure::once_into_js(move || {
				let _ = reject.call0(&JsValue::UNDEFINED);
			});
			let _ = target.add_event_listener_with_callback("load", on_load.unchecked_ref());
			let _ = target.add_event_listener_with_callback("error", on_error.unchecked_ref());
		});

		head.append_child(&element)
			.map_err(|e| install_error(asset, &describe(&e)))?;

		JsFuture::from(settled).await.map_err(|_| LoadError::Fetch {
			url: asset.url.clone(),
			reason: "the browser reported a load error".to_string(),
		})?;

		crate::debug_log!("Installed {:?} '{}'", asset.kind, asset.url);
		Ok(())
	}
}

fn install_error(asset: &AssetRef, reason: &str) -> LoadError {
	LoadError::Install {
		url: asset.url.clone(),
		reason: reason.to_string(),
	}
}

fn describe(value: &JsValue) -> String {
	value
		.as_string()
		.unwrap_or_else(|| format!("{:?}", value))
}
