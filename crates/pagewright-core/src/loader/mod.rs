//! On-demand resource loader
//!
//! Installs scripts and stylesheets at most once per [`ResourceKey`], in the
//! order they were requested.
//!
//! ## Deduplication
//!
//! - A key that installed successfully is *resolved* and is never installed
//!   again.
//! - While a key is installing, every other request for it awaits the same
//!   shared install, so concurrent first-time requests install once.
//! - A failed install is reported to every waiter and leaves the key
//!   unresolved. Nothing retries automatically.
//!
//! ## Example
//!
//! ```ignore
//! let report = runtime.request(["vendor/toc.js", "vendor/toc.css"]).await?;
//! assert_eq!(report.installed + report.reused, 2);
//! ```

#[cfg(target_arch = "wasm32")]
mod web;

#[cfg(target_arch = "wasm32")]
pub use web::WebInstaller;

use crate::dom::{Document, NodeId};
use crate::error::LoadError;
use crate::lifecycle::{CoreSignal, CoreSignals};
use async_trait::async_trait;
use futures::future::{FutureExt, LocalBoxFuture, Shared, join_all};
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::rc::Rc;

/// Kind of an installable asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
	/// Fetched and executed.
	Script,
	/// Inserted as a stylesheet link.
	Stylesheet,
}

impl AssetKind {
	/// Infers the kind from a key's extension.
	pub fn from_key(key: &ResourceKey) -> Option<Self> {
		let (_, extension) = key.as_str().rsplit_once('.')?;
		match extension.to_ascii_lowercase().as_str() {
			"js" | "mjs" => Some(AssetKind::Script),
			"css" => Some(AssetKind::Stylesheet),
			_ => None,
		}
	}
}

/// Deduplication key of a resource: the last path segment of its url,
/// without query string or fragment.
///
/// # Example
///
/// ```
/// use pagewright_core::loader::ResourceKey;
///
/// assert_eq!(ResourceKey::from_url("/static/a.js?v=2").as_str(), "a.js");
/// assert_eq!(ResourceKey::from_url("https://cdn.example/x/a.js#top").as_str(), "a.js");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey(String);

impl ResourceKey {
	/// Normalizes a url into its key.
	pub fn from_url(url: &str) -> Self {
		let end = url.find(['?', '#']).unwrap_or(url.len());
		let path = &url[..end];
		let segment = path.rsplit('/').next().unwrap_or(path);
		Self(segment.to_string())
	}

	/// Returns the key.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for ResourceKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// A resource to install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRef {
	/// Url as requested, query string kept.
	pub url: String,
	/// Deduplication key.
	pub key: ResourceKey,
	/// Asset kind.
	pub kind: AssetKind,
}

impl AssetRef {
	/// Parses a url into an asset reference.
	pub fn parse(url: &str) -> Result<Self, LoadError> {
		let key = ResourceKey::from_url(url);
		let kind =
			AssetKind::from_key(&key).ok_or_else(|| LoadError::UnsupportedAsset(url.to_string()))?;
		Ok(Self {
			url: url.to_string(),
			key,
			kind,
		})
	}
}

/// Installs assets into the page.
#[async_trait(?Send)]
pub trait AssetInstaller {
	/// Installs one asset. Completes when a script has executed or a
	/// stylesheet has loaded.
	async fn install(&self, asset: &AssetRef) -> Result<(), LoadError>;
}

/// An ordered list of urls to load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceRequest(Vec<String>);

impl ResourceRequest {
	/// Non-empty urls in request order.
	pub fn urls(&self) -> impl Iterator<Item = &str> {
		self.0.iter().map(String::as_str).filter(|url| !url.trim().is_empty())
	}
}

impl From<&str> for ResourceRequest {
	fn from(url: &str) -> Self {
		Self(vec![url.to_string()])
	}
}

impl From<String> for ResourceRequest {
	fn from(url: String) -> Self {
		Self(vec![url])
	}
}

impl<T: Into<String>> From<Vec<T>> for ResourceRequest {
	fn from(urls: Vec<T>) -> Self {
		Self(urls.into_iter().map(Into::into).collect())
	}
}

impl<T: Into<String> + Clone> From<&[T]> for ResourceRequest {
	fn from(urls: &[T]) -> Self {
		Self(urls.iter().cloned().map(Into::into).collect())
	}
}

impl<T: Into<String>, const N: usize> From<[T; N]> for ResourceRequest {
	fn from(urls: [T; N]) -> Self {
		Self(urls.into_iter().map(Into::into).collect())
	}
}

/// Outcome of a settled batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
	/// Assets this batch installed itself.
	pub installed: usize,
	/// Assets already resolved, or installed by an overlapping batch.
	pub reused: usize,
}

impl BatchReport {
	/// Adds another report's counts.
	pub fn merge(&mut self, other: BatchReport) {
		self.installed += other.installed;
		self.reused += other.reused;
	}
}

type InstallFuture = Shared<LocalBoxFuture<'static, Result<(), LoadError>>>;

/// Deduplicating, ordered resource loader.
pub struct ResourceLoader {
	installer: Rc<dyn AssetInstaller>,
	signals: Rc<CoreSignals>,
	resolved: RefCell<BTreeSet<ResourceKey>>,
	in_flight: RefCell<HashMap<ResourceKey, InstallFuture>>,
}

impl fmt::Debug for ResourceLoader {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ResourceLoader")
			.field("resolved", &self.resolved.borrow())
			.field("in_flight", &self.in_flight.borrow().keys().collect::<Vec<_>>())
			.finish()
	}
}

impl ResourceLoader {
	/// Creates a loader emitting batch signals on `signals`.
	pub fn new(installer: Rc<dyn AssetInstaller>, signals: Rc<CoreSignals>) -> Self {
		Self {
			installer,
			signals,
			resolved: RefCell::new(BTreeSet::new()),
			in_flight: RefCell::new(HashMap::new()),
		}
	}

	/// Whether `key` installed successfully.
	pub fn is_resolved(&self, key: &str) -> bool {
		self.resolved.borrow().contains(&ResourceKey(key.to_string()))
	}

	/// Resolved keys in sorted order.
	pub fn resolved_keys(&self) -> Vec<ResourceKey> {
		self.resolved.borrow().iter().cloned().collect()
	}

	/// Whether `key` is installing right now.
	pub fn is_in_flight(&self, key: &str) -> bool {
		self.in_flight
			.borrow()
			.contains_key(&ResourceKey(key.to_string()))
	}

	/// Loads a batch, one asset after the other.
	///
	/// Emits [`CoreSignal::LoadStart`] on entry and [`CoreSignal::LoadComplete`]
	/// once the batch settles, whether it succeeded or not. The first failure
	/// ends the batch.
	pub async fn request(&self, refs: impl Into<ResourceRequest>) -> Result<BatchReport, LoadError> {
		let request = refs.into();
		self.signals.emit(CoreSignal::LoadStart);
		let result = self.run_batch(&request).await;
		self.signals.emit(CoreSignal::LoadComplete);
		result
	}

	async fn run_batch(&self, request: &ResourceRequest) -> Result<BatchReport, LoadError> {
		let mut report = BatchReport::default();

		for url in request.urls() {
			let asset = AssetRef::parse(url)?;
			if self.resolved.borrow().contains(&asset.key) {
				report.reused += 1;
				continue;
			}

			let (install, started) = self.install_handle(&asset);
			let result = install.clone().await;
			self.settle(&asset.key, &install, &result);

			match result {
				Ok(()) if started => report.installed += 1,
				Ok(()) => report.reused += 1,
				Err(error) => {
					crate::error_log!("Failed to install '{}': {}", asset.url, error);
					return Err(error);
				}
			}
		}

		Ok(report)
	}

	/// Returns the shared install for `asset`, starting one if none is in
	/// flight. The flag tells whether this call started it.
	fn install_handle(&self, asset: &AssetRef) -> (InstallFuture, bool) {
		let mut in_flight = self.in_flight.borrow_mut();
		if let Some(existing) = in_flight.get(&asset.key) {
			crate::debug_log!("Joining in-flight install of '{}'", asset.key);
			return (existing.clone(), false);
		}

		let installer = Rc::clone(&self.installer);
		let owned = asset.clone();
		let install = async move { installer.install(&owned).await }
			.boxed_local()
			.shared();
		in_flight.insert(asset.key.clone(), install.clone());
		(install, true)
	}

	fn settle(&self, key: &ResourceKey, install: &InstallFuture, result: &Result<(), LoadError>) {
		{
			let mut in_flight = self.in_flight.borrow_mut();
			if in_flight
				.get(key)
				.is_some_and(|current| current.ptr_eq(install))
			{
				in_flight.remove(key);
			}
		}
		if result.is_ok() {
			self.resolved.borrow_mut().insert(key.clone());
		}
	}

	/// Loads the resources declared on elements in `scope` (or the whole
	/// document) through `attribute`.
	///
	/// A declaration is a single url or a JSON array of urls. Every
	/// declaration is its own batch; batches run concurrently. Malformed
	/// declarations are logged and skipped. Returns the merged counts, or the
	/// first batch error after all batches settled.
	pub async fn require_declared(
		&self,
		doc: &dyn Document,
		attribute: &str,
		scope: Option<NodeId>,
	) -> Result<BatchReport, LoadError> {
		let declarations: Vec<ResourceRequest> = doc
			.query_attribute(attribute, None, scope)
			.into_iter()
			.filter_map(|node| doc.attribute(node, attribute))
			.filter_map(|raw| match parse_declaration(&raw) {
				Ok(request) => Some(request),
				Err(error) => {
					crate::error_log!("{}", error);
					None
				}
			})
			.collect();

		let results = join_all(declarations.into_iter().map(|request| self.request(request))).await;

		let mut merged = BatchReport::default();
		for result in results {
			merged.merge(result?);
		}
		Ok(merged)
	}
}

/// Parses a declaration: a JSON array of urls, or a single url.
pub fn parse_declaration(raw: &str) -> Result<ResourceRequest, LoadError> {
	let trimmed = raw.trim();
	if trimmed.starts_with('[') {
		serde_json::from_str::<Vec<String>>(trimmed)
			.map(ResourceRequest::from)
			.map_err(|_| LoadError::Declaration(raw.to_string()))
	} else {
		Ok(ResourceRequest::from(trimmed))
	}
}
