//! Runtime context
//!
//! [`Runtime`] owns every piece of session state (registry, loader, buses,
//! state snapshot, overlay slot) together with the capabilities it drives. It
//! is a cheap `Clone` handle; independent runtimes share nothing.
//!
//! ## Lifecycle
//!
//! ```text
//! build() ──► init() ──► [navigate()]* ──► shutdown()
//!              │
//!              ├─ PreInit
//!              ├─ origin listeners (click / popstate)
//!              ├─ content info refresh (now and on every End)
//!              ├─ registry re-scan on every End
//!              └─ PostInit
//! ```
//!
//! ## Example
//!
//! ```ignore
//! let runtime = Runtime::builder()
//!     .document(Rc::new(WebDocument::new()?))
//!     .installer(Rc::new(WebInstaller::new()))
//!     .navigator(Rc::new(FetchNavigator::new()))
//!     .host(Rc::new(WebHost::new()))
//!     .build()?;
//!
//! runtime.init()?;
//! runtime.register_handler("page-title", |cx| { /* ... */ Ok(()) }, true);
//! ```

use crate::dom::{Document, InsertPosition, NodeId};
use crate::error::{ConfigError, DomError, HandlerError, LoadError, NavigationError, RuntimeError};
use crate::host::Host;
use crate::lifecycle::{CoreSignal, CoreSignals, LifecycleBus, Phase, SubscriptionId};
use crate::loader::{AssetInstaller, BatchReport, ResourceLoader, ResourceRequest};
use crate::navigation::{NavigationOutcome, NavigationRequest, SoftNavigator};
use crate::observable::{Observable, ProxyRegistry};
use crate::overlay::OverlaySlot;
use crate::registry::{ElementContext, ElementRegistry, HandlerRef, Marker, ScanReport};
use crate::response::{ResponseDirective, ServerResponse};
use crate::settings::RuntimeSettings;
use crate::state::{NavigationOrigin, StateSnapshot};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

struct RuntimeInner {
	settings: RuntimeSettings,
	document: Rc<dyn Document>,
	navigator: Rc<dyn SoftNavigator>,
	host: Rc<dyn Host>,
	registry: ElementRegistry,
	loader: ResourceLoader,
	lifecycle: LifecycleBus,
	signals: Rc<CoreSignals>,
	proxies: ProxyRegistry,
	state: StateSnapshot,
	overlay: OverlaySlot,
	initialized: Cell<bool>,
	generation: Cell<u64>,
	last_response: RefCell<Option<ServerResponse>>,
}

/// Handle to a page session.
#[derive(Clone)]
pub struct Runtime {
	inner: Rc<RuntimeInner>,
}

/// Non-owning handle to a [`Runtime`].
#[derive(Clone)]
pub struct WeakRuntime {
	inner: Weak<RuntimeInner>,
}

impl WeakRuntime {
	/// Returns the runtime if it is still alive.
	pub fn upgrade(&self) -> Option<Runtime> {
		self.inner.upgrade().map(|inner| Runtime { inner })
	}
}

impl fmt::Debug for WeakRuntime {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("WeakRuntime")
			.field("alive", &(self.inner.strong_count() > 0))
			.finish()
	}
}

impl fmt::Debug for Runtime {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Runtime")
			.field("initialized", &self.inner.initialized.get())
			.field("settings", &self.inner.settings)
			.field("registry", &self.inner.registry)
			.field("loader", &self.inner.loader)
			.finish_non_exhaustive()
	}
}

/// Builder for [`Runtime`].
#[derive(Default)]
pub struct RuntimeBuilder {
	settings: RuntimeSettings,
	document: Option<Rc<dyn Document>>,
	installer: Option<Rc<dyn AssetInstaller>>,
	navigator: Option<Rc<dyn SoftNavigator>>,
	host: Option<Rc<dyn Host>>,
}

impl RuntimeBuilder {
	/// Creates a builder with default settings and no capabilities.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the settings.
	pub fn settings(mut self, settings: RuntimeSettings) -> Self {
		self.settings = settings;
		self
	}

	/// Sets the document capability.
	pub fn document<D: Document + 'static>(mut self, document: Rc<D>) -> Self {
		self.document = Some(document);
		self
	}

	/// Sets the asset installer capability.
	pub fn installer<I: AssetInstaller + 'static>(mut self, installer: Rc<I>) -> Self {
		self.installer = Some(installer);
		self
	}

	/// Sets the soft navigation capability.
	pub fn navigator<N: SoftNavigator + 'static>(mut self, navigator: Rc<N>) -> Self {
		self.navigator = Some(navigator);
		self
	}

	/// Sets the host capability.
	pub fn host<H: Host + 'static>(mut self, host: Rc<H>) -> Self {
		self.host = Some(host);
		self
	}

	/// Fills every capability with the browser adapters.
	#[cfg(target_arch = "wasm32")]
	pub fn browser(self) -> Result<Self, DomError> {
		Ok(self
			.document(Rc::new(crate::dom::WebDocument::new()?))
			.installer(Rc::new(crate::loader::WebInstaller::new()))
			.navigator(Rc::new(crate::navigation::FetchNavigator::new()))
			.host(Rc::new(crate::host::WebHost::new())))
	}

	/// Validates the settings and builds the runtime.
	pub fn build(self) -> Result<Runtime, ConfigError> {
		self.settings.validate()?;

		let document = self.document.ok_or(ConfigError::MissingCapability("document"))?;
		let installer = self
			.installer
			.ok_or(ConfigError::MissingCapability("installer"))?;
		let navigator = self
			.navigator
			.ok_or(ConfigError::MissingCapability("navigator"))?;
		let host = self.host.ok_or(ConfigError::MissingCapability("host"))?;

		let signals = Rc::new(CoreSignals::new());
		let settings = self.settings;

		Ok(Runtime {
			inner: Rc::new(RuntimeInner {
				registry: ElementRegistry::new(settings.init_attribute.clone()),
				loader: ResourceLoader::new(installer, Rc::clone(&signals)),
				lifecycle: LifecycleBus::new(),
				signals,
				proxies: ProxyRegistry::new(),
				state: StateSnapshot::new(&settings),
				overlay: OverlaySlot::new(),
				initialized: Cell::new(false),
				generation: Cell::new(0),
				last_response: RefCell::new(None),
				settings,
				document,
				navigator,
				host,
			}),
		})
	}
}

impl Runtime {
	/// Starts building a runtime.
	pub fn builder() -> RuntimeBuilder {
		RuntimeBuilder::new()
	}

	/// Returns a non-owning handle.
	pub fn downgrade(&self) -> WeakRuntime {
		WeakRuntime {
			inner: Rc::downgrade(&self.inner),
		}
	}

	/// Whether two handles point to the same runtime.
	pub fn ptr_eq(&self, other: &Runtime) -> bool {
		Rc::ptr_eq(&self.inner, &other.inner)
	}

	/// The settings.
	pub fn settings(&self) -> &RuntimeSettings {
		&self.inner.settings
	}

	/// The document capability.
	pub fn document(&self) -> &dyn Document {
		self.inner.document.as_ref()
	}

	/// The host capability.
	pub fn host(&self) -> &dyn Host {
		self.inner.host.as_ref()
	}

	/// The element registry.
	pub fn registry(&self) -> &ElementRegistry {
		&self.inner.registry
	}

	/// The resource loader.
	pub fn loader(&self) -> &ResourceLoader {
		&self.inner.loader
	}

	/// The navigation lifecycle bus.
	pub fn lifecycle(&self) -> &LifecycleBus {
		&self.inner.lifecycle
	}

	/// The runtime milestone bus.
	pub fn signals(&self) -> &CoreSignals {
		&self.inner.signals
	}

	/// The page state.
	pub fn state(&self) -> &StateSnapshot {
		&self.inner.state
	}

	/// The overlay slot.
	pub fn overlay(&self) -> &OverlaySlot {
		&self.inner.overlay
	}

	/// Whether [`init`](Self::init) ran and [`shutdown`](Self::shutdown) did not.
	pub fn is_initialized(&self) -> bool {
		self.inner.initialized.get()
	}

	/// Starts the session.
	///
	/// Refused with [`RuntimeError::AlreadyInitialized`] while initialized.
	pub fn init(&self) -> Result<(), RuntimeError> {
		if self.inner.initialized.replace(true) {
			crate::error_log!("Runtime initialization was requested twice");
			return Err(RuntimeError::AlreadyInitialized);
		}

		self.signals().emit(CoreSignal::PreInit);

		self.state().attach(self.lifecycle());

		let weak = self.downgrade();
		self.lifecycle().on(
			Phase::End,
			move || {
				if let Some(runtime) = weak.upgrade() {
					runtime.state().refresh_info(runtime.document());
				}
			},
			true,
		);

		let weak = self.downgrade();
		self.lifecycle().on(
			Phase::End,
			move || {
				if let Some(runtime) = weak.upgrade() {
					runtime.rescan();
				}
			},
			false,
		);

		self.signals().emit(CoreSignal::PostInit);
		crate::info_log!("Runtime initialized");
		Ok(())
	}

	/// Drops every bus subscription and allows [`init`](Self::init) again.
	///
	/// Registrations, resolved resources and state are kept.
	pub fn shutdown(&self) {
		self.lifecycle().clear();
		self.signals().clear();
		self.inner.initialized.set(false);
	}

	fn rescan(&self) -> ScanReport {
		let doc = self.document();
		let pruned = self.registry().prune(|node| doc.contains(node));
		crate::debug_log!("Pruned {} detached elements before re-scan", pruned);
		self.registry().scan(self, None, None)
	}

	/// Maps `marker` to a named handler (`alias`, or the camel-cased marker).
	///
	/// With `run_now`, elements carrying the marker are initialized right away.
	pub fn register(&self, marker: &str, alias: Option<&str>, run_now: bool) -> ScanReport {
		let marker = Marker::from(marker);
		self.registry().insert_named(marker.clone(), alias);
		self.scan_registered(&marker, run_now)
	}

	/// Maps `marker` directly to `handler`.
	pub fn register_handler(
		&self,
		marker: &str,
		handler: impl Fn(&ElementContext) -> Result<(), HandlerError> + 'static,
		run_now: bool,
	) -> ScanReport {
		let marker = Marker::from(marker);
		self.registry()
			.insert(marker.clone(), HandlerRef::Direct(Rc::new(handler)));
		self.scan_registered(&marker, run_now)
	}

	fn scan_registered(&self, marker: &Marker, run_now: bool) -> ScanReport {
		if run_now {
			self.registry().scan(self, Some(marker), None)
		} else {
			ScanReport::default()
		}
	}

	/// Defines a named handler.
	pub fn define(
		&self,
		name: &str,
		handler: impl Fn(&ElementContext) -> Result<(), HandlerError> + 'static,
	) {
		self.registry().define(name, Rc::new(handler));
	}

	/// Initializes unvisited elements, optionally only those with `marker`
	/// and only inside `scope` (scope element included).
	pub fn scan(&self, marker: Option<&str>, scope: Option<NodeId>) -> ScanReport {
		let marker = marker.map(Marker::from);
		self.registry().scan(self, marker.as_ref(), scope)
	}

	/// Whether `marker` has a mapping.
	pub fn is_registered(&self, marker: &str) -> bool {
		self.registry().is_registered(marker)
	}

	/// Inserts markup next to or inside `anchor` and initializes the
	/// inserted elements only.
	pub fn insert_markup(
		&self,
		anchor: NodeId,
		markup: &str,
		position: InsertPosition,
	) -> Result<ScanReport, DomError> {
		let doc = self.document();
		let roots = doc.insert_markup(anchor, markup, position)?;

		let attribute = self.registry().init_attribute();
		let nodes = roots
			.into_iter()
			.flat_map(|root| doc.query_attribute(attribute, None, Some(root)))
			.collect();

		let report = self.registry().visit(self, nodes);
		self.signals().emit(CoreSignal::ElementsReady);
		Ok(report)
	}

	/// Loads resources in order, once per key.
	pub async fn request(&self, refs: impl Into<ResourceRequest>) -> Result<BatchReport, LoadError> {
		self.loader().request(refs).await
	}

	/// Whether the resource key installed successfully.
	pub fn is_resolved(&self, key: &str) -> bool {
		self.loader().is_resolved(key)
	}

	/// Loads resources declared through the require attribute in `scope`.
	pub async fn require_declared(&self, scope: Option<NodeId>) -> Result<BatchReport, LoadError> {
		self.loader()
			.require_declared(
				self.document(),
				&self.settings().require_attribute,
				scope,
			)
			.await
	}

	/// Attaches a change callback to `observable` unless its key is watched.
	pub fn watch<T, F>(&self, observable: &Observable<T>, callback: Option<F>) -> bool
	where
		T: Clone + 'static,
		F: Fn(&T) + 'static,
	{
		self.inner.proxies.watch(observable, callback)
	}

	/// Whether a canonical property key is watched.
	pub fn is_watched(&self, key: &str) -> bool {
		self.inner.proxies.is_watched(key)
	}

	/// Subscribes to a lifecycle phase, [`Phase::End`] by default.
	pub fn on(
		&self,
		callback: impl Fn() + 'static,
		run_now: bool,
		phase: Option<Phase>,
	) -> SubscriptionId {
		self.lifecycle()
			.on(phase.unwrap_or(Phase::End), callback, run_now)
	}

	/// Subscribes to the next occurrence of a phase, [`Phase::BeforeSwap`]
	/// by default.
	pub fn once(&self, callback: impl Fn() + 'static, phase: Option<Phase>) -> SubscriptionId {
		self.lifecycle()
			.once(phase.unwrap_or(Phase::BeforeSwap), callback)
	}

	/// Removes a lifecycle subscription.
	pub fn off(&self, id: SubscriptionId) -> bool {
		self.lifecycle().off(id)
	}

	/// Runs `teardown` once, right before the next content swap.
	pub fn bind_teardown(&self, teardown: impl Fn() + 'static) -> SubscriptionId {
		self.once(teardown, Some(Phase::BeforeSwap))
	}

	/// Replaces the main container's content with the markup at `url`.
	///
	/// Emits `click`/`popstate` (by origin), `start`, then after the fetch
	/// `before-swap`, swaps, and emits `end`. When another navigation starts
	/// while this one is fetching, this one stops after its fetch and
	/// returns [`NavigationOutcome::Superseded`].
	pub async fn navigate(
		&self,
		url: &str,
		origin: NavigationOrigin,
	) -> Result<NavigationOutcome, NavigationError> {
		let generation = self.inner.generation.get() + 1;
		self.inner.generation.set(generation);

		if let Some(phase) = origin.trigger_phase() {
			self.lifecycle().emit(phase);
		}
		self.lifecycle().emit(Phase::Start);

		let container_id = &self.settings().main_container_id;
		self.container(container_id)?;

		let request = NavigationRequest {
			url: url.to_string(),
			origin,
			container_id: container_id.clone(),
			timeout: Duration::from_millis(self.settings().request_timeout_ms),
		};
		let navigator = Rc::clone(&self.inner.navigator);
		let markup = navigator.fetch(&request).await?;

		if self.inner.generation.get() != generation {
			crate::info_log!("Navigation to {} was superseded by a newer one", url);
			return Ok(NavigationOutcome::Superseded);
		}

		self.lifecycle().emit(Phase::BeforeSwap);
		let container = self.container(container_id)?;
		self.document().replace_children(container, &markup)?;
		self.lifecycle().emit(Phase::End);

		Ok(NavigationOutcome::Swapped {
			url: url.to_string(),
		})
	}

	fn container(&self, id: &str) -> Result<NodeId, NavigationError> {
		self.document()
			.element_by_id(id)
			.ok_or_else(|| NavigationError::ContainerNotFound(id.to_string()))
	}

	/// Soft navigation to `target`, or a soft reload of the current location.
	///
	/// Closes the overlay and waits the redirect grace period first.
	pub async fn soft_redirect(&self, target: Option<&str>) -> Result<NavigationOutcome, NavigationError> {
		let target = match target {
			Some(url) => url.to_string(),
			None => self.host().current_url(),
		};

		if let Err(error) = self.overlay().destroy(self.document()) {
			crate::warn_log!("Failed to close the overlay before redirecting: {}", error);
		}

		let grace = Duration::from_millis(self.settings().redirect_grace_ms);
		let host = Rc::clone(&self.inner.host);
		host.sleep(grace).await;

		self.navigate(&target, NavigationOrigin::ClientNav).await
	}

	/// The last response passed to [`handle_server_response`](Self::handle_server_response).
	pub fn last_response(&self) -> Option<ServerResponse> {
		self.inner.last_response.borrow().clone()
	}

	/// Carries out a server response, then emits
	/// [`CoreSignal::ResponsePositive`] or [`CoreSignal::ResponseNegative`].
	///
	/// Every directive runs even if a soft navigation fails; the first
	/// navigation error is returned after the signal.
	pub async fn handle_server_response(&self, response: ServerResponse) -> Result<(), NavigationError> {
		let flash_delay = Duration::from_millis(self.settings().flash_delay_ms);
		let directives = response.directives(flash_delay);
		let success = response.success;
		*self.inner.last_response.borrow_mut() = Some(response);

		let host = Rc::clone(&self.inner.host);
		let mut first_error = None;
		for directive in directives {
			let outcome = match directive {
				ResponseDirective::Flash { message, duration } => {
					host.flash(&message, duration);
					Ok(())
				}
				ResponseDirective::HistoryBack => {
					host.history_back();
					Ok(())
				}
				ResponseDirective::HardReload { target, delay } => {
					if let Some(delay) = delay {
						host.sleep(delay).await;
					}
					host.hard_reload(target.as_deref());
					Ok(())
				}
				ResponseDirective::SoftRefresh => self.soft_redirect(None).await.map(drop),
				ResponseDirective::SoftRedirect(url) => self.soft_redirect(Some(&url)).await.map(drop),
			};

			if let Err(error) = outcome {
				crate::warn_log!("Server response follow-up failed: {}", error);
				first_error.get_or_insert(error);
			}
		}

		self.signals().emit(if success {
			CoreSignal::ResponsePositive
		} else {
			CoreSignal::ResponseNegative
		});

		first_error.map_or(Ok(()), Err)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::dom::MemoryDocument;
	use async_trait::async_trait;
	use futures::future::{FutureExt, LocalBoxFuture};
	use rstest::rstest;

	struct NoInstall;

	#[async_trait(?Send)]
	impl AssetInstaller for NoInstall {
		async fn install(&self, _asset: &crate::loader::AssetRef) -> Result<(), LoadError> {
			Ok(())
		}
	}

	struct NoNavigation;

	#[async_trait(?Send)]
	impl SoftNavigator for NoNavigation {
		async fn fetch(&self, request: &NavigationRequest) -> Result<String, NavigationError> {
			Err(NavigationError::Request {
				url: request.url.clone(),
				reason: "offline".to_string(),
			})
		}
	}

	struct QuietHost;

	impl Host for QuietHost {
		fn flash(&self, _message: &str, _duration: Duration) {}
		fn history_back(&self) {}
		fn hard_reload(&self, _target: Option<&str>) {}
		fn current_url(&self) -> String {
			"/".to_string()
		}
		fn sleep(&self, _duration: Duration) -> LocalBoxFuture<'static, ()> {
			futures::future::ready(()).boxed_local()
		}
	}

	fn runtime(markup: &str) -> Runtime {
		Runtime::builder()
			.document(Rc::new(MemoryDocument::parse(markup).unwrap()))
			.installer(Rc::new(NoInstall))
			.navigator(Rc::new(NoNavigation))
			.host(Rc::new(QuietHost))
			.build()
			.unwrap()
	}

	#[rstest]
	#[case("document")]
	#[case("installer")]
	#[case("navigator")]
	#[case("host")]
	fn test_build_requires_every_capability(#[case] missing: &str) {
		let mut builder = Runtime::builder();
		if missing != "document" {
			builder = builder.document(Rc::new(MemoryDocument::new()));
		}
		if missing != "installer" {
			builder = builder.installer(Rc::new(NoInstall));
		}
		if missing != "navigator" {
			builder = builder.navigator(Rc::new(NoNavigation));
		}
		if missing != "host" {
			builder = builder.host(Rc::new(QuietHost));
		}

		match builder.build() {
			Err(ConfigError::MissingCapability(name)) => assert_eq!(name, missing),
			other => panic!("expected a missing capability, got {:?}", other),
		}
	}

	#[rstest]
	fn test_build_validates_settings() {
		let settings = RuntimeSettings {
			main_container_id: String::new(),
			..Default::default()
		};
		let result = Runtime::builder()
			.settings(settings)
			.document(Rc::new(MemoryDocument::new()))
			.installer(Rc::new(NoInstall))
			.navigator(Rc::new(NoNavigation))
			.host(Rc::new(QuietHost))
			.build();
		assert!(matches!(result, Err(ConfigError::Invalid { .. })));
	}

	#[rstest]
	fn test_init_twice_is_refused() {
		let rt = runtime("");
		let pre_init = Rc::new(Cell::new(0));
		let counter = Rc::clone(&pre_init);
		rt.signals()
			.on(CoreSignal::PreInit, move || counter.set(counter.get() + 1), false);

		rt.init().unwrap();
		assert!(matches!(rt.init(), Err(RuntimeError::AlreadyInitialized)));
		assert_eq!(pre_init.get(), 1);
	}

	#[rstest]
	fn test_shutdown_allows_init_again() {
		let rt = runtime("");
		rt.init().unwrap();
		assert_eq!(rt.lifecycle().subscriber_count(Phase::End), 2);

		rt.shutdown();
		assert!(!rt.is_initialized());
		assert_eq!(rt.lifecycle().subscriber_count(Phase::End), 0);

		rt.init().unwrap();
		assert!(rt.is_initialized());
	}

	#[rstest]
	fn test_init_reads_content_info() {
		let rt = runtime(r#"<main id="main"><div data-cid="9" data-permalink="/p/9"></div></main>"#);
		rt.init().unwrap();
		assert_eq!(rt.state().content().content_id.as_deref(), Some("9"));
		assert_eq!(rt.state().content().permalink.as_deref(), Some("/p/9"));
	}

	#[rstest]
	fn test_runtime_does_not_leak_through_bus() {
		let rt = runtime("");
		rt.init().unwrap();
		let weak = rt.downgrade();
		drop(rt);
		assert!(weak.upgrade().is_none());
	}

	#[rstest]
	fn test_runtimes_are_isolated() {
		let a = runtime(r#"<p data-init="greeter"></p>"#);
		let b = runtime(r#"<p data-init="greeter"></p>"#);
		a.register_handler("greeter", |_| Ok(()), true);

		assert!(a.is_registered("greeter"));
		assert!(!b.is_registered("greeter"));
		assert!(!a.ptr_eq(&b));
	}
}
