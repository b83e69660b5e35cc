//! Shared test doubles for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use futures::channel::oneshot;
use futures::future::{FutureExt, LocalBoxFuture};
use pagewright_core::dom::MemoryDocument;
use pagewright_core::error::{LoadError, NavigationError};
use pagewright_core::host::Host;
use pagewright_core::loader::{AssetInstaller, AssetRef};
use pagewright_core::navigation::{NavigationRequest, SoftNavigator};
use pagewright_core::runtime::Runtime;
use pagewright_core::settings::RuntimeSettings;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::time::Duration;

/// Installer that records every install and yields once before finishing.
#[derive(Default)]
pub struct RecordingInstaller {
	pub installs: RefCell<Vec<String>>,
	/// `start <url>` and `end <url>` around each install.
	pub events: RefCell<Vec<String>>,
	pub failing: RefCell<HashSet<String>>,
}

impl RecordingInstaller {
	pub fn fail(&self, url: &str) {
		self.failing.borrow_mut().insert(url.to_string());
	}

	pub fn heal(&self, url: &str) {
		self.failing.borrow_mut().remove(url);
	}

	pub fn installed(&self) -> Vec<String> {
		self.installs.borrow().clone()
	}

	pub fn events(&self) -> Vec<String> {
		self.events.borrow().clone()
	}
}

#[async_trait(?Send)]
impl AssetInstaller for RecordingInstaller {
	async fn install(&self, asset: &AssetRef) -> Result<(), LoadError> {
		self.installs.borrow_mut().push(asset.url.clone());
		self.events
			.borrow_mut()
			.push(format!("start {}", asset.url));
		tokio::task::yield_now().await;
		self.events.borrow_mut().push(format!("end {}", asset.url));

		if self.failing.borrow().contains(&asset.url) {
			return Err(LoadError::Fetch {
				url: asset.url.clone(),
				reason: "404".to_string(),
			});
		}
		Ok(())
	}
}

/// Navigator serving fixed markup per url, optionally held until released.
#[derive(Default)]
pub struct ScriptedNavigator {
	pub pages: RefCell<HashMap<String, String>>,
	pub gates: RefCell<HashMap<String, oneshot::Receiver<()>>>,
	pub requests: RefCell<Vec<NavigationRequest>>,
}

impl ScriptedNavigator {
	pub fn page(&self, url: &str, markup: &str) {
		self.pages
			.borrow_mut()
			.insert(url.to_string(), markup.to_string());
	}

	/// Holds the next fetch of `url` until the returned sender fires.
	pub fn hold(&self, url: &str) -> oneshot::Sender<()> {
		let (tx, rx) = oneshot::channel();
		self.gates.borrow_mut().insert(url.to_string(), rx);
		tx
	}
}

#[async_trait(?Send)]
impl SoftNavigator for ScriptedNavigator {
	async fn fetch(&self, request: &NavigationRequest) -> Result<String, NavigationError> {
		self.requests.borrow_mut().push(request.clone());

		let gate = self.gates.borrow_mut().remove(&request.url);
		if let Some(gate) = gate {
			let _ = gate.await;
		}

		self.pages
			.borrow()
			.get(&request.url)
			.cloned()
			.ok_or_else(|| NavigationError::Request {
				url: request.url.clone(),
				reason: "404".to_string(),
			})
	}
}

/// A call received by [`RecordingHost`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
	Flash(String, Duration),
	HistoryBack,
	HardReload(Option<String>),
	Sleep(Duration),
}

/// Host that records calls; sleeping completes immediately.
pub struct RecordingHost {
	pub calls: RefCell<Vec<HostCall>>,
	pub url: RefCell<String>,
}

impl Default for RecordingHost {
	fn default() -> Self {
		Self {
			calls: RefCell::new(Vec::new()),
			url: RefCell::new("/current".to_string()),
		}
	}
}

impl RecordingHost {
	pub fn calls(&self) -> Vec<HostCall> {
		self.calls.borrow().clone()
	}
}

impl Host for RecordingHost {
	fn flash(&self, message: &str, duration: Duration) {
		self.calls
			.borrow_mut()
			.push(HostCall::Flash(message.to_string(), duration));
	}

	fn history_back(&self) {
		self.calls.borrow_mut().push(HostCall::HistoryBack);
	}

	fn hard_reload(&self, target: Option<&str>) {
		self.calls
			.borrow_mut()
			.push(HostCall::HardReload(target.map(str::to_string)));
	}

	fn current_url(&self) -> String {
		self.url.borrow().clone()
	}

	fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
		self.calls.borrow_mut().push(HostCall::Sleep(duration));
		futures::future::ready(()).boxed_local()
	}
}

/// A runtime over a headless document, with handles to every double.
pub struct Harness {
	pub runtime: Runtime,
	pub doc: Rc<MemoryDocument>,
	pub installer: Rc<RecordingInstaller>,
	pub navigator: Rc<ScriptedNavigator>,
	pub host: Rc<RecordingHost>,
}

impl Harness {
	pub fn new(markup: &str) -> Self {
		Self::with_settings(markup, RuntimeSettings::default())
	}

	pub fn with_settings(markup: &str, settings: RuntimeSettings) -> Self {
		let doc = Rc::new(MemoryDocument::parse(markup).unwrap());
		let installer = Rc::new(RecordingInstaller::default());
		let navigator = Rc::new(ScriptedNavigator::default());
		let host = Rc::new(RecordingHost::default());

		let runtime = Runtime::builder()
			.settings(settings)
			.document(Rc::clone(&doc))
			.installer(Rc::clone(&installer))
			.navigator(Rc::clone(&navigator))
			.host(Rc::clone(&host))
			.build()
			.unwrap();

		Self {
			runtime,
			doc,
			installer,
			navigator,
			host,
		}
	}

	/// Like [`Harness::new`], with `init` already run.
	pub fn initialized(markup: &str) -> Self {
		let harness = Self::new(markup);
		harness.runtime.init().unwrap();
		harness
	}
}

/// Shared label log for ordering assertions.
#[derive(Clone, Default)]
pub struct Log(Rc<RefCell<Vec<String>>>);

impl Log {
	pub fn push(&self, entry: impl Into<String>) {
		self.0.borrow_mut().push(entry.into());
	}

	/// Returns a callback that appends `entry`.
	pub fn recorder(&self, entry: &str) -> impl Fn() + 'static {
		let log = self.clone();
		let entry = entry.to_string();
		move || log.push(entry.clone())
	}

	pub fn entries(&self) -> Vec<String> {
		self.0.borrow().clone()
	}

	pub fn count(&self, entry: &str) -> usize {
		self.0.borrow().iter().filter(|e| *e == entry).count()
	}

	pub fn clear(&self) {
		self.0.borrow_mut().clear();
	}
}
