//! pagewright-core - Client Runtime for Server-Rendered Pages
//!
//! Turns a server-rendered document into a long-lived session with soft
//! (partial) page replacements. Declaratively marked elements are initialized
//! exactly once, behavior bundles are loaded on demand, and everything is
//! re-initialized after each swap without double binding.
//!
//! ## Architecture
//!
//! - [`registry`]: element lifecycle registry (markers → handlers, once per element)
//! - [`loader`]: deduplicated, ordered script and stylesheet loading
//! - [`lifecycle`]: navigation lifecycle bus and runtime signals
//! - [`observable`]: observable properties and the watch registry
//! - [`state`]: page state snapshot
//! - [`navigation`]: soft navigation transport
//! - [`response`]: server response directives
//! - [`overlay`]: single modal overlay slot
//! - [`host`]: host effects (flash, history, reload, timers)
//! - [`dom`]: DOM abstraction with a headless and a browser document
//! - [`runtime`]: the runtime context tying it all together
//!
//! ## Example
//!
//! ```
//! use pagewright_core::dom::MemoryDocument;
//! use pagewright_core::runtime::Runtime;
//! # use pagewright_core::error::{LoadError, NavigationError};
//! # use pagewright_core::host::Host;
//! # use pagewright_core::loader::{AssetInstaller, AssetRef};
//! # use pagewright_core::navigation::{NavigationRequest, SoftNavigator};
//! # use futures::future::{FutureExt, LocalBoxFuture};
//! # use std::rc::Rc;
//! # use std::time::Duration;
//! # struct Stub;
//! # #[async_trait::async_trait(?Send)]
//! # impl AssetInstaller for Stub {
//! #     async fn install(&self, _: &AssetRef) -> Result<(), LoadError> { Ok(()) }
//! # }
//! # #[async_trait::async_trait(?Send)]
//! # impl SoftNavigator for Stub {
//! #     async fn fetch(&self, _: &NavigationRequest) -> Result<String, NavigationError> { Ok(String::new()) }
//! # }
//! # impl Host for Stub {
//! #     fn flash(&self, _: &str, _: Duration) {}
//! #     fn history_back(&self) {}
//! #     fn hard_reload(&self, _: Option<&str>) {}
//! #     fn current_url(&self) -> String { String::new() }
//! #     fn sleep(&self, _: Duration) -> LocalBoxFuture<'static, ()> { futures::future::ready(()).boxed_local() }
//! # }
//! let doc = Rc::new(MemoryDocument::parse(r#"<h1 data-init="page-title">Hello</h1>"#).unwrap());
//! let runtime = Runtime::builder()
//!     .document(doc)
//!     .installer(Rc::new(Stub))
//!     .navigator(Rc::new(Stub))
//!     .host(Rc::new(Stub))
//!     .build()
//!     .unwrap();
//!
//! runtime.init().unwrap();
//! let report = runtime.register_handler("page-title", |_cx| Ok(()), true);
//! assert_eq!(report.invoked.len(), 1);
//! ```

#![warn(missing_docs)]

pub mod dom;
pub mod error;
pub mod host;
pub mod lifecycle;
pub mod loader;
pub mod logging;
pub mod navigation;
pub mod observable;
pub mod overlay;
pub mod registry;
pub mod response;
pub mod runtime;
pub mod settings;
pub mod state;

pub use error::{
	ConfigError, DomError, HandlerError, LoadError, NavigationError, Result, RuntimeError,
	StateError,
};
pub use lifecycle::{CoreSignal, Phase};
pub use runtime::{Runtime, RuntimeBuilder};
pub use settings::RuntimeSettings;

#[doc(hidden)]
pub mod __private {
	#[cfg(not(target_arch = "wasm32"))]
	pub use tracing;
	#[cfg(target_arch = "wasm32")]
	pub use web_sys;
}
