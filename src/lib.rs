//! # Pagewright
//!
//! A client runtime for server-rendered pages with soft (partial) page
//! replacements.
//!
//! Pagewright keeps one long-lived session per page. Elements carrying a
//! marker attribute are initialized exactly once, scripts and stylesheets are
//! loaded on demand and never twice, and everything re-initializes after each
//! soft navigation without double binding.
//!
//! ## Feature Flags
//!
//! - `debug-hooks` - Enables `debug_log!` output
//! - `release-logs` - Keeps info, warn and error logs in release builds
//! - `full` - Both of the above
//!
//! Browser adapters (`WebDocument`, `WebInstaller`, `FetchNavigator`,
//! `WebHost`) are available when compiling for `wasm32`.
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use pagewright::prelude::*;
//!
//! let runtime = Runtime::builder().browser()?.build()?;
//! runtime.init()?;
//!
//! runtime.define("instantToc", |cx| {
//!     let depth = cx.data("depth").unwrap_or_default();
//!     cx.bind_teardown(|| { /* unbind scroll listeners */ });
//!     Ok(())
//! });
//! runtime.register("instant-toc", None, true);
//!
//! runtime.request(["/static/toc.js", "/static/toc.css"]).await?;
//! ```
//!
//! ## Modules
//!
//! Every module of `pagewright-core` is re-exported under the same name.

pub use pagewright_core::{
	dom, error, host, lifecycle, loader, logging, navigation, observable, overlay, registry,
	response, runtime, settings, state,
};

pub use pagewright_core::{
	ConfigError, CoreSignal, DomError, HandlerError, LoadError, NavigationError, Phase, Result,
	Runtime, RuntimeBuilder, RuntimeError, RuntimeSettings, StateError,
};

pub use pagewright_core::{debug_log, error_log, info_log, warn_log};

// Re-export common external dependencies
pub use async_trait::async_trait;

/// Commonly used types.
pub mod prelude {
	pub use crate::dom::{Document, InsertPosition, MemoryDocument, NodeId};
	pub use crate::error::{
		ConfigError, DomError, HandlerError, LoadError, NavigationError, RuntimeError, StateError,
	};
	pub use crate::host::Host;
	pub use crate::lifecycle::{CoreSignal, Phase, SubscriptionId};
	pub use crate::loader::{AssetInstaller, AssetRef, BatchReport, ResourceRequest};
	pub use crate::navigation::{NavigationOutcome, NavigationRequest, SoftNavigator};
	pub use crate::observable::Observable;
	pub use crate::registry::{ElementContext, ScanReport};
	pub use crate::response::ServerResponse;
	pub use crate::runtime::{Runtime, RuntimeBuilder};
	pub use crate::settings::RuntimeSettings;
	pub use crate::state::NavigationOrigin;

	#[cfg(target_arch = "wasm32")]
	pub use crate::dom::WebDocument;
	#[cfg(target_arch = "wasm32")]
	pub use crate::host::WebHost;
	#[cfg(target_arch = "wasm32")]
	pub use crate::loader::WebInstaller;
	#[cfg(target_arch = "wasm32")]
	pub use crate::navigation::{FetchNavigator, bind_browser_navigation};

	// External
	pub use async_trait::async_trait;
	pub use futures::future::{FutureExt, LocalBoxFuture};
}
