//! Error types shared across the runtime.

/// Errors raised by a [`Document`](crate::dom::Document) adapter.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
	/// The node id no longer refers to an attached node.
	#[error("Node {0} is not attached to the document")]
	Detached(u64),

	/// Markup could not be parsed.
	#[error("Malformed markup at byte {offset}: {reason}")]
	Markup {
		/// Byte offset of the first unparsed input.
		offset: usize,
		/// What the parser expected.
		reason: String,
	},

	/// The adapter rejected the operation.
	#[error("DOM operation failed: {0}")]
	Operation(String),
}

/// Errors raised while installing a script or stylesheet.
///
/// Cloneable because one in-flight install hands its outcome to every
/// caller waiting on the same resource.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
	/// The url is neither a script nor a stylesheet.
	#[error("Unsupported asset type for '{0}' (expected .js or .css)")]
	UnsupportedAsset(String),

	/// The asset could not be fetched.
	#[error("Failed to fetch '{url}': {reason}")]
	Fetch {
		/// Requested url.
		url: String,
		/// Transport or status message.
		reason: String,
	},

	/// The asset was fetched but could not be attached to the document.
	#[error("Failed to install '{url}': {reason}")]
	Install {
		/// Requested url.
		url: String,
		/// Adapter message.
		reason: String,
	},

	/// A declarative requirement attribute is not a url or a list of urls.
	#[error("Malformed resource declaration '{0}'")]
	Declaration(String),
}

/// Error returned by an element handler.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct HandlerError {
	message: String,
}

impl HandlerError {
	/// Creates a handler error with the given message.
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
		}
	}

	/// Returns the message.
	pub fn message(&self) -> &str {
		&self.message
	}
}

impl From<DomError> for HandlerError {
	fn from(error: DomError) -> Self {
		Self::new(error.to_string())
	}
}

impl From<LoadError> for HandlerError {
	fn from(error: LoadError) -> Self {
		Self::new(error.to_string())
	}
}

/// Errors raised by a soft navigation.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavigationError {
	/// The page request failed or returned an error status.
	#[error("Request to '{url}' failed: {reason}")]
	Request {
		/// Target url.
		url: String,
		/// Transport or status message.
		reason: String,
	},

	/// The page request outlived the configured timeout.
	#[error("Request to '{url}' timed out after {timeout_ms}ms")]
	Timeout {
		/// Target url.
		url: String,
		/// Timeout that elapsed, in milliseconds.
		timeout_ms: u64,
	},

	/// The element whose content is swapped does not exist.
	#[error("Navigation container '#{0}' not found")]
	ContainerNotFound(String),

	/// Replacing the container content failed.
	#[error("Content swap failed: {0}")]
	Swap(#[from] DomError),
}

/// Errors raised by the state snapshot accessors.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
	/// The field is maintained by the runtime and cannot be written.
	#[error("State field '{0}' is read-only")]
	ReadOnly(String),

	/// The value has the wrong shape for the field.
	#[error("State field '{field}' expects {expected}")]
	InvalidValue {
		/// Field name.
		field: String,
		/// Description of the accepted values.
		expected: &'static str,
	},
}

/// Errors raised while loading or validating settings.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	/// TOML input could not be deserialized.
	#[error("Failed to parse TOML settings: {0}")]
	Toml(#[from] toml::de::Error),

	/// JSON input could not be deserialized.
	#[error("Failed to parse JSON settings: {0}")]
	Json(#[from] serde_json::Error),

	/// A setting parsed but failed validation.
	#[error("Invalid setting '{field}': {reason}")]
	Invalid {
		/// Setting name.
		field: &'static str,
		/// Why the value was rejected.
		reason: String,
	},

	/// The builder was not given a required adapter.
	#[error("Runtime capability '{0}' was not provided")]
	MissingCapability(&'static str),
}

/// Umbrella error for runtime operations.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
	/// `init` was called a second time.
	#[error("Runtime is already initialized")]
	AlreadyInitialized,

	/// Document error.
	#[error(transparent)]
	Dom(#[from] DomError),

	/// Resource loading error.
	#[error(transparent)]
	Load(#[from] LoadError),

	/// Soft navigation error.
	#[error(transparent)]
	Navigation(#[from] NavigationError),

	/// State snapshot error.
	#[error(transparent)]
	State(#[from] StateError),

	/// Settings error.
	#[error(transparent)]
	Config(#[from] ConfigError),
}

/// Result type defaulting to [`RuntimeError`].
pub type Result<T, E = RuntimeError> = std::result::Result<T, E>;
