//! Observable properties
//!
//! [`Observable`] is a shared, clonable value cell with a namespace and a
//! property name. [`ProxyRegistry`] attaches at most one change callback per
//! canonical `namespace.property` key; watching the same key again is a silent
//! no-op.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

type Observer<T> = Rc<dyn Fn(&T)>;

struct Slot<T> {
	value: T,
	observers: Vec<Observer<T>>,
}

/// A value whose writes notify observers.
///
/// Clones share the same slot.
///
/// # Example
///
/// ```
/// use pagewright_core::observable::Observable;
///
/// let count = Observable::new("demo", "count", 0);
/// let copy = count.clone();
/// count.set(3);
/// assert_eq!(copy.get(), 3);
/// ```
pub struct Observable<T> {
	namespace: Rc<str>,
	property: Rc<str>,
	slot: Rc<RefCell<Slot<T>>>,
}

impl<T> Clone for Observable<T> {
	fn clone(&self) -> Self {
		Self {
			namespace: Rc::clone(&self.namespace),
			property: Rc::clone(&self.property),
			slot: Rc::clone(&self.slot),
		}
	}
}

impl<T> Observable<T> {
	/// Returns `"namespace.property"`.
	pub fn canonical_key(&self) -> String {
		format!("{}.{}", self.namespace, self.property)
	}
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Observable")
			.field("key", &self.canonical_key())
			.field("value", &self.slot.borrow().value)
			.finish()
	}
}

impl<T: Clone + 'static> Observable<T> {
	/// Creates an observable with an initial value.
	pub fn new(namespace: &str, property: &str, value: T) -> Self {
		Self {
			namespace: Rc::from(namespace),
			property: Rc::from(property),
			slot: Rc::new(RefCell::new(Slot {
				value,
				observers: Vec::new(),
			})),
		}
	}

	/// Returns a copy of the current value.
	pub fn get(&self) -> T {
		self.slot.borrow().value.clone()
	}

	/// Stores a value, then notifies observers with it.
	pub fn set(&self, value: T) {
		let observers = {
			let mut slot = self.slot.borrow_mut();
			slot.value = value.clone();
			slot.observers.clone()
		};
		for observer in observers {
			observer(&value);
		}
	}

	/// Applies `f` to the current value and stores the result.
	pub fn update(&self, f: impl FnOnce(&T) -> T) {
		let next = f(&self.slot.borrow().value);
		self.set(next);
	}

	/// Adds an observer invoked after every write.
	pub fn subscribe(&self, observer: impl Fn(&T) + 'static) {
		self.slot.borrow_mut().observers.push(Rc::new(observer));
	}

	/// Number of attached observers.
	pub fn observer_count(&self) -> usize {
		self.slot.borrow().observers.len()
	}
}

/// Tracks which canonical keys already carry a watch callback.
#[derive(Debug, Default)]
pub struct ProxyRegistry {
	watched: RefCell<HashSet<String>>,
}

impl ProxyRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Attaches `callback` to `observable` unless its key is already watched.
	///
	/// Returns `false`, without side effects, when the key is already watched
	/// or no callback is given.
	pub fn watch<T, F>(&self, observable: &Observable<T>, callback: Option<F>) -> bool
	where
		T: Clone + 'static,
		F: Fn(&T) + 'static,
	{
		let Some(callback) = callback else {
			return false;
		};

		let key = observable.canonical_key();
		if !self.watched.borrow_mut().insert(key) {
			crate::debug_log!(
				"Property {} is already watched",
				observable.canonical_key()
			);
			return false;
		}

		observable.subscribe(callback);
		true
	}

	/// Whether `key` is watched.
	pub fn is_watched(&self, key: &str) -> bool {
		self.watched.borrow().contains(key)
	}

	/// Number of watched keys.
	pub fn len(&self) -> usize {
		self.watched.borrow().len()
	}

	/// Returns true if nothing is watched.
	pub fn is_empty(&self) -> bool {
		self.watched.borrow().is_empty()
	}
}
