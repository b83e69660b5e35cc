//! Navigation lifecycle bus
//!
//! A small synchronous pub/sub used for two event families:
//!
//! - [`Phase`]: the soft-navigation lifecycle (`click`/`popstate` → `start` →
//!   `before-swap` → swap → `end`).
//! - [`CoreSignal`]: runtime milestones such as `pre-init` or `elements-ready`.
//!
//! ## Ordering
//!
//! Subscribers of one event fire in subscription order. An emission works on a
//! snapshot taken when it starts: a subscription added by a running callback
//! first fires on the next emission, and a subscription removed by a running
//! callback does not fire again. One-shot subscriptions are removed before any
//! callback of the emission runs.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;
use std::str::FromStr;

/// Soft-navigation lifecycle phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
	/// A soft navigation was triggered by a link click.
	Click,
	/// A soft navigation was triggered by history traversal.
	Popstate,
	/// The navigation request was issued.
	Start,
	/// Last point at which the outgoing content is still in the document.
	BeforeSwap,
	/// The new content is live.
	End,
}

impl Phase {
	/// All phases in emission order.
	pub const ALL: [Phase; 5] = [
		Phase::Click,
		Phase::Popstate,
		Phase::Start,
		Phase::BeforeSwap,
		Phase::End,
	];

	/// Returns the phase name.
	pub fn as_str(&self) -> &'static str {
		match self {
			Phase::Click => "click",
			Phase::Popstate => "popstate",
			Phase::Start => "start",
			Phase::BeforeSwap => "before-swap",
			Phase::End => "end",
		}
	}
}

impl fmt::Display for Phase {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Error returned when parsing an unknown phase name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown lifecycle phase '{0}'")]
pub struct UnknownPhase(pub String);

impl FromStr for Phase {
	type Err = UnknownPhase;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Phase::ALL
			.into_iter()
			.find(|phase| phase.as_str() == s)
			.ok_or_else(|| UnknownPhase(s.to_string()))
	}
}

/// Runtime milestones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoreSignal {
	/// `init` started.
	PreInit,
	/// `init` finished.
	PostInit,
	/// A registry scan finished.
	ElementsReady,
	/// A resource batch started.
	LoadStart,
	/// A resource batch settled.
	LoadComplete,
	/// A successful server response was handled.
	ResponsePositive,
	/// A failed server response was handled.
	ResponseNegative,
}

impl CoreSignal {
	/// Returns the signal name.
	pub fn as_str(&self) -> &'static str {
		match self {
			CoreSignal::PreInit => "pre-init",
			CoreSignal::PostInit => "post-init",
			CoreSignal::ElementsReady => "elements-ready",
			CoreSignal::LoadStart => "load-start",
			CoreSignal::LoadComplete => "load-complete",
			CoreSignal::ResponsePositive => "response-positive",
			CoreSignal::ResponseNegative => "response-negative",
		}
	}
}

impl fmt::Display for CoreSignal {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Handle returned by a subscription, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Callback invoked by an [`EventBus`].
pub type Listener = Rc<dyn Fn()>;

struct Subscription<E> {
	id: SubscriptionId,
	event: E,
	once: bool,
	callback: Listener,
}

/// Synchronous single-threaded event bus.
pub struct EventBus<E> {
	subscriptions: RefCell<Vec<Subscription<E>>>,
	next_id: Cell<u64>,
}

/// Bus carrying soft-navigation phases.
pub type LifecycleBus = EventBus<Phase>;

/// Bus carrying runtime milestones.
pub type CoreSignals = EventBus<CoreSignal>;

impl<E> Default for EventBus<E> {
	fn default() -> Self {
		Self {
			subscriptions: RefCell::new(Vec::new()),
			next_id: Cell::new(0),
		}
	}
}

impl<E: fmt::Debug> fmt::Debug for EventBus<E> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let subscriptions = self.subscriptions.borrow();
		f.debug_struct("EventBus")
			.field(
				"subscriptions",
				&subscriptions
					.iter()
					.map(|s| (&s.event, s.once))
					.collect::<Vec<_>>(),
			)
			.finish()
	}
}

impl<E: Copy + Eq + Hash> EventBus<E> {
	/// Creates an empty bus.
	pub fn new() -> Self {
		Self::default()
	}

	fn push(&self, event: E, once: bool, callback: Listener) -> SubscriptionId {
		let id = SubscriptionId(self.next_id.get());
		self.next_id.set(id.0 + 1);
		self.subscriptions.borrow_mut().push(Subscription {
			id,
			event,
			once,
			callback,
		});
		id
	}

	/// Subscribes `callback` to every future occurrence of `event`.
	///
	/// With `run_now`, the callback is also invoked once before returning.
	pub fn on(&self, event: E, callback: impl Fn() + 'static, run_now: bool) -> SubscriptionId {
		let callback: Listener = Rc::new(callback);
		let id = self.push(event, false, Rc::clone(&callback));
		if run_now {
			callback();
		}
		id
	}

	/// Subscribes `callback` to the next occurrence of `event` only.
	pub fn once(&self, event: E, callback: impl Fn() + 'static) -> SubscriptionId {
		self.push(event, true, Rc::new(callback))
	}

	/// Removes a subscription. Returns `false` if it was already gone.
	pub fn off(&self, id: SubscriptionId) -> bool {
		let mut subscriptions = self.subscriptions.borrow_mut();
		let before = subscriptions.len();
		subscriptions.retain(|s| s.id != id);
		subscriptions.len() != before
	}

	/// Invokes the subscribers of `event`. Returns how many ran.
	pub fn emit(&self, event: E) -> usize {
		let snapshot: Vec<(SubscriptionId, bool, Listener)> = {
			let mut subscriptions = self.subscriptions.borrow_mut();
			let snapshot = subscriptions
				.iter()
				.filter(|s| s.event == event)
				.map(|s| (s.id, s.once, Rc::clone(&s.callback)))
				.collect();
			subscriptions.retain(|s| !(s.once && s.event == event));
			snapshot
		};

		let mut ran = 0;
		for (id, once, callback) in snapshot {
			if !once && !self.is_subscribed(id) {
				continue;
			}
			callback();
			ran += 1;
		}
		ran
	}

	/// Whether a subscription is still live.
	pub fn is_subscribed(&self, id: SubscriptionId) -> bool {
		self.subscriptions.borrow().iter().any(|s| s.id == id)
	}

	/// Number of live subscriptions for `event`.
	pub fn subscriber_count(&self, event: E) -> usize {
		self.subscriptions
			.borrow()
			.iter()
			.filter(|s| s.event == event)
			.count()
	}

	/// Drops every subscription.
	pub fn clear(&self) {
		// Callbacks may own runtime handles; drop them after releasing the borrow.
		let dropped = std::mem::take(&mut *self.subscriptions.borrow_mut());
		drop(dropped);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn recorder() -> (Rc<RefCell<Vec<&'static str>>>, impl Fn(&'static str) -> Listener) {
		let log = Rc::new(RefCell::new(Vec::new()));
		let make = {
			let log = Rc::clone(&log);
			move |label: &'static str| -> Listener {
				let log = Rc::clone(&log);
				Rc::new(move || log.borrow_mut().push(label))
			}
		};
		(log, make)
	}

	#[rstest]
	#[case("click", Phase::Click)]
	#[case("popstate", Phase::Popstate)]
	#[case("start", Phase::Start)]
	#[case("before-swap", Phase::BeforeSwap)]
	#[case("end", Phase::End)]
	fn test_phase_names(#[case] name: &str, #[case] phase: Phase) {
		assert_eq!(name.parse::<Phase>().unwrap(), phase);
		assert_eq!(phase.to_string(), name);
	}

	#[rstest]
	fn test_unknown_phase() {
		assert_eq!(
			"beforeReplace".parse::<Phase>(),
			Err(UnknownPhase("beforeReplace".to_string()))
		);
	}

	#[rstest]
	fn test_subscription_order() {
		let bus = LifecycleBus::new();
		let (log, make) = recorder();
		for label in ["a", "b", "c"] {
			let cb = make(label);
			bus.on(Phase::End, move || cb(), false);
		}

		assert_eq!(bus.emit(Phase::End), 3);
		assert_eq!(*log.borrow(), vec!["a", "b", "c"]);
	}

	#[rstest]
	fn test_run_now_invokes_immediately() {
		let bus = LifecycleBus::new();
		let (log, make) = recorder();
		let cb = make("now");
		bus.on(Phase::End, move || cb(), true);
		assert_eq!(*log.borrow(), vec!["now"]);

		bus.emit(Phase::End);
		assert_eq!(*log.borrow(), vec!["now", "now"]);
	}

	#[rstest]
	fn test_once_fires_a_single_time() {
		let bus = LifecycleBus::new();
		let (log, make) = recorder();
		let cb = make("teardown");
		bus.once(Phase::BeforeSwap, move || cb());

		assert_eq!(bus.subscriber_count(Phase::BeforeSwap), 1);
		bus.emit(Phase::BeforeSwap);
		bus.emit(Phase::BeforeSwap);

		assert_eq!(*log.borrow(), vec!["teardown"]);
		assert_eq!(bus.subscriber_count(Phase::BeforeSwap), 0);
	}

	#[rstest]
	fn test_emit_only_matching_event() {
		let bus = LifecycleBus::new();
		let (log, make) = recorder();
		let cb = make("end");
		bus.on(Phase::End, move || cb(), false);

		assert_eq!(bus.emit(Phase::Start), 0);
		assert!(log.borrow().is_empty());
	}

	#[rstest]
	fn test_off() {
		let bus = CoreSignals::new();
		let id = bus.on(CoreSignal::PostInit, || {}, false);
		assert!(bus.off(id));
		assert!(!bus.off(id));
		assert_eq!(bus.emit(CoreSignal::PostInit), 0);
	}

	#[rstest]
	fn test_subscription_added_during_emit_waits_for_next_emit() {
		let bus = Rc::new(LifecycleBus::new());
		let (log, make) = recorder();

		let inner = make("late");
		let weak = Rc::downgrade(&bus);
		bus.once(Phase::End, move || {
			if let Some(bus) = weak.upgrade() {
				let inner = inner.clone();
				bus.on(Phase::End, move || inner(), false);
			}
		});

		bus.emit(Phase::End);
		assert!(log.borrow().is_empty());

		bus.emit(Phase::End);
		assert_eq!(*log.borrow(), vec!["late"]);
	}

	#[rstest]
	fn test_subscription_removed_during_emit_is_skipped() {
		let bus = Rc::new(LifecycleBus::new());
		let (log, make) = recorder();
		let victim: Rc<Cell<Option<SubscriptionId>>> = Rc::new(Cell::new(None));

		let weak = Rc::downgrade(&bus);
		let target = Rc::clone(&victim);
		bus.on(
			Phase::End,
			move || {
				if let (Some(bus), Some(id)) = (weak.upgrade(), target.get()) {
					bus.off(id);
				}
			},
			false,
		);
		let cb = make("victim");
		victim.set(Some(bus.on(Phase::End, move || cb(), false)));

		assert_eq!(bus.emit(Phase::End), 1);
		assert!(log.borrow().is_empty());
	}

	#[rstest]
	fn test_clear() {
		let bus = LifecycleBus::new();
		bus.on(Phase::End, || {}, false);
		bus.once(Phase::BeforeSwap, || {});
		bus.clear();
		assert_eq!(bus.subscriber_count(Phase::End), 0);
		assert_eq!(bus.subscriber_count(Phase::BeforeSwap), 0);
	}
}
