//! Integration tests for the element lifecycle registry
//!
//! These tests verify:
//! 1. Handlers run at most once per element across scans
//! 2. Late-bound named handlers and direct handlers
//! 3. Fault isolation between elements
//! 4. Scoped scans and markup insertion
//! 5. Re-initialization of swapped-in content

mod common;

use common::{Harness, Log};
use pagewright_core::dom::{Document, InsertPosition};
use pagewright_core::error::HandlerError;
use pagewright_core::lifecycle::CoreSignal;
use pagewright_core::registry::ElementContext;
use pagewright_core::state::NavigationOrigin;
use rstest::rstest;

fn counting_handler(log: &Log, label: &str) -> impl Fn(&ElementContext) -> Result<(), HandlerError> + 'static {
	let log = log.clone();
	let label = label.to_string();
	move |_cx: &ElementContext| {
		log.push(label.clone());
		Ok(())
	}
}

#[rstest]
fn test_greeter_runs_once_per_element() {
	let h = Harness::initialized(r#"<main id="main"><p data-init="greeter">Hi</p></main>"#);
	let log = Log::default();

	h.runtime
		.register_handler("greeter", counting_handler(&log, "greeter"), true);
	h.runtime.scan(None, None);
	h.runtime.scan(Some("greeter"), None);

	assert_eq!(log.count("greeter"), 1);
}

#[rstest]
fn test_register_with_run_now_false_defers() {
	let h = Harness::initialized(r#"<p data-init="greeter"></p>"#);
	let log = Log::default();

	let report = h
		.runtime
		.register_handler("greeter", counting_handler(&log, "greeter"), false);
	assert!(report.invoked.is_empty());
	assert_eq!(log.count("greeter"), 0);

	h.runtime.scan(None, None);
	assert_eq!(log.count("greeter"), 1);
}

#[rstest]
fn test_named_handler_is_late_bound() {
	let h = Harness::initialized(r#"<nav data-init="instant-toc"></nav>"#);
	let log = Log::default();

	h.runtime.register("instant-toc", None, false);
	h.runtime.define("instantToc", counting_handler(&log, "toc"));

	let report = h.runtime.scan(None, None);
	assert_eq!(report.invoked.len(), 1);
	assert_eq!(log.entries(), vec!["toc"]);
}

#[rstest]
fn test_alias_selects_handler_name() {
	let h = Harness::initialized(r#"<div data-init="captcha"></div>"#);
	let log = Log::default();

	h.runtime.define("recaptcha", counting_handler(&log, "recaptcha"));
	h.runtime.register("captcha", Some("recaptcha"), true);

	assert_eq!(log.entries(), vec!["recaptcha"]);
}

#[rstest]
fn test_unresolved_marker_stays_visited() {
	let h = Harness::initialized(r#"<div data-init="later"></div>"#);
	let log = Log::default();

	let report = h.runtime.scan(None, None);
	assert_eq!(report.skipped.len(), 1);
	assert!(report.invoked.is_empty());

	// The element was consumed by the first scan.
	h.runtime
		.register_handler("later", counting_handler(&log, "later"), true);
	assert_eq!(log.count("later"), 0);
}

#[rstest]
fn test_faulty_handler_does_not_stop_scan() {
	let h = Harness::initialized(
		r#"<div data-init="broken"></div><div data-init="fine"></div><div data-init="broken"></div>"#,
	);
	let log = Log::default();

	h.runtime.register_handler(
		"broken",
		|_cx: &ElementContext| Err(HandlerError::new("boom")),
		false,
	);
	h.runtime
		.register_handler("fine", counting_handler(&log, "fine"), false);

	let report = h.runtime.scan(None, None);

	assert_eq!(report.invoked.len(), 3);
	assert_eq!(report.faults.len(), 2);
	assert!(report.faults.iter().all(|f| f.marker.as_str() == "broken"));
	assert_eq!(report.faults[0].error.message(), "boom");
	assert_eq!(log.count("fine"), 1);

	// Faulty elements are not retried.
	assert!(h.runtime.scan(None, None).invoked.is_empty());
}

#[rstest]
fn test_handler_sees_its_element() {
	let h = Harness::initialized(r#"<h1 data-init="page-title" data-level="1">Hello</h1>"#);
	let seen = Log::default();

	let log = seen.clone();
	h.runtime.register_handler(
		"page-title",
		move |cx: &ElementContext| {
			log.push(cx.runtime().document().text_content(cx.node()).unwrap_or_default());
			log.push(cx.data("level").unwrap_or_default());
			log.push(cx.marker().to_string());
			Ok(())
		},
		true,
	);

	assert_eq!(seen.entries(), vec!["Hello", "1", "page-title"]);
}

#[rstest]
fn test_handler_may_rescan_reentrantly() {
	let h = Harness::initialized(r#"<section data-init="outer"><p data-init="inner"></p></section>"#);
	let log = Log::default();

	h.runtime
		.register_handler("inner", counting_handler(&log, "inner"), false);

	let outer_log = log.clone();
	h.runtime.register_handler(
		"outer",
		move |cx: &ElementContext| {
			outer_log.push("outer");
			// The outer element is already visited, so this only reaches `inner`.
			cx.runtime().scan(None, Some(cx.node()));
			Ok(())
		},
		false,
	);

	h.runtime.scan(None, None);
	assert_eq!(log.entries(), vec!["outer", "inner"]);
}

#[rstest]
fn test_scope_includes_scope_element() {
	let h = Harness::initialized(
		r#"<div id="a" data-init="box"><span data-init="box"></span></div><div id="b" data-init="box"></div>"#,
	);
	let log = Log::default();
	h.runtime
		.register_handler("box", counting_handler(&log, "box"), false);

	let scope = h.doc.element_by_id("a").unwrap();
	let report = h.runtime.scan(None, Some(scope));

	assert_eq!(report.invoked.len(), 2);
	assert_eq!(report.invoked[0], scope);
}

#[rstest]
fn test_scan_emits_elements_ready() {
	let h = Harness::initialized("");
	let log = Log::default();
	h.runtime
		.signals()
		.on(CoreSignal::ElementsReady, log.recorder("ready"), false);

	h.runtime.scan(None, None);
	h.runtime.register("anything", None, true);

	assert_eq!(log.count("ready"), 2);
}

#[rstest]
#[case(InsertPosition::Before)]
#[case(InsertPosition::Prepend)]
#[case(InsertPosition::Append)]
fn test_insert_markup_scans_only_inserted_subtree(#[case] position: InsertPosition) {
	let h = Harness::initialized(r#"<main id="main"><ul id="list"><li data-init="row">old</li></ul></main>"#);
	let log = Log::default();
	h.runtime
		.register_handler("row", counting_handler(&log, "row"), false);

	let list = h.doc.element_by_id("list").unwrap();
	let report = h
		.runtime
		.insert_markup(list, r#"<li data-init="row">new</li>"#, position)
		.unwrap();

	assert_eq!(report.invoked.len(), 1);
	assert_eq!(
		h.doc.text_content(report.invoked[0]).as_deref(),
		Some("new")
	);
	// The pre-existing row is still unvisited.
	assert_eq!(h.runtime.scan(None, None).invoked.len(), 1);
}

#[tokio::test]
async fn test_swapped_content_initializes_again() {
	let h = Harness::initialized(r#"<main id="main"><p data-init="greeter">one</p></main>"#);
	let log = Log::default();
	h.runtime
		.register_handler("greeter", counting_handler(&log, "greeter"), true);
	h.navigator
		.page("/two", r#"<p data-init="greeter">two</p>"#);

	h.runtime
		.navigate("/two", NavigationOrigin::ClientNav)
		.await
		.unwrap();

	assert_eq!(log.count("greeter"), 2);
	// Visited entries of the swapped-out element were pruned.
	assert_eq!(h.runtime.registry().visited_count(), 1);
}

#[rstest]
fn test_duplicate_registration_overwrites() {
	let h = Harness::initialized(r#"<div data-init="toc"></div>"#);
	let log = Log::default();

	h.runtime
		.register_handler("toc", counting_handler(&log, "first"), false);
	h.runtime
		.register_handler("toc", counting_handler(&log, "second"), true);

	assert_eq!(log.entries(), vec!["second"]);
}
