//! Markup parsing for the headless document.
//!
//! Accepts the well-formed HTML subset that server templates emit: elements
//! with quoted, unquoted or bare attributes, void and self-closing elements,
//! raw-text elements (`script`, `style`, `textarea`), text and comments.
//! It is not an HTML5 tree builder: unclosed non-void elements are errors,
//! not implied closes.

use crate::error::DomError;
use nom::{
	IResult, Parser,
	branch::alt,
	bytes::complete::{tag, tag_no_case, take_till, take_until, take_while1},
	character::complete::{char, multispace0, multispace1},
	combinator::{map, opt, value},
	multi::many0,
	sequence::{delimited, preceded},
};

/// Elements that never have children or a closing tag.
pub const VOID_ELEMENTS: &[&str] = &[
	"area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
	"wbr",
];

/// Elements whose content is kept verbatim up to the closing tag.
///
/// Their text is neither decoded when parsed nor escaped when serialized.
pub const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea"];

/// A parsed markup node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupNode {
	/// An element and its subtree.
	Element(ElementNode),
	/// Decoded text.
	Text(String),
	/// Comment body, without the delimiters.
	Comment(String),
}

/// A parsed element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementNode {
	/// Lowercased tag name.
	pub tag: String,
	/// Attributes in source order, names lowercased, values decoded.
	pub attributes: Vec<(String, String)>,
	/// Child nodes.
	pub children: Vec<MarkupNode>,
}

impl ElementNode {
	/// Returns an attribute value.
	pub fn attribute(&self, name: &str) -> Option<&str> {
		self.attributes
			.iter()
			.find(|(key, _)| key == name)
			.map(|(_, value)| value.as_str())
	}
}

/// Parses a markup fragment.
///
/// # Example
///
/// ```
/// use pagewright_core::dom::markup::{MarkupNode, parse_fragment};
///
/// let nodes = parse_fragment(r#"<div data-init="greeter">Hi</div>"#).unwrap();
/// match &nodes[0] {
///     MarkupNode::Element(el) => assert_eq!(el.attribute("data-init"), Some("greeter")),
///     _ => unreachable!(),
/// }
/// ```
pub fn parse_fragment(input: &str) -> Result<Vec<MarkupNode>, DomError> {
	match nodes(input) {
		Ok(("", parsed)) => Ok(parsed),
		Ok((rest, _)) => Err(DomError::Markup {
			offset: input.len() - rest.len(),
			reason: format!("unclosed or unexpected tag near '{}'", excerpt(rest)),
		}),
		Err(_) => Err(DomError::Markup {
			offset: 0,
			reason: "unparseable markup".to_string(),
		}),
	}
}

fn excerpt(rest: &str) -> String {
	rest.chars().take(24).collect()
}

fn nodes(input: &str) -> IResult<&str, Vec<MarkupNode>> {
	many0(node).parse(input)
}

fn node(input: &str) -> IResult<&str, MarkupNode> {
	alt((comment, element, text)).parse(input)
}

fn comment(input: &str) -> IResult<&str, MarkupNode> {
	map(
		delimited(tag("<!--"), take_until("-->"), tag("-->")),
		|body: &str| MarkupNode::Comment(body.to_string()),
	)
	.parse(input)
}

fn text(input: &str) -> IResult<&str, MarkupNode> {
	map(take_while1(|c: char| c != '<'), |raw: &str| {
		MarkupNode::Text(decode_entities(raw))
	})
	.parse(input)
}

fn is_name_char(c: char) -> bool {
	c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.' | '@')
}

fn tag_name(input: &str) -> IResult<&str, &str> {
	take_while1(|c: char| c.is_ascii_alphanumeric() || c == '-').parse(input)
}

fn attribute_value(input: &str) -> IResult<&str, &str> {
	alt((
		delimited(char('"'), take_till(|c: char| c == '"'), char('"')),
		delimited(char('\''), take_till(|c: char| c == '\''), char('\'')),
		take_while1(|c: char| {
			!c.is_whitespace() && !matches!(c, '>' | '"' | '\'' | '=' | '<' | '`')
		}),
	))
	.parse(input)
}

fn attribute(input: &str) -> IResult<&str, (String, String)> {
	let (input, name) = take_while1(is_name_char).parse(input)?;
	let (input, raw) = opt(preceded(
		(multispace0, char('='), multispace0),
		attribute_value,
	))
	.parse(input)?;

	Ok((
		input,
		(
			name.to_ascii_lowercase(),
			raw.map(decode_entities).unwrap_or_default(),
		),
	))
}

fn closing_tag<'a>(input: &'a str, name: &str) -> IResult<&'a str, ()> {
	let (input, _) = tag("</").parse(input)?;
	let (input, _) = tag_no_case(name).parse(input)?;
	let (input, _) = multispace0.parse(input)?;
	let (input, _) = char('>').parse(input)?;
	Ok((input, ()))
}

/// Takes raw text up to the matching `</name`, ignoring other closing tags.
fn raw_text<'a>(input: &'a str, name: &str) -> IResult<&'a str, &'a str> {
	// ASCII lowercasing keeps byte offsets aligned with `input`.
	let haystack = input.to_ascii_lowercase();
	let needle = format!("</{}", name);
	let mut from = 0;
	while let Some(found) = haystack[from..].find(&needle) {
		let at = from + found;
		let end = at + needle.len();
		match haystack.as_bytes().get(end) {
			Some(b'>' | b'/') => return Ok((&input[at..], &input[..at])),
			Some(b) if b.is_ascii_whitespace() => return Ok((&input[at..], &input[..at])),
			_ => from = end,
		}
	}
	Err(nom::Err::Error(nom::error::Error::new(
		input,
		nom::error::ErrorKind::TakeUntil,
	)))
}

fn element(input: &str) -> IResult<&str, MarkupNode> {
	let (input, _) = char('<').parse(input)?;
	let (input, name) = tag_name(input)?;
	let (input, attributes) = many0(preceded(multispace1, attribute)).parse(input)?;
	let (input, _) = multispace0.parse(input)?;
	let (input, self_closing) =
		alt((value(true, tag("/>")), value(false, tag(">")))).parse(input)?;

	let name = name.to_ascii_lowercase();
	if self_closing || VOID_ELEMENTS.contains(&name.as_str()) {
		return Ok((
			input,
			MarkupNode::Element(ElementNode {
				tag: name,
				attributes,
				children: Vec::new(),
			}),
		));
	}

	let (input, children) = if RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
		let (input, raw) = raw_text(input, &name)?;
		let children = if raw.is_empty() {
			Vec::new()
		} else {
			vec![MarkupNode::Text(raw.to_string())]
		};
		(input, children)
	} else {
		nodes(input)?
	};

	let (input, ()) = closing_tag(input, &name)?;

	Ok((
		input,
		MarkupNode::Element(ElementNode {
			tag: name,
			attributes,
			children,
		}),
	))
}

/// Decodes the named entities templates commonly emit plus numeric references.
///
/// Unknown references are kept verbatim.
pub fn decode_entities(raw: &str) -> String {
	if !raw.contains('&') {
		return raw.to_string();
	}

	let mut out = String::with_capacity(raw.len());
	let mut rest = raw;

	while let Some(start) = rest.find('&') {
		out.push_str(&rest[..start]);
		let candidate = &rest[start..];

		let decoded = candidate
			.find(';')
			.filter(|end| *end <= 10)
			.and_then(|end| decode_reference(&candidate[1..end]).map(|c| (c, end)));

		match decoded {
			Some((c, end)) => {
				out.push(c);
				rest = &candidate[end + 1..];
			}
			None => {
				out.push('&');
				rest = &candidate[1..];
			}
		}
	}

	out.push_str(rest);
	out
}

fn decode_reference(reference: &str) -> Option<char> {
	match reference {
		"amp" => Some('&'),
		"lt" => Some('<'),
		"gt" => Some('>'),
		"quot" => Some('"'),
		"apos" => Some('\''),
		"nbsp" => Some('\u{a0}'),
		_ => {
			let number = reference.strip_prefix('#')?;
			let code = match number.strip_prefix(['x', 'X']) {
				Some(hex) => u32::from_str_radix(hex, 16).ok()?,
				None => number.parse().ok()?,
			};
			char::from_u32(code)
		}
	}
}

/// Escapes text content for serialization.
pub fn escape_text(text: &str) -> String {
	text.replace('&', "&amp;")
		.replace('<', "&lt;")
		.replace('>', "&gt;")
}

/// Escapes an attribute value for serialization inside double quotes.
pub fn escape_attribute(value: &str) -> String {
	value.replace('&', "&amp;").replace('"', "&quot;")
}
