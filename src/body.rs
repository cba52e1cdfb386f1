//! Body decoding, pretty-printing and truncation.
//!
//! Nothing in here fails: a body that cannot be parsed is shown as it came in.

use std::borrow::Cow;

use quick_xml::{events::Event, Reader, Writer};

/// Marker appended to a truncated body.
pub const ELLIPSIS: &str = "...";

/// Decodes a body as UTF-8, falling back to an escaped byte-string
/// representation (`b'\x89PNG...'`) for binary payloads.
pub fn decode(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => Cow::Owned(format!("b'{}'", bytes.escape_ascii())),
    }
}

/// Reformats JSON and XML bodies for reading. Any other content type, or a
/// body that does not parse, is returned unchanged.
pub fn pretty_print<'a>(text: &'a str, content_type: &str) -> Cow<'a, str> {
    let pretty = if content_type.contains("/json") {
        pretty_json(text)
    } else if content_type.contains("/xml") {
        pretty_xml(text, true).or_else(|| pretty_xml(text, false))
    } else {
        None
    };
    pretty.map_or(Cow::Borrowed(text), Cow::Owned)
}

/// Keeps the first `limit` characters and appends [`ELLIPSIS`]. A limit of
/// zero means no limit.
pub fn truncate(text: &str, limit: usize) -> Cow<'_, str> {
    if limit == 0 {
        return Cow::Borrowed(text);
    }
    match text.char_indices().nth(limit) {
        Some((end, _)) => Cow::Owned(format!("{}{ELLIPSIS}", &text[..end])),
        None => Cow::Borrowed(text),
    }
}

/// Full body pipeline: decode, optionally pretty-print, optionally truncate.
pub fn render_body(bytes: &[u8], content_type: &str, pretty: bool, limit: Option<usize>) -> String {
    let text = decode(bytes);
    let text = if pretty {
        pretty_print(&text, content_type)
    } else {
        Cow::Borrowed(text.as_ref())
    };
    match limit {
        Some(limit) => truncate(&text, limit).into_owned(),
        None => text.into_owned(),
    }
}

fn pretty_json(text: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(text).ok()?;
    serde_json::to_string_pretty(&value).ok()
}

// `strict` checks that end tags match their start tags; the lenient pass only
// re-indents whatever token stream the reader produces.
fn pretty_xml(text: &str, strict: bool) -> Option<String> {
    let mut reader = Reader::from_str(text);
    let config = reader.config_mut();
    config.trim_text(true);
    config.check_end_names = strict;

    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    loop {
        match reader.read_event().ok()? {
            Event::Eof => break,
            event => writer.write_event(event).ok()?,
        }
    }
    String::from_utf8(writer.into_inner()).ok()
}
