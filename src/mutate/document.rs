//! Structured-document namespace injection
//!
//! A document only needs three capabilities: parse, declare a namespace on
//! the root element, serialize. [`DocumentCodec`] hides the concrete format so
//! the compiled XML of a real bundle can be plugged in next to
//! [`TextXmlCodec`].

use rand::Rng;

use crate::error::{Error, Result};

/// Namespace URI bound by the injected declaration; declaring it is inert
pub const AUTO_NAMESPACE: &str = "http://schemas.android.com/apk/res-auto";

/// Prefix stem of the injected declaration
pub const PREFIX_STEM: &str = "guard";

const PREFIX_ATTEMPTS: usize = 16;

/// A parsed document with a single root element
pub trait StructuredDocument {
    /// `(prefix, uri)` pairs declared on the root; the default namespace has
    /// an empty prefix
    fn namespace_declarations(&self) -> Vec<(String, String)>;

    /// Declare `prefix` on the root element
    fn declare_namespace(&mut self, prefix: &str, uri: &str) -> Result<()>;

    fn serialize(&self) -> Result<Vec<u8>>;
}

/// Parses bytes into a [`StructuredDocument`]
pub trait DocumentCodec {
    fn name(&self) -> &'static str;

    fn parse(&self, bytes: &[u8]) -> Result<Box<dyn StructuredDocument>>;
}

/// Declare [`AUTO_NAMESPACE`] under a random unused prefix
///
/// Returns the new bytes and the declaration as `xmlns:prefix=uri`.
pub fn inject_namespace<R: Rng>(
    codec: &dyn DocumentCodec,
    bytes: &[u8],
    rng: &mut R,
) -> Result<(Vec<u8>, String)> {
    let mut doc = codec.parse(bytes)?;
    let taken: Vec<String> = doc
        .namespace_declarations()
        .into_iter()
        .map(|(prefix, _)| prefix)
        .collect();

    let prefix = (0..PREFIX_ATTEMPTS)
        .map(|_| format!("{}{}", PREFIX_STEM, rng.random_range(0..10_000)))
        .find(|p| !taken.contains(p))
        .ok_or_else(|| Error::mutation("document", "no free namespace prefix"))?;

    doc.declare_namespace(&prefix, AUTO_NAMESPACE)?;
    let out = doc.serialize()?;
    Ok((out, format!("xmlns:{}={}", prefix, AUTO_NAMESPACE)))
}

/// Plain-text XML
#[derive(Debug, Clone, Copy, Default)]
pub struct TextXmlCodec;

impl DocumentCodec for TextXmlCodec {
    fn name(&self) -> &'static str {
        "text-xml"
    }

    fn parse(&self, bytes: &[u8]) -> Result<Box<dyn StructuredDocument>> {
        Ok(Box::new(TextXmlDocument::parse(bytes)?))
    }
}

/// Text XML document; only the root start tag is interpreted
#[derive(Debug, Clone)]
pub struct TextXmlDocument {
    text: String,
    /// Byte offset just past the root element name
    name_end: usize,
    declarations: Vec<(String, String)>,
}

fn malformed(message: impl Into<String>) -> Error {
    Error::mutation("document", message)
}

impl TextXmlDocument {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| malformed(format!("not UTF-8: {}", e)))?
            .to_string();
        let mut pos = text.strip_prefix('\u{feff}').map(|_| 3).unwrap_or(0);

        // Prolog: declaration, processing instructions, comments, doctype
        loop {
            pos += leading_whitespace(&text[pos..]);
            let rest = &text[pos..];
            if rest.starts_with("<?") {
                pos += find_after(rest, "?>").ok_or_else(|| malformed("unterminated <?"))?;
            } else if rest.starts_with("<!--") {
                pos += find_after(rest, "-->").ok_or_else(|| malformed("unterminated comment"))?;
            } else if rest.starts_with("<!") {
                let end = match (rest.find('['), rest.find('>')) {
                    (Some(open), Some(close)) if open < close => find_after(rest, "]>"),
                    (_, Some(close)) => Some(close + 1),
                    _ => None,
                };
                pos += end.ok_or_else(|| malformed("unterminated doctype"))?;
            } else if rest.starts_with('<') {
                break;
            } else if rest.is_empty() {
                return Err(malformed("no root element"));
            } else {
                return Err(malformed("content before root element"));
            }
        }

        let name_start = pos + 1;
        let name_len = text[name_start..]
            .find(|c: char| c.is_whitespace() || c == '/' || c == '>')
            .ok_or_else(|| malformed("unterminated root tag"))?;
        if name_len == 0 {
            return Err(malformed("empty root element name"));
        }
        let name_end = name_start + name_len;
        let root = text[name_start..name_end].to_string();

        let (declarations, self_closing, tag_end) = parse_attributes(&text, name_end)?;
        if !self_closing && !text[tag_end..].contains(&format!("</{}", root)) {
            return Err(malformed(format!("root element <{}> is never closed", root)));
        }

        Ok(Self {
            text,
            name_end,
            declarations,
        })
    }
}

impl StructuredDocument for TextXmlDocument {
    fn namespace_declarations(&self) -> Vec<(String, String)> {
        self.declarations.clone()
    }

    fn declare_namespace(&mut self, prefix: &str, uri: &str) -> Result<()> {
        if self.declarations.iter().any(|(p, _)| p == prefix) {
            return Err(malformed(format!("prefix {} already declared", prefix)));
        }
        let attr = format!(" xmlns:{}=\"{}\"", prefix, escape_attr(uri));
        self.text.insert_str(self.name_end, &attr);
        self.declarations.push((prefix.to_string(), uri.to_string()));
        Ok(())
    }

    fn serialize(&self) -> Result<Vec<u8>> {
        Ok(self.text.as_bytes().to_vec())
    }
}

fn leading_whitespace(s: &str) -> usize {
    s.len() - s.trim_start().len()
}

/// Offset just past the first `needle` in `haystack`
fn find_after(haystack: &str, needle: &str) -> Option<usize> {
    haystack.find(needle).map(|i| i + needle.len())
}

/// Scan root attributes starting at `pos`
///
/// Returns namespace declarations, whether the tag self-closes, and the
/// offset just past the tag.
fn parse_attributes(text: &str, mut pos: usize) -> Result<(Vec<(String, String)>, bool, usize)> {
    let mut declarations = Vec::new();
    loop {
        pos += leading_whitespace(&text[pos..]);
        let rest = &text[pos..];
        if rest.starts_with("/>") {
            return Ok((declarations, true, pos + 2));
        }
        if rest.starts_with('>') {
            return Ok((declarations, false, pos + 1));
        }
        if rest.is_empty() {
            return Err(malformed("unterminated root tag"));
        }

        let name_len = rest
            .find(|c: char| c.is_whitespace() || c == '=' || c == '>' || c == '/')
            .unwrap_or(rest.len());
        if name_len == 0 {
            return Err(malformed(format!("unexpected character in root tag at {}", pos)));
        }
        let name = &rest[..name_len];
        pos += name_len;
        pos += leading_whitespace(&text[pos..]);
        if !text[pos..].starts_with('=') {
            return Err(malformed(format!("attribute {} has no value", name)));
        }
        pos += 1;
        pos += leading_whitespace(&text[pos..]);

        let quote = text[pos..]
            .chars()
            .next()
            .filter(|c| *c == '"' || *c == '\'')
            .ok_or_else(|| malformed(format!("attribute {} value is not quoted", name)))?;
        let value_start = pos + 1;
        let value_len = text[value_start..]
            .find(quote)
            .ok_or_else(|| malformed(format!("attribute {} value is not terminated", name)))?;
        let value = &text[value_start..value_start + value_len];
        pos = value_start + value_len + 1;

        if name == "xmlns" {
            declarations.push((String::new(), value.to_string()));
        } else if let Some(prefix) = name.strip_prefix("xmlns:") {
            declarations.push((prefix.to_string(), value.to_string()));
        }
    }
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
}
