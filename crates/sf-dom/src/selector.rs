//! Selector parsing for the host page arena.
//!
//! Supports the subset the suppression tables actually use: compound simple
//! selectors (`tag`, `#id`, `.class`, `[attr]`, `[attr=value]`) joined by
//! descendant combinators.

use sf_core::EngineError;
use sf_core::EngineResult;

/// Parsed selector. The last compound is the subject; earlier compounds must
/// match ancestors in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    pub(crate) steps: Vec<Compound>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct Compound {
    pub(crate) tag: Option<String>,
    pub(crate) id: Option<String>,
    pub(crate) classes: Vec<String>,
    pub(crate) attributes: Vec<AttributeMatch>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AttributeMatch {
    pub(crate) name: String,
    pub(crate) value: Option<String>,
}

impl Selector {
    pub fn parse(input: &str) -> EngineResult<Self> {
        let mut steps = Vec::new();
        for token in input.split_whitespace() {
            steps.push(parse_compound(token)?);
        }

        if steps.is_empty() {
            return Err(EngineError::new("selector.empty", "selector has no parts"));
        }

        Ok(Self { steps })
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }
}

fn parse_compound(token: &str) -> EngineResult<Compound> {
    let bytes = token.as_bytes();
    let mut compound = Compound::default();
    let mut idx = 0_usize;

    if idx < bytes.len() && is_name_start(bytes[idx]) {
        let end = name_end(token, idx);
        compound.tag = Some(token[idx..end].to_ascii_lowercase());
        idx = end;
    }

    while idx < bytes.len() {
        match bytes[idx] {
            b'#' => {
                let end = name_end(token, idx + 1);
                if end == idx + 1 {
                    return Err(EngineError::new(
                        "selector.missing_name",
                        format!("`#` without an id name in `{token}`"),
                    ));
                }
                compound.id = Some(token[idx + 1..end].to_owned());
                idx = end;
            }
            b'.' => {
                let end = name_end(token, idx + 1);
                if end == idx + 1 {
                    return Err(EngineError::new(
                        "selector.missing_name",
                        format!("`.` without a class name in `{token}`"),
                    ));
                }
                compound.classes.push(token[idx + 1..end].to_owned());
                idx = end;
            }
            b'[' => {
                let close = token[idx..].find(']').ok_or_else(|| {
                    EngineError::new(
                        "selector.unterminated_attribute",
                        format!("missing `]` in `{token}`"),
                    )
                })?;
                let body = &token[idx + 1..idx + close];
                compound.attributes.push(parse_attribute(body, token)?);
                idx += close + 1;
            }
            other => {
                return Err(EngineError::new(
                    "selector.invalid_char",
                    format!("unexpected `{}` in `{token}`", other as char),
                ));
            }
        }
    }

    if compound == Compound::default() {
        return Err(EngineError::new(
            "selector.empty",
            format!("empty compound in `{token}`"),
        ));
    }

    Ok(compound)
}

fn parse_attribute(body: &str, token: &str) -> EngineResult<AttributeMatch> {
    let (name, value) = match body.split_once('=') {
        Some((name, value)) => (name, Some(unquote(value).to_owned())),
        None => (body, None),
    };

    let name = name.trim();
    if name.is_empty() || !name.bytes().all(is_name_byte) {
        return Err(EngineError::new(
            "selector.invalid_attribute",
            format!("bad attribute name in `{token}`"),
        ));
    }

    Ok(AttributeMatch {
        name: name.to_ascii_lowercase(),
        value,
    })
}

fn unquote(value: &str) -> &str {
    let value = value.trim();
    let stripped = value
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'));
    if let Some(inner) = stripped {
        return inner;
    }

    let stripped = value
        .strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''));
    match stripped {
        Some(inner) => inner,
        None => value,
    }
}

fn is_name_start(byte: u8) -> bool {
    byte.is_ascii_alphabetic() || byte == b'_'
}

fn is_name_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_'
}

fn name_end(token: &str, from: usize) -> usize {
    let bytes = token.as_bytes();
    let mut idx = from;
    while idx < bytes.len() && is_name_byte(bytes[idx]) {
        idx = idx.saturating_add(1);
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::Selector;

    #[test]
    fn parses_tag_id_and_class_compound() {
        let selector = Selector::parse("a#thumbnail.rich-thumbnail");
        assert!(selector.is_ok());
        let selector = selector.unwrap_or_else(|_| unreachable!());
        assert_eq!(selector.step_count(), 1);
        let step = &selector.steps[0];
        assert_eq!(step.tag.as_deref(), Some("a"));
        assert_eq!(step.id.as_deref(), Some("thumbnail"));
        assert_eq!(step.classes, vec!["rich-thumbnail".to_owned()]);
    }

    #[test]
    fn parses_descendant_chain() {
        let selector = Selector::parse(".compact-video-renderer .thumbnail");
        assert!(selector.is_ok_and(|selector| selector.step_count() == 2));
    }

    #[test]
    fn parses_attribute_selectors() {
        let bare = Selector::parse("[moving]");
        assert!(bare.is_ok());

        let valued = Selector::parse("[data-preview=\"on\"]");
        assert!(valued.is_ok());
        let valued = valued.unwrap_or_else(|_| unreachable!());
        let attribute = &valued.steps[0].attributes[0];
        assert_eq!(attribute.name, "data-preview");
        assert_eq!(attribute.value.as_deref(), Some("on"));
    }

    #[test]
    fn rejects_malformed_patterns() {
        assert!(Selector::parse("").is_err());
        assert!(Selector::parse(".").is_err());
        assert!(Selector::parse("#").is_err());
        assert!(Selector::parse("[moving").is_err());
        assert!(Selector::parse("div::hover").is_err());
        assert!(Selector::parse("a>b").is_err());
    }

    #[test]
    fn custom_element_tags_parse() {
        let selector = Selector::parse("ytd-moving-thumbnail-renderer");
        assert!(selector.is_ok());
    }
}
