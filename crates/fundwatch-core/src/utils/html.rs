//! Minimal HTML element extraction.
//!
//! Enough to pull table cells out of a server-rendered page: find every
//! element with a given tag name, read its attributes, and get its text.
//! Tag and attribute names match case-insensitively.

/// One matched element: its opening tag and the markup between the tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Element<'a> {
    pub open_tag: &'a str,
    pub inner: &'a str,
}

impl<'a> Element<'a> {
    /// Attribute value from the opening tag, without quotes
    pub fn attr(&self, name: &str) -> Option<&'a str> {
        let lower = self.open_tag.to_ascii_lowercase();
        let needle = format!("{}=", name.to_ascii_lowercase());
        let mut from = 0;
        while let Some(rel) = lower[from..].find(&needle) {
            let idx = from + rel;
            if idx > 0 && lower.as_bytes()[idx - 1].is_ascii_whitespace() {
                let rest = &self.open_tag[idx + needle.len()..];
                return Some(match rest.chars().next() {
                    Some(q @ ('"' | '\'')) => {
                        let body = &rest[1..];
                        &body[..body.find(q).unwrap_or(body.len())]
                    }
                    _ => {
                        let end = rest
                            .find(|c: char| c.is_whitespace() || c == '>')
                            .unwrap_or(rest.len());
                        &rest[..end]
                    }
                });
            }
            from = idx + needle.len();
        }
        None
    }

    /// Whitespace-normalised class attribute
    pub fn class(&self) -> String {
        self.attr("class")
            .map(|c| c.split_whitespace().collect::<Vec<_>>().join(" "))
            .unwrap_or_default()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .map(|c| c.split_whitespace().any(|token| token == class))
            .unwrap_or(false)
    }

    /// Text content with tags stripped, entities decoded and whitespace collapsed
    pub fn text(&self) -> String {
        normalize_ws(&decode_entities(&strip_tags(self.inner)))
    }
}

/// Find the start of `<tag` at or after `from`, requiring a name boundary
/// so `<th` does not match `<thead`.
fn find_open(lower: &str, open: &str, from: usize) -> Option<usize> {
    let mut cursor = from;
    loop {
        let idx = lower.get(cursor..)?.find(open)? + cursor;
        match lower.as_bytes().get(idx + open.len()) {
            Some(b) if b.is_ascii_whitespace() || *b == b'>' || *b == b'/' => return Some(idx),
            _ => cursor = idx + 1,
        }
    }
}

/// Every `tag` element in document order, including nested ones.
/// Elements without a closing tag are skipped.
pub fn elements<'a>(html: &'a str, tag: &str) -> Vec<Element<'a>> {
    let lower = html.to_ascii_lowercase();
    let tag = tag.to_ascii_lowercase();
    let open = format!("<{}", tag);
    let close = format!("</{}", tag);

    let mut found = Vec::new();
    let mut pos = 0;
    while let Some(start) = find_open(&lower, &open, pos) {
        let Some(open_end) = lower[start..].find('>').map(|i| start + i + 1) else {
            break;
        };

        let mut depth = 1;
        let mut cursor = open_end;
        let mut inner_end = None;
        while let Some(close_idx) = lower[cursor..].find(&close).map(|i| cursor + i) {
            match find_open(&lower, &open, cursor) {
                Some(nested) if nested < close_idx => {
                    depth += 1;
                    cursor = nested + open.len();
                }
                _ => {
                    depth -= 1;
                    if depth == 0 {
                        inner_end = Some(close_idx);
                        break;
                    }
                    cursor = close_idx + close.len();
                }
            }
        }

        if let Some(end) = inner_end {
            found.push(Element {
                open_tag: &html[start..open_end],
                inner: &html[open_end..end],
            });
        }
        pos = open_end;
    }
    found
}

pub fn strip_tags(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;

    for ch in s.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out
}

pub fn decode_entities(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail.find(';').filter(|&semi| semi <= 10).and_then(|semi| {
            let entity = &tail[1..semi];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" | "#39" => Some('\''),
                "nbsp" => Some(' '),
                _ if entity.starts_with("#x") || entity.starts_with("#X") => {
                    u32::from_str_radix(&entity[2..], 16).ok().and_then(char::from_u32)
                }
                _ if entity.starts_with('#') => {
                    entity[1..].parse::<u32>().ok().and_then(char::from_u32)
                }
                _ => None,
            };
            ch.map(|c| (c, semi))
        });
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

pub fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
