//! Filter string codec.
//!
//! A filter string is a whitespace-separated list of tokens:
//! `key:(v1,v2)`, `key:value` or a free-text term. Values may carry a `!`
//! (negated) and/or `=` (exact) prefix. A backslash makes the next character
//! literal, which is how separators inside keys and values survive.

use tracing::debug;

use crate::active::{ActiveFilterSet, FilterTerm, Terms};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("dangling escape in {fragment:?}")]
    DanglingEscape { fragment: String },
    #[error("unterminated group in {fragment:?}")]
    UnterminatedGroup { fragment: String },
    #[error("unbalanced parenthesis in {fragment:?}")]
    UnbalancedParen { fragment: String },
    #[error("malformed value group in {fragment:?}")]
    MalformedGroup { fragment: String },
    #[error("empty key in {fragment:?}")]
    EmptyKey { fragment: String },
}

// (char, escaped)
type Chars = Vec<(char, bool)>;

#[derive(Debug, Clone, Copy)]
enum Fault {
    DanglingEscape,
    Unterminated,
    Unbalanced,
}

enum Parsed {
    Filter { key: String, terms: Terms },
    FreeText(String),
}

/// Parse a filter string. Never fails: malformed fragments are dropped.
pub fn parse(filter_string: Option<&str>) -> ActiveFilterSet {
    let mut out = ActiveFilterSet::new();
    let Some(input) = filter_string else { return out };
    for frag in split_fragments(input) {
        match frag.and_then(|(raw, chars)| parse_fragment(&raw, &chars)) {
            Ok(p) => apply(&mut out, p),
            Err(e) => {
                debug!(error = %e, "dropping malformed filter fragment");
                metrics::counter!("filter_fragments_dropped_total", 1u64);
            }
        }
    }
    out
}

/// Parse a filter string, reporting the first malformed fragment.
pub fn parse_strict(filter_string: &str) -> Result<ActiveFilterSet, ParseError> {
    let mut out = ActiveFilterSet::new();
    for frag in split_fragments(filter_string) {
        let (raw, chars) = frag?;
        apply(&mut out, parse_fragment(&raw, &chars)?);
    }
    Ok(out)
}

/// Render the canonical filter string: keys in insertion order, each as
/// `key:(v1,v2)`, followed by free-text terms.
pub fn serialize(active: &ActiveFilterSet) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(active.len() + active.free_text().len());
    for (key, terms) in active.iter() {
        if terms.is_empty() { continue; }
        let vals: Vec<String> = terms.iter().map(encode_term).collect();
        parts.push(format!("{}:({})", escape(key), vals.join(",")));
    }
    for t in active.free_text() {
        if !t.is_empty() { parts.push(escape(t)); }
    }
    parts.join(" ")
}

fn apply(out: &mut ActiveFilterSet, p: Parsed) {
    match p {
        Parsed::Filter { key, terms } => {
            for t in terms { out.push_term(&key, t); }
        }
        Parsed::FreeText(t) => out.push_free_text(&t),
    }
}

fn needs_escape(c: char) -> bool {
    matches!(c, '\\' | ',' | '(' | ')' | ':' | '"') || c.is_whitespace()
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for (i, c) in s.chars().enumerate() {
        if needs_escape(c) || (i == 0 && matches!(c, '!' | '=')) { out.push('\\'); }
        out.push(c);
    }
    out
}

fn encode_term(t: &FilterTerm) -> String {
    let mut out = String::new();
    if t.negated { out.push('!'); }
    if t.exact { out.push('='); }
    out.push_str(&escape(&t.value));
    out
}

/// Split on unescaped whitespace outside parentheses.
fn split_fragments(input: &str) -> Vec<Result<(String, Chars), ParseError>> {
    let mut out = Vec::new();
    let mut raw = String::new();
    let mut cur: Chars = Vec::new();
    let mut depth = 0usize;
    let mut fault: Option<Fault> = None;

    fn flush(out: &mut Vec<Result<(String, Chars), ParseError>>, raw: &mut String, cur: &mut Chars, fault: &mut Option<Fault>) {
        if raw.is_empty() { return; }
        let fragment = std::mem::take(raw);
        let chars = std::mem::take(cur);
        out.push(match fault.take() {
            None => Ok((fragment, chars)),
            Some(Fault::DanglingEscape) => Err(ParseError::DanglingEscape { fragment }),
            Some(Fault::Unterminated) => Err(ParseError::UnterminatedGroup { fragment }),
            Some(Fault::Unbalanced) => Err(ParseError::UnbalancedParen { fragment }),
        });
    }

    let mut it = input.chars();
    while let Some(c) = it.next() {
        if c == '\\' {
            raw.push(c);
            match it.next() {
                Some(n) => { raw.push(n); cur.push((n, true)); }
                None => { fault.get_or_insert(Fault::DanglingEscape); }
            }
            continue;
        }
        if c.is_whitespace() && depth == 0 {
            flush(&mut out, &mut raw, &mut cur, &mut fault);
            continue;
        }
        match c {
            '(' => depth += 1,
            ')' => {
                if depth == 0 { fault.get_or_insert(Fault::Unbalanced); } else { depth -= 1; }
            }
            _ => {}
        }
        raw.push(c);
        cur.push((c, false));
    }
    if depth > 0 { fault.get_or_insert(Fault::Unterminated); }
    flush(&mut out, &mut raw, &mut cur, &mut fault);
    out
}

fn collect(chars: &[(char, bool)]) -> String { chars.iter().map(|(c, _)| *c).collect() }

fn is_paren(ch: &(char, bool)) -> bool { matches!(ch, ('(', false) | (')', false)) }

fn parse_fragment(raw: &str, chars: &[(char, bool)]) -> Result<Parsed, ParseError> {
    // Key ends at the first unescaped colon outside parentheses.
    let mut depth = 0usize;
    let mut colon = None;
    for (i, ch) in chars.iter().enumerate() {
        match ch {
            ('(', false) => depth += 1,
            (')', false) => depth = depth.saturating_sub(1),
            (':', false) if depth == 0 => { colon = Some(i); break; }
            _ => {}
        }
    }
    let Some(colon) = colon else { return Ok(Parsed::FreeText(collect(chars))) };
    let key = &chars[..colon];
    if key.is_empty() { return Err(ParseError::EmptyKey { fragment: raw.to_string() }); }
    if key.iter().any(is_paren) { return Err(ParseError::MalformedGroup { fragment: raw.to_string() }); }

    let rest = &chars[colon + 1..];
    let body = match (rest.first(), rest.last()) {
        (Some(('(', false)), Some((')', false))) if rest.len() >= 2 => &rest[1..rest.len() - 1],
        _ => rest,
    };
    if body.iter().any(is_paren) { return Err(ParseError::MalformedGroup { fragment: raw.to_string() }); }

    let mut terms = Terms::new();
    for elem in body.split(|ch| *ch == (',', false)) {
        let mut elem = elem;
        let mut term = FilterTerm::new(String::new());
        if let Some((('!', false), tail)) = elem.split_first() { term.negated = true; elem = tail; }
        if let Some((('=', false), tail)) = elem.split_first() { term.exact = true; elem = tail; }
        term.value = collect(elem);
        // A bare empty element is padding; `=` or `!` on its own is a real term.
        if term.value.is_empty() && !term.exact && !term.negated { continue; }
        if !terms.iter().any(|t: &FilterTerm| t.same_as(&term)) { terms.push(term); }
    }
    if terms.is_empty() { terms.push(FilterTerm::sentinel()); }
    Ok(Parsed::Filter { key: collect(key), terms })
}
