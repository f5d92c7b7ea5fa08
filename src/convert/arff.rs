//! ARFF (attribute-relation file format) parser
//!
//! Supports the subset produced by the registry: `%` comments, case-insensitive
//! `@relation` / `@attribute` / `@data` headers, quoted names and values,
//! nominal specifications, dense and sparse data rows and `?` for missing values.
//! Relational attributes are read as opaque text so that the encoder can
//! reject them.

use super::table::{Attribute, AttributeKind, Table, Value};
use super::ConvertError;

/// Decode the payload as UTF-8, dropping a leading byte order mark
fn decode(input: &[u8]) -> Result<&str, ConvertError> {
    let text = std::str::from_utf8(input).map_err(|e| {
        let valid = &input[..e.valid_up_to()];
        let line = valid.iter().filter(|b| **b == b'\n').count() + 1;
        ConvertError::parse(line, format!("invalid UTF-8 at byte {}", e.valid_up_to()))
    })?;
    Ok(text.strip_prefix('\u{feff}').unwrap_or(text))
}

/// Parse an ARFF payload into a [`Table`]
pub fn parse(input: &[u8]) -> Result<Table, ConvertError> {
    let text = decode(input)?;

    let mut relation: Option<String> = None;
    let mut attributes: Vec<Attribute> = Vec::new();
    let mut rows: Vec<Vec<Value>> = Vec::new();
    let mut in_data = false;
    // Name of the relational attribute whose nested declarations are being skipped
    let mut skipping_relational: Option<String> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();

        if line.is_empty() || line.starts_with('%') {
            continue;
        }

        if in_data {
            rows.push(parse_row(line, &attributes, line_no)?);
            continue;
        }

        let (keyword, rest) = match line.split_once(char::is_whitespace) {
            Some((k, r)) => (k, r.trim()),
            None => (line, ""),
        };
        let keyword = keyword.to_ascii_lowercase();

        if let Some(ref name) = skipping_relational {
            if keyword == "@end" && unquote(rest) == *name {
                skipping_relational = None;
            }
            continue;
        }

        match keyword.as_str() {
            "@relation" => {
                relation = Some(unquote(rest));
            }
            "@attribute" => {
                let attribute = parse_attribute(rest, line_no)?;
                if attribute.kind == AttributeKind::Relational {
                    skipping_relational = Some(attribute.name.clone());
                }
                attributes.push(attribute);
            }
            "@data" => {
                if attributes.is_empty() {
                    return Err(ConvertError::parse(line_no, "@data before any @attribute"));
                }
                in_data = true;
            }
            other => {
                return Err(ConvertError::parse(
                    line_no,
                    format!("unexpected header keyword '{}'", other),
                ));
            }
        }
    }

    if attributes.is_empty() {
        return Err(ConvertError::parse(0, "no attributes declared"));
    }

    Ok(Table {
        relation: relation.unwrap_or_default(),
        attributes,
        rows,
    })
}

// ============================================================================
// Header
// ============================================================================

fn parse_attribute(spec: &str, line: usize) -> Result<Attribute, ConvertError> {
    let (name, rest) = split_name(spec, line)?;
    let rest = rest.trim();

    if rest.starts_with('{') {
        let inner = rest
            .strip_prefix('{')
            .and_then(|s| s.strip_suffix('}'))
            .ok_or_else(|| ConvertError::parse(line, "unterminated nominal specification"))?;

        let values = split_top_level(inner, line)?
            .into_iter()
            .filter(|raw| !raw.trim().is_empty())
            .map(|raw| parse_token(raw, line).map(|t| t.text))
            .collect::<Result<Vec<_>, _>>()?;

        return Ok(Attribute::new(name, AttributeKind::Nominal(values)));
    }

    let (type_name, type_arg) = match rest.split_once(char::is_whitespace) {
        Some((t, arg)) => (t, Some(arg.trim())),
        None => (rest, None),
    };

    let kind = match type_name.to_ascii_lowercase().as_str() {
        "numeric" => AttributeKind::Numeric,
        "real" => AttributeKind::Real,
        "integer" => AttributeKind::Integer,
        "string" => AttributeKind::String,
        "date" => AttributeKind::Date(type_arg.filter(|a| !a.is_empty()).map(unquote)),
        "relational" => AttributeKind::Relational,
        "" => return Err(ConvertError::parse(line, format!("missing type for '{}'", name))),
        other => {
            return Err(ConvertError::parse(
                line,
                format!("unknown attribute type '{}'", other),
            ))
        }
    };

    Ok(Attribute::new(name, kind))
}

/// Split an attribute declaration into its (possibly quoted) name and the remainder
fn split_name(spec: &str, line: usize) -> Result<(String, &str), ConvertError> {
    let spec = spec.trim_start();
    let first = spec
        .chars()
        .next()
        .ok_or_else(|| ConvertError::parse(line, "missing attribute name"))?;

    if first == '\'' || first == '"' {
        let end = closing_quote(spec, first)
            .ok_or_else(|| ConvertError::parse(line, "unterminated quoted attribute name"))?;
        let token = parse_token(&spec[..=end], line)?;
        Ok((token.text, &spec[end + 1..]))
    } else {
        let end = spec
            .find(|c: char| c.is_whitespace() || c == '{')
            .unwrap_or(spec.len());
        Ok((spec[..end].to_string(), &spec[end..]))
    }
}

// ============================================================================
// Data rows
// ============================================================================

fn parse_row(line: &str, attributes: &[Attribute], line_no: usize) -> Result<Vec<Value>, ConvertError> {
    if let Some(inner) = line.strip_prefix('{') {
        let inner = inner
            .strip_suffix('}')
            .ok_or_else(|| ConvertError::parse(line_no, "unterminated sparse row"))?;
        return parse_sparse_row(inner, attributes, line_no);
    }

    let raw_values = split_top_level(line, line_no)?;
    if raw_values.len() != attributes.len() {
        return Err(ConvertError::parse(
            line_no,
            format!(
                "expected {} values, found {}",
                attributes.len(),
                raw_values.len()
            ),
        ));
    }

    raw_values
        .into_iter()
        .zip(attributes)
        .map(|(raw, attribute)| {
            let token = parse_token(raw, line_no)?;
            typed_value(token, attribute, line_no)
        })
        .collect()
}

fn parse_sparse_row(inner: &str, attributes: &[Attribute], line_no: usize) -> Result<Vec<Value>, ConvertError> {
    let mut row: Vec<Value> = attributes.iter().map(sparse_default).collect();

    for entry in split_top_level(inner, line_no)? {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }

        let (index, raw) = entry
            .split_once(char::is_whitespace)
            .ok_or_else(|| ConvertError::parse(line_no, format!("malformed sparse entry '{}'", entry)))?;
        let index: usize = index
            .parse()
            .map_err(|_| ConvertError::parse(line_no, format!("invalid sparse index '{}'", index)))?;
        let attribute = attributes
            .get(index)
            .ok_or_else(|| ConvertError::parse(line_no, format!("sparse index {} out of range", index)))?;

        let token = parse_token(raw, line_no)?;
        row[index] = typed_value(token, attribute, line_no)?;
    }

    Ok(row)
}

/// Value of a cell omitted from a sparse row
fn sparse_default(attribute: &Attribute) -> Value {
    match &attribute.kind {
        kind if kind.is_numeric() => Value::Number(0.0),
        AttributeKind::Nominal(values) => values
            .first()
            .map(|v| Value::Text(v.clone()))
            .unwrap_or(Value::Missing),
        AttributeKind::String => Value::Text(String::new()),
        _ => Value::Missing,
    }
}

fn typed_value(token: Token, attribute: &Attribute, line: usize) -> Result<Value, ConvertError> {
    if !token.quoted && token.text == "?" {
        return Ok(Value::Missing);
    }

    match &attribute.kind {
        kind if kind.is_numeric() => token
            .text
            .trim()
            .parse::<f64>()
            .map(Value::Number)
            .map_err(|_| {
                ConvertError::parse(
                    line,
                    format!("invalid numeric value '{}' for '{}'", token.text, attribute.name),
                )
            }),
        AttributeKind::Nominal(values) => {
            if values.iter().any(|v| *v == token.text) {
                Ok(Value::Text(token.text))
            } else {
                Err(ConvertError::parse(
                    line,
                    format!("bad nominal value '{}' for '{}'", token.text, attribute.name),
                ))
            }
        }
        _ => Ok(Value::Text(token.text)),
    }
}

// ============================================================================
// Tokenizer
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
struct Token {
    text: String,
    quoted: bool,
}

/// Split on commas that are not inside quotes
fn split_top_level(s: &str, line: usize) -> Result<Vec<&str>, ConvertError> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, c) in s.char_indices() {
        match quote {
            Some(q) => {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                }
            }
            None => match c {
                '\'' | '"' => quote = Some(c),
                ',' => {
                    parts.push(&s[start..i]);
                    start = i + 1;
                }
                _ => {}
            },
        }
    }

    if quote.is_some() {
        return Err(ConvertError::parse(line, "unterminated quoted value"));
    }

    parts.push(&s[start..]);
    Ok(parts)
}

/// Trim and unquote a single value
fn parse_token(raw: &str, line: usize) -> Result<Token, ConvertError> {
    let raw = raw.trim();
    let Some(first) = raw.chars().next() else {
        return Ok(Token {
            text: String::new(),
            quoted: false,
        });
    };

    if first != '\'' && first != '"' {
        return Ok(Token {
            text: raw.to_string(),
            quoted: false,
        });
    }

    let end = closing_quote(raw, first)
        .ok_or_else(|| ConvertError::parse(line, "unterminated quoted value"))?;
    if !raw[end + 1..].trim().is_empty() {
        return Err(ConvertError::parse(
            line,
            format!("unexpected characters after quoted value '{}'", raw),
        ));
    }

    let mut text = String::with_capacity(end);
    let mut chars = raw[1..end].chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => text.push('\n'),
                Some('t') => text.push('\t'),
                Some('r') => text.push('\r'),
                Some(other) => text.push(other),
                None => text.push('\\'),
            }
        } else {
            text.push(c);
        }
    }

    Ok(Token { text, quoted: true })
}

/// Byte offset of the quote closing the one at offset 0
fn closing_quote(s: &str, quote: char) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in s.char_indices().skip(1) {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == quote {
            return Some(i);
        }
    }
    None
}

fn unquote(s: &str) -> String {
    let s = s.trim();
    match parse_token(s, 0) {
        Ok(token) => token.text,
        Err(_) => s.to_string(),
    }
}
