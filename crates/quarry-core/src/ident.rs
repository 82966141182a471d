//! SQL identifier quoting

use crate::errors::{QuarryError, Result};

/// Quote a possibly qualified identifier (`items.name` becomes
/// `"items"."name"`), doubling embedded quotes
///
/// # Errors
///
/// Fails with `InvalidOperation` for empty names or empty path segments.
pub fn quote_ident(name: &str) -> Result<String> {
    if name.is_empty() || name.split('.').any(str::is_empty) {
        return Err(QuarryError::InvalidIdentifier {
            name: name.to_string(),
        }
        .into());
    }

    let mut out = String::with_capacity(name.len() + 4);
    for (i, part) in name.split('.').enumerate() {
        if i > 0 {
            out.push('.');
        }
        out.push('"');
        out.push_str(&part.replace('"', "\"\""));
        out.push('"');
    }
    Ok(out)
}
