//! `$name` / `${name}` substitution for MDI commands
//!
//! Names follow pin naming (`[_a-z][-._a-z0-9]*`, case-insensitive). `$$` is a
//! literal dollar. Any other `$` and any unknown pin is an error, so a command is
//! never sent half-filled.

use std::sync::OnceLock;

use hx_error::{HalXadcError, Result};
use regex::Regex;

use crate::command::PinLookup;

fn pattern() -> Result<&'static Regex> {
    static RE: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\$(?:(\$)|([_a-z][-._a-z0-9]*)|\{([_a-z][-._a-z0-9]*)\}|())"))
        .as_ref()
        .map_err(|e| HalXadcError::Template(e.to_string()))
}

/// Pin names referenced by a template, in order of appearance.
pub fn placeholders(template: &str) -> Result<Vec<String>> {
    Ok(pattern()?
        .captures_iter(template)
        .filter_map(|c| c.get(2).or_else(|| c.get(3)).map(|m| m.as_str().to_string()))
        .collect())
}

/// Digits after the decimal point in a substituted value.
const MDI_DECIMALS: usize = 4;

/// Fixed-point rendering with trailing zeros dropped: `300`, `0.3`, `-0.25`.
fn mdi_number(value: f64) -> String {
    let s = format!("{:.*}", MDI_DECIMALS, value);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    match s {
        "-0" => "0".to_string(),
        _ => s.to_string(),
    }
}

pub fn substitute(template: &str, pins: &dyn PinLookup) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;
    for caps in pattern()?.captures_iter(template) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&template[last..whole.start()]);
        last = whole.end();

        if caps.get(1).is_some() {
            out.push('$');
            continue;
        }
        match caps.get(2).or_else(|| caps.get(3)) {
            Some(name) => {
                let value = pins.float(name.as_str()).ok_or_else(|| {
                    HalXadcError::Template(format!("no pin named '{}'", name.as_str()))
                })?;
                out.push_str(&mdi_number(value));
            }
            None => {
                return Err(HalXadcError::Template(format!(
                    "invalid placeholder at position {} in '{}'",
                    whole.start(),
                    template
                )));
            }
        }
    }
    out.push_str(&template[last..]);
    Ok(out)
}
