//! Output formatting — best-effort re-indentation of generated TypeScript.
//!
//! Generation correctness never depends on formatting: any failure here is
//! reported to the caller, which logs a warning and emits the unformatted
//! (but syntactically complete) source instead.

use anyhow::{Result, bail};
use tracing::warn;

const INDENT: &str = "  ";

/// Re-indent generated source by bracket depth.
pub fn format_ts(source: &str) -> Result<String> {
    let mut out = String::with_capacity(source.len() + source.len() / 4);
    let mut depth: i32 = 0;
    let mut previous_blank = false;

    for line in source.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !previous_blank && !out.is_empty() {
                out.push('\n');
            }
            previous_blank = true;
            continue;
        }
        previous_blank = false;

        let (opens, closes, leading_closes) = scan_brackets(trimmed)?;
        let line_depth = depth - leading_closes;
        if line_depth < 0 {
            bail!("unbalanced brackets: depth underflow at {trimmed:?}");
        }
        for _ in 0..line_depth {
            out.push_str(INDENT);
        }
        out.push_str(trimmed);
        out.push('\n');

        depth += opens - closes;
        if depth < 0 {
            bail!("unbalanced brackets: depth underflow after {trimmed:?}");
        }
    }

    if depth != 0 {
        bail!("unbalanced brackets: {depth} unclosed at end of file");
    }
    Ok(out)
}

/// Format, falling back to the unformatted source on any internal error.
pub fn format_or_warn(unit: &str, source: String) -> String {
    match format_ts(&source) {
        Ok(formatted) => formatted,
        Err(e) => {
            warn!(unit, err = %e, "formatting failed; emitting unformatted source");
            source
        }
    }
}

/// Count bracket opens/closes outside string literals, plus how many closing
/// brackets lead the line (they dedent the line itself).
fn scan_brackets(line: &str) -> Result<(i32, i32, i32)> {
    let mut opens = 0;
    let mut closes = 0;
    let mut leading_closes = 0;
    let mut at_start = true;
    let mut in_string = false;
    let mut escaped = false;

    for c in line.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                at_start = false;
            }
            '{' | '(' | '[' => {
                opens += 1;
                at_start = false;
            }
            '}' | ')' | ']' => {
                closes += 1;
                if at_start {
                    leading_closes += 1;
                }
            }
            c if c.is_whitespace() || c == ';' || c == ',' => {}
            _ => at_start = false,
        }
    }

    if in_string {
        bail!("unterminated string literal in {line:?}");
    }
    Ok((opens, closes, leading_closes))
}
