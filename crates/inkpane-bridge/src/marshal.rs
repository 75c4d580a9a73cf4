//! Rendering host calls as guest script.
//!
//! Strings are embedded as double-quoted literals: backslash and quote are
//! escaped, newlines become `\n` and carriage returns are dropped. Every call is
//! guarded by an existence check on the call surface so a half-initialized guest
//! never throws back into the host.

use std::fmt;
use std::str::FromStr;

/// Global the guest installs its call surface under.
pub const CALL_SURFACE: &str = "window.InkpaneEditor";

/// Quote `value` as a guest string literal.
pub fn js_string(value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "");
    format!("\"{}\"", escaped)
}

/// Interpret a double-quoted literal the way the guest engine does.
///
/// Returns `None` if `literal` is not a single well-formed literal.
pub fn unescape_js_string(literal: &str) -> Option<String> {
    let body = literal.strip_prefix('"')?.strip_suffix('"')?;
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => return None,
            '\\' => {
                let escaped = match chars.next()? {
                    'n' => '\n',
                    'r' => '\r',
                    't' => '\t',
                    'b' => '\u{8}',
                    'f' => '\u{c}',
                    'v' => '\u{b}',
                    '0' => '\0',
                    'u' => {
                        let hex: String = chars.by_ref().take(4).collect();
                        if hex.len() != 4 {
                            return None;
                        }
                        char::from_u32(u32::from_str_radix(&hex, 16).ok()?)?
                    }
                    other => other,
                };
                out.push(escaped);
            }
            '\n' | '\r' => return None,
            other => out.push(other),
        }
    }
    Some(out)
}

/// Marker severities the guest understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Severity {
    #[default]
    Info,
    Warning,
    Error,
    Hint,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Hint => "hint",
        }
    }

    /// Case-insensitive; anything unknown or missing is `Info`.
    pub fn lenient(name: Option<&str>) -> Self {
        name.and_then(|n| n.parse().ok()).unwrap_or_default()
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "warning" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            "hint" => Ok(Severity::Hint),
            other => Err(format!("unknown severity: {}", other)),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A call on the guest's call surface.
#[derive(Debug, Clone)]
pub struct GuestCall {
    method: &'static str,
    args: Vec<String>,
}

impl GuestCall {
    pub fn new(method: &'static str) -> Self {
        Self {
            method,
            args: Vec::new(),
        }
    }

    pub fn string(mut self, value: &str) -> Self {
        self.args.push(js_string(value));
        self
    }

    pub fn int(mut self, value: i64) -> Self {
        self.args.push(value.to_string());
        self
    }

    pub fn boolean(mut self, value: bool) -> Self {
        self.args.push(value.to_string());
        self
    }

    pub fn method(&self) -> &'static str {
        self.method
    }

    fn invocation(&self) -> String {
        format!("{}.{}({})", CALL_SURFACE, self.method, self.args.join(","))
    }

    /// `surface && surface.method(args);`
    pub fn render(&self) -> String {
        format!("{} && {};", CALL_SURFACE, self.invocation())
    }

    /// Like [`render`](Self::render) but also checks the method exists, for
    /// optional guest hooks.
    pub fn render_optional(&self) -> String {
        format!(
            "{} && {}.{} && {};",
            CALL_SURFACE,
            CALL_SURFACE,
            self.method,
            self.invocation()
        )
    }

    /// Expression evaluating to the call's result, or to `fallback` when the
    /// guest does not implement the method.
    pub fn render_query(&self, fallback: &str) -> String {
        format!(
            "({} && {}.{}) ? {} : {}",
            CALL_SURFACE,
            CALL_SURFACE,
            self.method,
            self.invocation(),
            fallback
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn escapes_backslash_quote_and_newline() {
        assert_eq!(js_string("a\\b\"c\nd\r"), r#""a\\b\"c\nd""#);
        assert_eq!(
            unescape_js_string(&js_string("\\\"\n")).as_deref(),
            Some("\\\"\n")
        );
    }

    #[test]
    fn rejects_malformed_literals() {
        assert_eq!(unescape_js_string("abc"), None);
        assert_eq!(unescape_js_string(r#""a"b""#), None);
        assert_eq!(unescape_js_string(r#""trailing\""#), None);
    }

    #[test]
    fn severity_parsing_is_lenient() {
        assert_eq!(Severity::lenient(Some("ERROR")), Severity::Error);
        assert_eq!(Severity::lenient(Some(" hint ")), Severity::Hint);
        assert_eq!(Severity::lenient(Some("fatal")), Severity::Info);
        assert_eq!(Severity::lenient(None), Severity::Info);
    }

    #[test]
    fn renders_guarded_calls() {
        let call = GuestCall::new("createMarker").int(3).string("oops").string("error");
        assert_eq!(
            call.render(),
            r#"window.InkpaneEditor && window.InkpaneEditor.createMarker(3,"oops","error");"#
        );
        assert_eq!(
            GuestCall::new("getText").render_query("''"),
            "(window.InkpaneEditor && window.InkpaneEditor.getText) ? window.InkpaneEditor.getText() : ''"
        );
        assert!(
            GuestCall::new("connectLsp")
                .render_optional()
                .starts_with("window.InkpaneEditor && window.InkpaneEditor.connectLsp && ")
        );
    }

    proptest! {
        #[test]
        fn guest_reads_back_what_host_wrote(s in "\\PC*") {
            let expected = s.replace('\r', "");
            prop_assert_eq!(unescape_js_string(&js_string(&s)), Some(expected));
        }

        #[test]
        fn control_characters_survive(s in "[\\\\\"\n\r a-z]{0,32}") {
            let expected = s.replace('\r', "");
            prop_assert_eq!(unescape_js_string(&js_string(&s)), Some(expected));
        }
    }
}
