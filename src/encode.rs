//! JavaScript literal encoding for inline script globals.
//!
//! | Value                 | Output                                  |
//! |-----------------------|-----------------------------------------|
//! | `"text"`              | `'text'`, escaped                       |
//! | `"js:expr"`           | `expr`, verbatim                        |
//! | null / bool / integer | `null`, `true`, `1`                     |
//! | `±∞`                  | `Number.POSITIVE_INFINITY` and negative |
//! | list                  | `[a,b]`                                 |
//! | object                | `{'key':value}`                         |

use indexmap::IndexMap;

/// Prefix marking a string as a raw JavaScript expression.
pub const RAW_PREFIX: &str = "js:";

/// A value that can be emitted as a JavaScript literal.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Object(IndexMap<String, Value>),
}

impl Value {
    /// A raw expression, emitted without quoting.
    pub fn raw(expr: impl AsRef<str>) -> Self {
        Self::Str(format!("{RAW_PREFIX}{}", expr.as_ref()))
    }

    pub fn encode(&self) -> String {
        encode(self)
    }
}

/// Encode `value` as JavaScript source text.
pub fn encode(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) if *f == f64::INFINITY => "Number.POSITIVE_INFINITY".to_string(),
        Value::Float(f) if *f == f64::NEG_INFINITY => "Number.NEGATIVE_INFINITY".to_string(),
        Value::Float(f) if f.is_nan() => "NaN".to_string(),
        Value::Float(f) => f.to_string(),
        Value::Str(s) => match s.strip_prefix(RAW_PREFIX) {
            Some(raw) => raw.to_string(),
            None => format!("'{}'", quote(s)),
        },
        Value::List(items) => {
            let items: Vec<String> = items.iter().map(encode).collect();
            format!("[{}]", items.join(","))
        }
        Value::Object(fields) => {
            let fields: Vec<String> = fields
                .iter()
                .map(|(k, v)| format!("'{}':{}", quote(k), encode(v)))
                .collect();
            format!("{{{}}}", fields.join(","))
        }
    }
}

/// Escape text for a single-quoted JavaScript string.
///
/// `</` becomes `<\/` so an inline value cannot close its `<script>`.
pub fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '"' => out.push_str("\\\""),
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            '<' if chars.peek() == Some(&'/') => {
                chars.next();
                out.push_str("<\\/");
            }
            _ => out.push(c),
        }
    }
    out
}

// ============================================================================
// conversions
// ============================================================================

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value as J;
        match value {
            J::Null => Self::Null,
            J::Bool(b) => Self::Bool(b),
            J::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            J::String(s) => Self::Str(s),
            J::Array(items) => Self::List(items.into_iter().map(Into::into).collect()),
            J::Object(map) => Self::Object(map.into_iter().map(|(k, v)| (k, v.into())).collect()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalars() {
        assert_eq!(encode(&Value::Null), "null");
        assert_eq!(encode(&true.into()), "true");
        assert_eq!(encode(&42i64.into()), "42");
        assert_eq!(encode(&1.5f64.into()), "1.5");
        assert_eq!(encode(&f64::INFINITY.into()), "Number.POSITIVE_INFINITY");
        assert_eq!(encode(&f64::NEG_INFINITY.into()), "Number.NEGATIVE_INFINITY");
    }

    #[test]
    fn test_string_escaping() {
        assert_eq!(encode(&"it's".into()), r"'it\'s'");
        assert_eq!(encode(&"a\tb\nc\r\"d\\".into()), r#"'a\tb\nc\r\"d\\'"#);
        assert_eq!(encode(&"</script>".into()), r"'<\/script>'");
        assert_eq!(encode(&"a < b".into()), "'a < b'");
    }

    #[test]
    fn test_raw_passthrough() {
        assert_eq!(encode(&"js:foo.bar".into()), "foo.bar");
        assert_eq!(encode(&Value::raw("window.app || {}")), "window.app || {}");
        assert_eq!(encode(&"xjs:foo".into()), "'xjs:foo'");
    }

    #[test]
    fn test_containers() {
        let value: Value = json!({"a": 1, "b": [true, null, "x"], "c": {"d": 2.5}}).into();
        assert_eq!(encode(&value), "{'a':1,'b':[true,null,'x'],'c':{'d':2.5}}");
        assert_eq!(encode(&Value::List(Vec::new())), "[]");
        assert_eq!(encode(&Value::from(Some("s"))), "'s'");
        assert_eq!(encode(&Value::from(None::<bool>)), "null");
    }
}
