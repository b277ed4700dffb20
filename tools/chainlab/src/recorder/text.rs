//! Turns call arguments and results into the text stored on a step.
//!
//! Rendering never fails: values JSON cannot express fall back to a lossy
//! rendering, and oversized text is cut and stamped with a content hash.

use crate::recorder::trace::{Fidelity, Rendered};
use crate::value::Value;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use sha2::{Digest, Sha256};

pub const DEFAULT_INDENT: usize = 2;
pub const DEFAULT_MAX_TEXT_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepSerializer {
    pub indent: usize,
    pub max_bytes: usize,
}

impl Default for StepSerializer {
    fn default() -> Self {
        Self {
            indent: DEFAULT_INDENT,
            max_bytes: DEFAULT_MAX_TEXT_BYTES,
        }
    }
}

impl StepSerializer {
    pub fn new(indent: usize, max_bytes: usize) -> Self {
        Self { indent, max_bytes }
    }

    pub fn render(&self, value: &Value) -> Rendered {
        let (text, fidelity) = match self.pretty(value) {
            Ok(text) => (text, Fidelity::Exact),
            Err(_) => (
                self.pretty(&value.to_json_lossy())
                    .unwrap_or_else(|_| value.to_key()),
                Fidelity::BestEffort,
            ),
        };
        if text.len() > self.max_bytes {
            return Rendered {
                text: truncate_with_hash(&text, self.max_bytes),
                fidelity: Fidelity::Truncated,
            };
        }
        Rendered { text, fidelity }
    }

    /// Renders an argument list as a JSON array.
    pub fn render_arguments(&self, args: &[Value]) -> Rendered {
        self.render(&Value::Array(args.to_vec()))
    }

    fn pretty<T: Serialize + ?Sized>(&self, value: &T) -> Result<String, serde_json::Error> {
        let mut out = Vec::new();
        if self.indent == 0 {
            serde_json::to_writer(&mut out, value)?;
        } else {
            let indent = " ".repeat(self.indent);
            let mut serializer =
                Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(indent.as_bytes()));
            value.serialize(&mut serializer)?;
        }
        Ok(String::from_utf8_lossy(&out).into_owned())
    }
}

/// Keeps at most `max_bytes` of `text` (on a char boundary) followed by
/// `<truncated:N bytes:sha256:XXXXXXXXXXXXXXXX>` over the full text.
pub fn truncate_with_hash(text: &str, max_bytes: usize) -> String {
    let hash = Sha256::digest(text.as_bytes());
    let prefix = hex_bytes(&hash[..8]);
    let mut cut = max_bytes.min(text.len());
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    format!(
        "{}<truncated:{} bytes:sha256:{prefix}>",
        &text[..cut],
        text.len()
    )
}

fn hex_bytes(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_pretty_json_with_configured_indent() {
        let value = Value::from(json!({"b": 1, "a": [true, null]}));
        let rendered = StepSerializer::default().render(&value);
        assert_eq!(rendered.fidelity, Fidelity::Exact);
        assert_eq!(
            rendered.text,
            "{\n  \"b\": 1,\n  \"a\": [\n    true,\n    null\n  ]\n}"
        );

        let compact = StepSerializer::new(0, DEFAULT_MAX_TEXT_BYTES).render(&value);
        assert_eq!(compact.text, r#"{"b":1,"a":[true,null]}"#);
    }

    #[test]
    fn functions_fall_back_to_placeholders() {
        let args = vec![
            Value::from(json!(["a"])),
            Value::Function("toUpper".to_string()),
        ];
        let rendered = StepSerializer::default().render_arguments(&args);
        assert_eq!(rendered.fidelity, Fidelity::BestEffort);
        assert!(rendered.text.contains("\"[Function: toUpper]\""));
    }

    #[test]
    fn oversized_text_is_cut_and_hashed() {
        let value = Value::from("é".repeat(40));
        let rendered = StepSerializer::new(2, 11).render(&value);
        assert_eq!(rendered.fidelity, Fidelity::Truncated);
        assert!(rendered.text.starts_with("\"éééé"));
        assert!(rendered.text.contains("<truncated:82 bytes:sha256:"));
    }

    #[test]
    fn truncation_marker_is_deterministic() {
        let a = truncate_with_hash("abcdef", 2);
        let b = truncate_with_hash("abcdef", 2);
        assert_eq!(a, b);
        assert!(a.starts_with("ab<truncated:6 bytes:sha256:"));
        assert_eq!(a.len(), "ab<truncated:6 bytes:sha256:>".len() + 16);
    }
}
