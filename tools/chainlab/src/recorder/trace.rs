//! Serializable step records and the append-only trace that owns them.

use serde::{Deserialize, Serialize};

/// How faithfully a step's text represents the underlying value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fidelity {
    #[default]
    Exact,
    /// The value held something JSON cannot express; placeholders were used.
    BestEffort,
    /// The text exceeded the size cap and ends in a hash marker.
    Truncated,
}

impl Fidelity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::BestEffort => "best_effort",
            Self::Truncated => "truncated",
        }
    }
}

/// Text produced by the step serializer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub text: String,
    pub fidelity: Fidelity,
}

/// One observed invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// 1-based, assigned at record time.
    pub sequence: u64,
    pub function_name: String,
    pub arguments_text: String,
    pub result_text: String,
    #[serde(default)]
    pub arguments_fidelity: Fidelity,
    #[serde(default)]
    pub result_fidelity: Fidelity,
}

#[derive(Debug, Clone, Default)]
pub struct Trace {
    steps: Vec<Step>,
}

impl Trace {
    pub fn record(&mut self, function_name: &str, arguments: Rendered, result: Rendered) -> &Step {
        let sequence = self.steps.len() as u64 + 1;
        self.steps.push(Step {
            sequence,
            function_name: function_name.to_string(),
            arguments_text: arguments.text,
            result_text: result.text,
            arguments_fidelity: arguments.fidelity,
            result_fidelity: result.fidelity,
        });
        &self.steps[self.steps.len() - 1]
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn reset(&mut self) {
        self.steps.clear();
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exact(text: &str) -> Rendered {
        Rendered {
            text: text.to_string(),
            fidelity: Fidelity::Exact,
        }
    }

    #[test]
    fn sequence_numbers_restart_after_reset() {
        let mut trace = Trace::default();
        trace.record("map", exact("[]"), exact("[]"));
        let second = trace.record("sortBy", exact("[]"), exact("[]"));
        assert_eq!(second.sequence, 2);

        trace.reset();
        assert!(trace.is_empty());
        let first = trace.record("head", exact("[]"), exact("1"));
        assert_eq!(first.sequence, 1);
        assert_eq!(trace.len(), 1);
    }

    #[test]
    fn step_serializes_with_snake_case_fidelity() {
        let mut trace = Trace::default();
        trace.record(
            "map",
            Rendered {
                text: "[\"[Function: toUpper]\"]".to_string(),
                fidelity: Fidelity::BestEffort,
            },
            exact("[]"),
        );
        let json = serde_json::to_value(&trace.steps()[0]).expect("serialize step");
        assert_eq!(json["arguments_fidelity"], "best_effort");
        assert_eq!(json["result_fidelity"], "exact");

        let parsed: Step = serde_json::from_str(
            r#"{"sequence":1,"function_name":"map","arguments_text":"[]","result_text":"[]"}"#,
        )
        .expect("fidelity defaults");
        assert_eq!(parsed.result_fidelity, Fidelity::Exact);
    }
}
