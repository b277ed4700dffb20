//! Editing session: the code and data texts plus the last good execution.
//!
//! Every edit re-runs the code. A failed run only sets the error message;
//! the previous result and steps stay on display.

use crate::errors::ChainlabError;
use crate::host::Host;
use crate::library::InterceptableLibrary;
use crate::logging::{JsonlLogger, LogEvent};
use crate::recorder::{Recorder, Step, StepSerializer};
use crate::value::Value;
use serde_json::json;

pub const EXAMPLE_DATA: &str =
    r#"[{"city": "Rybnik"}, {"city": "Warszawa"}, {"city": "Katowice"}]"#;
pub const EXAMPLE_CODE: &str = "return _(data)\n  .map('city')\n  .sortBy()\n  .value()";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The run succeeded and its result differs from the previous one.
    NewResult,
    SameResult,
    CannotProcess,
}

/// What a front end shows: result, numbered steps and the error banner.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub result: Option<Value>,
    pub steps: Vec<Step>,
    pub error: Option<String>,
}

impl Report {
    /// `{"result": ..., "steps": [...], "error": ...}` with function values
    /// rendered as placeholders.
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "result": self.result.as_ref().map(Value::to_json_lossy),
            "steps": self.steps,
            "error": self.error,
        })
    }
}

pub struct Session<L> {
    host: Host<L>,
    serializer: StepSerializer,
    logger: Option<JsonlLogger>,
    code: String,
    data: String,
    result: Option<Value>,
    steps: Vec<Step>,
    error: Option<String>,
}

impl<L: InterceptableLibrary + Clone> Session<L> {
    pub fn new(host: Host<L>, serializer: StepSerializer) -> Self {
        Self {
            host,
            serializer,
            logger: None,
            code: String::new(),
            data: String::new(),
            result: None,
            steps: Vec::new(),
            error: None,
        }
    }

    pub fn with_logger(mut self, logger: JsonlLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn report(&self) -> Report {
        Report {
            result: self.result.clone(),
            steps: self.steps.clone(),
            error: self.error.clone(),
        }
    }

    pub fn set_code(&mut self, code: impl Into<String>) -> ProcessOutcome {
        self.code = code.into();
        self.process()
    }

    pub fn set_data(&mut self, data: impl Into<String>) -> ProcessOutcome {
        self.data = data.into();
        self.process()
    }

    /// Replaces both texts and runs once.
    pub fn load(&mut self, code: impl Into<String>, data: impl Into<String>) -> ProcessOutcome {
        self.code = code.into();
        self.data = data.into();
        self.process()
    }

    /// Loads the city list and the map/sortBy chain, then runs it.
    pub fn use_example(&mut self) -> ProcessOutcome {
        self.data = EXAMPLE_DATA.to_string();
        self.code = EXAMPLE_CODE.to_string();
        self.process()
    }

    /// Re-indents the data text with two spaces. Invalid JSON is left as is
    /// and `None` is returned.
    pub fn beautify_data(&mut self) -> Option<ProcessOutcome> {
        let parsed: serde_json::Value = serde_json::from_str(&self.data).ok()?;
        let pretty = serde_json::to_string_pretty(&parsed).ok()?;
        Some(self.set_data(pretty))
    }

    fn process(&mut self) -> ProcessOutcome {
        let serializer = self.serializer;
        let outcome = self.host.execute(
            |library| Recorder::with_serializer(library, serializer),
            &self.code,
            &self.data,
        );
        match outcome {
            Ok(execution) => {
                let changed = !self
                    .result
                    .as_ref()
                    .is_some_and(|previous| previous.same_value_zero(&execution.result));
                self.log(LogEvent::info(
                    "execution_complete",
                    json!({
                        "steps": execution.steps.len(),
                        "result": execution.result.to_json_lossy(),
                    }),
                ));
                if changed {
                    self.log(LogEvent::info(
                        "new_result",
                        json!({ "result": execution.result.to_json_lossy() }),
                    ));
                }
                self.result = Some(execution.result);
                self.steps = execution.steps;
                self.error = None;
                if changed {
                    ProcessOutcome::NewResult
                } else {
                    ProcessOutcome::SameResult
                }
            }
            Err(err) => {
                self.log(LogEvent::warn(
                    "cannot_process",
                    json!({ "reason": err.reason() }),
                ));
                self.error = Some(cannot_process_message(&err));
                ProcessOutcome::CannotProcess
            }
        }
    }

    fn log(&self, event: LogEvent<'_>) {
        if let Some(logger) = &self.logger {
            let _ = logger.append(&event);
        }
    }
}

fn cannot_process_message(err: &ChainlabError) -> String {
    match err {
        ChainlabError::CannotProcess { .. } => err.to_string(),
        other => ChainlabError::cannot_process(other.reason()).to_string(),
    }
}
