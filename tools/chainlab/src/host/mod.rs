//! Reference execution host: parses a chain expression, binds `data` and `_`,
//! evaluates it against a fresh recorder and hands back result plus steps.

pub mod parser;

use crate::errors::ChainlabError;
use crate::library::{InterceptableLibrary, LibraryError};
use crate::library::iteratee::get_path;
use crate::recorder::{Handle, Proxy, Recorder, Step};
use crate::value::{Object, Value};
use parser::Expr;
use thiserror::Error;

/// Name user code uses for the wrapped library root.
pub const LIBRARY_BINDING: &str = "_";
pub const DATA_BINDING: &str = "data";

/// Detailed host failure. Callers only ever see it as
/// [`ChainlabError::CannotProcess`]; the detail goes to the logs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HostError {
    #[error("parse error: {0}")]
    Parse(String),
    #[error("invalid data: {0}")]
    Data(String),
    #[error("evaluation error: {0}")]
    Eval(String),
    #[error("library error: {0}")]
    Library(#[from] LibraryError),
}

impl From<HostError> for ChainlabError {
    fn from(err: HostError) -> Self {
        ChainlabError::cannot_process(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    pub result: Value,
    pub steps: Vec<Step>,
}

/// Runs user code against private copies of one library.
#[derive(Debug, Clone)]
pub struct Host<L> {
    library: L,
}

impl<L: InterceptableLibrary + Clone> Host<L> {
    pub fn new(library: L) -> Self {
        Self { library }
    }

    /// Parses `data_text`, builds a recorder with `construct` over a fresh copy
    /// of the library and evaluates `source` with `data` and `_` bound.
    pub fn execute(
        &self,
        construct: impl FnOnce(L) -> Recorder<L>,
        source: &str,
        data_text: &str,
    ) -> Result<Execution, ChainlabError> {
        let data = parse_data(data_text)?;
        let expr = parser::parse(source)?;
        let recorder = construct(self.library.clone());
        let scope = Scope {
            data,
            root: recorder.wrapped_library(),
        };
        let result = scope.eval(&expr)?.into_value().map_err(HostError::from)?;
        Ok(Execution {
            result,
            steps: recorder.stats(),
        })
    }
}

/// Blank text binds `data` to null.
pub fn parse_data(text: &str) -> Result<Value, HostError> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(text).map_err(|e| HostError::Data(e.to_string()))
}

struct Scope<L: InterceptableLibrary> {
    data: Value,
    root: Proxy<L>,
}

impl<L: InterceptableLibrary> Scope<L> {
    fn eval(&self, expr: &Expr) -> Result<Handle<L>, HostError> {
        match expr {
            Expr::Literal(value) => Ok(Handle::Value(value.clone())),
            Expr::Array(items) => Ok(Handle::Value(Value::Array(self.values(items)?))),
            Expr::Object(entries) => {
                let mut object = Object::new();
                for (key, value) in entries {
                    object.insert(key.clone(), self.value(value)?);
                }
                Ok(Handle::Value(Value::Object(object)))
            }
            Expr::Ident(name) => match name.as_str() {
                DATA_BINDING => Ok(Handle::Value(self.data.clone())),
                LIBRARY_BINDING => Ok(Handle::Proxy(self.root.clone())),
                other => Err(HostError::Eval(format!("`{other}` is not defined"))),
            },
            Expr::Member { object, name } => {
                let object = self.eval(object)?;
                Ok(member(&object, name))
            }
            Expr::Index { object, index } => {
                let object = self.eval(object)?;
                let key = self.value(index)?.to_key();
                Ok(member(&object, &key))
            }
            Expr::Call { callee, args } => {
                let callee = self.eval(callee)?;
                let args = self.values(args)?;
                callee.call(&args).map_err(|err| match err {
                    LibraryError::NotCallable(what) => {
                        HostError::Eval(format!("`{what}` is not a function"))
                    }
                    other => HostError::Library(other),
                })
            }
            Expr::Negate(inner) => match self.value(inner)? {
                Value::Number(n) => Ok(Handle::Value(Value::Number(-n))),
                other => Ok(Handle::Value(Value::Number(-other.to_number()))),
            },
        }
    }

    /// Evaluates to a concrete value; chains used as arguments are forced.
    fn value(&self, expr: &Expr) -> Result<Value, HostError> {
        Ok(self.eval(expr)?.into_value()?)
    }

    fn values(&self, exprs: &[Expr]) -> Result<Vec<Value>, HostError> {
        exprs.iter().map(|expr| self.value(expr)).collect()
    }
}

/// Member access. Missing members read as null, like an absent property.
fn member<L: InterceptableLibrary>(object: &Handle<L>, name: &str) -> Handle<L> {
    match object {
        Handle::Value(value) => {
            Handle::Value(get_path(value, &[name.to_string()]).unwrap_or_default())
        }
        handle => handle.get(name).unwrap_or(Handle::Value(Value::Null)),
    }
}
