//! The library seam the recorder intercepts.
//!
//! A library exposes an enumerable set of named functions, a callable root
//! (`_(value)`) and chain containers. Calls report whether they produced a
//! concrete value or a deferred chain container through [`ChainResult`], and
//! containers turn into concrete values with [`Deferred::force`].

pub mod builtins;
pub mod fluent;
pub mod iteratee;

pub use fluent::{FluentChain, FluentFunction, FluentLibrary};

use crate::value::Value;
use std::fmt;
use thiserror::Error;

/// Errors raised by library calls. The recorder never swallows these.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LibraryError {
    #[error("{function}: invalid array length {length}")]
    InvalidArrayLength { function: String, length: f64 },
    #[error("{function}: expected a function")]
    ExpectedFunction { function: String },
    #[error("unknown function `{0}`")]
    UnknownFunction(String),
    #[error("`{0}` is not callable here")]
    NotCallable(String),
    #[error("{function}: {message}")]
    InvalidArgument { function: String, message: String },
}

/// Outcome of a library call.
#[derive(Debug, Clone)]
pub enum ChainResult<C> {
    Concrete(Value),
    Deferred(C),
}

/// A lazy chain container.
pub trait Deferred: Clone + fmt::Debug {
    /// Runs every pending action and returns the concrete value.
    fn force(&self) -> Result<Value, LibraryError>;
}

/// The object a member is looked up on and a function is invoked against.
#[derive(Debug, Clone)]
pub enum Receiver<C> {
    Library,
    Chain(C),
}

#[derive(Debug, Clone)]
pub enum Member<F> {
    Function(F),
    Property(Value),
}

pub trait InterceptableLibrary {
    type Function: Clone + fmt::Debug;
    type Chain: Deferred;

    /// Names of the enumerable function members of the library root.
    fn list_function_names(&self) -> Vec<String>;

    fn get_function(&self, name: &str) -> Option<Self::Function>;

    /// Name of the function that starts an explicit chain.
    fn chain_initiation_name(&self) -> &str {
        "chain"
    }

    /// Member lookup on the root or on a chain container. Covers
    /// non-function properties and container-only members such as unwrap.
    fn member(
        &self,
        receiver: &Receiver<Self::Chain>,
        name: &str,
    ) -> Option<Member<Self::Function>>;

    /// Calls the library root itself, e.g. `_(data)`.
    fn call_root(&self, args: &[Value]) -> Result<ChainResult<Self::Chain>, LibraryError>;

    fn invoke(
        &self,
        function: &Self::Function,
        receiver: &Receiver<Self::Chain>,
        args: &[Value],
    ) -> Result<ChainResult<Self::Chain>, LibraryError>;

    /// Value form of a function handle, for passing functions as arguments.
    fn function_value(&self, function: &Self::Function) -> Value;
}
