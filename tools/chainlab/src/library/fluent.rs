//! A fluent utility library over [`Value`].
//!
//! `_(value)` opens an implicit chain, `_.chain(value)` an explicit one. Chain
//! containers are lazy: each chained call appends an action and nothing runs
//! until the container is forced.

use super::builtins::{self, FunctionDef, Kind};
use super::{ChainResult, Deferred, InterceptableLibrary, LibraryError, Member, Receiver};
use crate::value::Value;
use std::collections::BTreeMap;
use std::rc::Rc;

pub const CHAIN: &str = "chain";
const UNWRAP_MEMBERS: [&str; 3] = ["value", "valueOf", "toJSON"];

#[derive(Debug, Clone)]
pub struct FluentLibrary {
    registry: Rc<BTreeMap<&'static str, FunctionDef>>,
}

impl FluentLibrary {
    pub fn new() -> Self {
        Self {
            registry: Rc::new(builtins::registry()),
        }
    }

    pub fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    pub fn lookup(&self, name: &str) -> Option<FunctionDef> {
        self.registry.get(name).copied()
    }

    /// Runs a builtin with fully spelled-out arguments.
    pub fn apply(&self, def: FunctionDef, args: &[Value]) -> Result<Value, LibraryError> {
        (def.call)(self, args)
    }

    /// Calls a function value, e.g. an iteratee passed as `_.toUpper`.
    pub fn call_value(&self, callee: &Value, args: &[Value]) -> Result<Value, LibraryError> {
        match callee {
            Value::Function(name) => {
                let def = self
                    .lookup(name)
                    .ok_or_else(|| LibraryError::UnknownFunction(name.clone()))?;
                self.apply(def, args)
            }
            other => Err(LibraryError::NotCallable(other.to_key())),
        }
    }
}

impl Default for FluentLibrary {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy)]
pub enum FluentFunction {
    Builtin(FunctionDef),
    /// `_.chain(value)` on the root, `.chain()` on a container.
    Chain,
    Unwrap(&'static str),
}

#[derive(Debug, Clone)]
struct Action {
    def: FunctionDef,
    args: Vec<Value>,
}

#[derive(Debug, Clone)]
pub struct FluentChain {
    library: FluentLibrary,
    source: Value,
    actions: Vec<Action>,
    explicit: bool,
}

impl FluentChain {
    fn new(library: FluentLibrary, source: Value, explicit: bool) -> Self {
        Self {
            library,
            source,
            actions: Vec::new(),
            explicit,
        }
    }

    pub fn is_explicit(&self) -> bool {
        self.explicit
    }

    pub fn pending_actions(&self) -> usize {
        self.actions.len()
    }

    fn then(&self, def: FunctionDef, args: &[Value]) -> Self {
        let mut next = self.clone();
        next.actions.push(Action {
            def,
            args: args.to_vec(),
        });
        next
    }

    fn into_explicit(mut self) -> Self {
        self.explicit = true;
        self
    }
}

impl Deferred for FluentChain {
    fn force(&self) -> Result<Value, LibraryError> {
        self.actions
            .iter()
            .try_fold(self.source.clone(), |acc, action| {
                let mut args = Vec::with_capacity(action.args.len() + 1);
                args.push(acc);
                args.extend(action.args.iter().cloned());
                self.library.apply(action.def, &args)
            })
    }
}

impl InterceptableLibrary for FluentLibrary {
    type Function = FluentFunction;
    type Chain = FluentChain;

    fn list_function_names(&self) -> Vec<String> {
        let mut names = self
            .registry
            .keys()
            .map(|name| name.to_string())
            .collect::<Vec<_>>();
        names.push(CHAIN.to_string());
        names.sort();
        names
    }

    fn get_function(&self, name: &str) -> Option<FluentFunction> {
        if name == CHAIN {
            return Some(FluentFunction::Chain);
        }
        self.lookup(name).map(FluentFunction::Builtin)
    }

    fn chain_initiation_name(&self) -> &str {
        CHAIN
    }

    fn member(&self, receiver: &Receiver<FluentChain>, name: &str) -> Option<Member<FluentFunction>> {
        match receiver {
            Receiver::Library if name == "VERSION" => {
                Some(Member::Property(Value::from(self.version())))
            }
            Receiver::Library => self.get_function(name).map(Member::Function),
            Receiver::Chain(_) => UNWRAP_MEMBERS
                .iter()
                .copied()
                .find(|member| *member == name)
                .map(|member| Member::Function(FluentFunction::Unwrap(member)))
                .or_else(|| self.get_function(name).map(Member::Function)),
        }
    }

    fn call_root(&self, args: &[Value]) -> Result<ChainResult<FluentChain>, LibraryError> {
        let source = args.first().cloned().unwrap_or_default();
        Ok(ChainResult::Deferred(FluentChain::new(self.clone(), source, false)))
    }

    fn invoke(
        &self,
        function: &FluentFunction,
        receiver: &Receiver<FluentChain>,
        args: &[Value],
    ) -> Result<ChainResult<FluentChain>, LibraryError> {
        match (function, receiver) {
            (FluentFunction::Builtin(def), Receiver::Library) => {
                self.apply(*def, args).map(ChainResult::Concrete)
            }
            (FluentFunction::Chain, Receiver::Library) => {
                let source = args.first().cloned().unwrap_or_default();
                Ok(ChainResult::Deferred(FluentChain::new(self.clone(), source, true)))
            }
            (FluentFunction::Unwrap(name), Receiver::Library) => {
                Err(LibraryError::NotCallable((*name).to_string()))
            }
            (FluentFunction::Builtin(def), Receiver::Chain(chain)) => {
                if chain.explicit || def.kind == Kind::Chainable {
                    return Ok(ChainResult::Deferred(chain.then(*def, args)));
                }
                let mut full = Vec::with_capacity(args.len() + 1);
                full.push(chain.force()?);
                full.extend(args.iter().cloned());
                self.apply(*def, &full).map(ChainResult::Concrete)
            }
            (FluentFunction::Chain, Receiver::Chain(chain)) => {
                Ok(ChainResult::Deferred(chain.clone().into_explicit()))
            }
            (FluentFunction::Unwrap(_), Receiver::Chain(chain)) => {
                chain.force().map(ChainResult::Concrete)
            }
        }
    }

    fn function_value(&self, function: &FluentFunction) -> Value {
        match function {
            FluentFunction::Builtin(def) => Value::Function(def.name.to_string()),
            FluentFunction::Chain => Value::Function(CHAIN.to_string()),
            FluentFunction::Unwrap(name) => Value::Function((*name).to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn json_value(value: serde_json::Value) -> Value {
        Value::from(value)
    }

    fn deferred(result: ChainResult<FluentChain>) -> FluentChain {
        match result {
            ChainResult::Deferred(chain) => chain,
            ChainResult::Concrete(value) => panic!("expected a chain, got {value:?}"),
        }
    }

    #[test]
    fn implicit_chain_is_lazy_until_forced() {
        let lib = FluentLibrary::new();
        let root = deferred(lib.call_root(&[json_value(json!([3, 1, 2]))]).expect("root"));
        let sort = lib.get_function("sortBy").expect("sortBy");
        let sorted = deferred(
            lib.invoke(&sort, &Receiver::Chain(root), &[])
                .expect("sortBy on chain"),
        );
        assert_eq!(sorted.pending_actions(), 1);
        assert_eq!(sorted.force().expect("force"), json_value(json!([1, 2, 3])));
    }

    #[test]
    fn terminal_functions_unwrap_in_implicit_chains_only() {
        let lib = FluentLibrary::new();
        let head = lib.get_function("head").expect("head");
        let implicit = deferred(lib.call_root(&[json_value(json!([7, 8]))]).expect("root"));
        match lib.invoke(&head, &Receiver::Chain(implicit), &[]).expect("head") {
            ChainResult::Concrete(value) => assert_eq!(value, Value::Number(7.0)),
            ChainResult::Deferred(_) => panic!("head should unwrap in an implicit chain"),
        }

        let chain = lib.get_function(CHAIN).expect("chain");
        let explicit = deferred(
            lib.invoke(&chain, &Receiver::Library, &[json_value(json!([7, 8]))])
                .expect("chain"),
        );
        assert!(explicit.is_explicit());
        let wrapped = deferred(lib.invoke(&head, &Receiver::Chain(explicit), &[]).expect("head"));
        assert_eq!(wrapped.force().expect("force"), Value::Number(7.0));
    }

    #[test]
    fn unwrap_members_exist_only_on_containers() {
        let lib = FluentLibrary::new();
        assert!(lib.member(&Receiver::Library, "value").is_none());
        let root = deferred(lib.call_root(&[Value::Null]).expect("root"));
        assert!(matches!(
            lib.member(&Receiver::Chain(root), "value"),
            Some(Member::Function(FluentFunction::Unwrap("value")))
        ));
        assert!(matches!(
            lib.member(&Receiver::Library, "VERSION"),
            Some(Member::Property(Value::String(_)))
        ));
    }

    #[test]
    fn function_names_include_chain_initiation() {
        let names = FluentLibrary::new().list_function_names();
        assert!(names.iter().any(|name| name == CHAIN));
        assert!(names.iter().any(|name| name == "map"));
        assert!(!names.iter().any(|name| name == "value"));
    }

    #[test]
    fn call_value_rejects_non_functions() {
        let lib = FluentLibrary::new();
        let err = lib
            .call_value(&Value::from("nope"), &[])
            .expect_err("strings are not callable");
        assert_eq!(err, LibraryError::NotCallable("nope".to_string()));
        let err = lib
            .call_value(&Value::Function("missing".to_string()), &[])
            .expect_err("unknown function");
        assert_eq!(err, LibraryError::UnknownFunction("missing".to_string()));
    }
}
