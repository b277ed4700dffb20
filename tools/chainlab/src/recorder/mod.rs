//! Step recording over an intercepted library.
//!
//! `Recorder::new(library)` takes its own library instance, builds the root
//! proxy handed to user code and keeps the trace of observed calls.

pub mod proxy;
pub mod text;
pub mod trace;

pub use proxy::{Bare, Handle, Proxy};
pub use text::StepSerializer;
pub use trace::{Fidelity, Rendered, Step, Trace};

use crate::library::InterceptableLibrary;
use proxy::Shared;
use std::rc::Rc;

pub struct Recorder<L: InterceptableLibrary> {
    shared: Rc<Shared<L>>,
}

impl<L: InterceptableLibrary> Recorder<L> {
    pub fn new(library: L) -> Self {
        Self::with_serializer(library, StepSerializer::default())
    }

    pub fn with_serializer(library: L, serializer: StepSerializer) -> Self {
        Self {
            shared: Rc::new(Shared::new(library, serializer)),
        }
    }

    /// Root proxy to expose to user code as the chain-starting handle.
    pub fn wrapped_library(&self) -> Proxy<L> {
        Proxy::root(Rc::clone(&self.shared))
    }

    pub fn stats(&self) -> Vec<Step> {
        self.shared.trace.borrow().steps().to_vec()
    }

    /// Empties the trace. Proxies handed out earlier keep recording.
    pub fn reset_stats(&self) {
        self.shared.trace.borrow_mut().reset();
    }

    pub fn serializer(&self) -> StepSerializer {
        self.shared.serializer
    }

    pub fn library(&self) -> &L {
        &self.shared.library
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::{FluentLibrary, LibraryError};
    use crate::value::Value;
    use serde_json::json;

    fn cities() -> Value {
        Value::from(json!([{"city": "Rybnik"}, {"city": "Warszawa"}, {"city": "Katowice"}]))
    }

    fn member(handle: &Handle<FluentLibrary>, name: &str) -> Handle<FluentLibrary> {
        handle.get(name).expect("member exists")
    }

    #[test]
    fn city_chain_records_map_and_sort() {
        let recorder = Recorder::new(FluentLibrary::new());
        let root = Handle::Proxy(recorder.wrapped_library());

        let chain = root.call(&[cities()]).expect("root call");
        assert!(chain.is_proxy());
        let mapped = member(&chain, "map").call(&[Value::from("city")]).expect("map");
        let sorted = member(&mapped, "sortBy").call(&[]).expect("sortBy");
        let result = member(&sorted, "value").call(&[]).expect("value");

        let result = result.into_value().expect("concrete result");
        assert_eq!(result, Value::from(json!(["Katowice", "Rybnik", "Warszawa"])));

        let steps = recorder.stats();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].sequence, 1);
        assert_eq!(steps[0].function_name, "map");
        assert_eq!(steps[0].arguments_text, "[\n  \"city\"\n]");
        let mapped: Value = serde_json::from_str(&steps[0].result_text).expect("parse map");
        assert_eq!(mapped, Value::from(json!(["Rybnik", "Warszawa", "Katowice"])));
        assert_eq!(steps[1].function_name, "sortBy");
        assert_eq!(steps[1].arguments_text, "[]");
        let sorted: Value = serde_json::from_str(&steps[1].result_text).expect("parse sortBy");
        assert_eq!(sorted, result);
    }

    #[test]
    fn direct_call_records_once_and_returns_plain_value() {
        let recorder = Recorder::new(FluentLibrary::new());
        let root = Handle::Proxy(recorder.wrapped_library());
        let sum = member(&root, "add")
            .call(&[Value::Number(1.0), Value::Number(2.0)])
            .expect("add");
        assert!(matches!(sum, Handle::Value(Value::Number(n)) if n == 3.0));

        let steps = recorder.stats();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].function_name, "add");
        assert_eq!(steps[0].arguments_text, "[\n  1,\n  2\n]");
        assert_eq!(steps[0].result_text, "3");
    }

    #[test]
    fn chain_initiation_is_never_recorded() {
        let recorder = Recorder::new(FluentLibrary::new());
        let root = Handle::Proxy(recorder.wrapped_library());
        let explicit = member(&root, "chain").call(&[cities()]).expect("chain");
        let mapped = member(&explicit, "map").call(&[Value::from("city")]).expect("map");
        let head = member(&mapped, "head").call(&[]).expect("head");
        let rechained = member(&head, "chain").call(&[]).expect("chain again");
        assert_eq!(rechained.into_value().expect("force"), Value::from("Rybnik"));

        let names = recorder
            .stats()
            .into_iter()
            .map(|step| step.function_name)
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["map".to_string(), "head".to_string()]);
    }

    #[test]
    fn throwing_call_keeps_earlier_steps_only() {
        let recorder = Recorder::new(FluentLibrary::new());
        let root = Handle::Proxy(recorder.wrapped_library());
        member(&root, "add")
            .call(&[Value::Number(1.0), Value::Number(1.0)])
            .expect("add");
        let err = member(&root, "range")
            .call(&[Value::Number(0.0), Value::Number(1e9)])
            .expect_err("range refuses huge arrays");
        assert!(matches!(err, LibraryError::InvalidArrayLength { .. }));
        assert_eq!(recorder.stats().len(), 1);
    }

    #[test]
    fn reset_restarts_numbering_for_existing_proxies() {
        let recorder = Recorder::new(FluentLibrary::new());
        let root = Handle::Proxy(recorder.wrapped_library());
        let add = member(&root, "add");
        add.call(&[Value::Number(1.0), Value::Number(2.0)]).expect("add");
        add.call(&[Value::Number(3.0), Value::Number(4.0)]).expect("add");
        assert_eq!(recorder.stats().len(), 2);

        recorder.reset_stats();
        assert!(recorder.stats().is_empty());
        add.call(&[Value::Number(5.0), Value::Number(6.0)]).expect("add");
        let steps = recorder.stats();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].sequence, 1);
        assert_eq!(steps[0].result_text, "11");
    }

    #[test]
    fn unknown_members_pass_through_bare() {
        let recorder = Recorder::new(FluentLibrary::new());
        let root = Handle::Proxy(recorder.wrapped_library());
        let version = member(&root, "VERSION");
        assert!(matches!(version, Handle::Value(Value::String(_))));
        assert!(root.get("nope").is_none());

        let chain = root.call(&[Value::from(json!([1, 2]))]).expect("root");
        let unwrap = member(&chain, "valueOf");
        assert!(matches!(unwrap, Handle::Bare(_)));
        let value = unwrap.call(&[]).expect("unwrap");
        assert!(matches!(value, Handle::Value(Value::Array(_))));
        assert!(recorder.stats().is_empty());
    }

    #[test]
    fn function_arguments_are_recorded_best_effort() {
        let recorder = Recorder::new(FluentLibrary::new());
        let root = Handle::Proxy(recorder.wrapped_library());
        let to_upper = member(&root, "toUpper").into_value().expect("function value");
        let shouted = member(&root, "map")
            .call(&[Value::from(json!(["a", "b"])), to_upper])
            .expect("map with function iteratee");
        assert!(matches!(shouted, Handle::Value(Value::Array(_))));

        let steps = recorder.stats();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].arguments_fidelity, Fidelity::BestEffort);
        assert!(steps[0].arguments_text.contains("[Function: toUpper]"));
        assert_eq!(steps[0].result_fidelity, Fidelity::Exact);
    }
}
