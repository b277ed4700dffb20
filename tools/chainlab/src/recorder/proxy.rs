//! Observing handles over an [`InterceptableLibrary`].
//!
//! A [`Proxy`] stands in for the library root, for a named function or for a
//! chain container. Looking up a known function name yields a function proxy
//! carrying that name; invoking it runs the library call, records a step and
//! re-wraps any chain container so the next call in the chain is observed too.
//! Everything else is handed out [`Bare`], untouched by the recorder.

use crate::library::{ChainResult, Deferred, InterceptableLibrary, LibraryError, Member, Receiver};
use crate::recorder::text::StepSerializer;
use crate::recorder::trace::Trace;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

// ── Shared recorder state ─────────────────────────────────────────────────────

pub(super) struct Shared<L: InterceptableLibrary> {
    pub(super) library: L,
    /// Recordable names, fixed when the recorder is built.
    known: BTreeMap<String, L::Function>,
    pub(super) serializer: StepSerializer,
    pub(super) trace: RefCell<Trace>,
}

impl<L: InterceptableLibrary> Shared<L> {
    pub(super) fn new(library: L, serializer: StepSerializer) -> Self {
        let known = library
            .list_function_names()
            .into_iter()
            .filter_map(|name| library.get_function(&name).map(|function| (name, function)))
            .collect();
        Self {
            library,
            known,
            serializer,
            trace: RefCell::new(Trace::default()),
        }
    }

    fn record(&self, name: Option<&str>, args: &[Value], result: &Value) {
        let Some(name) = name else {
            return;
        };
        if name == self.library.chain_initiation_name() {
            return;
        }
        let arguments = self.serializer.render_arguments(args);
        let result = self.serializer.render(result);
        self.trace.borrow_mut().record(name, arguments, result);
    }
}

// ── Handles ───────────────────────────────────────────────────────────────────

/// What a member lookup or a call hands back to the caller.
pub enum Handle<L: InterceptableLibrary> {
    Value(Value),
    Proxy(Proxy<L>),
    Bare(Bare<L>),
}

impl<L: InterceptableLibrary> Handle<L> {
    pub fn get(&self, name: &str) -> Option<Handle<L>> {
        match self {
            Handle::Value(_) => None,
            Handle::Proxy(proxy) => proxy.get(name),
            Handle::Bare(bare) => bare.get(name),
        }
    }

    pub fn call(&self, args: &[Value]) -> Result<Handle<L>, LibraryError> {
        match self {
            Handle::Value(value) => Err(LibraryError::NotCallable(value.to_key())),
            Handle::Proxy(proxy) => proxy.call(args),
            Handle::Bare(bare) => bare.call(args),
        }
    }

    /// Concrete form: chains are forced, functions become function values.
    pub fn into_value(self) -> Result<Value, LibraryError> {
        match self {
            Handle::Value(value) => Ok(value),
            Handle::Proxy(proxy) => proxy.to_value(),
            Handle::Bare(bare) => bare.to_value(),
        }
    }

    pub fn is_proxy(&self) -> bool {
        matches!(self, Handle::Proxy(_))
    }
}

impl<L: InterceptableLibrary> fmt::Debug for Handle<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handle::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Handle::Proxy(proxy) => f.debug_tuple("Proxy").field(proxy).finish(),
            Handle::Bare(bare) => f.debug_tuple("Bare").field(bare).finish(),
        }
    }
}

// ── Proxy ─────────────────────────────────────────────────────────────────────

enum Target<L: InterceptableLibrary> {
    Library,
    Function {
        name: String,
        function: L::Function,
        receiver: Receiver<L::Chain>,
    },
    Chain(L::Chain),
}

impl<L: InterceptableLibrary> Clone for Target<L> {
    fn clone(&self) -> Self {
        match self {
            Target::Library => Target::Library,
            Target::Function {
                name,
                function,
                receiver,
            } => Target::Function {
                name: name.clone(),
                function: function.clone(),
                receiver: receiver.clone(),
            },
            Target::Chain(chain) => Target::Chain(chain.clone()),
        }
    }
}

pub struct Proxy<L: InterceptableLibrary> {
    shared: Rc<Shared<L>>,
    target: Target<L>,
}

impl<L: InterceptableLibrary> Clone for Proxy<L> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
            target: self.target.clone(),
        }
    }
}

impl<L: InterceptableLibrary> fmt::Debug for Proxy<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            Target::Library => f.write_str("Proxy(library)"),
            Target::Function { name, .. } => write!(f, "Proxy(function {name})"),
            Target::Chain(chain) => f.debug_tuple("Proxy").field(chain).finish(),
        }
    }
}

impl<L: InterceptableLibrary> Proxy<L> {
    pub(super) fn root(shared: Rc<Shared<L>>) -> Self {
        Self {
            shared,
            target: Target::Library,
        }
    }

    fn wrap(&self, target: Target<L>) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
            target,
        }
    }

    /// Name of the function this proxy observes, if it wraps one.
    pub fn function_name(&self) -> Option<&str> {
        match &self.target {
            Target::Function { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn is_chain(&self) -> bool {
        matches!(self.target, Target::Chain(_))
    }

    /// Member lookup. Known function names come back wrapped; any other
    /// member is returned bare. Function proxies have no members.
    pub fn get(&self, name: &str) -> Option<Handle<L>> {
        let receiver = match &self.target {
            Target::Library => Receiver::Library,
            Target::Chain(chain) => Receiver::Chain(chain.clone()),
            Target::Function { .. } => return None,
        };
        let known = self.shared.known.get(name);
        if let (Some(function), Target::Library) = (known, &self.target) {
            return Some(Handle::Proxy(self.wrap(Target::Function {
                name: name.to_string(),
                function: function.clone(),
                receiver,
            })));
        }
        match self.shared.library.member(&receiver, name)? {
            Member::Function(function) if known.is_some() => {
                Some(Handle::Proxy(self.wrap(Target::Function {
                    name: name.to_string(),
                    function,
                    receiver,
                })))
            }
            Member::Function(function) => Some(Handle::Bare(Bare {
                shared: Rc::clone(&self.shared),
                kind: BareKind::Function { function, receiver },
            })),
            Member::Property(value) => Some(Handle::Value(value)),
        }
    }

    /// Invokes the proxied target. Library errors propagate untouched and
    /// leave the trace as it was.
    pub fn call(&self, args: &[Value]) -> Result<Handle<L>, LibraryError> {
        match &self.target {
            Target::Library => {
                let outcome = self.shared.library.call_root(args)?;
                self.observe(None, args, outcome)
            }
            Target::Function {
                name,
                function,
                receiver,
            } => {
                let outcome = self.shared.library.invoke(function, receiver, args)?;
                self.observe(Some(name.as_str()), args, outcome)
            }
            Target::Chain(_) => Err(LibraryError::NotCallable("chain".to_string())),
        }
    }

    fn observe(
        &self,
        name: Option<&str>,
        args: &[Value],
        outcome: ChainResult<L::Chain>,
    ) -> Result<Handle<L>, LibraryError> {
        match outcome {
            ChainResult::Deferred(container) => {
                let forced = container.force()?;
                self.shared.record(name, args, &forced);
                Ok(Handle::Proxy(self.wrap(Target::Chain(container))))
            }
            ChainResult::Concrete(value) => {
                self.shared.record(name, args, &value);
                Ok(Handle::Value(value))
            }
        }
    }

    pub fn to_value(&self) -> Result<Value, LibraryError> {
        match &self.target {
            Target::Library => Err(LibraryError::NotCallable(
                "library root used as a value".to_string(),
            )),
            Target::Function { function, .. } => Ok(self.shared.library.function_value(function)),
            Target::Chain(chain) => chain.force(),
        }
    }
}

// ── Bare members ──────────────────────────────────────────────────────────────

enum BareKind<L: InterceptableLibrary> {
    Function {
        function: L::Function,
        receiver: Receiver<L::Chain>,
    },
    Container(L::Chain),
}

/// A library member the recorder does not observe. Calls go straight to the
/// library and their results are never wrapped.
pub struct Bare<L: InterceptableLibrary> {
    shared: Rc<Shared<L>>,
    kind: BareKind<L>,
}

impl<L: InterceptableLibrary> fmt::Debug for Bare<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            BareKind::Function { function, .. } => f.debug_tuple("Function").field(function).finish(),
            BareKind::Container(chain) => f.debug_tuple("Container").field(chain).finish(),
        }
    }
}

impl<L: InterceptableLibrary> Bare<L> {
    fn library(&self) -> &L {
        &self.shared.library
    }

    pub fn get(&self, name: &str) -> Option<Handle<L>> {
        let BareKind::Container(chain) = &self.kind else {
            return None;
        };
        let receiver = Receiver::Chain(chain.clone());
        match self.library().member(&receiver, name)? {
            Member::Function(function) => Some(Handle::Bare(Bare {
                shared: Rc::clone(&self.shared),
                kind: BareKind::Function { function, receiver },
            })),
            Member::Property(value) => Some(Handle::Value(value)),
        }
    }

    pub fn call(&self, args: &[Value]) -> Result<Handle<L>, LibraryError> {
        let BareKind::Function { function, receiver } = &self.kind else {
            return Err(LibraryError::NotCallable("chain".to_string()));
        };
        Ok(match self.library().invoke(function, receiver, args)? {
            ChainResult::Concrete(value) => Handle::Value(value),
            ChainResult::Deferred(chain) => Handle::Bare(Bare {
                shared: Rc::clone(&self.shared),
                kind: BareKind::Container(chain),
            }),
        })
    }

    pub fn to_value(&self) -> Result<Value, LibraryError> {
        match &self.kind {
            BareKind::Function { function, .. } => Ok(self.library().function_value(function)),
            BareKind::Container(chain) => chain.force(),
        }
    }
}
