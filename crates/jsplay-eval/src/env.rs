//! Lexical scopes for the jsplay evaluator.
//!
//! Scopes form a parent-linked chain shared by closures, so a function sees
//! the bindings of the scope it was created in. `var` declarations land in
//! the nearest function scope; `let`/`const` in the innermost block.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// The realm's global bindings.
    Global,
    /// A function body (or the script body).
    Function,
    Block,
}

#[derive(Debug, Clone)]
struct Binding {
    value: Value,
    mutable: bool,
    /// `false` between block entry and the `let`/`const` declaration.
    initialized: bool,
}

/// Why a binding lookup or assignment failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingError {
    NotFound,
    /// Read or write before the declaration ran.
    Uninitialized,
    /// Write to a `const`.
    Immutable,
}

/// A single scope level.
#[derive(Debug)]
pub struct Scope {
    kind: ScopeKind,
    bindings: RefCell<BTreeMap<String, Binding>>,
    parent: Option<Rc<Scope>>,
}

impl Scope {
    /// Create a new root scope for global bindings.
    pub fn global() -> Rc<Self> {
        Rc::new(Self {
            kind: ScopeKind::Global,
            bindings: RefCell::new(BTreeMap::new()),
            parent: None,
        })
    }

    /// Create a scope nested in `parent`.
    pub fn child(parent: &Rc<Scope>, kind: ScopeKind) -> Rc<Self> {
        Rc::new(Self {
            kind,
            bindings: RefCell::new(BTreeMap::new()),
            parent: Some(Rc::clone(parent)),
        })
    }

    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    /// Define an initialized binding in this scope, replacing any previous one.
    pub fn declare(&self, name: &str, value: Value, mutable: bool) {
        self.bindings.borrow_mut().insert(
            name.to_string(),
            Binding {
                value,
                mutable,
                initialized: true,
            },
        );
    }

    /// Reserve a `let`/`const` name at block entry; reads fail until [`Scope::initialize`].
    pub fn declare_uninitialized(&self, name: &str, mutable: bool) {
        self.bindings.borrow_mut().insert(
            name.to_string(),
            Binding {
                value: Value::Undefined,
                mutable,
                initialized: false,
            },
        );
    }

    /// Run a `let`/`const` declaration: set the value and end the dead zone.
    pub fn initialize(&self, name: &str, value: Value) {
        let mut bindings = self.bindings.borrow_mut();
        match bindings.get_mut(name) {
            Some(binding) => {
                binding.value = value;
                binding.initialized = true;
            }
            None => {
                bindings.insert(
                    name.to_string(),
                    Binding {
                        value,
                        mutable: true,
                        initialized: true,
                    },
                );
            }
        }
    }

    pub fn has_own(&self, name: &str) -> bool {
        self.bindings.borrow().contains_key(name)
    }

    /// Look up a variable, searching from innermost to outermost scope.
    pub fn lookup(&self, name: &str) -> Result<Value, BindingError> {
        if let Some(binding) = self.bindings.borrow().get(name) {
            return if binding.initialized {
                Ok(binding.value.clone())
            } else {
                Err(BindingError::Uninitialized)
            };
        }
        match &self.parent {
            Some(parent) => parent.lookup(name),
            None => Err(BindingError::NotFound),
        }
    }

    /// Update the first scope where the variable exists.
    pub fn assign(&self, name: &str, value: Value) -> Result<(), BindingError> {
        if let Some(binding) = self.bindings.borrow_mut().get_mut(name) {
            if !binding.initialized {
                return Err(BindingError::Uninitialized);
            }
            if !binding.mutable {
                return Err(BindingError::Immutable);
            }
            binding.value = value;
            return Ok(());
        }
        match &self.parent {
            Some(parent) => parent.assign(name, value),
            None => Err(BindingError::NotFound),
        }
    }

    /// Current value of a binding in this scope only, ignoring the dead zone.
    pub fn own_value(&self, name: &str) -> Option<Value> {
        self.bindings.borrow().get(name).map(|b| b.value.clone())
    }

    /// Move every binding's value into `out`, leaving this scope empty.
    pub(crate) fn release_values(&self, out: &mut Vec<Value>) {
        if let Ok(mut bindings) = self.bindings.try_borrow_mut() {
            out.extend(std::mem::take(&mut *bindings).into_values().map(|b| b.value));
        }
    }

    /// Names bound directly in this scope, sorted.
    pub fn names(&self) -> Vec<String> {
        self.bindings.borrow().keys().cloned().collect()
    }
}
