use std::{
    cell::RefCell,
    collections::hash_map::Entry,
    fmt::Debug,
    rc::Rc,
};

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::ErrorKind;

use super::value::Value;

/// Reads of this name return null and declarations of it are discarded.
pub const SENTINEL: &str = "_";

/// Consecutive loop iterations without progress before a loop is aborted.
pub const LOOP_LIMIT: usize = 1000;

#[derive(Debug, Clone)]
pub struct Binding {
    pub value: Value,
    pub constant: bool,
}

/// One lexical frame. Frames are shared: a closure keeps its defining frame
/// alive and sees later writes to it.
#[derive(Clone, Default)]
pub struct Scope {
    bindings: FxHashMap<String, Binding>,
    parent: Option<Rc<RefCell<Scope>>>,
}

impl Scope {
    pub fn boxed(parent: Option<Rc<RefCell<Scope>>>) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self::new(parent)))
    }

    pub fn new(parent: Option<Rc<RefCell<Scope>>>) -> Self {
        Self {
            bindings: FxHashMap::default(),
            parent,
        }
    }

    pub fn define(&mut self, name: &str, value: Value, constant: bool) -> Result<(), ErrorKind> {
        if name == SENTINEL {
            return Ok(());
        }

        match self.bindings.entry(name.to_string()) {
            Entry::Occupied(o) => Err(ErrorKind::AlreadyDeclared(o.key().clone())),
            Entry::Vacant(v) => {
                v.insert(Binding { value, constant });
                Ok(())
            }
        }
    }

    /// Binds a name, replacing any earlier binding in this frame.
    pub fn insert(&mut self, name: String, value: Value) {
        self.bindings.insert(
            name,
            Binding {
                value,
                constant: true,
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        if name == SENTINEL {
            return Some(Value::Null);
        }

        if let Some(binding) = self.bindings.get(name) {
            Some(binding.value.clone())
        } else if let Some(parent) = &self.parent {
            parent.borrow().get(name)
        } else {
            None
        }
    }

    pub fn assign(&mut self, name: &str, value: Value) -> Result<(), ErrorKind> {
        if name == SENTINEL {
            return Ok(());
        }

        if let Some(binding) = self.bindings.get_mut(name) {
            if binding.constant {
                return Err(ErrorKind::ConstantReassignment(name.to_string()));
            }
            binding.value = value;
            Ok(())
        } else if let Some(parent) = &self.parent {
            parent.borrow_mut().assign(name, value)
        } else {
            Err(ErrorKind::UndeclaredVariable(name.to_string()))
        }
    }

    pub fn bindings(&self) -> impl Iterator<Item = (&String, &Binding)> {
        self.bindings.iter()
    }
}

impl Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(format!("Scope<{:?}>", std::ptr::from_ref(self)).as_str())
            .field(
                "bindings",
                &self
                    .bindings
                    .iter()
                    .map(|(name, binding)| (name.clone(), binding.value.to_string()))
                    .collect::<Vec<_>>(),
            )
            .field("parent", &self.parent.as_ref().map(|p| p.as_ptr()))
            .finish()
    }
}

/// Progress tracking for one running `while` loop.
#[derive(Debug, Clone, Default)]
struct LoopGuard {
    /// Names read while evaluating the loop condition.
    watched: FxHashSet<String>,
    tracking: bool,
    progressed: bool,
    idle_iterations: usize,
}

/// The current frame plus the loop guards of every loop being executed.
#[derive(Clone)]
pub struct Environment {
    scope: Rc<RefCell<Scope>>,
    loops: Vec<LoopGuard>,
}

impl Environment {
    pub fn new(scope: Rc<RefCell<Scope>>) -> Self {
        Self {
            scope,
            loops: Vec::new(),
        }
    }

    pub fn scope(&self) -> &Rc<RefCell<Scope>> {
        &self.scope
    }

    pub fn replace_scope(&mut self, scope: Rc<RefCell<Scope>>) -> Rc<RefCell<Scope>> {
        std::mem::replace(&mut self.scope, scope)
    }

    pub fn define(&mut self, name: &str, value: Value, constant: bool) -> Result<(), ErrorKind> {
        self.scope.borrow_mut().define(name, value, constant)
    }

    pub fn get(&mut self, name: &str) -> Result<Value, ErrorKind> {
        for guard in &mut self.loops {
            if guard.tracking {
                guard.watched.insert(name.to_string());
            }
        }

        self.scope
            .borrow()
            .get(name)
            .ok_or_else(|| ErrorKind::UndeclaredVariable(name.to_string()))
    }

    pub fn assign(&mut self, name: &str, value: Value) -> Result<(), ErrorKind> {
        self.scope.borrow_mut().assign(name, value)?;

        for guard in &mut self.loops {
            if guard.watched.contains(name) {
                guard.progressed = true;
            }
        }
        Ok(())
    }

    pub fn enter_loop(&mut self) {
        self.loops.push(LoopGuard::default());
    }

    pub fn exit_loop(&mut self) {
        self.loops.pop();
    }

    /// Turns recording of variable reads for the innermost loop on or off.
    pub fn track_reads(&mut self, tracking: bool) {
        if let Some(guard) = self.loops.last_mut() {
            guard.tracking = tracking;
        }
    }

    /// Closes an iteration of the innermost loop. Fails once `LOOP_LIMIT`
    /// iterations in a row have not assigned any name the condition read.
    pub fn finish_iteration(&mut self) -> Result<(), ErrorKind> {
        let Some(guard) = self.loops.last_mut() else {
            return Ok(());
        };

        if guard.progressed {
            guard.idle_iterations = 0;
        } else {
            guard.idle_iterations += 1;
        }
        guard.progressed = false;

        if guard.idle_iterations >= LOOP_LIMIT {
            tracing::warn!(
                watched = ?guard.watched,
                iterations = guard.idle_iterations,
                "aborting loop that made no progress"
            );
            return Err(ErrorKind::InfiniteLoop);
        }
        Ok(())
    }
}

impl Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("scope", &self.scope.borrow())
            .field("loops", &self.loops.len())
            .finish()
    }
}
