//! Nestable naming scopes for deployment steps.
//!
//! A context prefixes the key of every step deployed while it is active, so the
//! same contract type deployed under two logical roles gets two distinct keys.

use std::{
    fmt,
    ops::{Deref, DerefMut},
};

use crate::Deployer;

/// Ordered list of active context names (LIFO).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextStack {
    path: Vec<String>,
}

impl ContextStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>) {
        self.path.push(name.into());
    }

    pub fn pop(&mut self) -> Option<String> {
        self.path.pop()
    }

    /// The active context names, outermost first.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn depth(&self) -> usize {
        self.path.len()
    }
}

impl fmt::Display for ContextStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.join("/"))
    }
}

/// Scoped context acquisition on a [`Deployer`].
///
/// Created by [`Deployer::context`]. The context is pushed when the guard is
/// created and popped when it is dropped, on every exit path including `?` and
/// unwinding. The guard holds the deployer's only mutable borrow, so nested
/// guards are released in LIFO order by construction.
pub struct ContextGuard<'a, B, S> {
    deployer: &'a mut Deployer<B, S>,
}

impl<'a, B, S> ContextGuard<'a, B, S> {
    pub(crate) fn new(deployer: &'a mut Deployer<B, S>, name: String) -> Self {
        tracing::trace!(context = %name, depth = deployer.contexts.depth() + 1, "Entering context");
        deployer.contexts.push(name);
        Self { deployer }
    }
}

impl<B, S> Deref for ContextGuard<'_, B, S> {
    type Target = Deployer<B, S>;

    fn deref(&self) -> &Self::Target {
        self.deployer
    }
}

impl<B, S> DerefMut for ContextGuard<'_, B, S> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.deployer
    }
}

impl<B, S> Drop for ContextGuard<'_, B, S> {
    fn drop(&mut self) {
        let name = self.deployer.contexts.pop();
        tracing::trace!(context = ?name, "Leaving context");
    }
}
