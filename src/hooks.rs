//! Lifecycle Hooks
//!
//! Pre-operation, post-operation and plugin hooks are kept per class in
//! registration order. Registering the same hook twice stores it twice.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::names::ClassName;

/// When a hook runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookKind {
    Pre,
    Post,
    Plugin,
}

impl HookKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookKind::Pre => "pre",
            HookKind::Post => "post",
            HookKind::Plugin => "plugin",
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type HookFn = dyn Fn(&mut Value) + Send + Sync;

/// A callable hook, invoked with the document it applies to
#[derive(Clone)]
pub struct Hook(Arc<HookFn>);

impl Hook {
    pub fn new(f: impl Fn(&mut Value) + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn call(&self, document: &mut Value) {
        (self.0)(document)
    }

    pub fn ptr_eq(&self, other: &Hook) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Hook")
    }
}

#[derive(Debug, Default)]
pub(crate) struct HookTable {
    hooks: HashMap<(HookKind, ClassName), Vec<Hook>>,
}

impl HookTable {
    pub(crate) fn push(&mut self, kind: HookKind, class: ClassName, hook: Hook) -> usize {
        let list = self.hooks.entry((kind, class)).or_default();
        list.push(hook);
        list.len()
    }

    pub(crate) fn get(&self, kind: HookKind, class: &ClassName) -> Vec<Hook> {
        self.hooks
            .get(&(kind, class.clone()))
            .cloned()
            .unwrap_or_default()
    }
}
