use std::{
    collections::{HashMap, HashSet},
    rc::Rc,
};

use anyhow::anyhow;

use super::{
    scopes::{Scope, ScopeStack},
    values::ValueRef,
};
use crate::{
    errors::{SourceBuffer, Span},
    parser::ast::Script,
};

/// Index of a module in a [`ModuleMap`].
pub type ModuleId = usize;

/// Extension appended to import paths that don't have one.
pub const EXTENSION: &str = ".l";

/// Supplies the source of imported modules.
pub trait FileProvider {
    fn read(&self, path: &str) -> anyhow::Result<String>;
}

/// A [`FileProvider`] serving files from memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryProvider {
    files: HashMap<String, String>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file. `path` is normalized like an import path.
    pub fn with_file(mut self, path: &str, contents: impl Into<String>) -> Self {
        self.insert(path, contents);
        self
    }

    pub fn insert(&mut self, path: &str, contents: impl Into<String>) {
        self.files.insert(normalize_path("", path), contents.into());
    }
}

impl FileProvider for MemoryProvider {
    fn read(&self, path: &str) -> anyhow::Result<String> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow!("no such file `{}`", path))
    }
}

/// Resolves `path` against the directory of `importer` and appends the
/// default extension if it's missing. `.` and `..` segments collapse.
pub fn normalize_path(importer: &str, path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    let absolute = path.starts_with('/') || importer.starts_with('/');

    if !path.starts_with('/') {
        // The importer's directory, without its file name
        if let Some(idx) = importer.rfind('/') {
            segments.extend(importer[..idx].split('/').filter(|segment| !segment.is_empty()));
        }
    }

    for segment in path.split('/') {
        match segment {
            "" | "." => {},

            ".." => {
                if segments.last().map_or(true, |last| *last == "..") {
                    if !absolute {
                        segments.push("..");
                    }
                } else {
                    segments.pop();
                }
            },

            _ => segments.push(segment),
        }
    }

    let mut res = segments.join("/");

    if absolute {
        res.insert(0, '/');
    }

    if !res.ends_with(EXTENSION) {
        res.push_str(EXTENSION);
    }

    res
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ModuleState {
    /// Pass 1 is running. Importing a module in this state closes a cycle.
    Declaring,
    Declared,
    Checked,
}

/// One source file being compiled.
#[derive(Debug)]
pub struct Module {
    pub path: String,
    pub source: Rc<SourceBuffer>,
    pub ast: Rc<Script>,
    /// The names this module exports with `pub`.
    pub public: Scope,
    pub scopes: ScopeStack,
    pub state: ModuleState,
    /// Aliases of imports that closed a cycle. Only types may be used
    /// through them.
    pub(super) cyclic: HashSet<String>,
    /// Values of top-level functions and variables, by the span of
    /// their name.
    pub(super) declared: HashMap<Span, ValueRef>,
}

impl Module {
    pub fn new(path: String, source: SourceBuffer, ast: Script) -> Self {
        Self {
            path,
            source: Rc::new(source),
            ast: Rc::new(ast),
            public: Scope::new(),
            scopes: ScopeStack::new(),
            state: ModuleState::Declaring,
            cyclic: HashSet::new(),
            declared: HashMap::new(),
        }
    }

    /// Top-level declarations, public or not.
    pub fn scope(&self) -> &Scope {
        self.scopes.module_scope()
    }
}

/// Every module of a compilation, deduplicated by normalized path.
#[derive(Debug, Default)]
pub struct ModuleMap {
    modules: Vec<Module>,
    by_path: HashMap<String, ModuleId>,
}

impl ModuleMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, module: Module) -> ModuleId {
        let id = self.modules.len();
        self.by_path.insert(module.path.clone(), id);
        self.modules.push(module);
        id
    }

    pub fn find(&self, path: &str) -> Option<ModuleId> {
        self.by_path.get(path).copied()
    }

    pub fn get(&self, id: ModuleId) -> &Module {
        &self.modules[id]
    }

    pub(super) fn get_mut(&mut self, id: ModuleId) -> &mut Module {
        &mut self.modules[id]
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Module> {
        self.modules.iter()
    }
}
