use super::ActionDefine;
use crate::error::{DefineError, GraphError};
use crate::serialized::SerializableDefine;
use ahash::AHashMap;
use std::sync::Arc;
use tracing::warn;

/// Registry of node kinds, addressed by name.
///
/// Each define is also reachable through its obsolete names so that graphs saved before
/// a kind was renamed still load.
#[derive(Debug, Clone, Default)]
pub struct DefineCatalog {
    defines: AHashMap<String, Arc<ActionDefine>>,
    aliases: AHashMap<String, String>,
}

impl DefineCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A catalog pre-populated with the standard library of method defines.
    pub fn with_builtins() -> Result<Self, DefineError> {
        let mut catalog = Self::new();
        crate::library::register_builtins(&mut catalog)?;
        Ok(catalog)
    }

    /// Registers a define, replacing any define with the same name.
    pub fn register(&mut self, define: ActionDefine) -> Arc<ActionDefine> {
        let define = Arc::new(define);
        self.register_shared(Arc::clone(&define));
        define
    }

    pub fn register_shared(&mut self, define: Arc<ActionDefine>) {
        for alias in define.obsolete_names() {
            self.aliases
                .insert(alias.clone(), define.name().to_string());
        }
        self.defines.insert(define.name().to_string(), define);
    }

    /// Makes `alias` resolve to the define registered as `target`.
    pub fn with_alias(mut self, alias: &str, target: &str) -> Self {
        self.aliases.insert(alias.to_string(), target.to_string());
        self
    }

    /// Looks up a define by its current name or by one of its obsolete names.
    pub fn get(&self, name: &str) -> Option<Arc<ActionDefine>> {
        if let Some(define) = self.defines.get(name) {
            return Some(Arc::clone(define));
        }
        let target = self.aliases.get(name)?;
        let define = self.defines.get(target)?;
        warn!(
            obsolete = name,
            define = define.name(),
            message = define.obsolete_message().unwrap_or_default(),
            "Resolved obsolete define name"
        );
        Some(Arc::clone(define))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.defines.contains_key(name) || self.aliases.contains_key(name)
    }

    /// Registered define names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.defines.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.defines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defines.is_empty()
    }

    /// Rebuilds a persisted generated define against this catalog and registers it.
    pub fn load_generated(
        &mut self,
        serialized: &SerializableDefine,
    ) -> Result<Arc<ActionDefine>, DefineError> {
        let signature = serialized.signature();
        let graph = serialized
            .graph
            .build(self, Some(Arc::new(signature.clone())))
            .map_err(|source: GraphError| DefineError::InvalidGraph {
                define: serialized.name.clone(),
                source,
            })?;
        let mut define = ActionDefine::generated(signature, graph)?
            .with_obsolete_names(serialized.obsolete_names.iter().cloned());
        if let Some(message) = &serialized.obsolete_message {
            define = define.with_obsolete_message(message.clone());
        }
        Ok(self.register(define))
    }
}
