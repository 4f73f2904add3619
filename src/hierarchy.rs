//! Class hierarchy inspection used to detect overrides of out-of-scope
//! members and name clashes of rewritten descriptors.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::HierarchyError;
use crate::types::ClassNode;

/// What the descriptor mapping needs to know about one class.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClassInfo {
    pub name: String,
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
    /// `(name, desc)` of every declared method.
    pub methods: Vec<(String, String)>,
    /// `(name, desc)` of every declared field.
    pub fields: Vec<(String, String)>,
}

impl ClassInfo {
    pub fn new(name: impl Into<String>) -> Self {
        ClassInfo {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn extends(mut self, super_name: impl Into<String>) -> Self {
        self.super_name = Some(super_name.into());
        self
    }

    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    pub fn method(mut self, name: impl Into<String>, desc: impl Into<String>) -> Self {
        self.methods.push((name.into(), desc.into()));
        self
    }

    pub fn field(mut self, name: impl Into<String>, desc: impl Into<String>) -> Self {
        self.fields.push((name.into(), desc.into()));
        self
    }

    pub fn has_method(&self, name: &str, desc: &str) -> bool {
        self.methods.iter().any(|(n, d)| n == name && d == desc)
    }

    pub fn has_field(&self, name: &str, desc: &str) -> bool {
        self.fields.iter().any(|(n, d)| n == name && d == desc)
    }

    /// Direct supertypes, superclass first.
    pub fn supertypes(&self) -> impl Iterator<Item = &str> {
        self.super_name
            .iter()
            .map(String::as_str)
            .chain(self.interfaces.iter().map(String::as_str))
    }
}

impl From<&ClassNode> for ClassInfo {
    fn from(class: &ClassNode) -> Self {
        ClassInfo {
            name: class.name.clone(),
            super_name: class.super_name.clone(),
            interfaces: class.interfaces.clone(),
            methods: class
                .methods
                .iter()
                .map(|m| (m.name.clone(), m.desc.clone()))
                .collect(),
            fields: class
                .fields
                .iter()
                .map(|f| (f.name.clone(), f.desc.clone()))
                .collect(),
        }
    }
}

/// Source of class structure. Implementations usually sit on top of a class
/// path; failures abandon only the affected branch of a hierarchy search.
pub trait ClassHierarchy: Send + Sync {
    fn lookup(&self, class: &str) -> Result<ClassInfo, HierarchyError>;
}

/// A hierarchy held in memory.
#[derive(Debug, Default)]
pub struct InMemoryHierarchy {
    classes: RwLock<HashMap<String, ClassInfo>>,
}

impl InMemoryHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, info: ClassInfo) -> Self {
        self.insert(info);
        self
    }

    /// Adds or replaces a class.
    pub fn insert(&self, info: ClassInfo) {
        match self.classes.write() {
            Ok(mut classes) => {
                classes.insert(info.name.clone(), info);
            }
            Err(poisoned) => {
                poisoned.into_inner().insert(info.name.clone(), info);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.classes.read().map_or(0, |c| c.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ClassHierarchy for InMemoryHierarchy {
    fn lookup(&self, class: &str) -> Result<ClassInfo, HierarchyError> {
        let classes = self
            .classes
            .read()
            .map_err(|e| HierarchyError::Unreadable {
                class: class.to_string(),
                reason: e.to_string(),
            })?;
        classes
            .get(class)
            .cloned()
            .ok_or_else(|| HierarchyError::ClassNotFound(class.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let hierarchy = InMemoryHierarchy::new()
            .with(ClassInfo::new("a/B").extends("java/lang/Object").method("run", "()Z"));
        let info = hierarchy.lookup("a/B").unwrap();
        assert!(info.has_method("run", "()Z"));
        assert_eq!(info.supertypes().collect::<Vec<_>>(), vec!["java/lang/Object"]);
        assert_eq!(
            hierarchy.lookup("a/C"),
            Err(HierarchyError::ClassNotFound("a/C".into()))
        );
    }
}
