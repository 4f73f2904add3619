//! Memoized rewriting of member signatures: which fields and methods turn
//! their `boolean` types into `int`, and under which name.

mod types;

pub use self::types::*;

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, trace, warn};

use crate::config::{Scope, LIBRARY_PREFIXES, RENAME_SUFFIX};
use crate::descriptor::{
    is_boolean_field, is_boolean_method, parse_method_descriptor, return_type, transform_field_descriptor,
    transform_method_descriptor, JvmType,
};
use crate::error::{Result, TransformError};
use crate::hierarchy::{ClassHierarchy, ClassInfo};
use crate::types::ClassNode;

#[derive(Debug, Default)]
struct MappingState {
    /// original key -> rewritten descriptor
    descriptors: HashMap<MemberKey, String>,
    /// original method key -> rewritten name
    names: HashMap<MemberKey, String>,
    /// (owner, rewritten name, rewritten desc) -> original descriptor
    original_desc: HashMap<MemberKey, String>,
    /// (owner, rewritten name, rewritten desc) -> original name
    original_name: HashMap<MemberKey, String>,
    /// Classes of the current session, consulted before the hierarchy.
    local_classes: HashMap<String, ClassInfo>,
    next_id: u32,
}

impl MappingState {
    fn insert_checked(map: &mut HashMap<MemberKey, String>, key: MemberKey, value: String) -> Result<()> {
        match map.get(&key) {
            Some(existing) if *existing != value => Err(TransformError::InconsistentMapping {
                owner: key.owner.clone(),
                name: key.name.clone(),
                desc: key.desc.clone(),
                existing: existing.clone(),
                requested: value,
            }),
            Some(_) => Ok(()),
            None => {
                map.insert(key, value);
                Ok(())
            }
        }
    }
}

/// Walk order of a hierarchy search.
enum Visit {
    Continue,
    Stop,
}

/// The signature rewrite table of one transformation session.
///
/// Resolution is atomic: the memo lookup, the hierarchy walk and the
/// registration of the result happen under one lock, so concurrent first
/// resolutions of a key agree.
pub struct DescriptorMapping {
    scope: Scope,
    hierarchy: Arc<dyn ClassHierarchy>,
    state: Mutex<MappingState>,
}

impl DescriptorMapping {
    pub fn new(scope: Scope, hierarchy: Arc<dyn ClassHierarchy>) -> Self {
        DescriptorMapping {
            scope,
            hierarchy,
            state: Mutex::new(MappingState::default()),
        }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    fn lock(&self) -> MutexGuard<'_, MappingState> {
        // A panic while holding the lock cannot leave a half-written entry:
        // every registration is a single insert.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Makes a class of the current session visible to hierarchy searches
    /// with its pre-rewrite members.
    pub fn register_class(&self, class: &ClassNode) {
        let mut state = self.lock();
        state
            .local_classes
            .entry(class.name.clone())
            .or_insert_with(|| ClassInfo::from(class));
    }

    /// Whether member signatures declared by `class` may be rewritten.
    pub fn should_transform(&self, class: &str) -> bool {
        match &self.scope {
            Scope::All => !is_library_class(class),
            Scope::Target(target) => is_target_or_nested(class, target),
            Scope::Prefix(prefix) => class.starts_with(prefix.as_str()),
        }
    }

    /// Whether a class counts as part of the program under rewrite when it
    /// is met during a hierarchy search.
    pub fn is_inside(&self, class: &str) -> bool {
        self.should_transform(class)
    }

    /// Rewritten descriptor and name of a method.
    pub fn resolve_method(&self, owner: &str, name: &str, desc: &str) -> Result<ResolvedMethod> {
        if !self.should_transform(owner) || !is_boolean_method(desc) {
            return Ok(ResolvedMethod::unchanged(name, desc));
        }
        let key = MemberKey::new(owner, name, desc);
        let mut state = self.lock();
        if let (Some(new_desc), Some(new_name)) = (state.descriptors.get(&key), state.names.get(&key)) {
            return Ok(ResolvedMethod {
                name: new_name.clone(),
                desc: new_desc.clone(),
            });
        }

        if self.is_outside_method(&state, owner, name, desc) {
            debug!("{} overrides an out-of-scope method, keeping its signature", key);
            MappingState::insert_checked(&mut state.descriptors, key.clone(), desc.to_string())?;
            MappingState::insert_checked(&mut state.names, key, name.to_string())?;
            return Ok(ResolvedMethod::unchanged(name, desc));
        }

        let new_desc = transform_method_descriptor(desc);
        match self.transform_method_name(&mut state, owner, name, &new_desc) {
            Some(new_name) => {
                trace!("mapping {} -> {}{}", key, new_name, new_desc);
                let reverse = MemberKey::new(owner, &new_name, &new_desc);
                MappingState::insert_checked(&mut state.descriptors, key.clone(), new_desc.clone())?;
                MappingState::insert_checked(&mut state.names, key, new_name.clone())?;
                MappingState::insert_checked(&mut state.original_desc, reverse.clone(), desc.to_string())?;
                MappingState::insert_checked(&mut state.original_name, reverse, name.to_string())?;
                Ok(ResolvedMethod {
                    name: new_name,
                    desc: new_desc,
                })
            }
            None => {
                debug!("constructor {} clashes after rewriting, left untransformed", key);
                MappingState::insert_checked(&mut state.descriptors, key.clone(), desc.to_string())?;
                MappingState::insert_checked(&mut state.names, key, name.to_string())?;
                Ok(ResolvedMethod::unchanged(name, desc))
            }
        }
    }

    /// Rewritten descriptor of a field. Fields are never renamed.
    pub fn resolve_field(&self, owner: &str, name: &str, desc: &str) -> Result<String> {
        if !self.should_transform(owner) || !is_boolean_field(desc) {
            return Ok(desc.to_string());
        }
        let key = MemberKey::new(owner, name, desc);
        let mut state = self.lock();
        if let Some(new_desc) = state.descriptors.get(&key) {
            return Ok(new_desc.clone());
        }
        if self.is_outside_field(&state, owner, name, desc) {
            debug!("{} is declared out of scope, keeping its type", key);
            MappingState::insert_checked(&mut state.descriptors, key, desc.to_string())?;
            return Ok(desc.to_string());
        }
        let new_desc = transform_field_descriptor(desc);
        trace!("mapping {} -> {}", key, new_desc);
        let reverse = MemberKey::new(owner, name, &new_desc);
        MappingState::insert_checked(&mut state.descriptors, key, new_desc.clone())?;
        MappingState::insert_checked(&mut state.original_desc, reverse, desc.to_string())?;
        Ok(new_desc)
    }

    /// `(owner, name, desc)` names a rewritten method, or an original one
    /// that deals in booleans.
    pub fn is_transformed_or_boolean_method(&self, owner: &str, name: &str, desc: &str) -> bool {
        self.resolve_quietly(owner, name, desc);
        self.lock().original_desc.contains_key(&MemberKey::new(owner, name, desc)) || is_boolean_method(desc)
    }

    /// The method originally returned `boolean`.
    pub fn is_transformed_or_boolean_return(&self, owner: &str, name: &str, desc: &str) -> bool {
        self.resolve_quietly(owner, name, desc);
        let original = self.original_descriptor(owner, name, desc);
        return_type(&original) == Some(JvmType::Boolean)
    }

    pub fn is_transformed_or_boolean_field(&self, owner: &str, name: &str, desc: &str) -> bool {
        if let Err(e) = self.resolve_field(owner, name, desc) {
            warn!("{}", e);
        }
        self.lock().original_desc.contains_key(&MemberKey::new(owner, name, desc)) || is_boolean_field(desc)
    }

    /// Name before rewriting, for a `(owner, name, desc)` seen after it.
    pub fn original_name(&self, owner: &str, name: &str, desc: &str) -> String {
        self.lock()
            .original_name
            .get(&MemberKey::new(owner, name, desc))
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    /// Descriptor before rewriting, for a `(owner, name, desc)` seen after it.
    pub fn original_descriptor(&self, owner: &str, name: &str, desc: &str) -> String {
        self.lock()
            .original_desc
            .get(&MemberKey::new(owner, name, desc))
            .cloned()
            .unwrap_or_else(|| desc.to_string())
    }

    /// Parameter types before rewriting.
    pub fn original_types(&self, owner: &str, name: &str, desc: &str) -> Vec<JvmType> {
        parse_method_descriptor(&self.original_descriptor(owner, name, desc))
            .map(|(params, _)| params)
            .unwrap_or_default()
    }

    /// Number of registered forward entries.
    pub fn len(&self) -> usize {
        self.lock().descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn resolve_quietly(&self, owner: &str, name: &str, desc: &str) {
        if let Err(e) = self.resolve_method(owner, name, desc) {
            warn!("{}", e);
        }
    }

    fn lookup(&self, state: &MappingState, class: &str) -> Option<ClassInfo> {
        if let Some(info) = state.local_classes.get(class) {
            return Some(info.clone());
        }
        match self.hierarchy.lookup(class) {
            Ok(info) => Some(info),
            Err(e) => {
                warn!("abandoning hierarchy branch: {}", e);
                None
            }
        }
    }

    /// Breadth-first walk over `start` and its supertypes. Classes that cannot
    /// be loaded end their branch of the search.
    fn walk_hierarchy<F>(&self, state: &MappingState, start: &str, mut visit: F)
    where
        F: FnMut(&ClassInfo) -> Visit,
    {
        let mut visited: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<String> = VecDeque::new();
        queue.push_back(start.to_string());
        while let Some(name) = queue.pop_front() {
            if !visited.insert(name.clone()) {
                continue;
            }
            let Some(info) = self.lookup(state, &name) else {
                continue;
            };
            if let Visit::Stop = visit(&info) {
                return;
            }
            for parent in info.supertypes() {
                if !visited.contains(parent) && !queue.iter().any(|q| q == parent) {
                    queue.push_back(parent.to_string());
                }
            }
        }
    }

    fn is_outside_method(&self, state: &MappingState, owner: &str, name: &str, desc: &str) -> bool {
        let mut outside = false;
        self.walk_hierarchy(state, owner, |info| {
            if info.has_method(name, desc) && !self.is_inside(&info.name) {
                debug!("{}.{}{} is declared outside the rewrite scope", info.name, name, desc);
                outside = true;
                return Visit::Stop;
            }
            Visit::Continue
        });
        outside
    }

    /// The first declaration found decides.
    fn is_outside_field(&self, state: &MappingState, owner: &str, name: &str, desc: &str) -> bool {
        let mut outside = false;
        self.walk_hierarchy(state, owner, |info| {
            if info.has_field(name, desc) {
                outside = !self.is_inside(&info.name);
                return Visit::Stop;
            }
            Visit::Continue
        });
        outside
    }

    /// `(owner, name, desc)` is already the target of a rewrite or is
    /// declared somewhere in the hierarchy of `owner`.
    fn is_taken(&self, state: &MappingState, owner: &str, name: &str, desc: &str) -> bool {
        if state.original_desc.contains_key(&MemberKey::new(owner, name, desc)) {
            return true;
        }
        let mut clash = false;
        self.walk_hierarchy(state, owner, |info| {
            if info.has_method(name, desc) {
                debug!("{}.{}{} clashes with the rewritten descriptor", info.name, name, desc);
                clash = true;
                return Visit::Stop;
            }
            Visit::Continue
        });
        clash
    }

    /// `Some(name)` to keep or rename; `None` for a constructor that would
    /// need a new name.
    fn transform_method_name(&self, state: &mut MappingState, owner: &str, name: &str, new_desc: &str) -> Option<String> {
        if !self.is_taken(state, owner, name, new_desc) {
            return Some(name.to_string());
        }
        if name == "<init>" {
            return None;
        }
        loop {
            let renamed = format!("{}{}{}", name, RENAME_SUFFIX, state.next_id);
            state.next_id += 1;
            if !self.is_taken(state, owner, &renamed, new_desc) {
                return Some(renamed);
            }
        }
    }
}

fn is_library_class(class: &str) -> bool {
    LIBRARY_PREFIXES.iter().any(|p| class.starts_with(p))
}

fn is_target_or_nested(class: &str, target: &str) -> bool {
    class == target
        || class
            .strip_prefix(target)
            .is_some_and(|rest| rest.starts_with('$'))
}
