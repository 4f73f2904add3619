//! Class-level entry point.
//!
//! A [`ClassTransformer`] is one transformation session: the descriptor
//! mapping it owns accumulates every decision taken for the classes it has
//! seen, so callers and callees transformed separately agree on signatures.

use std::fmt;
use std::sync::Arc;

use log::{debug, info, warn};

use crate::analysis::BranchOracle;
use crate::config::TransformConfig;
use crate::error::TransformError;
use crate::hierarchy::ClassHierarchy;
use crate::mapping::DescriptorMapping;
use crate::passes::{rewrite_method, MethodTarget};
use crate::runtime::{ExecutionContext, LiteralSink};
use crate::types::ClassNode;

/// A member whose signature changed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberChange {
    pub name: String,
    pub desc: String,
    pub new_name: String,
    pub new_desc: String,
}

impl fmt::Display for MemberChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{} -> {}{}", self.name, self.desc, self.new_name, self.new_desc)
    }
}

/// A member whose signature or body could not be rewritten. A failed body
/// is kept as written.
#[derive(Debug)]
pub struct MemberFailure {
    pub member: String,
    pub error: TransformError,
}

/// What happened to one class.
#[derive(Debug, Default)]
pub struct TransformReport {
    pub class: String,
    pub retyped_fields: Vec<MemberChange>,
    pub retyped_methods: Vec<MemberChange>,
    /// Bodies rewritten through the pipeline.
    pub rewritten_bodies: usize,
    pub failures: Vec<MemberFailure>,
}

impl TransformReport {
    fn new(class: &str) -> Self {
        TransformReport {
            class: class.to_string(),
            ..Default::default()
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Methods whose name changed, not only their descriptor.
    pub fn renamed_methods(&self) -> impl Iterator<Item = &MemberChange> {
        self.retyped_methods.iter().filter(|m| m.name != m.new_name)
    }

    fn fail(&mut self, member: String, error: TransformError) {
        warn!("{}: {}", member, error);
        self.failures.push(MemberFailure { member, error });
    }
}

pub struct ClassTransformer {
    config: TransformConfig,
    mapping: DescriptorMapping,
    oracle: Arc<dyn BranchOracle>,
}

impl ClassTransformer {
    pub fn new(config: TransformConfig, hierarchy: Arc<dyn ClassHierarchy>, oracle: Arc<dyn BranchOracle>) -> Self {
        let mapping = DescriptorMapping::new(config.scope.clone(), hierarchy);
        ClassTransformer { config, mapping, oracle }
    }

    pub fn config(&self) -> &TransformConfig {
        &self.config
    }

    pub fn mapping(&self) -> &DescriptorMapping {
        &self.mapping
    }

    /// Evaluation state for code produced by this session.
    pub fn execution_context<S: LiteralSink>(&self, sink: S) -> ExecutionContext<S> {
        ExecutionContext::new(self.config.max_int, sink)
    }

    /// Makes `class` known to hierarchy searches without transforming it,
    /// so that classes transformed before it see its original members.
    pub fn register(&self, class: &ClassNode) {
        self.mapping.register_class(class);
    }

    /// Retypes the fields and methods of `class` and rewrites its method
    /// bodies when the class is in scope.
    pub fn transform(&self, class: &mut ClassNode) -> TransformReport {
        let owner = class.name.clone();
        let mut report = TransformReport::new(&owner);
        if owner == self.config.helper_class {
            debug!("{} is the distance helper, left alone", owner);
            return report;
        }
        self.mapping.register_class(class);
        let rewrite_bodies = self.mapping.should_transform(&owner);

        for field in &mut class.fields {
            match self.mapping.resolve_field(&owner, &field.name, &field.desc) {
                Ok(desc) if desc != field.desc => {
                    debug!("{}.{}: {} -> {}", owner, field.name, field.desc, desc);
                    report.retyped_fields.push(MemberChange {
                        name: field.name.clone(),
                        desc: std::mem::replace(&mut field.desc, desc.clone()),
                        new_name: field.name.clone(),
                        new_desc: desc,
                    });
                }
                Ok(_) => {}
                Err(e) => report.fail(format!("{}.{}:{}", owner, field.name, field.desc), e),
            }
        }

        for method in &mut class.methods {
            let (name, desc) = (method.name.clone(), method.desc.clone());
            let member = format!("{}.{}{}", owner, name, desc);
            let resolved = match self.mapping.resolve_method(&owner, &name, &desc) {
                Ok(resolved) => resolved,
                Err(e) => {
                    report.fail(member, e);
                    continue;
                }
            };

            if rewrite_bodies && method.has_code() && !method.instructions.is_empty() {
                let target = MethodTarget {
                    owner: &owner,
                    original_name: &name,
                    original_desc: &desc,
                    desc: &resolved.desc,
                };
                match rewrite_method(method, &target, &self.mapping, self.oracle.as_ref(), &self.config.helper_class) {
                    Ok(()) => report.rewritten_bodies += 1,
                    Err(e) => report.fail(member.clone(), e),
                }
            }

            if resolved.name != name || resolved.desc != desc {
                debug!("{} -> {}{}", member, resolved.name, resolved.desc);
                method.name = resolved.name.clone();
                method.desc = resolved.desc.clone();
                report.retyped_methods.push(MemberChange {
                    name,
                    desc,
                    new_name: resolved.name,
                    new_desc: resolved.desc,
                });
            }
        }

        info!(
            "{}: {} fields and {} methods retyped, {} bodies rewritten, {} failures",
            owner,
            report.retyped_fields.len(),
            report.retyped_methods.len(),
            report.rewritten_bodies,
            report.failures.len()
        );
        report
    }
}

/// Transforms a single class in a fresh session.
pub fn transform_class(
    config: TransformConfig,
    hierarchy: Arc<dyn ClassHierarchy>,
    oracle: Arc<dyn BranchOracle>,
    class: &mut ClassNode,
) -> TransformReport {
    ClassTransformer::new(config, hierarchy, oracle).transform(class)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::StructuralOracle;
    use crate::code_attribute::{FieldRef, Insn, Label};
    use crate::config::Scope;
    use crate::field_info::{FieldAccessFlags, FieldNode};
    use crate::hierarchy::{ClassInfo, InMemoryHierarchy};
    use crate::method_info::{MethodAccessFlags, MethodNode};

    fn transformer(hierarchy: InMemoryHierarchy) -> ClassTransformer {
        ClassTransformer::new(
            TransformConfig::default().with_scope(Scope::Prefix("com/acme/".into())),
            Arc::new(hierarchy),
            Arc::new(StructuralOracle::new()),
        )
    }

    fn class_with_flag() -> ClassNode {
        let mut class = ClassNode::new("com/acme/Door", Some("java/lang/Object"));
        class
            .fields
            .push(FieldNode::new(FieldAccessFlags::PRIVATE, "open", "Z"));
        class.methods.push(
            MethodNode::new(MethodAccessFlags::PUBLIC, "isOpen", "()Z").with_code(
                vec![
                    Insn::Aload(0),
                    Insn::Getfield(FieldRef::new("com/acme/Door", "open", "Z")),
                    Insn::Ireturn,
                ],
                1,
                1,
            ),
        );
        class
            .methods
            .push(MethodNode::new(MethodAccessFlags::PUBLIC | MethodAccessFlags::NATIVE, "lock", "(Z)V"));
        class
    }

    #[test]
    fn test_transform_retypes_members() {
        let mut class = class_with_flag();
        let report = transformer(InMemoryHierarchy::new()).transform(&mut class);

        assert!(report.is_clean(), "{:?}", report.failures);
        assert_eq!(class.fields[0].desc, "I");
        assert_eq!(class.methods[0].desc, "()I");
        assert_eq!(class.methods[1].desc, "(I)V");
        assert_eq!(report.retyped_fields.len(), 1);
        assert_eq!(report.retyped_methods.len(), 2);
        // native methods keep no body to rewrite
        assert_eq!(report.rewritten_bodies, 1);
        assert_eq!(
            class.methods[0].instructions[1],
            Insn::Getfield(FieldRef::new("com/acme/Door", "open", "I"))
        );
    }

    #[test]
    fn test_out_of_scope_class_is_left_alone() {
        let mut class = class_with_flag();
        class.name = "org/other/Door".into();
        let before = class.clone();
        let report = transformer(InMemoryHierarchy::new()).transform(&mut class);

        assert_eq!(class, before);
        assert_eq!(report.rewritten_bodies, 0);
        assert!(report.retyped_methods.is_empty());
    }

    #[test]
    fn test_override_of_library_predicate_keeps_signature() {
        let hierarchy = InMemoryHierarchy::new().with(ClassInfo::new("org/lib/Filter").method("accept", "(I)Z"));
        let mut class = ClassNode::new("com/acme/Even", Some("org/lib/Filter"));
        class.methods.push(
            MethodNode::new(MethodAccessFlags::PUBLIC, "accept", "(I)Z").with_code(
                vec![
                    Insn::Iload(1),
                    Insn::Iconst2,
                    Insn::Irem,
                    Insn::Ifne(Label(0)),
                    Insn::Iconst1,
                    Insn::Ireturn,
                    Insn::Label(Label(0)),
                    Insn::Iconst0,
                    Insn::Ireturn,
                ],
                2,
                2,
            ),
        );
        let report = transformer(hierarchy).transform(&mut class);

        assert!(report.retyped_methods.is_empty());
        assert_eq!(class.methods[0].desc, "(I)Z");
        let conversions = class.methods[0]
            .instructions
            .iter()
            .filter(|i| matches!(i, Insn::Invokestatic(m) if m.name == "intToBoolean"))
            .count();
        assert_eq!(conversions, 2);
    }

    #[test]
    fn test_helper_class_is_skipped() {
        let mut helper = ClassNode::new(TransformConfig::default().helper_class, Some("java/lang/Object"));
        helper.fields.push(FieldNode::new(FieldAccessFlags::STATIC, "on", "Z"));
        let report = transformer(InMemoryHierarchy::new()).transform(&mut helper);
        assert_eq!(helper.fields[0].desc, "Z");
        assert_eq!(report.retyped_fields.len(), 0);
    }
}
