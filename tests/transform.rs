use std::sync::Arc;

use testability_transform::code_attribute::{FieldRef, Insn, Label, MethodRef};
use testability_transform::{
    ClassHierarchy, ClassInfo, ClassNode, ClassTransformer, FieldAccessFlags, FieldNode, InMemoryHierarchy,
    MethodAccessFlags, MethodNode, Scope, StructuralOracle, TransformConfig,
};

const HELPER: &str = "testability/runtime/Distance";

fn session(hierarchy: InMemoryHierarchy) -> ClassTransformer {
    let hierarchy: Arc<dyn ClassHierarchy> = Arc::new(hierarchy);
    ClassTransformer::new(
        TransformConfig::default().with_scope(Scope::Prefix("com/acme/".into())),
        hierarchy,
        Arc::new(StructuralOracle::new()),
    )
}

fn helper_calls(method: &MethodNode, name: &str) -> usize {
    method
        .instructions
        .iter()
        .filter(|i| matches!(i, Insn::Invokestatic(m) if m.owner == HELPER && m.name == name))
        .count()
}

fn lock_class() -> ClassNode {
    let count = FieldRef::new("com/acme/Lock", "count", "I");
    let mut lock = ClassNode::new("com/acme/Lock", Some("java/lang/Object"));
    lock.fields.push(FieldNode::new(FieldAccessFlags::PRIVATE, "count", "I"));
    lock.methods.push(
        MethodNode::new(MethodAccessFlags::PUBLIC, "isLocked", "()Z").with_code(
            vec![
                Insn::Aload(0),
                Insn::Getfield(count),
                Insn::Ifle(Label(0)),
                Insn::Iconst1,
                Insn::Ireturn,
                Insn::Label(Label(0)),
                Insn::Iconst0,
                Insn::Ireturn,
            ],
            1,
            1,
        ),
    );
    lock
}

fn user_class() -> ClassNode {
    let mut user = ClassNode::new("com/acme/User", Some("java/lang/Object"));
    user.methods.push(
        MethodNode::new(MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC, "open", "(Lcom/acme/Lock;)I").with_code(
            vec![
                Insn::Aload(0),
                Insn::Invokevirtual(MethodRef::new("com/acme/Lock", "isLocked", "()Z")),
                Insn::Ifeq(Label(0)),
                Insn::Iconst0,
                Insn::Ireturn,
                Insn::Label(Label(0)),
                Insn::Iconst1,
                Insn::Ireturn,
            ],
            1,
            1,
        ),
    );
    user
}

#[test]
fn test_class_without_booleans_keeps_its_signatures() {
    let mut class = ClassNode::new("com/acme/Counter", Some("java/lang/Object"));
    class.fields.push(FieldNode::new(FieldAccessFlags::PRIVATE, "n", "I"));
    class.methods.push(
        MethodNode::new(MethodAccessFlags::PUBLIC, "get", "()I").with_code(
            vec![
                Insn::Aload(0),
                Insn::Getfield(FieldRef::new("com/acme/Counter", "n", "I")),
                Insn::Ireturn,
            ],
            1,
            1,
        ),
    );
    let before = class.clone();
    let report = session(InMemoryHierarchy::new()).transform(&mut class);

    assert!(report.is_clean());
    assert!(report.retyped_fields.is_empty());
    assert!(report.retyped_methods.is_empty());
    assert_eq!(class.fields, before.fields);
    assert_eq!(class.methods[0].name, "get");
    assert_eq!(class.methods[0].desc, "()I");
    assert_eq!(class.methods[0].instructions, before.methods[0].instructions);
}

#[test]
fn test_call_sites_follow_the_callee() {
    let transformer = session(InMemoryHierarchy::new());
    let mut lock = lock_class();
    let mut user = user_class();
    transformer.register(&user);

    let lock_report = transformer.transform(&mut lock);
    let user_report = transformer.transform(&mut user);

    assert_eq!(lock_report.retyped_methods.len(), 1);
    assert!(user_report.retyped_methods.is_empty());
    let is_locked = &lock.methods[0];
    assert_eq!((is_locked.name.as_str(), is_locked.desc.as_str()), ("isLocked", "()I"));

    for insn in &user.methods[0].instructions {
        if let Some(m) = insn.method_ref().filter(|m| m.owner == "com/acme/Lock") {
            assert!(lock.method(&m.name, &m.desc).is_some(), "dangling call {:?}", m);
        }
    }
    // the distance returned by isLocked is tested by sign
    assert!(user.methods[0].instructions.contains(&Insn::Ifle(Label(0))));
    assert_eq!(helper_calls(&user.methods[0], "pushPredicate"), 1);
    assert_eq!(helper_calls(&lock.methods[0], "getDistance"), 2);
}

#[test]
fn test_flag_assignment_gets_an_else_branch() {
    let flag = FieldRef::new("com/acme/Switch", "flag", "Z");
    let mut class = ClassNode::new("com/acme/Switch", Some("java/lang/Object"));
    class
        .fields
        .push(FieldNode::new(FieldAccessFlags::STATIC, "flag", "Z"));
    // if (x > 0) flag = true;
    class.methods.push(
        MethodNode::new(MethodAccessFlags::STATIC, "update", "(I)V").with_code(
            vec![
                Insn::Iload(0),
                Insn::Ifle(Label(0)),
                Insn::Iconst1,
                Insn::Putstatic(flag),
                Insn::Label(Label(0)),
                Insn::Return,
            ],
            1,
            1,
        ),
    );
    let report = session(InMemoryHierarchy::new()).transform(&mut class);
    assert!(report.is_clean(), "{:?}", report.failures);

    let update = &class.methods[0];
    let retyped = FieldRef::new("com/acme/Switch", "flag", "I");
    let stores = update
        .instructions
        .iter()
        .filter(|i| **i == Insn::Putstatic(retyped.clone()))
        .count();
    assert_eq!(stores, 2);
    assert_eq!(helper_calls(update, "getDistance"), 2);
    assert!(update.max_stack >= 5);
}

#[test]
fn test_library_override_converts_at_the_boundary() {
    let hierarchy = InMemoryHierarchy::new()
        .with(ClassInfo::new("java/util/function/IntPredicate").method("test", "(I)Z"));
    let mut class = ClassNode::new("com/acme/Positive", Some("java/lang/Object"));
    class.interfaces.push("java/util/function/IntPredicate".into());
    class.methods.push(
        MethodNode::new(MethodAccessFlags::PUBLIC, "test", "(I)Z").with_code(
            vec![
                Insn::Iload(1),
                Insn::Ifle(Label(0)),
                Insn::Iconst1,
                Insn::Ireturn,
                Insn::Label(Label(0)),
                Insn::Iconst0,
                Insn::Ireturn,
            ],
            1,
            2,
        ),
    );
    let report = session(hierarchy).transform(&mut class);

    assert!(report.retyped_methods.is_empty());
    assert_eq!(class.methods[0].desc, "(I)Z");
    assert_eq!(helper_calls(&class.methods[0], "intToBoolean"), 2);
}

#[test]
fn test_string_predicate_becomes_distance() {
    let mut class = ClassNode::new("com/acme/Greeter", Some("java/lang/Object"));
    class.methods.push(
        MethodNode::new(MethodAccessFlags::STATIC, "isHello", "(Ljava/lang/String;)Z").with_code(
            vec![
                Insn::Aload(0),
                Insn::Ldc(testability_transform::code_attribute::Constant::String("hello".into())),
                Insn::Invokevirtual(MethodRef::new("java/lang/String", "equals", "(Ljava/lang/Object;)Z")),
                Insn::Ireturn,
            ],
            2,
            1,
        ),
    );
    let report = session(InMemoryHierarchy::new()).transform(&mut class);

    assert_eq!(class.methods[0].desc, "(Ljava/lang/String;)I");
    assert_eq!(report.retyped_methods[0].new_desc, "(Ljava/lang/String;)I");
    assert_eq!(helper_calls(&class.methods[0], "StringEquals"), 1);
    assert_eq!(helper_calls(&class.methods[0], "booleanToInt"), 0);
}

#[test]
fn test_references_already_retyped_are_still_predicates() {
    let transformer = session(InMemoryHierarchy::new());
    let mut lock = lock_class();
    let mut gate = ClassNode::new("com/acme/Gate", Some("java/lang/Object"));
    gate.fields.push(FieldNode::new(FieldAccessFlags::STATIC, "open", "Z"));
    transformer.transform(&mut lock);
    transformer.transform(&mut gate);
    assert_eq!(gate.fields[0].desc, "I");

    // compiled against the retyped Lock and Gate
    let is_locked = MethodRef::new("com/acme/Lock", "isLocked", "()I");
    let open = FieldRef::new("com/acme/Gate", "open", "I");
    let mut late = ClassNode::new("com/acme/Late", Some("java/lang/Object"));
    late.methods.push(
        MethodNode::new(MethodAccessFlags::STATIC, "check", "(Lcom/acme/Lock;)I").with_code(
            vec![
                Insn::Aload(0),
                Insn::Invokevirtual(is_locked.clone()),
                Insn::Ifeq(Label(0)),
                Insn::Getstatic(open.clone()),
                Insn::Ifne(Label(0)),
                Insn::Iconst1,
                Insn::Ireturn,
                Insn::Label(Label(0)),
                Insn::Iconst0,
                Insn::Ireturn,
            ],
            1,
            1,
        ),
    );
    let report = transformer.transform(&mut late);
    assert!(report.is_clean(), "{:?}", report.failures);

    let check = &late.methods[0];
    assert!(check.instructions.contains(&Insn::Ifle(Label(0))));
    assert!(check.instructions.contains(&Insn::Ifgt(Label(0))));
    assert!(!check.instructions.contains(&Insn::Ifeq(Label(0))));
    assert!(!check.instructions.contains(&Insn::Ifne(Label(0))));
    assert!(check.instructions.contains(&Insn::Invokevirtual(is_locked)));
    assert!(check.instructions.contains(&Insn::Getstatic(open)));
    assert_eq!(helper_calls(check, "booleanToInt"), 0);
    assert_eq!(helper_calls(check, "pushPredicate"), 2);
}
