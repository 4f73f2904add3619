//! `boolean[]` becomes `int[]`.

use super::{Node, Pass, PassContext};
use crate::code_attribute::{Constant, Insn};
use crate::descriptor::{transform_type_operand, T_BOOLEAN, T_INT};
use crate::error::Result;

pub struct Arrays;

impl Arrays {
    /// The array reference `depth` slots down is an `int[]` after rewriting.
    fn int_array_at(node: &Node, depth: usize, cx: &PassContext<'_>) -> bool {
        cx.frame(node.origin)
            .and_then(|f| f.peek(depth))
            .and_then(|v| v.descriptor())
            .is_some_and(|desc| desc == "[I")
    }
}

impl Pass for Arrays {
    fn name(&self) -> &'static str {
        "arrays"
    }

    fn run(&self, nodes: Vec<Node>, cx: &mut PassContext<'_>) -> Result<Vec<Node>> {
        let mut out = Vec::with_capacity(nodes.len());
        for node in nodes {
            let insn = match &node.insn {
                Insn::Newarray(T_BOOLEAN) => Insn::Newarray(T_INT),
                Insn::Anewarray(class) => Insn::Anewarray(transform_type_operand(class)),
                Insn::Checkcast(class) => Insn::Checkcast(transform_type_operand(class)),
                Insn::Multianewarray { desc, dimensions } => Insn::Multianewarray {
                    desc: transform_type_operand(desc),
                    dimensions: *dimensions,
                },
                Insn::Ldc(Constant::Class(class)) => Insn::Ldc(Constant::Class(transform_type_operand(class))),
                Insn::Baload if Self::int_array_at(&node, 1, cx) => Insn::Iaload,
                Insn::Bastore if Self::int_array_at(&node, 2, cx) => Insn::Iastore,
                _ => {
                    out.push(node);
                    continue;
                }
            };
            out.push(node.replaced(insn));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::test_support::run;

    #[test]
    fn test_boolean_arrays_become_int_arrays() {
        let out = run(
            &Arrays,
            "([B)V",
            vec![
                Insn::Iconst2,
                Insn::Newarray(T_BOOLEAN),
                Insn::Astore(1),
                Insn::Aload(1),
                Insn::Iconst0,
                Insn::Iconst1,
                Insn::Bastore,
                Insn::Aload(1),
                Insn::Iconst0,
                Insn::Baload,
                Insn::Pop,
                Insn::Aload(0),
                Insn::Iconst0,
                Insn::Baload,
                Insn::Pop,
                Insn::Iconst1,
                Insn::Iconst1,
                Insn::Multianewarray {
                    desc: "[[Z".into(),
                    dimensions: 2,
                },
                Insn::Checkcast("[[Z".into()),
                Insn::Pop,
                Insn::Iconst1,
                Insn::Anewarray("[Z".into()),
                Insn::Pop,
                Insn::Return,
            ],
            2,
        );
        assert_eq!(
            out,
            vec![
                Insn::Iconst2,
                Insn::Newarray(T_INT),
                Insn::Astore(1),
                Insn::Aload(1),
                Insn::Iconst0,
                Insn::Iconst1,
                Insn::Iastore,
                Insn::Aload(1),
                Insn::Iconst0,
                Insn::Iaload,
                Insn::Pop,
                Insn::Aload(0),
                Insn::Iconst0,
                Insn::Baload,
                Insn::Pop,
                Insn::Iconst1,
                Insn::Iconst1,
                Insn::Multianewarray {
                    desc: "[[I".into(),
                    dimensions: 2,
                },
                Insn::Checkcast("[[I".into()),
                Insn::Pop,
                Insn::Iconst1,
                Insn::Anewarray("[I".into()),
                Insn::Pop,
                Insn::Return,
            ]
        );
    }

    #[test]
    fn test_class_names_are_untouched() {
        let out = run(
            &Arrays,
            "(Ljava/lang/Object;)V",
            vec![
                Insn::Aload(0),
                Insn::Checkcast("a/B".into()),
                Insn::Pop,
                Insn::Ldc(Constant::Class("a/B".into())),
                Insn::Pop,
                Insn::Return,
            ],
            1,
        );
        assert_eq!(out[1], Insn::Checkcast("a/B".into()));
        assert_eq!(out[3], Insn::Ldc(Constant::Class("a/B".into())));
    }
}
