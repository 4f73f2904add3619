//! Call and field sites follow the rewritten signatures.
//!
//! Well-known string, collection and map predicates are replaced by their
//! distance helpers. Every other member reference is resolved through the
//! descriptor mapping; where the resolved member still deals in `boolean`,
//! distances are converted at the boundary.

use super::helpers::{Helper, Lane};
use super::{Node, Pass, PassContext};
use crate::code_attribute::{FieldRef, Insn, MethodRef};
use crate::descriptor::{parse_method_descriptor, JvmType};
use crate::error::Result;

const COLLECTIONS: [&str; 13] = [
    "java/util/Collection",
    "java/util/List",
    "java/util/Set",
    "java/util/SortedSet",
    "java/util/Queue",
    "java/util/Deque",
    "java/util/ArrayList",
    "java/util/LinkedList",
    "java/util/Vector",
    "java/util/HashSet",
    "java/util/LinkedHashSet",
    "java/util/TreeSet",
    "java/util/ArrayDeque",
];

const MAPS: [&str; 6] = [
    "java/util/Map",
    "java/util/SortedMap",
    "java/util/HashMap",
    "java/util/LinkedHashMap",
    "java/util/TreeMap",
    "java/util/Hashtable",
];

/// Helper replacing a library predicate, and whether `startsWith(String)`
/// needs its missing offset argument.
fn well_known(insn: &Insn) -> Option<(Helper, bool)> {
    let (m, is_static) = match insn {
        Insn::Invokevirtual(m) | Insn::Invokeinterface(m) => (m, false),
        Insn::Invokestatic(m) => (m, true),
        _ => return None,
    };
    let owner = m.owner.as_str();
    let (name, desc) = (m.name.as_str(), m.desc.as_str());
    if is_static {
        return match (owner, name, desc) {
            ("java/util/regex/Pattern", "matches", "(Ljava/lang/String;Ljava/lang/CharSequence;)Z") => {
                Some((Helper::StringMatchRegex, false))
            }
            _ => None,
        };
    }
    if owner == "java/lang/String" {
        let helper = match (name, desc) {
            ("equals", "(Ljava/lang/Object;)Z") => Helper::StringEquals,
            ("equalsIgnoreCase", "(Ljava/lang/String;)Z") => Helper::StringEqualsIgnoreCase,
            ("startsWith", "(Ljava/lang/String;)Z") => return Some((Helper::StringStartsWith, true)),
            ("startsWith", "(Ljava/lang/String;I)Z") => Helper::StringStartsWith,
            ("endsWith", "(Ljava/lang/String;)Z") => Helper::StringEndsWith,
            ("isEmpty", "()Z") => Helper::StringIsEmpty,
            ("matches", "(Ljava/lang/String;)Z") => Helper::StringMatches,
            ("regionMatches", "(ILjava/lang/String;II)Z") => Helper::StringRegionMatches,
            ("regionMatches", "(ZILjava/lang/String;II)Z") => Helper::StringRegionMatchesIgnoreCase,
            _ => return None,
        };
        return Some((helper, false));
    }
    if COLLECTIONS.contains(&owner) {
        let helper = match (name, desc) {
            ("isEmpty", "()Z") => Helper::CollectionIsEmpty,
            ("contains", "(Ljava/lang/Object;)Z") => Helper::CollectionContains,
            ("containsAll", "(Ljava/util/Collection;)Z") => Helper::CollectionContainsAll,
            _ => return None,
        };
        return Some((helper, false));
    }
    if MAPS.contains(&owner) {
        let helper = match (name, desc) {
            ("isEmpty", "()Z") => Helper::MapIsEmpty,
            ("containsKey", "(Ljava/lang/Object;)Z") => Helper::MapContainsKey,
            ("containsValue", "(Ljava/lang/Object;)Z") => Helper::MapContainsValue,
            _ => return None,
        };
        return Some((helper, false));
    }
    None
}

/// Same kind of invoke, different target.
fn with_method(insn: &Insn, m: MethodRef) -> Insn {
    match insn {
        Insn::Invokevirtual(_) => Insn::Invokevirtual(m),
        Insn::Invokespecial(_) => Insn::Invokespecial(m),
        Insn::Invokeinterface(_) => Insn::Invokeinterface(m),
        _ => Insn::Invokestatic(m),
    }
}

fn with_field(insn: &Insn, f: FieldRef) -> Insn {
    match insn {
        Insn::Getstatic(_) => Insn::Getstatic(f),
        Insn::Putstatic(_) => Insn::Putstatic(f),
        Insn::Getfield(_) => Insn::Getfield(f),
        _ => Insn::Putfield(f),
    }
}

/// `checkcast` operand restoring the static type of a staged object.
fn cast_operand(ty: &JvmType) -> Option<String> {
    match ty {
        JvmType::Reference(name) if name == "java/lang/Object" => None,
        JvmType::Reference(name) => Some(name.clone()),
        JvmType::Array(_) => Some(ty.to_descriptor()),
        _ => None,
    }
}

fn adapt_invoke(node: Node, method: &MethodRef, cx: &PassContext<'_>, out: &mut Vec<Node>) -> Result<()> {
    let resolved = cx.mapping.resolve_method(&method.owner, &method.name, &method.desc)?;
    let target = MethodRef::new(method.owner.as_str(), resolved.name, resolved.desc);
    let Some((params, ret)) = parse_method_descriptor(&target.desc) else {
        out.push(node.replaced(with_method(&node.insn, target)));
        return Ok(());
    };

    // Park the arguments above the first boolean, convert it, restore them
    if let Some(first) = params.iter().position(|p| *p == JvmType::Boolean) {
        let rest = &params[first + 1..];
        for param in rest.iter().rev() {
            out.push(cx.call(Helper::PushParameter(Lane::of(param))));
        }
        out.push(cx.call(Helper::IntToBoolean));
        for param in rest {
            out.push(cx.call(Helper::PopParameter(Lane::of(param))));
            if let Some(class) = cast_operand(param) {
                out.push(Node::inserted(Insn::Checkcast(class)));
            }
        }
    }
    out.push(node.replaced(with_method(&node.insn, target)));
    if ret == JvmType::Boolean {
        out.push(cx.call(Helper::BooleanToInt));
    }
    Ok(())
}

fn adapt_field(node: Node, field: &FieldRef, cx: &PassContext<'_>, out: &mut Vec<Node>) -> Result<()> {
    let desc = cx.mapping.resolve_field(&field.owner, &field.name, &field.desc)?;
    let still_boolean = desc == "Z";
    let is_put = matches!(node.insn, Insn::Putfield(_) | Insn::Putstatic(_));
    let target = FieldRef::new(field.owner.as_str(), field.name.as_str(), desc);
    if still_boolean && is_put {
        out.push(cx.call(Helper::IntToBoolean));
    }
    out.push(node.replaced(with_field(&node.insn, target)));
    if still_boolean && !is_put {
        out.push(cx.call(Helper::BooleanToInt));
    }
    Ok(())
}

pub struct CallSites;

impl Pass for CallSites {
    fn name(&self) -> &'static str {
        "call-sites"
    }

    fn run(&self, nodes: Vec<Node>, cx: &mut PassContext<'_>) -> Result<Vec<Node>> {
        let mut out = Vec::with_capacity(nodes.len());
        for node in nodes {
            if let Some((helper, needs_offset)) = well_known(&node.insn) {
                if needs_offset {
                    out.push(Node::inserted(Insn::Iconst0));
                }
                out.push(node.replaced(helper.call(cx.helper_class)));
                continue;
            }
            if let Some(method) = node.insn.method_ref().cloned() {
                if method.owner == cx.helper_class {
                    out.push(node);
                } else {
                    adapt_invoke(node, &method, cx, &mut out)?;
                }
                continue;
            }
            if let Some(field) = node.insn.field_ref().cloned() {
                adapt_field(node, &field, cx, &mut out)?;
                continue;
            }
            out.push(node);
        }
        Ok(out)
    }
}
