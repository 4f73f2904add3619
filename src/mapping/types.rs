use std::fmt;

/// `(owner, name, descriptor)` of a field or method.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemberKey {
    pub owner: String,
    pub name: String,
    pub desc: String,
}

impl MemberKey {
    pub fn new(owner: &str, name: &str, desc: &str) -> Self {
        MemberKey {
            owner: owner.to_string(),
            name: name.to_string(),
            desc: desc.to_string(),
        }
    }
}

impl fmt::Display for MemberKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}{}", self.owner, self.name, self.desc)
    }
}

/// Outcome of resolving a method signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedMethod {
    pub name: String,
    pub desc: String,
}

impl ResolvedMethod {
    pub fn unchanged(name: &str, desc: &str) -> Self {
        ResolvedMethod {
            name: name.to_string(),
            desc: desc.to_string(),
        }
    }

    pub fn is_renamed_from(&self, name: &str) -> bool {
        self.name != name
    }
}
