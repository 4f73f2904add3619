//! Static facts about a method body that the rewriting passes consult.

pub mod frames;
pub mod locals;
pub mod oracle;
pub mod regions;

pub use self::frames::{analyze, Frame, Frames, MemberTypes, MethodShape, Unmapped, Value};
pub use self::locals::BooleanLocals;
pub use self::oracle::{BranchOracle, ControlDependency, FixedOracle, StructuralOracle};
pub use self::regions::{conditional_regions, Region};
