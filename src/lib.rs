//! A testability transformation for JVM bytecode.
//!
//! Boolean predicates give a search no gradient: a flag is either set or not.
//! This crate rewrites class trees so that every `boolean` field, parameter,
//! return value, local and array element carries an integer *branch
//! distance* instead, and ships the runtime those rewritten classes call into.
//!
//! ```rust
//! use std::sync::Arc;
//! use testability_transform::{
//!     transform_class, ClassNode, FieldAccessFlags, FieldNode, InMemoryHierarchy, StructuralOracle,
//!     TransformConfig,
//! };
//!
//! let mut class = ClassNode::new("com/example/Flags", Some("java/lang/Object"));
//! class.fields.push(FieldNode::new(FieldAccessFlags::PRIVATE, "ready", "Z"));
//!
//! let report = transform_class(
//!     TransformConfig::default(),
//!     Arc::new(InMemoryHierarchy::new()),
//!     Arc::new(StructuralOracle::new()),
//!     &mut class,
//! );
//! assert_eq!(class.fields[0].desc, "I");
//! assert_eq!(report.retyped_fields.len(), 1);
//! ```

#[macro_use]
extern crate bitflags;

pub mod code_attribute;
pub mod field_info;
pub mod method_info;
pub mod types;

pub mod analysis;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod hierarchy;
pub mod mapping;
pub mod passes;
pub mod runtime;
pub mod transform;

pub use analysis::{BranchOracle, ControlDependency, FixedOracle, StructuralOracle};
pub use config::{Scope, TransformConfig, GLOBAL_CONFIG};
pub use error::{AnalyzerError, DistanceError, HierarchyError, Result, TransformError};
pub use field_info::*;
pub use hierarchy::{ClassHierarchy, ClassInfo, InMemoryHierarchy};
pub use mapping::DescriptorMapping;
pub use method_info::*;
pub use runtime::ExecutionContext;
pub use transform::{transform_class, ClassTransformer, MemberChange, MemberFailure, TransformReport};
pub use types::*;
