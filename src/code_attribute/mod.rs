mod types;

pub mod stack_calc;

pub use self::types::*;
