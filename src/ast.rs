pub mod expression;
pub mod value;

pub use expression::*;
pub use value::*;
