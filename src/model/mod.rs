pub mod expr;
pub mod table;
pub mod value;

pub use expr::*;
pub use table::*;
pub use value::*;
