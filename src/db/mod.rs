pub mod mysql;
pub mod postgres;
pub mod registry;
pub mod resolver;
pub mod sql;
pub mod sqlite;
pub mod traits;

pub use mysql::*;
pub use postgres::*;
pub use registry::*;
pub use resolver::*;
pub use sqlite::*;
pub use traits::*;

#[cfg(test)]
pub(crate) mod test_stubs;
