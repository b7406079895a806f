//! MySQL/MariaDB support.
//!
//! # Supported Versions
//!
//! - MySQL 5.x (legacy: LIMIT/OFFSET paging), 8.0+
//! - MariaDB 10.2+, including servers that report themselves as
//!   `MySQL 5.5.5-10.x-MariaDB`

mod dialect;

pub use dialect::{MysqlDialect, MysqlFlavor};
