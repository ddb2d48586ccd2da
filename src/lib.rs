//! Skiff: a typed data layer for OData style table services.
//!
//! Declare a table's shape once with [`TableSchema`], then build, validate
//! and execute queries and commands through a [`Database`] bound to an
//! [`ODataAdapter`], without hand-writing query strings.
//!
//! ```no_run
//! use skiff::{Database, FieldDef, ODataAdapter, BasicAuth, TableSchema, eq};
//!
//! # async fn run() -> skiff::Result<()> {
//! let customers = TableSchema::declare("Customers")
//!     .field("code", FieldDef::text().primary_key())
//!     .field("name", FieldDef::text().nullable(false))
//!     .field("balance", FieldDef::number())
//!     .build()?;
//!
//! let adapter = ODataAdapter::builder("https://example.test", "crm")
//!     .auth(BasicAuth::new("user", "secret"))
//!     .build()?;
//! let database = Database::new(adapter);
//! let table = database.table(&customers);
//!
//! let name = customers.column("name")?;
//! let overdue = table
//!     .query()
//!     .filter(eq(&name, "O'Brien"))
//!     .top(10)
//!     .list()
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub use skiff_core::*;
pub use skiff_odata::*;
