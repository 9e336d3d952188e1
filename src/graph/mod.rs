//! Graph abstraction layer for backend-agnostic database access.
//!
//! Persisters describe their reads as [`Statement`]s and hand them to a
//! [`CypherExecutor`]. Backends live in [`backends`].
//!
//! # Usage
//!
//! ```ignore
//! use graph_ogm::graph::{Node, QueryExt};
//!
//! let rows = client
//!     .query("MATCH (n:Person) WHERE n.name = $name RETURN n")
//!     .returns(["n"])
//!     .param("name", "Ada")
//!     .fetch_all()
//!     .await?;
//!
//! let node: Node = rows[0].get("n")?;
//! ```

mod node;
mod row;
mod statement;
mod traits;

pub mod backends;

pub use node::Node;
pub use row::{Params, Row, RowStream};
pub use statement::{Query, QueryExt, Statement};
pub use traits::CypherExecutor;
