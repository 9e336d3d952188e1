//! Backend implementations for different graph databases.
//!
//! Each backend implements [`CypherExecutor`](crate::graph::CypherExecutor).
//!
//! | Backend | Module | Status |
//! |---------|--------|--------|
//! | PostgreSQL + Apache AGE | [`postgres`] | Available |
//!
//! The in-memory graph used for embedded use and tests does not speak Cypher;
//! it plugs in one level higher, as a persister (see
//! [`crate::persister::memory`]).

pub mod postgres;
