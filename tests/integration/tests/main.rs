//! End-to-End Integration Tests
//!
//! These tests drive the column-store provider through its factory, backed
//! by an in-memory keyspace and a clock the tests can move forward.

mod common;
mod scenarios;
mod sessions;
mod unit_of_work;
