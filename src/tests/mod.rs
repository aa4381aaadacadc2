//! Test modules for the topic router.
//!
//! This module contains the crate-level testing infrastructure:
//! - Configuration loading and validation tests
//! - Error conversion and reporting tests
//! - Property-based tests of the routing table using proptest
//! - Test fixtures and strategies shared between them

pub mod config_tests;
pub mod error_tests;

// Re-export commonly used testing tools to simplify imports in test modules
pub use test_utils::{
    create_test_dir, literal_key_strategy, topic_key_strategy, route_key_strategy,
    route_op_strategy, RouteOp, TestFixture,
};
