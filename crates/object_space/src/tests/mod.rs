//! Scenario tests that drive the object space through its public surface

pub(crate) mod support;

mod concurrency;
