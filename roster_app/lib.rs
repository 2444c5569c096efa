pub mod config;
pub mod lifecycle;
pub mod repository;
pub mod services;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
