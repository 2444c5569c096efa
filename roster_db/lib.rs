pub mod mapping;

mod connection;
mod memory;
mod models;
mod repository;

pub use connection::{
    DbPool, PostgresConnection, connection_pool, establish_test_connection_pool,
};
pub use memory::InMemoryPlayerRepository;
pub use repository::*;
