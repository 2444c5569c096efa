mod health_handler;
mod player_handler;

pub use health_handler::*;
pub use player_handler::*;
