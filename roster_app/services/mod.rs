mod player_service;

pub use player_service::PlayerService;
