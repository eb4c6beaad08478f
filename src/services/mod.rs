pub mod session_store;
pub mod game_service;

pub use session_store::SessionStore;
pub use game_service::GameService;
