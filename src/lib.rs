pub mod aggregate;
pub mod app;
pub mod config;
pub mod dispatch;
pub mod errors;
pub mod handlers;
pub mod ledger;
pub mod models;
pub mod ratings;
pub mod report;
pub mod scheduler;
pub mod state;
pub mod storage;
pub mod transport;
pub mod ui;
pub mod window;

pub use app::router;
pub use config::AppConfig;
pub use state::AppState;
pub use storage::{load_ledger, load_ratings};
