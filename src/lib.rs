pub mod access;
pub mod aggregate;
pub mod app;
pub mod config;
pub mod errors;
pub mod extract;
pub mod handlers;
pub mod models;
pub mod probe;
pub mod report;
pub mod series;
pub mod state;
pub mod store;
pub mod ui;
pub mod window;

pub use app::router;
pub use config::ReportConfig;
pub use state::AppState;
