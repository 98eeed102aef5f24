pub mod backend;
pub mod clock;
pub mod config;
pub mod dashboard;
pub mod http;
pub mod location;
pub mod logging;
pub mod network;
pub mod search;
pub mod weather;

pub use config::Config;
pub use dashboard::{Dashboard, DashboardState, Services};
