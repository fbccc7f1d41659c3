pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod docs;
pub mod error;
pub mod model;
pub mod routes;
pub mod service;
pub mod store;

/// Concrete store and service wired into the HTTP layer.
pub type AppStore = store::mysql::MySqlLeaveStore;
pub type AppService = service::LeaveService<AppStore>;
