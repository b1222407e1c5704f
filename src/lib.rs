pub mod app;
pub mod config;
pub mod error;
pub mod api {
    pub mod errors;
    pub mod polls;
}
pub mod db {
    pub mod models;
    pub mod repository;
}
