pub mod aggregation;
pub mod api;
pub mod config;
pub mod controller;
pub mod coordinator;
pub mod error;
pub mod export;
pub mod index;
pub mod logging;
pub mod model;
pub mod playback;
pub mod summary;
pub mod zones;
