pub mod ajax;
pub mod api;
pub mod backend;
pub mod config;
pub mod data_models;
pub mod location;
pub mod render;
pub mod session;
pub mod view;
