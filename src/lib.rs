pub mod app;
pub mod config;
pub mod library;
pub mod model;
pub mod player;
pub mod playlist;
pub mod track;
