pub mod models;
pub mod scale;
pub mod settings;
