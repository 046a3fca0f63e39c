pub mod fetch;
pub mod setup;
pub mod ui;
