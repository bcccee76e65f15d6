pub mod scenarios;
pub mod sensitivity;
pub mod waterfall;
