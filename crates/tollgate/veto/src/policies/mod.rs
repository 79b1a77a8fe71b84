//! Veto policies

pub mod application;
pub mod deploy_window;
pub mod unhappy;

pub use application::ApplicationVeto;
pub use deploy_window::DeployWindowVeto;
pub use unhappy::UnhappyVeto;
