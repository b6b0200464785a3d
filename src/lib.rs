pub mod app;
pub mod editor;
pub mod focus;
pub mod logging;
pub mod naming;
pub mod player;
pub mod save;
pub mod settings;
pub mod sidebar;

#[cfg(feature = "desktop")]
mod desktop;

#[cfg(feature = "desktop")]
pub use desktop::run;
