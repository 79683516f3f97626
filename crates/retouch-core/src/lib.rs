pub mod collab;
pub mod config;
pub mod consts;
pub mod editor;
pub mod error;
pub mod history;
pub mod image_state;
pub mod prefs;
pub mod session;
pub mod share;
pub mod transform;
pub mod voice;
