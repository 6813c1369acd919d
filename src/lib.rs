//! Terminal choropleth of COVID-19 cases per Brazilian municipality.
//!
//! Case counts come from the Brasil.IO `covid19` dataset, municipality
//! boundaries from per-state GeoJSON files. The map is drawn with braille
//! outlines over cell-colored fills.

pub mod app;
pub mod braille;
pub mod config;
pub mod data;
pub mod error;
pub mod loader;
pub mod map;
pub mod panel;
pub mod scale;
pub mod uf;
pub mod ui;

pub use app::{App, Interaction, Phase};
pub use config::{Cli, Config};
pub use error::FetchError;
pub use uf::StateCode;
