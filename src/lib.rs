//! Przeglądarka roślin regulowanych: mapa kartogramu, tabela gatunków
//! dla wybranego regionu, wyszukiwarka gatunków i eksport do PDF.

pub mod api;
pub mod colors;
pub mod config;
pub mod controller;
pub mod data;
pub mod error;
pub mod fetcher;
pub mod filters;
pub mod map_draw;
pub mod pdf;
pub mod region;
pub mod report;
pub mod species;
pub mod state;
pub mod ui;

pub use error::{AtlasError, Result};
