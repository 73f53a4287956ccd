pub mod bot;
pub mod config;
pub mod db;
pub mod dialogue;
pub mod enrich;
pub mod errors;
pub mod evidence;
pub mod fallback;
pub mod http;
pub mod imagery;
pub mod localization;
pub mod product;
pub mod providers;
pub mod storage;
pub mod text_processing;
