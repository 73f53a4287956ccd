//! # Imagery Module
//!
//! Sources or synthesizes a product image and rehosts it.
//!
//! - `brand`: official asset, logo service and image search tiers
//! - `card`: procedural gradient card, the terminal fallback
//! - `resolver`: the tiered `resolve_product_image` pipeline

pub mod brand;
pub mod card;
pub mod resolver;

use std::fmt;

pub use brand::{BrandImageSource, ImageSearch, LogoService, OfficialAsset};
pub use card::{CardRenderer, GradientCardRenderer};
pub use resolver::{ImageResolver, ResolvedImage};

/// The pipeline tier that produced an image
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageTier {
    OfficialAsset,
    Logo,
    ImageSearch,
    /// Generated by the named provider
    Generated(String),
    Card,
}

impl fmt::Display for ImageTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageTier::OfficialAsset => f.write_str("official asset"),
            ImageTier::Logo => f.write_str("logo"),
            ImageTier::ImageSearch => f.write_str("image search"),
            ImageTier::Generated(provider) => write!(f, "generated by {provider}"),
            ImageTier::Card => f.write_str("card"),
        }
    }
}
