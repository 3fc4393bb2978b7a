//! PDF layout engine.
//!
//! - `document` - page buffer, cursor and serialization through lopdf
//! - `fonts` - Helvetica metrics and text fitting
//! - `layout` - masthead, title, metadata grid, table, signature block
//! - `compositor` - signature and stamp images

pub mod compositor;
pub mod document;
pub mod fonts;
pub mod layout;

pub use compositor::{PartialAssetError, PreparedSignature, SignatureAsset, SignatureCompositor, SignerRole};
pub use document::{Color, DecodedImage, ImageHandle, PageSize, ReportDocument};
pub use fonts::Font;
pub use layout::{Masthead, SignatureBlock, TableSpec};
