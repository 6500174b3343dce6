pub mod reader;
pub mod sector;

pub use reader::{RawImage, SectorReader};
