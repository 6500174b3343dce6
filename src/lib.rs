//! Read-only access to ISO9660, High Sierra and CD-i volumes.
//!
//! Media is read through [`optical::SectorReader`]; [`fs::iso9660`] mounts
//! it and exposes paths, file data, status and extended attributes.

pub mod fs;
pub mod optical;
