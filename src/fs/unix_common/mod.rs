//! Shared helpers for Unix-style metadata carried by filesystems.

pub mod inode;
