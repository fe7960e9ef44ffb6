//! Data models for the ISAPI client.
//!
//! This module contains the request documents and response types exchanged
//! with the device.

// Export submodules
pub mod connection;
pub mod document;
pub mod image;
pub mod security;
pub mod status;
