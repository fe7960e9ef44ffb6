//! # isapi-client
//!
//! An async client for the ISAPI HTTP interface of IP cameras.
//!
//! Every request is authenticated with HTTP Digest and the client keeps no
//! device state between calls, so one client can be cloned freely and
//! several clients can talk to different cameras at the same time.
//!
//! ## Features
//!
//! - Digest authentication (MD5, SHA-256 and SHA-512 families, `-sess`,
//!   `auth` and `auth-int`), answering the first challenge it supports
//! - Image settings: color, sharpness, gain, white balance, shutter,
//!   IR-cut filter, lens correction, stabilization and exposure
//! - Write verification against each endpoint's status convention
//! - Option discovery from the camera's channel document
//! - Server certificate listing, upload and deletion
//! - JPEG snapshots and snapshot rate measurement
//!
//! ## Example
//!
//! ```rust,no_run
//! use isapi_client::{ExposureMode, IsapiClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = IsapiClient::builder()
//!         .host("192.168.1.64")
//!         .username("admin")
//!         .password_from_env("CAMERA_PASSWORD")?
//!         .build()?;
//!
//!     if !client.check_connection().await?.is_authenticated() {
//!         return Err("camera rejected the credentials".into());
//!     }
//!
//!     let image = client.image();
//!     image.set_color(1).brightness(60).contrast(50).send().await?;
//!     image.set_exposure(1, ExposureMode::PIrisManual { iris_level: None }).await?;
//!
//!     let levels = image.shutter_levels("channels.xml").await?;
//!     println!("supported shutter levels: {levels:?}");
//!
//!     Ok(())
//! }
//! ```

mod api;
mod client;
mod digest;
mod error;
mod models;
mod xml;

pub use api::certificates::{CertificateHandler, UploadCertificateBuilder};
pub use api::image::{ImageAdjustmentBuilder, ImageHandler, SetColorBuilder, WhiteBalanceBuilder};
pub use api::security::SecurityHandler;
pub use api::streaming::StreamingHandler;
pub use api::system::SystemHandler;
pub use client::{IsapiClient, IsapiClientBuilder, Scheme, TlsVerification, DEFAULT_TIMEOUT};
pub use error::{FailureClass, IsapiError, IsapiResult, UrlParseError};
pub use models::connection::ConnectionStatus;
pub use models::document::{
    Field, FieldValue, ParameterDocument, ISAPI_NAMESPACE, VENDOR_NAMESPACE,
};
pub use models::image::{ExposureMode, IrcutFilterType, SnapshotRate, DEFAULT_IRIS_LEVEL};
pub use models::security::{CertificateInfo, Payload};
pub use models::status::{ResponseStatus, StatusConvention};
pub use xml::{pretty_print, XmlDocument};
