//! GeoPublish: publish spatial datasets to map-server catalogs.
//!
//! The crate wraps two remote services behind blocking, envelope-returning
//! clients:
//!
//! - [`geoserver::GeoServerEngine`] talks to a GeoServer-style catalog REST
//!   API: workspaces, stores, feature types, coverages, styles, layer
//!   groups, and the GeoWebCache tile-cache endpoints. The interesting
//!   parts are the coverage preparation pipeline (zip repackaging and
//!   GRASS grid header rewriting), the idempotent publish protocol with
//!   bounded retries and "already exists" recovery, and the tile-cache
//!   synchronization state machine.
//! - [`ckan::CkanEngine`] talks to a CKAN-style dataset registry action
//!   API: dataset/resource CRUD, search, and file upload.
//!
//! Remote operations return an [`Envelope`]: `{"success": true,
//! "result": …}` or `{"success": false, "error": "…"}`, so callers
//! embedding the library in web services can pass responses straight
//! through. Transport failures and invalid arguments surface as `Err`
//! values instead, and downloads return the written paths directly; see
//! the module documentation for the split.
//!
//! All HTTP goes through the [`http::HttpClient`] trait, so engines are
//! generic over the transport and fully testable without a live server.

pub mod ckan;
pub mod envelope;
pub mod geoserver;
pub mod http;
pub mod identifier;
pub mod retry;
pub mod xmlutil;

pub use envelope::Envelope;
pub use http::{HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestClient};
pub use identifier::Identifier;
