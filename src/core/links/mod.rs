// Link-logging business logic.
// - `link_models.rs` holds the data types shared with the adapters.
// - `link_service.rs` runs the per-message pipeline.
// - `url_detector.rs` finds URLs in free chat text.

#[path = "link_models.rs"]
pub mod link_models;

#[path = "link_service.rs"]
pub mod link_service;

#[path = "url_detector.rs"]
pub mod url_detector;

pub use link_models::{AuthPolicy, ChatEvent, SpreadsheetRow, StreamSnapshot, UserRole};
pub use link_service::{
    LinkError, LinkService, LinkSink, StreamInfoError, StreamInfoSource, WriteError,
};
