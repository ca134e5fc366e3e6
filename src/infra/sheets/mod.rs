// Google Sheets infra layer.
// - `sheets_client.rs` appends rows using service-account OAuth2.

#[path = "sheets_client.rs"]
pub mod sheets_client;
