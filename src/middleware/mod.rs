pub mod download_token;
pub mod json_body;
