pub mod access_service;
pub mod book_service;
pub mod download_service;
pub mod notification_service;
pub mod order_service;
pub mod purchase_service;
