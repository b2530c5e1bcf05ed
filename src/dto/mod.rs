pub mod books;
pub mod orders;
pub mod purchases;
