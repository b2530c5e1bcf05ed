pub mod books;
pub mod emails;
pub mod purchases;
pub mod status;

pub use books::Entity as Books;
pub use emails::Entity as Emails;
pub use purchases::Entity as Purchases;
