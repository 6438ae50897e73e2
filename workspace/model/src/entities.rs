//! This file serves as the root for all SeaORM entity modules.
//! The data model of the classifieds board lives here: users, the two-level
//! rubric tree, adverts with their image attachments, comments and ratings.

pub mod advert;
pub mod advert_image;
pub mod comment;
pub mod rating;
pub mod rubric;
pub mod user;

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::advert::Entity as Advert;
    pub use super::advert_image::Entity as AdvertImage;
    pub use super::comment::Entity as Comment;
    pub use super::rating::Entity as Rating;
    pub use super::rubric::Entity as Rubric;
    pub use super::user::Entity as User;
}
