pub mod collection;
pub mod hash;
pub mod image;
pub mod jwt;
pub mod recipe;
pub mod shopping_list;
