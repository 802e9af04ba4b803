//! SeaORM entity definitions

pub mod user;

pub use user::{ActiveModel as UserActiveModel, Entity as UserEntity, Model as UserModel};
