//! Query modules for the entities stored in Redis.

pub mod quarters;
