pub mod index;
pub mod projects;
pub mod serve;
pub mod sessions;
