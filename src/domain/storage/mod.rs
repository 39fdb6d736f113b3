//! Storage domain - transactional access to the school tables

mod repository;

pub use repository::{SchoolStore, SchoolTransaction};

#[cfg(test)]
pub use repository::MockSchoolStore;
