mod repository;
mod schema;
mod unit_of_work;

pub use repository::Repository;
