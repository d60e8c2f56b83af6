pub mod csv_loader;
pub mod schema_loader;

pub use csv_loader::{load_assigned_papers, parse_assignments};
pub use schema_loader::{load_schema, parse_schema};
