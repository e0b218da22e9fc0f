//! Per-dataset transforms plus the calendar dimension.

pub mod categories;
pub mod crime;
pub mod date_dim;
pub mod date_parser;
pub mod district;
pub mod population;

pub use categories::{CategoryRegistry, UNMAPPED_CATEGORY_ID};
pub use crime::{CrimeLoad, CATEGORY_TABLE, CRIME_TABLE};
pub use date_dim::DATE_TABLE;
pub use district::DISTRICT_TABLE;
pub use population::{CITY_POPULATION_TABLE, DISTRICT_POPULATION_TABLE};
