pub mod seed;
pub mod seed_sql;
pub mod tables;
pub mod tmdb;
