pub mod db_utils;
pub mod employee_cache;
pub mod gallery;
