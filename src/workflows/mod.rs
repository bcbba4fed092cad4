pub mod query;
pub mod saver;
pub mod search;
pub mod table;
