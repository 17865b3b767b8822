pub mod enums;
pub mod instrument;
pub mod list_filter;
pub mod timestamp;
