pub mod rename;
pub mod upload;
