pub mod init;
pub mod lifecycle;
pub mod scale;
pub mod status;
