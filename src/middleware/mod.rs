pub mod cors;
pub mod init_data;
pub mod rate_limit;
