pub mod http;
pub mod s3;
