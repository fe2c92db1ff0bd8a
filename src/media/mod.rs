pub mod checksum;
pub mod encoding;
