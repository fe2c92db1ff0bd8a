pub mod opensubtitles;
pub mod xmlrpc;
