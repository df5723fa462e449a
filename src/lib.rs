pub mod archive;
pub mod build;
pub mod checksum;
pub mod cleanup;
pub mod deps;
pub mod download;
pub mod formula;
pub mod http;
pub mod install;
pub mod runtime;
