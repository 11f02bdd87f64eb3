// Gantry Infra: file-backed limit configuration

pub mod limit_source;

pub use limit_source::FileLimitSource;
