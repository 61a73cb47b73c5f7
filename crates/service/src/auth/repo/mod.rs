pub mod file;

pub use file::FileIdentityRepository;
