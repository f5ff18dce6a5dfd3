pub mod djinni;

pub use djinni::types::Job;
