mod digest;

pub use digest::send_digest;
