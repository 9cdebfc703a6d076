/// Security primitives for playback-access-service
///
/// - **signature**: wallet personal-message signature recovery (secp256k1 / Keccak-256)
pub mod signature;

pub use signature::{recover_address, verify_signature};
