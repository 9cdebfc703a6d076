/// Wallet signature verification
///
/// Recovers the signer of an EIP-191 personal message
/// (`"\x19Ethereum Signed Message:\n" + len(message) + message`, Keccak-256)
/// and compares the derived account address with the claimed one.
///
/// Every failure path returns `false`; nothing here returns an error.
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use sha3::{Digest, Keccak256};
use tracing::debug;

const PERSONAL_MESSAGE_PREFIX: &str = "\x19Ethereum Signed Message:\n";

/// 64-byte (r, s) signature followed by a 1-byte recovery id
pub const SIGNATURE_LENGTH: usize = 65;

/// Digest the wallet actually signed for `message`
pub fn personal_message_digest(message: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(PERSONAL_MESSAGE_PREFIX.as_bytes());
    hasher.update(message.len().to_string().as_bytes());
    hasher.update(message);
    hasher.finalize().into()
}

/// Lowercase `0x`-prefixed account address for a public key
pub fn address_of(key: &VerifyingKey) -> String {
    let point = key.to_encoded_point(false);
    // Skip the 0x04 SEC1 tag; the address is the last 20 bytes of the hash.
    let hash = Keccak256::digest(&point.as_bytes()[1..]);
    format!("0x{}", hex::encode(&hash[12..]))
}

/// Recover the signer address of `signed_message`, if the signature is well formed.
pub fn recover_address(signed_message: &str, signature: &str) -> Option<String> {
    let trimmed = signature.trim();
    let encoded = trimmed.strip_prefix("0x").unwrap_or(trimmed);

    let bytes = match hex::decode(encoded) {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!(error = %e, "Failed to decode signature");
            return None;
        }
    };

    if bytes.len() != SIGNATURE_LENGTH {
        debug!(length = bytes.len(), "Invalid signature length");
        return None;
    }

    // Legacy encoding carries v as 27/28.
    let v = match bytes[64] {
        v @ (27 | 28) => v - 27,
        v => v,
    };
    let mut recovery_id = RecoveryId::from_byte(v)?;

    let mut sig = Signature::from_slice(&bytes[..64]).ok()?;
    // Negating s flips the parity of the recovered point's y coordinate.
    if let Some(normalized) = sig.normalize_s() {
        sig = normalized;
        recovery_id = RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced());
    }

    let digest = personal_message_digest(signed_message.as_bytes());
    match VerifyingKey::recover_from_prehash(&digest, &sig, recovery_id) {
        Ok(key) => Some(address_of(&key)),
        Err(e) => {
            debug!(error = %e, "Failed to recover public key");
            None
        }
    }
}

/// Check that `signature` over `signed_message` was produced by `claimed_address`.
pub fn verify_signature(signed_message: &str, signature: &str, claimed_address: &str) -> bool {
    let Some(recovered) = recover_address(signed_message, signature) else {
        return false;
    };

    let valid = recovered.eq_ignore_ascii_case(claimed_address.trim());
    debug!(recovered = %recovered, valid, "Signature checked");
    valid
}

/// Produce a `0x`-prefixed 65-byte personal-message signature (v = 27/28).
pub fn sign_personal_message(key: &SigningKey, message: &str) -> Option<String> {
    let digest = personal_message_digest(message.as_bytes());
    let (sig, recovery_id) = key.sign_prehash_recoverable(&digest).ok()?;

    let mut bytes = sig.to_bytes().to_vec();
    bytes.push(recovery_id.to_byte() + 27);
    Some(format!("0x{}", hex::encode(bytes)))
}
