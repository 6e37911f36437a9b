use rand::rngs::OsRng;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey, ecdsa::Signature};
use sha2::{Digest, Sha256};

use crate::error::{ChainError, Result};

/// Hex SHA-256 of arbitrary bytes.
pub fn hash_hex(bytes: &[u8]) -> String {
    hex::encode(sha256(bytes))
}

pub fn sha256(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

/// Derive address (hex of compressed pubkey) from a given hex pubkey.
/// Returns normalized hex (lowercase) if valid.
pub fn pubkey_to_address_hex(pubkey_hex: &str) -> Result<String> {
    let bytes = hex::decode(pubkey_hex).map_err(|_| crypto("invalid pubkey hex"))?;
    let pk = PublicKey::from_slice(&bytes).map_err(|_| crypto("invalid pubkey bytes"))?;
    Ok(hex::encode(pk.serialize()))
}

/// Verify a hex DER signature over `sha256(payload)` against a hex compressed pubkey.
pub fn verify_signature_hex(pubkey_hex: &str, sig_hex: &str, payload: &[u8]) -> Result<bool> {
    let secp = Secp256k1::verification_only();

    let sig_bytes = hex::decode(sig_hex).map_err(|_| crypto("invalid signature hex"))?;
    let sig = Signature::from_der(&sig_bytes).map_err(|_| crypto("invalid DER signature"))?;

    let pk_bytes = hex::decode(pubkey_hex).map_err(|_| crypto("invalid pubkey hex"))?;
    let pk = PublicKey::from_slice(&pk_bytes).map_err(|_| crypto("invalid pubkey bytes"))?;

    let msg = Message::from_digest(sha256(payload));
    Ok(secp.verify_ecdsa(&msg, &sig, &pk).is_ok())
}

/// Verification that folds malformed encodings into `InvalidSignature`.
pub fn check_signature(pubkey_hex: &str, sig_hex: &str, payload: &[u8]) -> Result<()> {
    match verify_signature_hex(pubkey_hex, sig_hex, payload) {
        Ok(true) => Ok(()),
        Ok(false) | Err(_) => Err(ChainError::InvalidSignature),
    }
}

/// Signing identity of a node or a wallet user.
#[derive(Clone)]
pub struct KeyPair {
    secret: SecretKey,
    address: String,
}

impl KeyPair {
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let (secret, public) = secp.generate_keypair(&mut OsRng);
        Self {
            secret,
            address: hex::encode(public.serialize()),
        }
    }

    pub fn from_secret_hex(secret_hex: &str) -> Result<Self> {
        let bytes = hex::decode(secret_hex.trim()).map_err(|_| crypto("invalid private key hex"))?;
        let secret = SecretKey::from_slice(&bytes).map_err(|_| crypto("invalid private key bytes"))?;
        let secp = Secp256k1::signing_only();
        let public = PublicKey::from_secret_key(&secp, &secret);
        Ok(Self {
            secret,
            address: hex::encode(public.serialize()),
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn secret_hex(&self) -> String {
        hex::encode(self.secret.secret_bytes())
    }

    /// Hex DER signature over `sha256(payload)`.
    pub fn sign(&self, payload: &[u8]) -> String {
        let secp = Secp256k1::signing_only();
        let msg = Message::from_digest(sha256(payload));
        let sig = secp.sign_ecdsa(&msg, &self.secret);
        hex::encode(sig.serialize_der().to_vec())
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

fn crypto(msg: &str) -> ChainError {
    ChainError::Crypto(msg.to_string())
}
