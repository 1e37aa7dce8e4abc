//! Local key handling and transaction signing.
//!
//! # Security
//! - Keys arrive through the capability interface or environment variables
//! - Keys are never logged or serialized
//! - Signing is synchronous; no key material crosses an await point

use alloy::signers::k256::ecdsa::{hazmat::SignPrimitive, SigningKey};
use alloy::signers::k256::{FieldBytes, Scalar};
use sha2::{Digest, Sha256};

use crate::blockchain::types::{LedgerError, LedgerResult};

/// Environment variable holding the posting-tier key for the CLI.
pub const POSTING_KEY_ENV_VAR: &str = "BROADCAST_POSTING_KEY";

/// Environment variable holding the active-tier key for the CLI.
pub const ACTIVE_KEY_ENV_VAR: &str = "BROADCAST_ACTIVE_KEY";

/// Compact recoverable signature: recovery byte followed by r and s.
pub type CompactSignature = [u8; 65];

/// Offset added to the recovery id for compressed-key signatures.
const COMPACT_RECOVERY_OFFSET: u8 = 31;

/// Version byte of wallet-import-format keys.
const WIF_VERSION: u8 = 0x80;

/// Nonce retries before giving up on a canonical signature.
const MAX_SIGNING_ATTEMPTS: u8 = 64;

/// A secp256k1 signing key bound to one chain id.
pub struct Wallet {
    key: SigningKey,
    chain_id: [u8; 32],
}

impl Wallet {
    /// Create a wallet from a private key string.
    ///
    /// # Arguments
    /// * `private_key` - WIF (`5...`) or 64 hex characters, optional 0x prefix
    /// * `chain_id_hex` - 64 hex characters identifying the chain
    pub fn from_private_key(private_key: &str, chain_id_hex: &str) -> LedgerResult<Self> {
        let trimmed = private_key.trim();
        let hex = trimmed.strip_prefix("0x").unwrap_or(trimmed);

        let secret = if hex.len() == 64 && hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            alloy::primitives::hex::decode(hex)
                .map_err(|e| LedgerError::Wallet(format!("Invalid private key format: {}", e)))?
        } else {
            decode_wif(trimmed)?
        };

        let key = SigningKey::from_slice(&secret)
            .map_err(|e| LedgerError::Wallet(format!("Invalid private key format: {}", e)))?;
        let chain_id = decode_chain_id(chain_id_hex)?;

        Ok(Self { key, chain_id })
    }

    /// Hex-encoded compressed public key.
    pub fn public_key_hex(&self) -> String {
        let compressed = self.key.verifying_key().to_sec1_bytes();
        alloy::primitives::hex::encode(compressed)
    }

    /// Digest signed for a transaction: sha256(chain_id || bytes).
    pub fn signing_digest(&self, canonical: &[u8]) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.chain_id);
        hasher.update(canonical);
        hasher.finalize().into()
    }

    /// Sign canonical transaction bytes.
    ///
    /// Nodes reject signatures whose r or s would need a leading zero or
    /// sign byte, so the nonce is re-derived with extra entropy until the
    /// result is canonical.
    pub fn sign(&self, canonical: &[u8]) -> LedgerResult<CompactSignature> {
        let digest = self.signing_digest(canonical);
        let z = FieldBytes::from(digest);
        let secret: &Scalar = self.key.as_nonzero_scalar();

        for attempt in 0..MAX_SIGNING_ATTEMPTS {
            let extra: Vec<u8> = if attempt == 0 {
                Vec::new()
            } else {
                Sha256::new()
                    .chain_update(digest)
                    .chain_update([attempt])
                    .finalize()
                    .to_vec()
            };

            let (signature, recovery) = secret
                .try_sign_prehashed_rfc6979::<Sha256>(&z, &extra)
                .map_err(|e| LedgerError::Wallet(format!("Signing failed: {}", e)))?;
            let recovery = recovery
                .ok_or_else(|| LedgerError::Wallet("Signing failed: no recovery id".into()))?;

            let mut compact = [0u8; 65];
            compact[0] = COMPACT_RECOVERY_OFFSET + recovery.to_byte();
            compact[1..].copy_from_slice(&signature.to_bytes());
            if is_canonical(&compact) {
                return Ok(compact);
            }
            tracing::trace!(attempt, "Non-canonical signature, retrying");
        }

        Err(LedgerError::Wallet("Signing failed: no canonical signature".into()))
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("public_key", &self.public_key_hex())
            .finish_non_exhaustive()
    }
}

/// True when neither r nor s carries a high bit or a redundant zero byte.
pub fn is_canonical(signature: &CompactSignature) -> bool {
    let c = signature;
    c[1] & 0x80 == 0
        && !(c[1] == 0 && c[2] & 0x80 == 0)
        && c[33] & 0x80 == 0
        && !(c[33] == 0 && c[34] & 0x80 == 0)
}

/// Secret bytes of a base58check WIF key. A trailing compression flag is
/// accepted and dropped.
fn decode_wif(wif: &str) -> LedgerResult<Vec<u8>> {
    let raw = bs58::decode(wif)
        .with_check(Some(WIF_VERSION))
        .into_vec()
        .map_err(|e| LedgerError::Wallet(format!("Invalid private key format: {}", e)))?;

    match raw.as_slice() {
        [WIF_VERSION, secret @ ..] if secret.len() == 32 => Ok(secret.to_vec()),
        [WIF_VERSION, secret @ .., 0x01] if secret.len() == 32 => Ok(secret.to_vec()),
        _ => Err(LedgerError::Wallet(
            "Invalid private key format: unexpected WIF length".to_string(),
        )),
    }
}

fn decode_chain_id(chain_id_hex: &str) -> LedgerResult<[u8; 32]> {
    let bytes = alloy::primitives::hex::decode(chain_id_hex)
        .map_err(|e| LedgerError::Wallet(format!("Invalid chain id: {}", e)))?;
    bytes
        .try_into()
        .map_err(|_| LedgerError::Wallet("Invalid chain id: expected 32 bytes".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::MAINNET_CHAIN_ID;

    // Well-known development key
    const TEST_PRIVATE_KEY: &str =
        "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    // Bitcoin wiki WIF example and the key it encodes
    const WIF_HEX: &str = "0C28FCA386C7A227600B2FE50B7CAE11EC86D3BF1FBE471BE89827E19D72AA1D";
    const WIF: &str = "5HueCGU8rMjxEXxiPuD5BDku4MkFqeZyd4dZ1jvhTVqvbTLvyTJ";

    #[test]
    fn test_wallet_from_private_key() {
        let wallet = Wallet::from_private_key(TEST_PRIVATE_KEY, MAINNET_CHAIN_ID).unwrap();
        let public = wallet.public_key_hex();
        assert_eq!(public.len(), 66);
        assert!(public.starts_with("02") || public.starts_with("03"));
    }

    #[test]
    fn test_wallet_with_0x_prefix() {
        let prefixed = format!("0x{}", TEST_PRIVATE_KEY);
        let a = Wallet::from_private_key(&prefixed, MAINNET_CHAIN_ID).unwrap();
        let b = Wallet::from_private_key(TEST_PRIVATE_KEY, MAINNET_CHAIN_ID).unwrap();
        assert_eq!(a.public_key_hex(), b.public_key_hex());
    }

    #[test]
    fn test_wif_matches_hex() {
        let from_wif = Wallet::from_private_key(WIF, MAINNET_CHAIN_ID).unwrap();
        let from_hex = Wallet::from_private_key(WIF_HEX, MAINNET_CHAIN_ID).unwrap();
        assert_eq!(from_wif.public_key_hex(), from_hex.public_key_hex());
    }

    #[test]
    fn test_wif_bad_checksum() {
        let mut corrupted = WIF.to_string();
        corrupted.pop();
        corrupted.push('K');
        let result = Wallet::from_private_key(&corrupted, MAINNET_CHAIN_ID);
        assert!(result.unwrap_err().to_string().contains("Invalid private key"));
    }

    #[test]
    fn test_invalid_private_key() {
        let result = Wallet::from_private_key("invalid_key", MAINNET_CHAIN_ID);
        assert!(result.unwrap_err().to_string().contains("Invalid private key"));
    }

    #[test]
    fn test_invalid_chain_id() {
        let result = Wallet::from_private_key(TEST_PRIVATE_KEY, "beef");
        assert!(result.unwrap_err().to_string().contains("Invalid chain id"));
    }

    #[test]
    fn test_digest_depends_on_chain() {
        let main = Wallet::from_private_key(TEST_PRIVATE_KEY, MAINNET_CHAIN_ID).unwrap();
        let other = Wallet::from_private_key(TEST_PRIVATE_KEY, &"00".repeat(32)).unwrap();
        assert_ne!(main.signing_digest(b"tx"), other.signing_digest(b"tx"));
    }

    #[test]
    fn test_signature_is_compact_and_deterministic() {
        let wallet = Wallet::from_private_key(TEST_PRIVATE_KEY, MAINNET_CHAIN_ID).unwrap();
        let first = wallet.sign(b"\x01\x02\x03").unwrap();
        let second = wallet.sign(b"\x01\x02\x03").unwrap();
        assert_eq!(first, second);
        assert!((31..=34).contains(&first[0]));
    }

    #[test]
    fn test_signatures_are_canonical() {
        let wallet = Wallet::from_private_key(WIF, MAINNET_CHAIN_ID).unwrap();
        for i in 0u32..200 {
            let signature = wallet.sign(&i.to_le_bytes()).unwrap();
            assert!(is_canonical(&signature), "message {i}");
        }
    }

    #[test]
    fn test_is_canonical_rejects_padding_and_high_bits() {
        let mut sig = [0x11u8; 65];
        assert!(is_canonical(&sig));

        sig[1] = 0x80;
        assert!(!is_canonical(&sig));

        sig[1] = 0x00;
        sig[2] = 0x10;
        assert!(!is_canonical(&sig));

        sig[2] = 0x80;
        assert!(is_canonical(&sig));

        sig[33] = 0xff;
        assert!(!is_canonical(&sig));
    }

    #[test]
    fn test_debug_hides_key() {
        let wallet = Wallet::from_private_key(TEST_PRIVATE_KEY, MAINNET_CHAIN_ID).unwrap();
        let debug = format!("{:?}", wallet);
        assert!(!debug.contains(TEST_PRIVATE_KEY));
    }
}
