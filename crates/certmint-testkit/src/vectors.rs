//! Golden test vectors for deterministic verification.
//!
//! Canonical content bytes, fingerprints and Ed25519 signatures are fixed
//! by their formats, so these values must never change. Token strings are
//! not pinned: they pass through a deflate stream whose exact bytes depend
//! on the compressor.

use chrono::NaiveDate;

use certmint_core::token::SIGN_DOMAIN;
use certmint_core::{canonical_content_bytes, fingerprint, token, Content, Keypair};

/// A fingerprint vector.
#[derive(Debug, Clone)]
pub struct FingerprintVector {
    pub body: &'static str,
    /// Expected fingerprint (hex).
    pub expected: &'static str,
}

/// All fingerprint vectors.
pub fn fingerprint_vectors() -> Vec<FingerprintVector> {
    vec![
        FingerprintVector {
            body: "",
            expected: "af1349b9f5f9a1a6",
        },
        FingerprintVector {
            body: "Certifico que {{titular}} participou em {{emissao}}",
            expected: "84c02dff25c865b9",
        },
        FingerprintVector {
            // Same body with a trailing space.
            body: "Certifico que {{titular}} participou em {{emissao}} ",
            expected: "42fd604c0ff59759",
        },
        FingerprintVector {
            body: "<p>{{titular}}</p>",
            expected: "c55e627459b05a8c",
        },
    ]
}

/// A signed content vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Seed for deterministic key generation.
    pub seed: [u8; 32],
    pub titular: &'static str,
    /// Issuance date, `YYYY-MM-DD`.
    pub emissao: &'static str,
    pub emissora: &'static str,
    pub texto: &'static str,
    /// Include the standard extension fields (see [`content_from_vector`]).
    pub with_extensions: bool,
    /// Expected canonical CBOR (hex).
    pub expected_payload: &'static str,
    /// Expected public key (hex).
    pub expected_public_key: &'static str,
    /// Expected signature over `SIGN_DOMAIN || payload` (hex).
    pub expected_signature: &'static str,
}

/// All signed content vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "reserved fields only",
            seed: [0x42; 32],
            titular: "Ana Silva",
            emissao: "2024-03-10",
            emissora: "GruPy-SP",
            texto: "Participou do evento",
            with_extensions: false,
            expected_payload: "a465746578746f7450617274696369706f7520646f206576656e746f67656d69\
                               7373616fd903ec6a323032342d30332d313067746974756c617269416e612053\
                               696c766168656d6973736f72616847727550792d5350",
            expected_public_key: "2152f8d19b791d24453242e15f2eab6cb7cffa7b6a5ed30097960e069881db12",
            expected_signature: "dfb93fc3eb33b09926e955f4c5b416ba08e4b9c0050aa51dde81f235ffd61e67\
                                 930e9393e30866b4c26e3c4edc031d2dfed6eb7dbddc88b016db8123b825090a",
        },
        GoldenVector {
            name: "every value type",
            seed: [0x42; 32],
            titular: "Ana Silva",
            emissao: "2024-03-10",
            emissora: "GruPy-SP",
            texto: "Participou do evento",
            with_extensions: true,
            expected_payload: "a8646e6f7461fb40230000000000006573616c646f39012b65746578746f7450\
                               617274696369706f7520646f206576656e746f676475726163616f0467656d69\
                               7373616fd903ec6a323032342d30332d313067746974756c617269416e612053\
                               696c766168656d6973736f72616847727550792d53506870616c6573747261d9\
                               03ec6a323032342d30332d3039",
            expected_public_key: "2152f8d19b791d24453242e15f2eab6cb7cffa7b6a5ed30097960e069881db12",
            expected_signature: "2994d0da05822e560156470c7f86b95f6087f5e48c437b044fc3c204ff69ee35\
                                 8765e295bbb39d1aba93dc1e66b1f3a2b4227d17345b968deb8788d262046b0a",
        },
        GoldenVector {
            name: "non-ascii text, zero seed",
            seed: [0x00; 32],
            titular: "João Ninguém",
            emissao: "1999-12-31",
            emissora: "PyLadies São Paulo",
            texto: "Organizou a trilha de Rust",
            with_extensions: false,
            expected_payload: "a465746578746f781a4f7267616e697a6f752061207472696c68612064652052\
                               75737467656d697373616fd903ec6a313939392d31322d333167746974756c61\
                               726e4a6fc3a36f204e696e6775c3a96d68656d6973736f72617350794c616469\
                               65732053c3a36f205061756c6f",
            expected_public_key: "3b6a27bcceb6a42d62a3a8d02a6f0d73653215771de243a63ac048a18b59da29",
            expected_signature: "0c40159b382ea64ad6ebed1d52dec057720c165d97d6cebcec09e8a122663265\
                                 330b66e9c8d5b78bc398f1a5b2003204fb6871978a0603a99c25734bad641f01",
        },
    ]
}

/// Build the content described by a vector.
///
/// The standard extensions are `duracao = 4`, `nota = 9.5`,
/// `saldo = -300` and `palestra = 2024-03-09`.
pub fn content_from_vector(vector: &GoldenVector) -> Content {
    let emissao = NaiveDate::parse_from_str(vector.emissao, "%Y-%m-%d").expect("vector date");
    let mut builder = Content::builder(vector.titular, emissao, vector.emissora, vector.texto);
    if vector.with_extensions {
        builder = builder
            .field("duracao", 4i64)
            .field("nota", 9.5f64)
            .field("saldo", -300i64)
            .field(
                "palestra",
                NaiveDate::from_ymd_opt(2024, 3, 9).expect("vector date"),
            );
    }
    builder.build().expect("vector content is valid")
}

/// Check one vector, describing the first mismatch.
pub fn verify_vector(vector: &GoldenVector) -> Result<(), String> {
    let content = content_from_vector(vector);
    let keypair = Keypair::from_seed(&vector.seed);

    let payload = canonical_content_bytes(&content);
    if hex::encode(&payload) != vector.expected_payload {
        return Err(format!(
            "{}: payload {} != {}",
            vector.name,
            hex::encode(&payload),
            vector.expected_payload
        ));
    }

    let public_key = keypair.public_key();
    if public_key.to_hex() != vector.expected_public_key {
        return Err(format!("{}: public key {}", vector.name, public_key.to_hex()));
    }

    let mut message = SIGN_DOMAIN.to_vec();
    message.extend_from_slice(&payload);
    let signature = keypair.sign(&message);
    if signature.to_hex() != vector.expected_signature {
        return Err(format!("{}: signature {}", vector.name, signature.to_hex()));
    }

    let signed = token::sign(&content, &keypair)
        .map_err(|e| format!("{}: signing failed: {}", vector.name, e))?;
    match token::verify(signed.as_str(), &public_key) {
        Ok(recovered) if recovered == content => Ok(()),
        Ok(_) => Err(format!("{}: token recovered different content", vector.name)),
        Err(e) => Err(format!("{}: token rejected: {}", vector.name, e)),
    }
}

/// Check every vector.
pub fn verify_all_vectors() -> Result<(), String> {
    for vector in fingerprint_vectors() {
        let actual = fingerprint(vector.body).to_hex();
        if actual != vector.expected {
            return Err(format!(
                "fingerprint of {:?}: {} != {}",
                vector.body, actual, vector.expected
            ));
        }
    }
    all_vectors().iter().try_for_each(verify_vector)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_vectors() {
        verify_all_vectors().unwrap();
    }

    #[test]
    fn test_vectors_have_distinct_payloads() {
        let payloads: std::collections::HashSet<_> =
            all_vectors().iter().map(|v| v.expected_payload).collect();
        assert_eq!(payloads.len(), all_vectors().len());
    }
}
