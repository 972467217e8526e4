//! 随机密钥材料生成
//!
//! 全部使用操作系统提供的加密随机源（`OsRng`），生成的值不得写入日志

use base64::{engine::general_purpose::STANDARD, Engine};
use rand::rngs::OsRng;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use serde::Serialize;

use crate::config::env::constants::DB_PASSWORD_LEN;

const LOWER: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const UPPER: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";
const SYMBOLS: &[u8] = b"$&+:;=?@#|'<>-^*()%!,.";

const AES_GCM_TYPE_URL: &str = "type.googleapis.com/google.crypto.tink.AesGcmKey";
const AES256_KEY_LEN: usize = 32;

/// 每个进程只生成一次的密钥
#[derive(Clone)]
pub struct GeneratedSecrets {
    /// JWT 签名密钥（base64 编码的 256 位随机值）
    pub jwt_private_key: String,
    /// 数据库密码
    pub db_password: String,
}

impl GeneratedSecrets {
    pub fn generate() -> Self {
        Self {
            jwt_private_key: generate_signing_key(),
            db_password: generate_password(DB_PASSWORD_LEN),
        }
    }
}

impl std::fmt::Debug for GeneratedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratedSecrets").finish_non_exhaustive()
    }
}

/// base64 编码的 32 字节随机值
pub fn generate_signing_key() -> String {
    let mut secret = [0u8; 32];
    OsRng.fill_bytes(&mut secret);
    STANDARD.encode(secret)
}

/// 生成密码：小写、大写、数字、符号各至少一个，其余从全集中随机选取后打乱
pub fn generate_password(len: usize) -> String {
    let mut rng = OsRng;
    let all: Vec<u8> = [LOWER, UPPER, DIGITS, SYMBOLS].concat();

    let mut chars: Vec<u8> = [LOWER, UPPER, DIGITS, SYMBOLS]
        .iter()
        .filter_map(|class| class.choose(&mut rng).copied())
        .collect();
    while chars.len() < len {
        if let Some(c) = all.choose(&mut rng) {
            chars.push(*c);
        }
    }

    for _ in 0..3 {
        chars.shuffle(&mut rng);
    }
    chars.into_iter().map(char::from).collect()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Keyset {
    primary_key_id: u32,
    key: Vec<KeysetKey>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct KeysetKey {
    key_data: KeyData,
    status: &'static str,
    key_id: u32,
    output_prefix_type: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct KeyData {
    type_url: &'static str,
    value: String,
    key_material_type: &'static str,
}

/// 生成 AES256-GCM 明文 keyset（Tink JSON 格式），返回其 base64 编码
///
/// key id 固定落在十位数区间内，保证同类 keyset 的序列化长度一致
pub fn generate_keyset_handle() -> Result<String, serde_json::Error> {
    let mut rng = OsRng;
    let key_id: u32 = rng.gen_range(0x4000_0000..=0x7FFF_FFFF);

    let mut key_value = [0u8; AES256_KEY_LEN];
    rng.fill_bytes(&mut key_value);

    // AesGcmKey { version = 0, key_value = 3 }，version 为默认值不写出
    let mut proto = Vec::with_capacity(AES256_KEY_LEN + 2);
    proto.push(0x1a);
    proto.push(AES256_KEY_LEN as u8);
    proto.extend_from_slice(&key_value);

    let keyset = Keyset {
        primary_key_id: key_id,
        key: vec![KeysetKey {
            key_data: KeyData {
                type_url: AES_GCM_TYPE_URL,
                value: STANDARD.encode(&proto),
                key_material_type: "SYMMETRIC",
            },
            status: "ENABLED",
            key_id,
            output_prefix_type: "TINK",
        }],
    };

    Ok(STANDARD.encode(serde_json::to_vec(&keyset)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signing_key_is_256_bits() {
        let key = generate_signing_key();
        let decoded = STANDARD.decode(&key).unwrap();
        assert_eq!(decoded.len(), 32);
        assert_ne!(key, generate_signing_key());
    }

    #[test]
    fn test_password_contains_every_class() {
        for _ in 0..50 {
            let password = generate_password(12);
            assert_eq!(password.len(), 12);
            assert!(password.bytes().any(|b| LOWER.contains(&b)));
            assert!(password.bytes().any(|b| UPPER.contains(&b)));
            assert!(password.bytes().any(|b| DIGITS.contains(&b)));
            assert!(password.bytes().any(|b| SYMBOLS.contains(&b)));
        }
    }

    #[test]
    fn test_keyset_handle_structure() {
        let handle = generate_keyset_handle().unwrap();
        let json: serde_json::Value =
            serde_json::from_slice(&STANDARD.decode(&handle).unwrap()).unwrap();

        let key = &json["key"][0];
        assert_eq!(json["primaryKeyId"], key["keyId"]);
        assert_eq!(key["keyData"]["typeUrl"], AES_GCM_TYPE_URL);
        assert_eq!(key["status"], "ENABLED");

        let value = STANDARD
            .decode(key["keyData"]["value"].as_str().unwrap())
            .unwrap();
        assert_eq!(value.len(), 34);
        assert_eq!(&value[..2], &[0x1a, 0x20]);
    }

    #[test]
    fn test_keyset_handle_length_is_stable() {
        let first = generate_keyset_handle().unwrap();
        for _ in 0..20 {
            let next = generate_keyset_handle().unwrap();
            assert_eq!(first.len(), next.len());
            assert_ne!(first, next);
        }
    }
}
