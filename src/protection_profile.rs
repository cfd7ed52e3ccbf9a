/// ProtectionProfile specifies the cipher and authentication suite,
/// similar to a TLS cipher suite.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ProtectionProfile {
    /// AES-CM-128 with HMAC-SHA1 and an 80-bit tag, the only suite
    /// implemented here.
    #[default]
    Aes128CmHmacSha1_80 = 0x0001,
    /// AEAD AES-GCM (RFC 7714). Declared so negotiation surfaces can name
    /// it, but contexts reject it as unsupported.
    AeadAes128Gcm = 0x0007,
}

impl ProtectionProfile {
    /// Master/session encryption key length.
    pub fn key_len(&self) -> usize {
        match *self {
            ProtectionProfile::Aes128CmHmacSha1_80 | ProtectionProfile::AeadAes128Gcm => 16,
        }
    }

    /// Master/session salt length.
    pub fn salt_len(&self) -> usize {
        match *self {
            ProtectionProfile::Aes128CmHmacSha1_80 => 14,
            ProtectionProfile::AeadAes128Gcm => 12,
        }
    }

    /// Authentication tag length appended to RTP packets.
    pub fn rtp_auth_tag_len(&self) -> usize {
        match *self {
            ProtectionProfile::Aes128CmHmacSha1_80 => 10,
            ProtectionProfile::AeadAes128Gcm => 0,
        }
    }

    /// Authentication tag length appended to RTCP packets.
    pub fn rtcp_auth_tag_len(&self) -> usize {
        match *self {
            ProtectionProfile::Aes128CmHmacSha1_80 => 10,
            ProtectionProfile::AeadAes128Gcm => 0,
        }
    }

    /// Session authentication key length.
    pub fn auth_key_len(&self) -> usize {
        match *self {
            ProtectionProfile::Aes128CmHmacSha1_80 => 20,
            ProtectionProfile::AeadAes128Gcm => 0,
        }
    }
}
