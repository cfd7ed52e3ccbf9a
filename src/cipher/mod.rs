pub(crate) mod cipher_aes_cm_hmac_sha1;

use bytes::Bytes;

use crate::error::Result;

/// Cipher is one of the SRTP-specific cipher suites behind a protection
/// profile.
///
/// The RTCP authentication tag is placed *after* the ESRTCP word
/// (Encrypted-flag and SRTCP index):
///
/// > | RTCP Header | Encrypted payload |E| SRTCP Index | Auth tag |
pub(crate) trait Cipher {
    /// Get RTP authentication tag length.
    fn rtp_auth_tag_len(&self) -> usize;

    /// Get RTCP authentication tag length.
    fn rtcp_auth_tag_len(&self) -> usize;

    /// Retrieve the SRTCP index trailing the encrypted payload.
    fn get_rtcp_index(&self, input: &[u8]) -> usize;

    /// Encrypt an RTP packet in wire form.
    fn encrypt_rtp(
        &mut self,
        plaintext: &[u8],
        header: &rtp::header::Header,
        roc: u32,
    ) -> Result<Bytes>;

    /// Authenticate and decrypt an RTP packet in wire form.
    fn decrypt_rtp(
        &mut self,
        encrypted: &[u8],
        header: &rtp::header::Header,
        roc: u32,
    ) -> Result<Bytes>;

    /// Encrypt an RTCP packet in wire form.
    fn encrypt_rtcp(&mut self, plaintext: &[u8], srtcp_index: usize, ssrc: u32) -> Result<Bytes>;

    /// Authenticate and decrypt an RTCP packet in wire form.
    fn decrypt_rtcp(&mut self, encrypted: &[u8], srtcp_index: usize, ssrc: u32) -> Result<Bytes>;
}
