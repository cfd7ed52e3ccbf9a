use bytes::Bytes;
use util::marshal::*;

use super::*;
use crate::key_derivation::SRTCP_INDEX_SIZE;

impl Context {
    /// decrypt_rtcp authenticates and decrypts an SRTCP packet in wire form.
    /// The index used for the keystream and for replay placement is the one
    /// the packet itself carries.
    pub fn decrypt_rtcp(&mut self, encrypted: &[u8]) -> Result<Bytes> {
        let mut buf = encrypted;
        rtcp::header::Header::unmarshal(&mut buf)?;

        let min_len = rtcp::header::HEADER_LENGTH
            + rtcp::header::SSRC_LENGTH
            + SRTCP_INDEX_SIZE
            + self.cipher.rtcp_auth_tag_len();
        if encrypted.len() < min_len {
            return Err(Error::SrtcpTooSmall(encrypted.len(), min_len));
        }

        let index = self.cipher.get_rtcp_index(encrypted);
        let ssrc = u32::from_be_bytes([encrypted[4], encrypted[5], encrypted[6], encrypted[7]]);

        {
            let state = self.get_srtcp_ssrc_state(ssrc);
            match state.replay_detector.check(index as u64) {
                ReplayCheck::Ok => {}
                ReplayCheck::Duplicate => return Err(Error::SrtcpSsrcDuplicated(ssrc, index)),
                ReplayCheck::TooOld => return Err(Error::SrtcpSsrcTooOld(ssrc, index)),
            }
        }

        let dst = self.cipher.decrypt_rtcp(encrypted, index, ssrc)?;

        self.get_srtcp_ssrc_state(ssrc).replay_detector.accept();

        Ok(dst)
    }

    /// encrypt_rtcp encrypts a marshalled RTCP packet, appending the ESRTCP
    /// word (E-bit and index) and the auth tag.
    pub fn encrypt_rtcp(&mut self, plaintext: &[u8]) -> Result<Bytes> {
        let mut buf = plaintext;
        rtcp::header::Header::unmarshal(&mut buf)?;

        let min_len = rtcp::header::HEADER_LENGTH + rtcp::header::SSRC_LENGTH;
        if plaintext.len() < min_len {
            return Err(Error::SrtcpTooSmall(plaintext.len(), min_len));
        }

        let ssrc = u32::from_be_bytes([plaintext[4], plaintext[5], plaintext[6], plaintext[7]]);

        let index = self.get_srtcp_ssrc_state(ssrc).next_srtcp_index()?;

        self.cipher.encrypt_rtcp(plaintext, index, ssrc)
    }
}
