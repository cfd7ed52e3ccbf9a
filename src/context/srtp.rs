use bytes::Bytes;
use util::marshal::*;

use super::*;

impl Context {
    pub fn decrypt_rtp_with_header(
        &mut self,
        encrypted: &[u8],
        header: &rtp::header::Header,
    ) -> Result<Bytes> {
        let roc = {
            let state = self.get_srtp_ssrc_state(header.ssrc);
            let roc = state.next_rollover_count(header.sequence_number);
            let index = (u64::from(roc) << 16) | u64::from(header.sequence_number);

            match state.replay_detector.check(index) {
                ReplayCheck::Ok => {}
                ReplayCheck::Duplicate => {
                    return Err(Error::SrtpSsrcDuplicated(header.ssrc, index));
                }
                ReplayCheck::TooOld => {
                    return Err(Error::SrtpSsrcTooOld(header.ssrc, index));
                }
            }

            roc
        };

        let dst = self.cipher.decrypt_rtp(encrypted, header, roc)?;

        // Only now that the tag has verified may any state move.
        {
            let state = self.get_srtp_ssrc_state(header.ssrc);
            state.replay_detector.accept();
            state.update_rollover_count(header.sequence_number, roc);
        }

        Ok(dst)
    }

    /// decrypt_rtp authenticates and decrypts an RTP packet in wire form.
    pub fn decrypt_rtp(&mut self, encrypted: &[u8]) -> Result<Bytes> {
        let mut buf = encrypted;
        let header = rtp::header::Header::unmarshal(&mut buf)?;
        self.decrypt_rtp_with_header(encrypted, &header)
    }

    pub fn encrypt_rtp_with_header(
        &mut self,
        plaintext: &[u8],
        header: &rtp::header::Header,
    ) -> Result<Bytes> {
        let roc = self
            .get_srtp_ssrc_state(header.ssrc)
            .next_rollover_count(header.sequence_number);

        let dst = self.cipher.encrypt_rtp(plaintext, header, roc)?;

        self.get_srtp_ssrc_state(header.ssrc)
            .update_rollover_count(header.sequence_number, roc);

        Ok(dst)
    }

    /// encrypt_rtp encrypts a marshalled RTP packet, appending the auth tag.
    /// Output length = input length + the profile's tag length.
    pub fn encrypt_rtp(&mut self, plaintext: &[u8]) -> Result<Bytes> {
        let mut buf = plaintext;
        let header = rtp::header::Header::unmarshal(&mut buf)?;
        self.encrypt_rtp_with_header(plaintext, &header)
    }
}
