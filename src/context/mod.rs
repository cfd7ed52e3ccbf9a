
use std::collections::HashMap;

use crate::cipher::cipher_aes_cm_hmac_sha1::CipherAesCmHmacSha1;
use crate::cipher::Cipher;
use crate::error::{Error, Result};
use crate::option::*;
use crate::protection_profile::ProtectionProfile;
use crate::replay_detector::*;

pub mod srtcp;
pub mod srtp;

/// Largest 48-bit packet index (rollover counter ∥ sequence number).
pub(crate) const MAX_SRTP_PACKET_INDEX: u64 = (1 << 48) - 1;

/// Largest usable SRTCP index; the wire MSB carries the E-bit.
pub(crate) const MAX_SRTCP_INDEX: usize = 0x7FFF_FFFF;

const SEQ_NUM_MEDIAN: i32 = 1 << 15;

/// Encrypt/decrypt state for a single SRTP SSRC.
pub(crate) struct SrtpSsrcState {
    ssrc: u32,
    rollover_counter: u32,
    rollover_has_processed: bool,
    highest_sequence_number: u16,
    replay_detector: Box<dyn ReplayDetector + Send + 'static>,
}

/// Encrypt/decrypt state for a single SRTCP SSRC.
pub(crate) struct SrtcpSsrcState {
    ssrc: u32,
    srtcp_index: usize,
    replay_detector: Box<dyn ReplayDetector + Send + 'static>,
}

impl SrtpSsrcState {
    /// Guess the rollover counter a sequence number belongs to, without
    /// committing it (RFC 3550 Appendix A.1 / RFC 3711 §3.3.1).
    ///
    /// A sequence more than half the number space behind the highest seen
    /// one is assumed to be ahead of a wrap; more than half ahead, behind
    /// one. Nothing precedes the very first rollover, so the counter never
    /// underflows below its starting value of zero.
    pub fn next_rollover_count(&self, sequence_number: u16) -> u32 {
        if !self.rollover_has_processed {
            return self.rollover_counter;
        }

        let seq = i32::from(sequence_number);
        let highest = i32::from(self.highest_sequence_number);

        if highest < SEQ_NUM_MEDIAN {
            if seq - highest > SEQ_NUM_MEDIAN && self.rollover_counter > 0 {
                return self.rollover_counter - 1;
            }
        } else if highest - SEQ_NUM_MEDIAN > seq {
            return self.rollover_counter.wrapping_add(1);
        }

        self.rollover_counter
    }

    /// Commit a guessed rollover counter once the packet has authenticated.
    /// The counter advances exactly once per 16-bit wrap; guesses for a
    /// previous rollover leave the state untouched.
    pub fn update_rollover_count(&mut self, sequence_number: u16, guessed_roc: u32) {
        if !self.rollover_has_processed {
            self.rollover_has_processed = true;
            self.highest_sequence_number = sequence_number;
            return;
        }

        if guessed_roc == self.rollover_counter.wrapping_add(1) {
            self.rollover_counter = guessed_roc;
            self.highest_sequence_number = sequence_number;
        } else if guessed_roc == self.rollover_counter
            && sequence_number > self.highest_sequence_number
        {
            self.highest_sequence_number = sequence_number;
        }
    }
}

impl SrtcpSsrcState {
    /// Advance the 31-bit index for the next outbound packet; the first
    /// packet carries index 1. The index is embedded in the wire image and
    /// must never wrap, so exhaustion is fatal for the SSRC.
    pub fn next_srtcp_index(&mut self) -> Result<usize> {
        if self.srtcp_index >= MAX_SRTCP_INDEX {
            return Err(Error::SrtcpIndexExhausted(self.ssrc));
        }
        self.srtcp_index += 1;
        Ok(self.srtcp_index)
    }
}

/// Context represents an SRTP cryptographic context.
/// A Context can only be used for one-way operations: it must be used
/// either ONLY for encryption or ONLY for decryption.
pub struct Context {
    cipher: Box<dyn Cipher + Send>,

    srtp_ssrc_states: HashMap<u32, SrtpSsrcState>,
    srtcp_ssrc_states: HashMap<u32, SrtcpSsrcState>,

    new_srtp_replay_detector: ContextOption,
    new_srtcp_replay_detector: ContextOption,
}

impl Context {
    /// Derives session keys from the master secrets and creates a new SRTP
    /// Context for `profile`. With `None` options no replay protection is
    /// performed; sessions install a windowed detector on their remote
    /// context.
    pub fn new(
        master_key: &[u8],
        master_salt: &[u8],
        profile: ProtectionProfile,
        srtp_ctx_opt: Option<ContextOption>,
        srtcp_ctx_opt: Option<ContextOption>,
    ) -> Result<Context> {
        let key_len = profile.key_len();
        let salt_len = profile.salt_len();

        if master_key.len() != key_len {
            return Err(Error::SrtpMasterKeyLength(key_len, master_key.len()));
        } else if master_salt.len() != salt_len {
            return Err(Error::SrtpSaltLength(salt_len, master_salt.len()));
        }

        let cipher: Box<dyn Cipher + Send> = match profile {
            ProtectionProfile::Aes128CmHmacSha1_80 => {
                Box::new(CipherAesCmHmacSha1::new(profile, master_key, master_salt)?)
            }
            ProtectionProfile::AeadAes128Gcm => return Err(Error::ErrNoSuchSrtpProfile),
        };

        Ok(Context {
            cipher,
            srtp_ssrc_states: HashMap::new(),
            srtcp_ssrc_states: HashMap::new(),
            new_srtp_replay_detector: srtp_ctx_opt.unwrap_or_else(srtp_no_replay_protection),
            new_srtcp_replay_detector: srtcp_ctx_opt.unwrap_or_else(srtcp_no_replay_protection),
        })
    }

    fn get_srtp_ssrc_state(&mut self, ssrc: u32) -> &mut SrtpSsrcState {
        let s = SrtpSsrcState {
            ssrc,
            rollover_counter: 0,
            rollover_has_processed: false,
            highest_sequence_number: 0,
            replay_detector: (self.new_srtp_replay_detector)(),
        };

        self.srtp_ssrc_states.entry(ssrc).or_insert(s)
    }

    fn get_srtcp_ssrc_state(&mut self, ssrc: u32) -> &mut SrtcpSsrcState {
        let s = SrtcpSsrcState {
            ssrc,
            srtcp_index: 0,
            replay_detector: (self.new_srtcp_replay_detector)(),
        };

        self.srtcp_ssrc_states.entry(ssrc).or_insert(s)
    }

    /// roc returns the SRTP rollover counter of the specified SSRC, if any
    /// packet has been processed for it.
    pub fn roc(&self, ssrc: u32) -> Option<u32> {
        self.srtp_ssrc_states.get(&ssrc).map(|s| s.rollover_counter)
    }

    /// set_roc sets the SRTP rollover counter of the specified SSRC.
    pub fn set_roc(&mut self, ssrc: u32, roc: u32) {
        self.get_srtp_ssrc_state(ssrc).rollover_counter = roc;
    }

    /// index returns the SRTCP index of the specified SSRC, if any packet
    /// has been processed for it.
    pub fn index(&self, ssrc: u32) -> Option<usize> {
        self.srtcp_ssrc_states.get(&ssrc).map(|s| s.srtcp_index)
    }

    /// set_index sets the SRTCP index of the specified SSRC.
    pub fn set_index(&mut self, ssrc: u32, index: usize) {
        self.get_srtcp_ssrc_state(ssrc).srtcp_index = index.min(MAX_SRTCP_INDEX);
    }
}
