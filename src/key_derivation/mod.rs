
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockEncrypt, KeyInit};
use aes::Aes128;

use crate::error::{Error, Result};

pub(crate) const LABEL_SRTP_ENCRYPTION: u8 = 0x00;
pub(crate) const LABEL_SRTP_AUTHENTICATION_TAG: u8 = 0x01;
pub(crate) const LABEL_SRTP_SALT: u8 = 0x02;
pub(crate) const LABEL_SRTCP_ENCRYPTION: u8 = 0x03;
pub(crate) const LABEL_SRTCP_AUTHENTICATION_TAG: u8 = 0x04;
pub(crate) const LABEL_SRTCP_SALT: u8 = 0x05;

pub(crate) const SRTCP_INDEX_SIZE: usize = 4;

/// xor_bytes writes `a XOR b` into `dst`, bounded by the shortest of the
/// three slices, and returns the number of bytes written. Bytes of `dst`
/// past that prefix are left untouched.
pub(crate) fn xor_bytes(dst: &mut [u8], a: &[u8], b: &[u8]) -> usize {
    let n = dst.len().min(a.len()).min(b.len());
    for i in 0..n {
        dst[i] = a[i] ^ b[i];
    }
    n
}

/// aes_cm_key_derivation derives a session key, salt or auth key from the
/// master secrets, per RFC 3711 §4.3 with a key derivation rate of 0.
///
/// The PRF input block is the master salt zero-padded to one AES block with
/// the label XORed in at byte 7; the two trailing bytes count keystream
/// blocks. Each block is AES encrypted under the master key and the
/// concatenated output truncated to `out_len`.
pub(crate) fn aes_cm_key_derivation(
    label: u8,
    master_key: &[u8],
    master_salt: &[u8],
    index_over_kdr: usize,
    out_len: usize,
) -> Result<Vec<u8>> {
    if index_over_kdr != 0 {
        // A non-zero kdr would XOR the 24-bit "index DIV kdr" into the PRF
        // input as well.
        return Err(Error::UnsupportedIndexOverKdr);
    }

    let n_master_key = master_key.len();
    let n_master_salt = master_salt.len();

    let mut prf_in = vec![0u8; n_master_key];
    prf_in[..n_master_salt].copy_from_slice(master_salt);

    prf_in[7] ^= label;

    let key = GenericArray::from_slice(master_key);
    let block = Aes128::new(key);

    let mut out = vec![0u8; ((out_len + n_master_key) / n_master_key) * n_master_key];
    for (i, n) in (0..out_len).step_by(n_master_key).enumerate() {
        prf_in[n_master_key - 2] = ((i >> 8) & 0xFF) as u8;
        prf_in[n_master_key - 1] = (i & 0xFF) as u8;

        out[n..n + n_master_key].copy_from_slice(&prf_in);
        let out_block = GenericArray::from_mut_slice(&mut out[n..n + n_master_key]);
        block.encrypt_block(out_block);
    }

    Ok(out[..out_len].to_vec())
}

/// generate_counter builds the 16-byte CTR IV from the packet index
/// (rollover counter ∥ sequence number), the SSRC and the session salt,
/// per RFC 3711 §4.1.1.
pub(crate) fn generate_counter(
    sequence_number: u16,
    rollover_counter: u32,
    ssrc: u32,
    session_salt: &[u8],
) -> [u8; 16] {
    assert!(session_salt.len() <= 16);

    let mut counter = [0u8; 16];
    counter[4..8].copy_from_slice(&ssrc.to_be_bytes());
    counter[8..12].copy_from_slice(&rollover_counter.to_be_bytes());
    counter[12..16].copy_from_slice(&((u32::from(sequence_number)) << 16).to_be_bytes());

    // The salt covers the first 14 bytes; the trailing block counter stays.
    let mut iv = counter;
    xor_bytes(&mut iv, &counter, session_salt);
    iv
}
