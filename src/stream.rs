use tokio::sync::mpsc;
use util::buffer::Buffer;
use util::marshal::*;

use crate::error::{Error, Result};

/// Limit the SRTP buffer to 1MB.
const SRTP_BUFFER_SIZE: usize = 1000 * 1000;

/// Limit the SRTCP buffer to 100KB.
const SRTCP_BUFFER_SIZE: usize = 100 * 1000;

/// Stream handles the decrypted packets of a single SSRC.
///
/// Packets queue in a bounded buffer between the session's read loop and
/// the reader; once the buffer is full the dispatcher drops the newest
/// packets until the reader catches up.
pub struct Stream {
    ssrc: u32,
    tx: mpsc::Sender<u32>,
    pub(crate) buffer: Buffer,
    is_rtp: bool,
}

impl Stream {
    pub(crate) fn new(ssrc: u32, tx: mpsc::Sender<u32>, is_rtp: bool) -> Self {
        Stream {
            ssrc,
            tx,
            buffer: Buffer::new(
                0,
                if is_rtp {
                    SRTP_BUFFER_SIZE
                } else {
                    SRTCP_BUFFER_SIZE
                },
            ),
            is_rtp,
        }
    }

    /// get_ssrc returns the SSRC we are demuxing for.
    pub fn get_ssrc(&self) -> u32 {
        self.ssrc
    }

    /// Reads the next full decrypted packet into `buf`. Blocks until one is
    /// available or the stream closes; errors if `buf` cannot hold the
    /// packet (the packet is consumed).
    pub async fn read(&self, buf: &mut [u8]) -> Result<usize> {
        Ok(self.buffer.read(buf, None).await?)
    }

    /// Reads the next packet and parses its RTP header, returning both the
    /// byte count and the header.
    pub async fn read_rtp(&self, buf: &mut [u8]) -> Result<(usize, rtp::header::Header)> {
        if !self.is_rtp {
            return Err(Error::InvalidRtpStream);
        }

        let n = self.buffer.read(buf, None).await?;
        let mut b = &buf[..n];
        let header = rtp::header::Header::unmarshal(&mut b)?;

        Ok((n, header))
    }

    /// Reads the next compound packet and parses the RTCP records in it.
    pub async fn read_rtcp(
        &self,
        buf: &mut [u8],
    ) -> Result<Vec<Box<dyn rtcp::packet::Packet + Send + Sync>>> {
        if self.is_rtp {
            return Err(Error::InvalidRtcpStream);
        }

        let n = self.buffer.read(buf, None).await?;
        let mut b = &buf[..n];
        let pkts = rtcp::packet::unmarshal(&mut b)?;

        Ok(pkts)
    }

    /// Close removes the stream from its session and unblocks any pending
    /// reads.
    pub async fn close(&self) -> Result<()> {
        self.buffer.close().await;
        let _ = self.tx.send(self.ssrc).await;

        Ok(())
    }
}
