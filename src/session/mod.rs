#[cfg(test)]
mod session_rtcp_test;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{mpsc, Mutex};
use util::conn::Conn;
use util::marshal::*;

use crate::config::Config;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::option::{srtcp_replay_protection, srtp_replay_protection};
use crate::stream::Stream;

const DEFAULT_SESSION_SRTP_REPLAY_PROTECTION_WINDOW: usize = 64;
const DEFAULT_SESSION_SRTCP_REPLAY_PROTECTION_WINDOW: usize = 64;

/// Session provides a bi-directional SRTP or SRTCP session over one
/// datagram transport, demultiplexing inbound traffic into per-SSRC
/// streams.
///
/// SRTP itself does not have a design like this, but it is common in most
/// applications for local/remote to each have their own keying material.
/// This provides those patterns instead of making everyone re-implement.
pub struct Session {
    local_context: Arc<Mutex<Context>>,
    streams_map: Arc<Mutex<HashMap<u32, Arc<Stream>>>>,
    new_stream_rx: Arc<Mutex<mpsc::Receiver<Arc<Stream>>>>,
    close_stream_tx: mpsc::Sender<u32>,
    close_session_tx: mpsc::Sender<()>,
    pub(crate) udp_tx: Arc<dyn Conn + Send + Sync>,
    is_rtp: bool,
}

impl Session {
    /// Derives both directions' contexts from `config` and spawns the read
    /// loop on `conn`. The session is live once this returns.
    pub async fn new(
        conn: Arc<dyn Conn + Send + Sync>,
        config: Config,
        is_rtp: bool,
    ) -> Result<Self> {
        let local_context = Context::new(
            &config.keys.local_master_key,
            &config.keys.local_master_salt,
            config.profile,
            config.local_rtp_options,
            config.local_rtcp_options,
        )?;

        let mut remote_context = Context::new(
            &config.keys.remote_master_key,
            &config.keys.remote_master_salt,
            config.profile,
            config.remote_rtp_options.or_else(|| {
                Some(srtp_replay_protection(
                    DEFAULT_SESSION_SRTP_REPLAY_PROTECTION_WINDOW,
                ))
            }),
            config.remote_rtcp_options.or_else(|| {
                Some(srtcp_replay_protection(
                    DEFAULT_SESSION_SRTCP_REPLAY_PROTECTION_WINDOW,
                ))
            }),
        )?;

        let streams_map = Arc::new(Mutex::new(HashMap::new()));
        let (new_stream_tx, new_stream_rx) = mpsc::channel(8);
        let (close_stream_tx, mut close_stream_rx) = mpsc::channel(8);
        let (close_session_tx, mut close_session_rx) = mpsc::channel(8);
        let udp_tx = Arc::clone(&conn);
        let udp_rx = Arc::clone(&conn);
        let cloned_streams_map = Arc::clone(&streams_map);
        let cloned_close_stream_tx = close_stream_tx.clone();

        tokio::spawn(async move {
            let mut buf = vec![0u8; 8192];

            loop {
                let incoming_stream = Session::incoming(
                    &udp_rx,
                    &mut buf,
                    &cloned_streams_map,
                    &cloned_close_stream_tx,
                    &new_stream_tx,
                    &mut remote_context,
                    is_rtp,
                );
                let close_stream = close_stream_rx.recv();
                let close_session = close_session_rx.recv();

                tokio::select! {
                    result = incoming_stream => match result {
                        Ok(()) => {},
                        Err(err) => {
                            // Transport gone; tear the session down.
                            log::info!("srtp session read loop exit: {err}");
                            break;
                        }
                    },
                    opt = close_stream => if let Some(ssrc) = opt {
                        Session::close_stream(&cloned_streams_map, ssrc).await
                    },
                    _ = close_session => break
                }
            }

            // Unblock pending reads before the transport goes away. Dropping
            // new_stream_tx here wakes any pending accept with "closed".
            {
                let mut streams = cloned_streams_map.lock().await;
                for (_, stream) in streams.drain() {
                    stream.buffer.close().await;
                }
            }

            let _ = udp_rx.close().await;
        });

        Ok(Session {
            local_context: Arc::new(Mutex::new(local_context)),
            streams_map,
            new_stream_rx: Arc::new(Mutex::new(new_stream_rx)),
            close_stream_tx,
            close_session_tx,
            udp_tx,
            is_rtp,
        })
    }

    async fn close_stream(streams_map: &Arc<Mutex<HashMap<u32, Arc<Stream>>>>, ssrc: u32) {
        let mut streams = streams_map.lock().await;
        streams.remove(&ssrc);
    }

    async fn incoming(
        udp_rx: &Arc<dyn Conn + Send + Sync>,
        buf: &mut [u8],
        streams_map: &Arc<Mutex<HashMap<u32, Arc<Stream>>>>,
        close_stream_tx: &mpsc::Sender<u32>,
        new_stream_tx: &mpsc::Sender<Arc<Stream>>,
        remote_context: &mut Context,
        is_rtp: bool,
    ) -> Result<()> {
        let n = udp_rx.recv(buf).await?;
        if n == 0 {
            return Err(Error::SessionEof);
        }

        // A single bad packet must not tear down the session: anything that
        // fails to authenticate, replays or will not parse is dropped here.
        let decrypted = if is_rtp {
            match remote_context.decrypt_rtp(&buf[0..n]) {
                Ok(decrypted) => decrypted,
                Err(err) => {
                    log::warn!("drop inbound srtp packet: {err}");
                    return Ok(());
                }
            }
        } else {
            match remote_context.decrypt_rtcp(&buf[0..n]) {
                Ok(decrypted) => decrypted,
                Err(err) => {
                    log::warn!("drop inbound srtcp packet: {err}");
                    return Ok(());
                }
            }
        };

        let mut b = &decrypted[..];
        let ssrcs = if is_rtp {
            match rtp::header::Header::unmarshal(&mut b) {
                Ok(header) => vec![header.ssrc],
                Err(err) => {
                    log::warn!("drop undecodable rtp packet: {err}");
                    return Ok(());
                }
            }
        } else {
            match rtcp::packet::unmarshal(&mut b) {
                Ok(pkts) => destination_ssrc(&pkts),
                Err(err) => {
                    log::warn!("drop undecodable rtcp packet: {err}");
                    return Ok(());
                }
            }
        };

        for ssrc in ssrcs {
            let (stream, is_new) =
                Session::get_or_create_stream(streams_map, close_stream_tx.clone(), is_rtp, ssrc)
                    .await;
            if is_new {
                log::trace!(
                    "srtp session got new {} stream {ssrc}",
                    if is_rtp { "rtp" } else { "rtcp" }
                );
                // Publish before delivering the first payload; an
                // accept-stream consumer may be waiting.
                new_stream_tx.send(Arc::clone(&stream)).await?;
            }

            match stream.buffer.write(&decrypted).await {
                Ok(_) => {}
                // Silently drop data when the buffer is full.
                Err(util::Error::ErrBufferFull) => {}
                Err(err) => return Err(err.into()),
            }
        }

        Ok(())
    }

    async fn get_or_create_stream(
        streams_map: &Arc<Mutex<HashMap<u32, Arc<Stream>>>>,
        close_stream_tx: mpsc::Sender<u32>,
        is_rtp: bool,
        ssrc: u32,
    ) -> (Arc<Stream>, bool) {
        let mut streams = streams_map.lock().await;

        if let Some(stream) = streams.get(&ssrc) {
            (Arc::clone(stream), false)
        } else {
            let stream = Arc::new(Stream::new(ssrc, close_stream_tx, is_rtp));
            streams.insert(ssrc, Arc::clone(&stream));
            (stream, true)
        }
    }

    /// open creates or returns the stream for the given SSRC without
    /// waiting for a packet to arrive, for callers that already know which
    /// SSRC they want.
    pub async fn open(&self, ssrc: u32) -> Arc<Stream> {
        let (stream, _) = Session::get_or_create_stream(
            &self.streams_map,
            self.close_stream_tx.clone(),
            self.is_rtp,
            ssrc,
        )
        .await;

        stream
    }

    /// accept waits for the first packet of a not-yet-seen SSRC and returns
    /// its stream.
    pub async fn accept(&self) -> Result<Arc<Stream>> {
        let mut new_stream_rx = self.new_stream_rx.lock().await;
        match new_stream_rx.recv().await {
            Some(stream) => Ok(stream),
            None => Err(Error::SessionSrtpAlreadyClosed),
        }
    }

    /// close ends the session: every stream errors out, pending accepts
    /// return closed and the transport is closed. Closing again is a no-op.
    pub async fn close(&self) -> Result<()> {
        let _ = self.close_session_tx.send(()).await;

        Ok(())
    }

    /// write encrypts one marshalled RTP or RTCP packet and sends it.
    pub async fn write(&self, buf: &Bytes, is_rtp: bool) -> Result<usize> {
        if self.is_rtp != is_rtp {
            return Err(Error::SessionRtpRtcpTypeMismatch);
        }

        let encrypted = {
            let mut local_context = self.local_context.lock().await;

            if is_rtp {
                local_context.encrypt_rtp(buf)?
            } else {
                local_context.encrypt_rtcp(buf)?
            }
        };

        Ok(self.udp_tx.send(&encrypted).await?)
    }

    /// write_rtp encrypts and sends a single RTP packet.
    pub async fn write_rtp(&self, pkt: &rtp::packet::Packet) -> Result<usize> {
        let raw = pkt.marshal()?;
        self.write(&raw, true).await
    }

    /// write_rtp_batch encrypts `pkts` under a single local-context
    /// acquisition, keeping rollover state monotonic across the batch, then
    /// sends them in submission order. On a transport failure the local
    /// context has already advanced for every packet of the batch.
    pub async fn write_rtp_batch(&self, pkts: &[rtp::packet::Packet]) -> Result<usize> {
        if !self.is_rtp {
            return Err(Error::SessionRtpRtcpTypeMismatch);
        }

        let encrypted_pkts = {
            let mut local_context = self.local_context.lock().await;

            let mut encrypted_pkts = Vec::with_capacity(pkts.len());
            for pkt in pkts {
                let raw = pkt.marshal()?;
                encrypted_pkts.push(local_context.encrypt_rtp(&raw)?);
            }
            encrypted_pkts
        };

        let mut sent = 0;
        for encrypted in &encrypted_pkts {
            sent += self.udp_tx.send(encrypted).await?;
        }

        Ok(sent)
    }

    /// write_rtcp encrypts and sends a single RTCP packet.
    pub async fn write_rtcp(
        &self,
        pkt: &(dyn rtcp::packet::Packet + Send + Sync),
    ) -> Result<usize> {
        let raw = pkt.marshal()?;
        self.write(&raw, false).await
    }
}

/// create a list of Destination SSRCs
/// that's a superset of all Destinations in the slice.
fn destination_ssrc(pkts: &[Box<dyn rtcp::packet::Packet + Send + Sync>]) -> Vec<u32> {
    let mut ssrc_set = HashSet::new();
    for p in pkts {
        for ssrc in p.destination_ssrc() {
            ssrc_set.insert(ssrc);
        }
    }
    ssrc_set.into_iter().collect()
}
