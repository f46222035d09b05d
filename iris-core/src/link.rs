//! Serial link driver
//!
//! [`Link`] ties the pieces together for one serial port: it pumps the
//! frame parser over the receive reservoir, routes decoded requests
//! through the [`Dispatcher`], and assembles reply frames onto the
//! [`FrameSink`]. It also announces the device with a periodic handshake
//! frame until the host completes the handshake.
//!
//! Frame body layout on this link (between length field and checksum):
//!
//! ```text
//! ┌──────┬─────┬───────────────────────┬────────┐
//! │ ADDR │ CMD │ expansion bytes (opt) │ DATA.. │
//! └──────┴─────┴───────────────────────┴────────┘
//! ```
//!
//! Expansion bytes are controlled by the [`Addressing`] flag bits and are
//! symmetric: a link configured with them emits them and expects them on
//! every inbound frame.

use crate::command::{AckCode, Command};
use crate::dispatch::{Dispatcher, Reply};
use heapless::Vec;
use iris_hal::FrameSink;
use iris_protocol::{
    encode_frame, ByteSource, DefinitionError, EncodeError, FrameEvent, FrameParser, FrameShape,
    ProtocolDefinition,
};

/// Expansion flag: one extra address byte after the command.
pub const EXPAND_ADDR: u8 = 0x01;
/// Expansion flag: one extra command byte.
pub const EXPAND_CMD: u8 = 0x02;
/// Expansion flag: a 16-bit sequence number (little-endian).
pub const EXPAND_SN: u8 = 0x04;

/// Identity of this endpoint on the link, plus the optional expansion
/// bytes carried by every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Addressing {
    /// Device address matched against inbound frames and stamped on
    /// outbound ones
    pub device: u8,
    /// Combination of the `EXPAND_*` flag bits
    pub expand: u8,
    /// Extra address byte, sent when `EXPAND_ADDR` is set
    pub addr_expand: u8,
    /// Extra command byte, sent when `EXPAND_CMD` is set
    pub cmd_expand: u8,
    /// Sequence number, sent when `EXPAND_SN` is set
    pub sn_expand: u16,
}

impl Addressing {
    /// Addressing with no expansion bytes.
    pub fn plain(device: u8) -> Self {
        Self {
            device,
            expand: 0,
            addr_expand: 0,
            cmd_expand: 0,
            sn_expand: 0,
        }
    }

    /// Number of expansion bytes between the command and the data.
    fn extra_len(&self) -> usize {
        let mut n = 0;
        if self.expand & EXPAND_ADDR != 0 {
            n += 1;
        }
        if self.expand & EXPAND_CMD != 0 {
            n += 1;
        }
        if self.expand & EXPAND_SN != 0 {
            n += 2;
        }
        n
    }
}

/// Whether the device address is checked before or after the handshake
/// gate.
///
/// `BeforeGate` silently ignores anything addressed elsewhere, even when
/// the system is still locked. `AfterGate` refuses all pre-handshake
/// traffic with `SystemLock` first and only then filters by address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AddressCheckOrder {
    BeforeGate,
    AfterGate,
}

/// Link policy knobs.
#[derive(Debug, Clone, Copy)]
pub struct LinkConfig {
    /// Address check placement relative to the handshake gate
    pub addr_order: AddressCheckOrder,
    /// Ticks between handshake announcements while unhandshaken
    pub handshake_period: u32,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            addr_order: AddressCheckOrder::BeforeGate,
            handshake_period: 1000,
        }
    }
}

/// Counters for one `pump` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkStats {
    /// Validated frames delivered by the parser
    pub frames: u16,
    /// Parse errors (all locally recovered)
    pub parse_errors: u16,
    /// Frames that could not be transmitted
    pub send_failures: u16,
}

/// Transmission failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SendError {
    /// Body exceeds the link's frame capacity
    Overflow,
    /// Frame assembly failed
    Encode(EncodeError),
    /// The sink refused or truncated the frame
    Sink,
}

/// One serial command/response endpoint.
///
/// `MAX` bounds frame size (receive scratch and transmit buffer), `N` is
/// the dispatch table capacity. `C` is the handler context, typically the
/// board's `DataManager`.
pub struct Link<'p, C, K, const MAX: usize, const N: usize> {
    def: &'p ProtocolDefinition,
    parser: FrameParser<'p, MAX>,
    dispatcher: Dispatcher<C, N>,
    addressing: Addressing,
    config: LinkConfig,
    sink: K,
    last_handshake: u32,
    /// Bytes between header end and the address byte (the length field)
    lead: usize,
}

impl<'p, C, K: FrameSink, const MAX: usize, const N: usize> Link<'p, C, K, MAX, N> {
    pub fn new(
        def: &'p ProtocolDefinition,
        addressing: Addressing,
        dispatcher: Dispatcher<C, N>,
        sink: K,
        config: LinkConfig,
    ) -> Result<Self, DefinitionError> {
        let parser = FrameParser::new(def)?;
        let lead = match def.shape {
            FrameShape::LengthPrefixed { offset, size, .. } => offset + size - def.header.len(),
            _ => 0,
        };
        Ok(Self {
            def,
            parser,
            dispatcher,
            addressing,
            config,
            sink,
            last_handshake: 0,
            lead,
        })
    }

    /// True once the host has completed the handshake.
    pub fn handshake_done(&self) -> bool {
        self.dispatcher.handshake_done()
    }

    /// Send a device-initiated frame (upload data, notifications).
    pub fn send(&mut self, cmd: u8, data: &[u8]) -> Result<(), SendError> {
        send_frame::<K, MAX>(self.def, &self.addressing, &mut self.sink, cmd, data)
    }

    /// Service the link: handshake announcement, then decode and dispatch
    /// everything buffered in `source`.
    pub fn pump<S: ByteSource>(&mut self, source: &mut S, now: u32, ctx: &mut C) -> LinkStats {
        let mut stats = LinkStats::default();

        if !self.dispatcher.handshake_done()
            && now.wrapping_sub(self.last_handshake) >= self.config.handshake_period
        {
            self.last_handshake = now;
            if self.send(Command::Handshake.as_u8(), &[]).is_err() {
                stats.send_failures += 1;
            }
        }

        let Self {
            def,
            parser,
            dispatcher,
            addressing,
            config,
            sink,
            lead,
            ..
        } = self;
        let def = *def;
        let lead = *lead;
        let extra = addressing.extra_len();

        parser.pump(source, now, |event| {
            let payload = match event {
                FrameEvent::Error(_) => {
                    stats.parse_errors += 1;
                    return;
                }
                FrameEvent::Frame(payload) => payload,
            };
            stats.frames += 1;

            let body = payload.get(lead..).unwrap_or(&[]);
            if body.len() < 2 + extra {
                let nack = [0, AckCode::FrameLen.as_u8()];
                if send_frame::<K, MAX>(def, addressing, sink, Command::Ack.as_u8(), &nack)
                    .is_err()
                {
                    stats.send_failures += 1;
                }
                return;
            }
            let addr = body[0];
            let cmd = body[1];
            let data = &body[2 + extra..];
            let for_us = addr == addressing.device;

            let reply = match config.addr_order {
                AddressCheckOrder::BeforeGate => {
                    if !for_us {
                        return;
                    }
                    dispatcher.dispatch(ctx, cmd, data)
                }
                AddressCheckOrder::AfterGate => {
                    if !dispatcher.handshake_done() && cmd != Command::Handshake.as_u8() {
                        Reply::Status(AckCode::SystemLock)
                    } else if !for_us {
                        return;
                    } else {
                        dispatcher.dispatch(ctx, cmd, data)
                    }
                }
            };

            let sent = match reply {
                Reply::None => Ok(()),
                Reply::Data(data) => send_frame::<K, MAX>(def, addressing, sink, cmd, &data),
                Reply::Status(code) => {
                    let nack = [cmd, code.as_u8()];
                    send_frame::<K, MAX>(def, addressing, sink, Command::Ack.as_u8(), &nack)
                }
            };
            if sent.is_err() {
                stats.send_failures += 1;
            }
        });

        stats
    }
}

/// Assemble and transmit one frame: address, command, expansion bytes,
/// data, wrapped per the protocol definition.
fn send_frame<K: FrameSink, const MAX: usize>(
    def: &ProtocolDefinition,
    addressing: &Addressing,
    sink: &mut K,
    cmd: u8,
    data: &[u8],
) -> Result<(), SendError> {
    let mut body: Vec<u8, MAX> = Vec::new();
    body.push(addressing.device).map_err(|_| SendError::Overflow)?;
    body.push(cmd).map_err(|_| SendError::Overflow)?;
    if addressing.expand & EXPAND_ADDR != 0 {
        body.push(addressing.addr_expand)
            .map_err(|_| SendError::Overflow)?;
    }
    if addressing.expand & EXPAND_CMD != 0 {
        body.push(addressing.cmd_expand)
            .map_err(|_| SendError::Overflow)?;
    }
    if addressing.expand & EXPAND_SN != 0 {
        body.extend_from_slice(&addressing.sn_expand.to_le_bytes())
            .map_err(|_| SendError::Overflow)?;
    }
    body.extend_from_slice(data).map_err(|_| SendError::Overflow)?;

    let mut tx = [0u8; MAX];
    let n = encode_frame(def, &body, &mut tx).map_err(SendError::Encode)?;
    sink.write_all(&tx[..n]).map_err(|_| SendError::Sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board_info::DataManager;
    use crate::handlers;
    use crate::testutil::{MemStorage, VecSink};
    use iris_protocol::{ChecksumKind, Endianness, RingBuffer, ResyncPolicy};

    const MAX: usize = 64;
    const DEVICE: u8 = 0x03;

    fn link_def() -> ProtocolDefinition {
        ProtocolDefinition {
            shape: FrameShape::LengthPrefixed {
                offset: 1,
                size: 2,
                len_includes_all: true,
                len_extra: 0,
            },
            header: &[0xFA],
            tail: &[0x0D],
            checksum: Some(ChecksumKind::Crc16Modbus),
            endianness: Endianness::Little,
            min_frame_len: 8,
            max_frame_len: 48,
            inter_byte_timeout: 20,
            frame_timeout: 100,
            header_mismatch: ResyncPolicy::DiscardOne,
        }
    }

    type TestLink<'p> = Link<'p, DataManager<MemStorage>, VecSink, MAX, 8>;

    fn make_link(def: &ProtocolDefinition, config: LinkConfig) -> TestLink<'_> {
        let mut dispatcher = Dispatcher::new(true);
        handlers::register_standard(&mut dispatcher).unwrap();
        Link::new(
            def,
            Addressing::plain(DEVICE),
            dispatcher,
            VecSink::new(),
            config,
        )
        .unwrap()
    }

    fn manager() -> DataManager<MemStorage> {
        DataManager::load(MemStorage::erased()).unwrap()
    }

    /// Encode a host request: addr + cmd + data under the link protocol.
    fn request(def: &ProtocolDefinition, addr: u8, cmd: u8, data: &[u8]) -> heapless::Vec<u8, MAX> {
        let mut body: heapless::Vec<u8, MAX> = heapless::Vec::new();
        body.push(addr).unwrap();
        body.push(cmd).unwrap();
        body.extend_from_slice(data).unwrap();
        let mut buf = [0u8; MAX];
        let n = encode_frame(def, &body, &mut buf).unwrap();
        heapless::Vec::from_slice(&buf[..n]).unwrap()
    }

    /// Decode every frame in `bytes` into (cmd, data) pairs.
    fn decode_replies(
        def: &ProtocolDefinition,
        bytes: &[u8],
    ) -> heapless::Vec<(u8, heapless::Vec<u8, MAX>), 8> {
        let mut parser = FrameParser::<MAX>::new(def).unwrap();
        let mut rb = RingBuffer::<256>::new();
        rb.push_slice(bytes);
        let mut out = heapless::Vec::new();
        parser.pump(&mut rb, 0, |event| {
            if let FrameEvent::Frame(payload) = event {
                // Skip the 2-byte length field, then addr.
                assert_eq!(payload[2], DEVICE);
                let cmd = payload[3];
                let data = heapless::Vec::from_slice(&payload[4..]).unwrap();
                out.push((cmd, data)).unwrap();
            } else {
                panic!("reply stream must parse cleanly");
            }
        });
        out
    }

    #[test]
    fn test_handshake_announced_periodically_until_answered() {
        let def = link_def();
        let mut link = make_link(&def, LinkConfig::default());
        let mut ctx = manager();
        let mut rx = RingBuffer::<64>::new();

        link.pump(&mut rx, 0, &mut ctx);
        assert!(link.sink.bytes.is_empty());

        link.pump(&mut rx, 1000, &mut ctx);
        link.pump(&mut rx, 1500, &mut ctx);
        link.pump(&mut rx, 2000, &mut ctx);
        let sent = decode_replies(&def, &link.sink.bytes);
        assert_eq!(sent.len(), 2);
        assert!(sent
            .iter()
            .all(|(cmd, _)| *cmd == Command::Handshake.as_u8()));

        // Host answers the handshake; announcements must stop.
        link.sink.bytes.clear();
        rx.push_slice(&request(&def, DEVICE, Command::Handshake.as_u8(), &[]));
        link.pump(&mut rx, 2100, &mut ctx);
        assert!(link.handshake_done());

        link.pump(&mut rx, 9000, &mut ctx);
        let sent = decode_replies(&def, &link.sink.bytes);
        // Only the handshake echo reply, no further announcements.
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, Command::Handshake.as_u8());
    }

    #[test]
    fn test_request_reply_round_trip() {
        let def = link_def();
        let mut link = make_link(&def, LinkConfig::default());
        let mut ctx = manager();
        let mut rx = RingBuffer::<128>::new();

        rx.push_slice(&request(&def, DEVICE, Command::Handshake.as_u8(), &[]));
        rx.push_slice(&request(
            &def,
            DEVICE,
            Command::GetSoftwareVersion.as_u8(),
            &[],
        ));
        let stats = link.pump(&mut rx, 10, &mut ctx);
        assert_eq!(stats.frames, 2);
        assert_eq!(stats.parse_errors, 0);

        let replies = decode_replies(&def, &link.sink.bytes);
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[1].0, Command::GetSoftwareVersion.as_u8());
        assert_eq!(replies[1].1.as_slice(), b"0.0.0.0");
    }

    #[test]
    fn test_set_hardware_version_end_to_end() {
        let def = link_def();
        let mut link = make_link(&def, LinkConfig::default());
        let mut ctx = manager();
        let mut rx = RingBuffer::<192>::new();

        rx.push_slice(&request(&def, DEVICE, Command::Handshake.as_u8(), &[]));
        rx.push_slice(&request(
            &def,
            DEVICE,
            Command::SetHardwareVersion.as_u8(),
            b"4.2.0.1",
        ));
        rx.push_slice(&request(
            &def,
            DEVICE,
            Command::GetHardwareVersion.as_u8(),
            &[],
        ));
        link.pump(&mut rx, 10, &mut ctx);

        let replies = decode_replies(&def, &link.sink.bytes);
        assert_eq!(replies.len(), 3);
        // Set is acknowledged through the universal ack with Finish.
        assert_eq!(replies[1].0, Command::Ack.as_u8());
        assert_eq!(
            replies[1].1.as_slice(),
            &[Command::SetHardwareVersion.as_u8(), AckCode::Finish.as_u8()]
        );
        assert_eq!(replies[2].1.as_slice(), b"4.2.0.1");
        assert_eq!(ctx.hardware_version(), "4.2.0.1");
    }

    #[test]
    fn test_pre_handshake_request_refused_with_system_lock() {
        let def = link_def();
        let mut link = make_link(&def, LinkConfig::default());
        let mut ctx = manager();
        let mut rx = RingBuffer::<64>::new();

        rx.push_slice(&request(
            &def,
            DEVICE,
            Command::GetSerialNumber.as_u8(),
            &[],
        ));
        link.pump(&mut rx, 10, &mut ctx);

        let replies = decode_replies(&def, &link.sink.bytes);
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].0, Command::Ack.as_u8());
        assert_eq!(
            replies[0].1.as_slice(),
            &[
                Command::GetSerialNumber.as_u8(),
                AckCode::SystemLock.as_u8()
            ]
        );
    }

    #[test]
    fn test_other_device_ignored_before_gate() {
        let def = link_def();
        let mut link = make_link(&def, LinkConfig::default());
        let mut ctx = manager();
        let mut rx = RingBuffer::<64>::new();

        rx.push_slice(&request(&def, 0x55, Command::GetSerialNumber.as_u8(), &[]));
        let stats = link.pump(&mut rx, 10, &mut ctx);
        assert_eq!(stats.frames, 1);
        assert!(link.sink.bytes.is_empty());
    }

    #[test]
    fn test_after_gate_order_nacks_foreign_traffic_while_locked() {
        let def = link_def();
        let config = LinkConfig {
            addr_order: AddressCheckOrder::AfterGate,
            ..LinkConfig::default()
        };
        let mut link = make_link(&def, config);
        let mut ctx = manager();
        let mut rx = RingBuffer::<64>::new();

        // Addressed to another device, but the system lock answers first.
        rx.push_slice(&request(&def, 0x55, Command::GetSerialNumber.as_u8(), &[]));
        link.pump(&mut rx, 10, &mut ctx);

        let replies = decode_replies(&def, &link.sink.bytes);
        assert_eq!(replies.len(), 1);
        assert_eq!(
            replies[0].1.as_slice(),
            &[
                Command::GetSerialNumber.as_u8(),
                AckCode::SystemLock.as_u8()
            ]
        );
    }

    #[test]
    fn test_unknown_command_nacked_operate_invalid() {
        let def = link_def();
        let mut link = make_link(&def, LinkConfig::default());
        let mut ctx = manager();
        let mut rx = RingBuffer::<64>::new();

        rx.push_slice(&request(&def, DEVICE, Command::Handshake.as_u8(), &[]));
        rx.push_slice(&request(&def, DEVICE, 0x7E, &[]));
        link.pump(&mut rx, 10, &mut ctx);

        let replies = decode_replies(&def, &link.sink.bytes);
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[1].0, Command::Ack.as_u8());
        assert_eq!(
            replies[1].1.as_slice(),
            &[0x7E, AckCode::OperateInvalid.as_u8()]
        );
    }

    #[test]
    fn test_corrupted_request_counted_not_answered() {
        let def = link_def();
        let mut link = make_link(&def, LinkConfig::default());
        let mut ctx = manager();
        let mut rx = RingBuffer::<64>::new();

        let mut bad = request(&def, DEVICE, Command::Handshake.as_u8(), &[]);
        bad[4] ^= 0x01; // flip a body bit, breaking the checksum
        rx.push_slice(&bad);
        let stats = link.pump(&mut rx, 10, &mut ctx);

        assert_eq!(stats.frames, 0);
        assert!(stats.parse_errors >= 1);
        assert!(link.sink.bytes.is_empty());
        assert!(!link.handshake_done());
    }

    #[test]
    fn test_expansion_bytes_on_outbound_frames() {
        let def = link_def();
        let addressing = Addressing {
            device: DEVICE,
            expand: EXPAND_ADDR | EXPAND_SN,
            addr_expand: 0x21,
            cmd_expand: 0,
            sn_expand: 0x0102,
        };
        let dispatcher: Dispatcher<DataManager<MemStorage>, 8> = Dispatcher::new(true);
        let mut link: Link<'_, _, _, MAX, 8> = Link::new(
            &def,
            addressing,
            dispatcher,
            VecSink::new(),
            LinkConfig::default(),
        )
        .unwrap();

        link.send(Command::UploadMode.as_u8(), &[0xAB]).unwrap();
        let frame = link.sink.bytes.as_slice();
        // header, len_lo, len_hi, addr, cmd, addr_expand, sn_lo, sn_hi, data
        assert_eq!(frame[0], 0xFA);
        assert_eq!(frame[3], DEVICE);
        assert_eq!(frame[4], Command::UploadMode.as_u8());
        assert_eq!(frame[5], 0x21);
        assert_eq!(&frame[6..8], &[0x02, 0x01]);
        assert_eq!(frame[8], 0xAB);
    }

    #[test]
    fn test_short_addressed_frame_gets_frame_len_nack() {
        // A definition permitting frames with a body shorter than
        // addr + cmd: min_frame_len at the bare overhead.
        let mut def = link_def();
        def.min_frame_len = 6;
        let mut link = make_link(&def, LinkConfig::default());
        let mut ctx = manager();
        let mut rx = RingBuffer::<64>::new();

        // Body is a single byte: too short to carry addr + cmd.
        let mut body = [0u8; 1];
        body[0] = DEVICE;
        let mut buf = [0u8; MAX];
        let n = encode_frame(&def, &body, &mut buf).unwrap();
        rx.push_slice(&buf[..n]);
        link.pump(&mut rx, 10, &mut ctx);

        let replies = decode_replies(&def, &link.sink.bytes);
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].0, Command::Ack.as_u8());
        assert_eq!(replies[0].1.as_slice(), &[0x00, AckCode::FrameLen.as_u8()]);
    }

    #[test]
    fn test_parse_error_timeout_reported_in_stats() {
        let def = link_def();
        let mut link = make_link(&def, LinkConfig::default());
        let mut ctx = manager();
        let mut rx = RingBuffer::<64>::new();

        rx.push(0xFA);
        link.pump(&mut rx, 10, &mut ctx);
        let stats = link.pump(&mut rx, 500, &mut ctx);
        assert_eq!(stats.parse_errors, 1);
    }
}
