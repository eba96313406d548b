use anyhow::{Result, bail};
use std::fmt;


pub const PAYLOAD_SIZE: usize = 8192;
pub const HEADER_SIZE: usize = 32;
pub const DATAGRAM_SIZE: usize = HEADER_SIZE + PAYLOAD_SIZE;

/// `pkt_in_batch` counts to this value before wrapping to zero.
pub const PACKET_COUNTER_MODULUS: u32 = 390_625;

const PKT_IN_BATCH_MASK: u64 = (1 << 20) - 1;
const ID_MASK: u64 = (1 << 6) - 1;
const RESERVED1_MASK: u64 = (1 << 63) - 1;
const FREQ_NOT_TIME_BIT: u64 = 1 << 63;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketKind {
    Time,
    Frequency,
}

impl PacketKind {
    pub fn freq_not_time(self) -> u64 {
        match self {
            PacketKind::Time => 0,
            PacketKind::Frequency => 1,
        }
    }
}

impl fmt::Display for PacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketKind::Time => write!(f, "time"),
            PacketKind::Frequency => write!(f, "freq"),
        }
    }
}

/// One roach packet as the board would describe it, before bit packing.
///
/// Each stream keeps a single instance per kind and mutates it in place every
/// cycle, so the payload lives on the heap and is never reallocated.
#[derive(Debug, Clone)]
pub struct LogicalPacket {
    pub unix_time: u32,
    pub pkt_in_batch: u32,
    pub digital_id: u8,
    pub if_id: u8,
    pub user_data0: u32,
    pub user_data1: u32,
    pub reserved0: u64,
    pub reserved1: u64,
    pub kind: PacketKind,
    pub payload: Box<[u8; PAYLOAD_SIZE]>,
}

impl LogicalPacket {
    pub fn new(kind: PacketKind, payload: Box<[u8; PAYLOAD_SIZE]>) -> Self {
        Self {
            unix_time: 0,
            pkt_in_batch: 0,
            digital_id: 0,
            if_id: 0,
            user_data0: 0,
            user_data1: 0,
            reserved0: 0,
            reserved1: 0,
            kind,
            payload,
        }
    }

    pub fn with_ids(mut self, digital_id: u8, if_id: u8) -> Self {
        self.digital_id = digital_id;
        self.if_id = if_id;
        self
    }

    /// Packs the scalar fields into the four header words.
    ///
    /// Fields wider than their slot are truncated to the slot width, the same
    /// way the board's header registers behave.
    pub fn pack(&self) -> RawHeader {
        let word0 = u64::from(self.unix_time)
            | ((u64::from(self.pkt_in_batch) & PKT_IN_BATCH_MASK) << 32)
            | ((u64::from(self.digital_id) & ID_MASK) << 52)
            | ((u64::from(self.if_id) & ID_MASK) << 58);

        // Both halves come from user_data1; user_data0 never reaches the wire.
        let word1 = u64::from(self.user_data1) | (u64::from(self.user_data1) << 32);

        let word2 = self.reserved0;

        let word3 = (self.reserved1 & RESERVED1_MASK) | (self.kind.freq_not_time() << 63);

        RawHeader {
            word0,
            word1,
            word2,
            word3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawHeader {
    pub word0: u64,
    pub word1: u64,
    pub word2: u64,
    pub word3: u64,
}

impl RawHeader {
    /// Reads the header words back out of an encoded datagram.
    pub fn from_datagram(datagram: &[u8]) -> Option<Self> {
        if datagram.len() < HEADER_SIZE {
            return None;
        }
        let word = |index: usize| {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&datagram[index * 8..index * 8 + 8]);
            u64::from_be_bytes(bytes)
        };
        Some(Self {
            word0: word(0),
            word1: word(1),
            word2: word(2),
            word3: word(3),
        })
    }

    pub fn unix_time(&self) -> u32 {
        self.word0 as u32
    }

    pub fn pkt_in_batch(&self) -> u32 {
        ((self.word0 >> 32) & PKT_IN_BATCH_MASK) as u32
    }

    pub fn digital_id(&self) -> u8 {
        ((self.word0 >> 52) & ID_MASK) as u8
    }

    pub fn if_id(&self) -> u8 {
        ((self.word0 >> 58) & ID_MASK) as u8
    }

    pub fn kind(&self) -> PacketKind {
        if self.word3 & FREQ_NOT_TIME_BIT != 0 {
            PacketKind::Frequency
        } else {
            PacketKind::Time
        }
    }

    pub fn to_be_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        for (chunk, word) in bytes
            .chunks_exact_mut(8)
            .zip([self.word0, self.word1, self.word2, self.word3])
        {
            chunk.copy_from_slice(&word.to_be_bytes());
        }
        bytes
    }
}

impl fmt::Display for RawHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:x}, {:x}, {:x}, {:x}",
            self.word0, self.word1, self.word2, self.word3
        )
    }
}

/// Writes header and payload into `out` in wire order.
///
/// Header words go out big-endian. The payload is copied verbatim since the
/// generator already produces it in as-sent order.
pub fn assemble_into(
    header: &RawHeader,
    payload: &[u8; PAYLOAD_SIZE],
    out: &mut [u8; DATAGRAM_SIZE],
) {
    out[..HEADER_SIZE].copy_from_slice(&header.to_be_bytes());
    out[HEADER_SIZE..].copy_from_slice(payload);
}

pub fn assemble(header: &RawHeader, payload: &[u8]) -> Result<Box<[u8; DATAGRAM_SIZE]>> {
    let Ok(payload) = <&[u8; PAYLOAD_SIZE]>::try_from(payload) else {
        bail!(
            "payload must be exactly {PAYLOAD_SIZE} bytes, got {}",
            payload.len()
        );
    };
    let mut out = Box::new([0u8; DATAGRAM_SIZE]);
    assemble_into(header, payload, &mut out);
    Ok(out)
}
