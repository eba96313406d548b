use crate::packet::{
    DATAGRAM_SIZE, LogicalPacket, PACKET_COUNTER_MODULUS, PacketKind, assemble_into,
};
use crate::payload::{self, SIGNAL_COUNTER_MODULUS};
use crate::transport::Transport;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmissionConfig {
    /// Gap between the end of one pair and the start of the next.
    pub pkt_delay: Duration,
    /// Gap between the time and frequency packets of a pair.
    pub tf_delay: Duration,
    pub do_trigger: bool,
    pub include_packet_number: bool,
    pub digital_id: u8,
    pub if_id: u8,
}

impl Default for EmissionConfig {
    fn default() -> Self {
        Self {
            pkt_delay: Duration::from_millis(500),
            tf_delay: Duration::from_millis(1),
            do_trigger: true,
            include_packet_number: true,
            digital_id: 0,
            if_id: 0,
        }
    }
}

/// Free-running counters carried from one pair to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EmissionState {
    pub packet_counter: u32,
    pub signal_counter: u8,
    pub packet_number: u8,
}

impl EmissionState {
    pub fn advance(&mut self) {
        self.packet_counter += 1;
        if self.packet_counter >= PACKET_COUNTER_MODULUS {
            self.packet_counter = 0;
        }

        self.signal_counter += 1;
        if self.signal_counter >= SIGNAL_COUNTER_MODULUS {
            self.signal_counter = 0;
        }

        self.packet_number = self.packet_number.wrapping_add(1);
    }
}

/// Source of timestamps and the only place the loop blocks.
pub trait Clock {
    fn unix_time(&self) -> u32;
    fn sleep(&mut self, duration: Duration);
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn unix_time(&self) -> u32 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs() as u32)
            .unwrap_or(0)
    }

    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub unix_time: u32,
    pub pkt_in_batch: u32,
    pub triggered: bool,
    pub send_failures: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub pairs: u64,
    pub send_failures: u64,
    pub triggers: u64,
}

pub struct EmissionScheduler<T, C> {
    config: EmissionConfig,
    state: EmissionState,
    time_packet: LogicalPacket,
    freq_packet: LogicalPacket,
    scratch: Box<[u8; DATAGRAM_SIZE]>,
    transport: T,
    clock: C,
}

impl<T: Transport, C: Clock> EmissionScheduler<T, C> {
    pub fn new(config: EmissionConfig, transport: T, clock: C) -> Self {
        Self::with_state(config, EmissionState::default(), transport, clock)
    }

    pub fn with_state(config: EmissionConfig, state: EmissionState, transport: T, clock: C) -> Self {
        let time_packet = LogicalPacket::new(PacketKind::Time, payload::time_domain_template())
            .with_ids(config.digital_id, config.if_id);
        let freq_packet =
            LogicalPacket::new(PacketKind::Frequency, payload::frequency_domain_template())
                .with_ids(config.digital_id, config.if_id);

        Self {
            config,
            state,
            time_packet,
            freq_packet,
            scratch: Box::new([0u8; DATAGRAM_SIZE]),
            transport,
            clock,
        }
    }

    pub fn state(&self) -> EmissionState {
        self.state
    }

    pub fn packet(&self, kind: PacketKind) -> &LogicalPacket {
        match kind {
            PacketKind::Time => &self.time_packet,
            PacketKind::Frequency => &self.freq_packet,
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Sends one time/frequency pair, waits out both delays and advances the counters.
    pub fn run_cycle(&mut self) -> CycleReport {
        if self.config.include_packet_number {
            payload::stamp_packet_number(&mut self.time_packet.payload, self.state.packet_number);
            payload::stamp_packet_number(&mut self.freq_packet.payload, self.state.packet_number);
        }

        // One timestamp per pair, even if the tf gap straddles a second boundary.
        let unix_time = self.clock.unix_time();
        let pkt_in_batch = self.state.packet_counter;
        let mut send_failures = 0;

        self.time_packet.unix_time = unix_time;
        self.time_packet.pkt_in_batch = pkt_in_batch;
        if !self.emit(PacketKind::Time) {
            send_failures += 1;
        }
        self.clock.sleep(self.config.tf_delay);

        self.freq_packet.unix_time = unix_time;
        self.freq_packet.pkt_in_batch = pkt_in_batch;
        let triggered = payload::apply_trigger(
            &mut self.freq_packet.payload,
            self.state.signal_counter,
            self.config.do_trigger,
        );
        if triggered {
            info!(pkt_in_batch, unix_time, "Trigger!");
        }
        if !self.emit(PacketKind::Frequency) {
            send_failures += 1;
        }
        self.clock.sleep(self.config.pkt_delay);

        self.state.advance();

        CycleReport {
            unix_time,
            pkt_in_batch,
            triggered,
            send_failures,
        }
    }

    /// Runs `pairs` cycles, or forever when `pairs` is `None`.
    pub fn run(&mut self, pairs: Option<u64>) -> RunSummary {
        let mut summary = RunSummary::default();
        while pairs.is_none_or(|limit| summary.pairs < limit) {
            let report = self.run_cycle();
            summary.pairs += 1;
            summary.send_failures += u64::from(report.send_failures);
            if report.triggered {
                summary.triggers += 1;
            }
        }
        info!(
            pairs = summary.pairs,
            send_failures = summary.send_failures,
            triggers = summary.triggers,
            "Emission finished"
        );
        summary
    }

    fn emit(&mut self, kind: PacketKind) -> bool {
        let packet = match kind {
            PacketKind::Time => &self.time_packet,
            PacketKind::Frequency => &self.freq_packet,
        };
        let header = packet.pack();
        assemble_into(&header, &packet.payload, &mut self.scratch);

        debug!(
            kind = %kind,
            unix_time = packet.unix_time,
            pkt_in_batch = packet.pkt_in_batch,
            payload = ?payload::first_group(&packet.payload),
            header = %header,
            "Sending datagram"
        );

        match self.transport.send(&self.scratch[..]) {
            Ok(_) => true,
            Err(e) => {
                warn!(kind = %kind, pkt_in_batch = packet.pkt_in_batch, error = ?e, "Unable to send datagram");
                false
            }
        }
    }
}
