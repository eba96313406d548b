use crate::packet::PAYLOAD_SIZE;
use std::f64::consts::PI;

#[cfg(test)]
mod tests;

/// Bytes per big-endian word on the board; sample order is reversed inside each group.
pub const GROUP_SIZE: usize = 8;

pub const TIME_MARKER: u8 = 5;
pub const FREQ_SAMPLE: u8 = 1;
pub const FREQ_MARKER: u8 = 2;

/// Wire offset of the first true-order sample bin after the zig-zag reordering.
pub const PACKET_NUMBER_OFFSET: usize = 6;
pub const TRIGGER_OFFSET: usize = 3;
pub const TRIGGER_VALUE: u8 = 100;
pub const NO_TRIGGER_VALUE: u8 = 1;

pub const SIGNAL_COUNTER_MODULUS: u8 = 16;
pub const SIGNAL_TRIGGER: u8 = 14;

/// Synthetic waveform value for the sample at `true_index`.
///
/// Consecutive index pairs share a sample, giving a 64-byte period. The
/// rounded value is truncated to eight bits, so the peak of 128 goes out as
/// `0x80`.
pub fn waveform_sample(true_index: usize) -> u8 {
    let phase = (true_index / 2) as f64 * PI / 16.0;
    (128.0 * phase.sin()).round() as i32 as i8 as u8
}

fn fill_template(sample: impl Fn(usize) -> u8, marker: u8) -> Box<[u8; PAYLOAD_SIZE]> {
    let mut payload = Box::new([0u8; PAYLOAD_SIZE]);
    for (group_index, group) in payload.chunks_exact_mut(GROUP_SIZE).enumerate() {
        for (pair, slot) in group.chunks_exact_mut(2).enumerate() {
            let true_index = group_index * GROUP_SIZE + (GROUP_SIZE - 2) - 2 * pair;
            slot[0] = sample(true_index);
            slot[1] = marker;
        }
    }
    payload
}

pub fn time_domain_template() -> Box<[u8; PAYLOAD_SIZE]> {
    fill_template(waveform_sample, TIME_MARKER)
}

pub fn frequency_domain_template() -> Box<[u8; PAYLOAD_SIZE]> {
    fill_template(|_| FREQ_SAMPLE, FREQ_MARKER)
}

pub fn stamp_packet_number(payload: &mut [u8; PAYLOAD_SIZE], packet_number: u8) {
    payload[PACKET_NUMBER_OFFSET] = packet_number;
}

/// Sets the trigger byte for this cycle and reports whether the trigger fired.
pub fn apply_trigger(payload: &mut [u8; PAYLOAD_SIZE], signal_counter: u8, enabled: bool) -> bool {
    let fire = enabled && signal_counter == SIGNAL_TRIGGER;
    payload[TRIGGER_OFFSET] = if fire { TRIGGER_VALUE } else { NO_TRIGGER_VALUE };
    fire
}

/// Undoes the zig-zag ordering of one wire group, yielding signed samples in true order.
pub fn true_order(group: &[u8; GROUP_SIZE]) -> [i8; GROUP_SIZE] {
    let mut samples = [0i8; GROUP_SIZE];
    for (pair, slot) in group.chunks_exact(2).enumerate() {
        let true_index = (GROUP_SIZE - 2) - 2 * pair;
        samples[true_index] = slot[0] as i8;
        samples[true_index + 1] = slot[1] as i8;
    }
    samples
}

/// First wire group of `payload`, in as-sent order.
pub fn first_group(payload: &[u8; PAYLOAD_SIZE]) -> [u8; GROUP_SIZE] {
    let mut group = [0u8; GROUP_SIZE];
    group.copy_from_slice(&payload[..GROUP_SIZE]);
    group
}
