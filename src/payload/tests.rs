use super::*;

#[test]
fn time_template_first_group_is_zig_zagged() {
    let payload = time_domain_template();
    assert_eq!(first_group(&payload), [71, 5, 49, 5, 25, 5, 0, 5]);
    assert_eq!(true_order(&first_group(&payload)), [0, 5, 25, 5, 49, 5, 71, 5]);
}

#[test]
fn waveform_peak_truncates_to_signed_byte() {
    assert_eq!(waveform_sample(16), 0x80);
    assert_eq!(waveform_sample(17), 0x80);
    assert_eq!(waveform_sample(48), 0x80);
    assert_eq!(waveform_sample(40) as i8, -91);
    assert_eq!(waveform_sample(32), 0);
}

#[test]
fn waveform_repeats_every_64_bins() {
    for index in 0..256 {
        assert_eq!(waveform_sample(index), waveform_sample(index + 64), "bin {index}");
    }
}

#[test]
fn time_template_places_samples_at_reversed_positions() {
    let payload = time_domain_template();
    assert_eq!(payload[22], 0x80, "true bin 16 lands at wire offset 22");
    assert_eq!(payload[46] as i8, -91, "true bin 40 lands at wire offset 46");
    for group in payload.chunks_exact(GROUP_SIZE) {
        for marker in group.iter().skip(1).step_by(2) {
            assert_eq!(*marker, TIME_MARKER);
        }
    }
}

#[test]
fn frequency_template_alternates_one_and_two() {
    let payload = frequency_domain_template();
    for (index, byte) in payload.iter().enumerate() {
        let expected = if index % 2 == 0 { FREQ_SAMPLE } else { FREQ_MARKER };
        assert_eq!(*byte, expected, "offset {index}");
    }
}

#[test]
fn trigger_fires_only_at_threshold_when_enabled() {
    let mut payload = frequency_domain_template();
    for counter in 0..SIGNAL_COUNTER_MODULUS {
        let fired = apply_trigger(&mut payload, counter, true);
        assert_eq!(fired, counter == 14);
        let expected = if counter == 14 { 100 } else { 1 };
        assert_eq!(payload[TRIGGER_OFFSET], expected, "signal counter {counter}");
    }
}

#[test]
fn disabled_trigger_writes_the_quiet_value() {
    let mut payload = frequency_domain_template();
    assert!(!apply_trigger(&mut payload, SIGNAL_TRIGGER, false));
    assert_eq!(payload[TRIGGER_OFFSET], NO_TRIGGER_VALUE);
}

#[test]
fn packet_number_overwrites_first_true_bin() {
    let mut payload = time_domain_template();
    stamp_packet_number(&mut payload, 42);
    assert_eq!(payload[PACKET_NUMBER_OFFSET], 42);
    assert_eq!(true_order(&first_group(&payload))[0], 42);
    assert_eq!(payload[..6], [71, 5, 49, 5, 25, 5]);
}
