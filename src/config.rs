use crate::scheduler::EmissionConfig;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::level_filters::LevelFilter;

#[derive(Parser, Debug, Clone)]
#[command(about = "Streams simulated roach time/frequency packet pairs over UDP")]
pub struct Args {
    /// IP address to which the packets are sent
    #[arg(long, default_value = "127.0.0.1")]
    pub ip: String,

    /// Port to which the packets are sent
    #[arg(long, default_value_t = 23530)]
    pub port: u16,

    /// Delay between packet pairs (approximately the period of the packet cycle), e.g. 500ms, 1s
    #[arg(long, default_value = "500ms", value_parser = parse_duration)]
    pub pkt_delay: Duration,

    /// Delay between the time and frequency packets of a pair
    #[arg(long, default_value = "1ms", value_parser = parse_duration)]
    pub tf_delay: Duration,

    /// Whether to inject the trigger into the frequency packets
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub do_trig: bool,

    /// Whether to put the packet number in the first bin of both packets
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub incl_pkt_num: bool,

    /// Digital channel the simulated board reports
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..64))]
    pub digital_id: u8,

    /// IF input the simulated board reports
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..64))]
    pub if_id: u8,

    /// Stop after this many packet pairs instead of running until killed
    #[arg(long)]
    pub pairs: Option<u64>,

    /// Write logs to this file instead of stdout
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Default log level; RUST_LOG overrides it
    #[arg(long, default_value = "info")]
    pub log_level: LevelFilter,
}

impl Args {
    pub fn destination(&self) -> String {
        if self.ip.contains(':') && !self.ip.starts_with('[') {
            format!("[{}]:{}", self.ip, self.port)
        } else {
            format!("{}:{}", self.ip, self.port)
        }
    }

    pub fn emission_config(&self) -> EmissionConfig {
        EmissionConfig {
            pkt_delay: self.pkt_delay,
            tf_delay: self.tf_delay,
            do_trigger: self.do_trig,
            include_packet_number: self.incl_pkt_num,
            digital_id: self.digital_id,
            if_id: self.if_id,
        }
    }
}

/// Parses durations such as `500ms`, `1.5s`, `250us` or `1m30s`.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    if input == "0" {
        return Ok(Duration::ZERO);
    }
    if input.is_empty() {
        return Err("empty duration".to_string());
    }

    let mut total = Duration::ZERO;
    let mut rest = input;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(|| format!("missing unit in duration {input:?}"))?;
        let (number, tail) = rest.split_at(number_len);
        let value: f64 = number
            .parse()
            .map_err(|_| format!("invalid number {number:?} in duration {input:?}"))?;

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, next) = tail.split_at(unit_len);
        let nanos_per_unit = match unit {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            _ => return Err(format!("unknown unit {unit:?} in duration {input:?}")),
        };

        let nanos = (value * nanos_per_unit).round();
        if !nanos.is_finite() || nanos >= u64::MAX as f64 {
            return Err(format!("duration {input:?} out of range"));
        }
        total = total
            .checked_add(Duration::from_nanos(nanos as u64))
            .ok_or_else(|| format!("duration {input:?} out of range"))?;
        rest = next;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_emission_defaults() {
        let args = Args::parse_from(["roach_simulator"]);
        assert_eq!(args.emission_config(), EmissionConfig::default());
        assert_eq!(args.destination(), "127.0.0.1:23530");
        assert_eq!(args.pairs, None);
        assert_eq!(args.log_level, LevelFilter::INFO);
    }

    #[test]
    fn flags_override_defaults() {
        let args = Args::parse_from([
            "roach_simulator",
            "--ip",
            "10.0.0.5",
            "--port",
            "4000",
            "--pkt-delay",
            "1s",
            "--tf-delay",
            "250us",
            "--do-trig",
            "false",
            "--incl-pkt-num=false",
            "--digital-id",
            "3",
            "--pairs",
            "20",
        ]);
        let config = args.emission_config();
        assert_eq!(args.destination(), "10.0.0.5:4000");
        assert_eq!(config.pkt_delay, Duration::from_secs(1));
        assert_eq!(config.tf_delay, Duration::from_micros(250));
        assert!(!config.do_trigger);
        assert!(!config.include_packet_number);
        assert_eq!(config.digital_id, 3);
        assert_eq!(args.pairs, Some(20));
    }

    #[test]
    fn ids_wider_than_six_bits_are_rejected() {
        assert!(Args::try_parse_from(["roach_simulator", "--if-id", "64"]).is_err());
    }

    #[test]
    fn ipv6_destination_is_bracketed() {
        let args = Args::parse_from(["roach_simulator", "--ip", "::1"]);
        assert_eq!(args.destination(), "[::1]:23530");
    }

    #[test]
    fn parses_go_style_durations() {
        assert_eq!(parse_duration("500ms"), Ok(Duration::from_millis(500)));
        assert_eq!(parse_duration("1m30s"), Ok(Duration::from_secs(90)));
        assert_eq!(parse_duration("1.5s"), Ok(Duration::from_millis(1500)));
        assert_eq!(parse_duration("0"), Ok(Duration::ZERO));
        assert!(parse_duration("10").is_err());
        assert!(parse_duration("5 parsecs").is_err());
        assert!(parse_duration("").is_err());
    }
}
