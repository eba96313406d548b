use anyhow::Result;
use clap::Parser;
use roachsim::config::Args;
use roachsim::logging::init_logging;
use roachsim::packet::{DATAGRAM_SIZE, PAYLOAD_SIZE, PacketKind};
use roachsim::payload::{first_group, true_order};
use roachsim::scheduler::{EmissionScheduler, SystemClock};
use roachsim::transport::{UdpTransport, ip_packet_size, needs_jumbo_frames};
use tracing::{error, info, warn};

fn main() -> Result<()> {
    let args = Args::parse();
    let _guard = init_logging(args.log_file.as_deref(), args.log_level)?;

    let config = args.emission_config();
    let destination = args.destination();
    info!(
        pkt_delay = ?config.pkt_delay,
        tf_delay = ?config.tf_delay,
        do_trigger = config.do_trigger,
        include_packet_number = config.include_packet_number,
        "Timing configured"
    );
    info!(destination = %destination, "Addressing packets");

    let transport = UdpTransport::connect(&destination).inspect_err(|e| {
        error!(destination = %destination, error = ?e, "Failed to open UDP transport");
    })?;

    let local = transport.local_addr()?;
    let ip_size = ip_packet_size(local, transport.peer(), DATAGRAM_SIZE);
    info!(
        payload_size = PAYLOAD_SIZE,
        datagram_size = DATAGRAM_SIZE,
        ip_packet_size = ip_size,
        "Packet sizes"
    );
    if needs_jumbo_frames(ip_size) {
        warn!(
            ip_packet_size = ip_size,
            "Datagrams exceed a standard 1500-byte MTU; off-host receivers need jumbo frames"
        );
    }

    let mut scheduler = EmissionScheduler::new(config, transport, SystemClock);
    for kind in [PacketKind::Time, PacketKind::Frequency] {
        let group = first_group(&scheduler.packet(kind).payload);
        info!(
            kind = %kind,
            true_order = ?true_order(&group),
            as_sent = ?group,
            "First payload group (some bins change every cycle)"
        );
    }

    scheduler.run(args.pairs);
    Ok(())
}
