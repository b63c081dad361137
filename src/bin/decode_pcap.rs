//! Decode telemetry frames carried in the UDP datagrams of a pcap/pcapng capture.
//!
//! `decode_pcap CAPTURE DIALECT... [--port N] [--dump[=FILE]] [--log LEVEL]`

use anyhow::Context as _;
use clap::Parser;
use mavgen::config::{init_logging, LoggingConfig};
use mavgen::dialect::DialectSet;
use mavgen::dump::{dump_message, hex_string, packet_summary};
use mavgen::frame::DispatchTable;
use mavgen::stream::{decode_stream, ReceiveStats};
use pcap_parser::pcapng::Block as PcapNgBlock;
use pcap_parser::traits::{PcapNGPacketBlock, PcapReaderIterator};
use pcap_parser::{Linktype, PcapBlockOwned, PcapError};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "decode_pcap", about = "Decode telemetry frames from UDP datagrams in a capture")]
struct Args {
    /// pcap or pcapng capture.
    capture: PathBuf,
    /// Dialect files; every dialect given (and its includes) is decoded.
    #[arg(required = true)]
    dialects: Vec<PathBuf>,
    /// Only datagrams from or to this UDP port.
    #[arg(long)]
    port: Option<u16>,
    /// Dump every decoded message, to stdout or to FILE.
    #[arg(long, value_name = "FILE", num_args = 0..=1, default_missing_value = "-")]
    dump: Option<PathBuf>,
    /// Log filter used when RUST_LOG is unset.
    #[arg(long, default_value = "warn")]
    log: String,
}

#[derive(Debug, Default)]
struct Summary {
    packets: u64,
    datagrams: u64,
    decoded: u64,
    unknown: u64,
    removed: u64,
    stats: ReceiveStats,
    /// message name -> count
    per_message: BTreeMap<String, u64>,
    /// message id -> count, for ids outside the dispatch table
    unknown_ids: BTreeMap<u32, u64>,
    first_error: Option<String>,
}

impl Summary {
    fn add_stats(&mut self, s: &ReceiveStats) {
        self.stats.frames += s.frames;
        self.stats.bad_checksum += s.bad_checksum;
        self.stats.skipped_bytes += s.skipped_bytes;
        self.stats.unverified += s.unverified;
        self.stats.lost += s.lost;
    }
}

struct Decoder<'a> {
    table: &'a DispatchTable,
    port: Option<u16>,
    dump: Option<Box<dyn Write>>,
    summary: Summary,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&LoggingConfig {
        level: args.log.clone(),
        ..LoggingConfig::default()
    })
    .map_err(|e| anyhow::anyhow!("failed to init logging: {e}"))?;

    let mut set = DialectSet::new();
    for path in &args.dialects {
        let d = mavgen::load(path).with_context(|| format!("loading {}", path.display()))?;
        set.insert(d)?;
    }
    let names: Vec<String> = set.iter().map(|d| d.name.clone()).collect();
    let names: Vec<&str> = names.iter().map(String::as_str).collect();
    let table = set.dispatch_table(&names)?;

    let dump: Option<Box<dyn Write>> = match &args.dump {
        Some(p) if p.as_os_str() == "-" => Some(Box::new(std::io::stdout())),
        Some(p) => Some(Box::new(
            File::create(p).with_context(|| format!("creating dump file {}", p.display()))?,
        )),
        None => None,
    };
    let mut decoder = Decoder {
        table: &table,
        port: args.port,
        dump,
        summary: Summary::default(),
    };

    // pcap or pcapng, by the magic at the start of the file.
    let mut magic = [0u8; 4];
    {
        let mut f = File::open(&args.capture).with_context(|| format!("opening {}", args.capture.display()))?;
        f.read_exact(&mut magic)?;
    }
    let file = File::open(&args.capture)?;
    if magic == [0x0a, 0x0d, 0x0d, 0x0a] {
        run_pcapng(file, &mut decoder)?;
    } else {
        run_legacy_pcap(file, &mut decoder)?;
    }

    let s = &decoder.summary;
    eprintln!("capture:        {}", args.capture.display());
    eprintln!("dialects:       {}", names.join(", "));
    eprintln!("packets:        {}", s.packets);
    eprintln!("udp datagrams:  {}", s.datagrams);
    eprintln!("frames:         {}", s.stats.frames);
    eprintln!("decoded:        {}", s.decoded);
    eprintln!("unknown id:     {}", s.unknown);
    eprintln!("removed:        {}", s.removed);
    eprintln!("bad checksum:   {}", s.stats.bad_checksum);
    eprintln!("unverified:     {}", s.stats.unverified);
    eprintln!("skipped bytes:  {}", s.stats.skipped_bytes);
    eprintln!("sequence lost:  {}", s.stats.lost);
    if let Some(err) = &s.first_error {
        eprintln!("first error:    {}", err);
    }
    if !s.per_message.is_empty() {
        eprintln!("messages:");
        for (name, n) in &s.per_message {
            eprintln!("  {:<32} {}", name, n);
        }
    }
    if !s.unknown_ids.is_empty() {
        eprintln!("unknown ids (skipped):");
        for (id, n) in &s.unknown_ids {
            eprintln!("  {:>8}: {}", id, n);
        }
    }
    Ok(())
}

impl Decoder<'_> {
    fn datagram(&mut self, linktype: Linktype, frame: &[u8]) -> anyhow::Result<()> {
        self.summary.packets += 1;
        let Some(udp) = udp_payload_from_linktype(linktype, frame) else {
            return Ok(());
        };
        if let Some(port) = self.port {
            if udp.src_port != port && udp.dst_port != port {
                return Ok(());
            }
        }
        self.summary.datagrams += 1;

        let result = decode_stream(self.table, udp.payload);
        self.summary.add_stats(&result.stats);
        for m in &result.messages {
            match &m.message {
                Some(msg) => {
                    self.summary.decoded += 1;
                    *self.summary.per_message.entry(format!("{}::{}", msg.dialect, msg.name)).or_insert(0) += 1;
                    if let Some(w) = self.dump.as_mut() {
                        writeln!(w, "#{} {}", self.summary.packets, packet_summary(&m.packet, m.status))?;
                        writeln!(w, "{}", dump_message(self.table, msg))?;
                    }
                }
                None => {
                    self.summary.unknown += 1;
                    *self.summary.unknown_ids.entry(m.packet.message_id).or_insert(0) += 1;
                    if let Some(w) = self.dump.as_mut() {
                        writeln!(w, "#{} {}", self.summary.packets, packet_summary(&m.packet, m.status))?;
                        writeln!(w, "  payload: {}", hex_string(&m.packet.payload))?;
                    }
                }
            }
        }
        for r in result.removed {
            self.summary.removed += 1;
            if self.summary.first_error.is_none() {
                self.summary.first_error = Some(format!("id {}: {}", r.message_id, r.reason));
            }
        }
        Ok(())
    }
}

fn run_legacy_pcap<R: Read>(file: R, decoder: &mut Decoder) -> anyhow::Result<()> {
    let mut reader = pcap_parser::pcap::LegacyPcapReader::new(1 << 20, file)?;
    let mut linktype: Option<Linktype> = None;
    loop {
        match reader.next() {
            Ok((offset, block)) => {
                match block {
                    PcapBlockOwned::LegacyHeader(h) => linktype = Some(h.network),
                    PcapBlockOwned::Legacy(b) => decoder.datagram(linktype.unwrap_or(Linktype(1)), b.data)?,
                    PcapBlockOwned::NG(_) => {}
                }
                reader.consume(offset);
            }
            Err(PcapError::Eof) => break,
            Err(PcapError::Incomplete(_)) => {
                reader
                    .refill()
                    .map_err(|e| anyhow::anyhow!("pcap refill error: {:?}", e))?;
            }
            Err(e) => return Err(anyhow::anyhow!("pcap read error: {:?}", e)),
        }
    }
    Ok(())
}

fn run_pcapng<R: Read>(file: R, decoder: &mut Decoder) -> anyhow::Result<()> {
    let mut reader = pcap_parser::pcapng::PcapNGReader::new(1 << 20, file)?;
    let mut if_linktypes: Vec<Linktype> = Vec::new();
    loop {
        match reader.next() {
            Ok((offset, block)) => {
                if let PcapBlockOwned::NG(b) = block {
                    match &b {
                        PcapNgBlock::InterfaceDescription(idb) => if_linktypes.push(idb.linktype),
                        PcapNgBlock::EnhancedPacket(epb) => {
                            let lt = if_linktypes.get(epb.if_id as usize).copied().unwrap_or(Linktype(1));
                            decoder.datagram(lt, epb.packet_data())?;
                        }
                        PcapNgBlock::SimplePacket(spb) => {
                            let lt = if_linktypes.first().copied().unwrap_or(Linktype(1));
                            decoder.datagram(lt, spb.packet_data())?;
                        }
                        _ => {}
                    }
                }
                reader.consume(offset);
            }
            Err(PcapError::Eof) => break,
            Err(PcapError::Incomplete(_)) => {
                reader
                    .refill()
                    .map_err(|e| anyhow::anyhow!("pcapng refill error: {:?}", e))?;
            }
            Err(e) => return Err(anyhow::anyhow!("pcapng read error: {:?}", e)),
        }
    }
    Ok(())
}

struct Udp<'a> {
    src_port: u16,
    dst_port: u16,
    payload: &'a [u8],
}

/// Extract the UDP datagram from a captured frame, using linktype and IPv4/UDP length fields
/// so Ethernet padding of short frames is not included.
fn udp_payload_from_linktype(linktype: Linktype, frame: &[u8]) -> Option<Udp<'_>> {
    let l3 = match linktype.0 {
        1 => ethernet_l3(frame)?,    // DLT_EN10MB
        101 => frame,                // DLT_RAW
        113 => linux_sll_l3(frame)?, // DLT_LINUX_SLL
        _ => return None,
    };
    ipv4_udp(l3)
}

fn ethernet_l3(frame: &[u8]) -> Option<&[u8]> {
    if frame.len() < 14 {
        return None;
    }
    let mut off = 12usize;
    let mut ethertype = u16::from_be_bytes([frame[off], frame[off + 1]]);
    off += 2;
    // 802.1Q / 802.1ad tags
    while ethertype == 0x8100 || ethertype == 0x88a8 {
        if frame.len() < off + 4 {
            return None;
        }
        off += 2;
        ethertype = u16::from_be_bytes([frame[off], frame[off + 1]]);
        off += 2;
    }
    match ethertype {
        0x0800 => Some(&frame[off..]),
        _ => None,
    }
}

fn linux_sll_l3(frame: &[u8]) -> Option<&[u8]> {
    if frame.len() < 16 {
        return None;
    }
    match u16::from_be_bytes([frame[14], frame[15]]) {
        0x0800 => Some(&frame[16..]),
        _ => None,
    }
}

fn ipv4_udp(l3: &[u8]) -> Option<Udp<'_>> {
    if l3.len() < 20 || l3[0] >> 4 != 4 {
        return None;
    }
    let ihl = (l3[0] & 0x0f) as usize * 4;
    let total_len = u16::from_be_bytes([l3[2], l3[3]]) as usize;
    if ihl < 20 || l3.len() < ihl || total_len < ihl {
        return None;
    }
    let l3 = if total_len <= l3.len() { &l3[..total_len] } else { l3 };
    if l3.len() < ihl + 8 || l3[9] != 17 {
        return None;
    }
    let udp = &l3[ihl..];
    let udp_len = u16::from_be_bytes([udp[4], udp[5]]) as usize;
    if udp_len < 8 || udp.len() < udp_len {
        return None;
    }
    Some(Udp {
        src_port: u16::from_be_bytes([udp[0], udp[1]]),
        dst_port: u16::from_be_bytes([udp[2], udp[3]]),
        payload: &udp[8..udp_len],
    })
}
