use anyhow::Result;

use crate::cli::InspectOpts;
use crate::packet::{PACKET_LEN, Packet, parse_hex, validate};

pub fn run(opts: InspectOpts) -> Result<bool> {
    let bytes = parse_hex(&opts.hex)?;
    if !validate(&bytes) {
        println!("INVALID ({} bytes, expected {})", bytes.len(), PACKET_LEN);
        return Ok(false);
    }
    let packet = Packet::try_from(bytes.as_slice())?;
    match packet.timestamp() {
        Some(ts) => println!("VALID  stamped {}", ts.format("%Y-%m-%d %H:%M")),
        None => println!("VALID  (timestamp bytes do not form a date)"),
    }
    Ok(true)
}
