use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::device::{MacLow, ProductType};
use crate::test::runner::TestType;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "switchcfg",
    about = "Configure and function-test smart switch devices over a serial link"
)]
pub struct Cli {
    /// More log output (-v debug, -vv trace). RUST_LOG wins when set.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
    /// Only log errors
    #[arg(short, long, default_value_t = false, global = true)]
    pub quiet: bool,
    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Cmd {
    /// List serial ports
    Ports,
    /// Encode the device configuration and send it
    Configure(ConfigureOpts),
    /// Probe whether the device answers
    Status(SerialOpts),
    /// Run a single functional test
    Test(TestOpts),
    /// Run an ordered list of functional tests
    Sequence(SequenceOpts),
    /// Check a hex-encoded configuration packet
    Inspect(InspectOpts),
}

#[derive(Args, Debug, Clone)]
pub struct SerialOpts {
    /// Serial device path
    #[arg(long, default_value = "/dev/ttyUSB0")]
    pub dev: String,
    /// Baud rate
    #[arg(long, default_value_t = 115_200)]
    pub baud: u32,
    /// Enable RTS/CTS
    #[arg(long, default_value_t = false)]
    pub rtscts: bool,
    /// Response timeout in milliseconds
    #[arg(long, default_value_t = 5_000)]
    pub timeout_ms: u64,
    /// Delay after opening the port before the first write
    #[arg(long, default_value_t = 500)]
    pub settle_ms: u64,
}

#[derive(Args, Debug, Clone)]
pub struct ConfigureOpts {
    #[command(flatten)]
    pub ser: SerialOpts,
    /// TOML file with device settings; missing keys take factory defaults
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Product type (light, outlet, dimming)
    #[arg(long)]
    pub product: Option<ProductType>,
    /// Low two MAC bytes as hex, e.g. 0A1B
    #[arg(long)]
    pub mac: Option<MacLow>,
    /// SUB ID (0-255)
    #[arg(long)]
    pub sub_id: Option<u8>,
}

#[derive(Args, Debug, Clone)]
pub struct TestOpts {
    #[command(flatten)]
    pub ser: SerialOpts,
    /// Test name, e.g. touch, ir, buzzer
    pub name: String,
}

#[derive(Args, Debug, Clone)]
pub struct SequenceOpts {
    #[command(flatten)]
    pub ser: SerialOpts,
    /// Tests in run order; all eight when omitted
    pub tests: Vec<TestType>,
    /// Repeat the sequence this many times
    #[arg(long, default_value_t = 1)]
    pub rounds: u32,
    /// Device settings the results are recorded against
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct InspectOpts {
    /// Packet bytes as hex; spaces and colons are ignored
    pub hex: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sequence_with_defaults() {
        let cli = Cli::parse_from(["switchcfg", "sequence", "touch", "led"]);
        match cli.cmd {
            Cmd::Sequence(opts) => {
                assert_eq!(opts.tests, vec![TestType::Touch, TestType::Led]);
                assert_eq!(opts.rounds, 1);
                assert_eq!(opts.ser.baud, 115_200);
                assert_eq!(opts.ser.timeout_ms, 5_000);
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn parses_configure_overrides() {
        let cli = Cli::parse_from([
            "switchcfg", "-vv", "configure", "--dev", "/dev/ttyS3", "--product", "dimming", "--mac",
            "0A1B", "--sub-id", "7",
        ]);
        assert_eq!(cli.verbose, 2);
        match cli.cmd {
            Cmd::Configure(opts) => {
                assert_eq!(opts.ser.dev, "/dev/ttyS3");
                assert_eq!(opts.product, Some(ProductType::DimmingSwitch));
                assert_eq!(opts.mac, Some(MacLow([0x0A, 0x1B])));
                assert_eq!(opts.sub_id, Some(7));
                assert!(opts.config.is_none());
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn rejects_unknown_sequence_entry() {
        assert!(Cli::try_parse_from(["switchcfg", "sequence", "touch", "laser"]).is_err());
    }
}
