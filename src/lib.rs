//! Configuration and functional testing of smart switch devices over a
//! serial link: the 40-byte configuration packet, the command/response
//! protocol, and the test runner and sequencer built on it.

pub mod checksum;
pub mod cli;
pub mod configure;
pub mod device;
pub mod inspect;
pub mod logger;
pub mod packet;
pub mod port;
pub mod proto;
pub mod stats;
pub mod test;
