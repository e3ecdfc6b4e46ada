use pcap_parser::PcapError;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Generic(&'static str),
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("capture file error: {0:?}")]
    Pcap(PcapError<&'static [u8]>),
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<&'static str> for Error {
    fn from(s: &'static str) -> Self {
        Error::Generic(s)
    }
}

impl From<PcapError<&[u8]>> for Error {
    fn from(e: PcapError<&[u8]>) -> Self {
        Error::Pcap(e.to_owned_vec())
    }
}

impl From<PcapError<Vec<u8>>> for Error {
    fn from(e: PcapError<Vec<u8>>) -> Self {
        Error::Pcap(e.to_owned_vec())
    }
}
