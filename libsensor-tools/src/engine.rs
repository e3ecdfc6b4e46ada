use crate::analyzer::FrameAnalyzer;
use crate::config::Config;
use crate::context::*;
use crate::error::Error;
use crate::frame::Frame;
use crate::timestamp::{Timestamp, MICROS_PER_SEC};
use pcap_parser::{Block, Linktype, PcapBlockOwned, PcapError};
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// pcap/pcap-ng replay engine
///
/// `CaptureFileEngine` iterates over a pcap input, abstracts the file format
/// (legacy pcap or pcap-ng, timestamp resolution, interfaces) and hands every
/// Ethernet frame to the wrapped `FrameAnalyzer`, in file order.
///
/// ## example
///
/// ```
/// use libsensor_tools::{CaptureContext, CaptureFileEngine, Config, Error, Frame, FrameAnalyzer};
/// #[derive(Default)]
/// pub struct CountingAnalyzer {
///     frame_count: usize,
/// }
///
/// impl FrameAnalyzer for CountingAnalyzer {
///     fn handle_frame(&mut self, _frame: &Frame, _ctx: &CaptureContext) -> Result<(), Error> {
///         self.frame_count += 1;
///         Ok(())
///     }
/// }
///
/// let config = Config::default();
/// let mut engine = CaptureFileEngine::new(CountingAnalyzer::default(), &config);
///
/// // `engine.run()` can take any `Read` as input
/// use std::io::Cursor;
/// let mut input = Cursor::new(vec![1, 2, 3, 4, 5]);
/// let res = engine.run(&mut input);
/// assert!(res.is_err());
/// ```
pub struct CaptureFileEngine<A: FrameAnalyzer> {
    analyzer: A,

    capacity: usize,
    stop: Option<Arc<AtomicBool>>,

    ctx: CaptureContext,
    interfaces: Vec<InterfaceInfo>,
    skipped_link_types: Vec<Linktype>,
}

impl<A: FrameAnalyzer> CaptureFileEngine<A> {
    pub fn new(analyzer: A, config: &Config) -> Self {
        let capacity = config
            .get_usize("buffer_initial_capacity")
            .unwrap_or(128 * 1024);
        CaptureFileEngine {
            analyzer,
            capacity,
            stop: None,
            ctx: CaptureContext::default(),
            interfaces: Vec::new(),
            skipped_link_types: Vec::new(),
        }
    }

    /// Stop reading (between blocks) as soon as `stop` is set
    pub fn with_stop_flag(self, stop: Arc<AtomicBool>) -> Self {
        CaptureFileEngine {
            stop: Some(stop),
            ..self
        }
    }

    pub fn analyzer(&self) -> &A {
        &self.analyzer
    }

    pub fn analyzer_mut(&mut self) -> &mut A {
        &mut self.analyzer
    }

    fn stop_requested(&self) -> bool {
        self.stop
            .as_ref()
            .is_some_and(|stop| stop.load(Ordering::SeqCst))
    }

    /// Main function: given a reader, read all pcap data and call analyzer for each Frame
    pub fn run(&mut self, input: &mut (dyn Read + Send)) -> Result<(), Error> {
        let mut reader = pcap_parser::create_reader(self.capacity, input)?;

        self.analyzer.init()?;
        let mut block_index = 0usize;
        let mut last_incomplete_index = 0;

        let result = loop {
            if self.stop_requested() {
                debug!("Replay: stop requested");
                break Ok(());
            }
            match reader.next() {
                Ok((offset, block)) => {
                    block_index += 1;
                    let res = self.handle_block(&block);
                    reader.consume(offset);
                    if let Err(e) = res {
                        break Err(e);
                    }
                }
                Err(PcapError::Eof) => break Ok(()),
                Err(PcapError::Incomplete(_)) => {
                    if last_incomplete_index == block_index && reader.reader_exhausted() {
                        warn!("Could not read complete data block (block_index={block_index})");
                        warn!("Hint: the input file may be truncated.");
                        break Ok(());
                    }
                    last_incomplete_index = block_index;
                    trace!("need refill");
                    if let Err(e) = reader.refill() {
                        break Err(Error::from(e));
                    }
                }
                Err(e) => {
                    let e = e.to_owned_vec();
                    error!("error while reading: {e:?}");
                    break Err(Error::Pcap(e));
                }
            }
        };

        self.analyzer.teardown();
        result
    }

    fn handle_block(&mut self, block: &PcapBlockOwned) -> Result<(), Error> {
        let frame = match block {
            PcapBlockOwned::NG(Block::SectionHeader(_)) => {
                // reset section-related variables
                self.interfaces = Vec::new();
                return Ok(());
            }
            PcapBlockOwned::NG(Block::InterfaceDescription(idb)) => {
                self.interfaces.push(pcapng_build_interface(idb));
                return Ok(());
            }
            PcapBlockOwned::LegacyHeader(hdr) => {
                let ts_unit = if hdr.is_nanosecond_precision() {
                    1_000_000_000
                } else {
                    1_000_000
                };
                self.interfaces.push(InterfaceInfo {
                    link_type: hdr.network,
                    ts_unit,
                    if_tsoffset: 0,
                    snaplen: hdr.snaplen,
                });
                debug!("Legacy pcap, link type: {}", hdr.network);
                return Ok(());
            }
            PcapBlockOwned::NG(Block::EnhancedPacket(epb)) => {
                let if_info = self
                    .interfaces
                    .get(epb.if_id as usize)
                    .ok_or(Error::Generic("Enhanced packet references unknown interface"))?;
                let (ts_sec, ts_frac) = pcap_parser::build_ts(
                    epb.ts_high,
                    epb.ts_low,
                    if_info.if_tsoffset,
                    if_info.ts_unit,
                );
                let ts = Timestamp::new(ts_sec, to_micros(ts_frac, if_info.ts_unit));
                Frame {
                    ts,
                    link_type: if_info.link_type,
                    data: epb.data,
                    caplen: epb.caplen,
                    origlen: epb.origlen,
                    frame_index: 0,
                }
            }
            PcapBlockOwned::NG(Block::SimplePacket(spb)) => {
                let if_info = self
                    .interfaces
                    .first()
                    .ok_or(Error::Generic("Simple packet without interface"))?;
                Frame {
                    ts: Timestamp::default(),
                    link_type: if_info.link_type,
                    data: spb.data,
                    caplen: spb.data.len() as u32,
                    origlen: spb.origlen,
                    frame_index: 0,
                }
            }
            PcapBlockOwned::Legacy(b) => {
                let if_info = self
                    .interfaces
                    .first()
                    .ok_or(Error::Generic("Legacy packet without file header"))?;
                Frame {
                    ts: Timestamp::new(b.ts_sec, to_micros(b.ts_usec, if_info.ts_unit)),
                    link_type: if_info.link_type,
                    data: b.data,
                    caplen: b.caplen,
                    origlen: b.origlen,
                    frame_index: 0,
                }
            }
            _ => {
                trace!("ignoring block");
                return Ok(());
            }
        };
        if frame.link_type != Linktype::ETHERNET {
            if !self.skipped_link_types.contains(&frame.link_type) {
                warn!("Unsupported link type {}, skipping frames", frame.link_type);
                self.skipped_link_types.push(frame.link_type);
            }
            return Ok(());
        }
        let frame_index = self.ctx.update(frame.ts);
        let frame = Frame {
            frame_index,
            ..frame
        };
        self.analyzer.handle_frame(&frame, &self.ctx)
    }
}

fn to_micros(frac: u32, ts_unit: u64) -> u32 {
    let unit = u64::from(MICROS_PER_SEC);
    if ts_unit > unit {
        (u64::from(frac) / (ts_unit / unit)) as u32
    } else if ts_unit < unit && ts_unit > 0 {
        (u64::from(frac) * (unit / ts_unit)) as u32
    } else {
        frac
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[derive(Default)]
    struct Recorder {
        frames: Vec<(usize, Timestamp, Vec<u8>)>,
        torn_down: bool,
    }

    impl FrameAnalyzer for Recorder {
        fn handle_frame(&mut self, frame: &Frame, ctx: &CaptureContext) -> Result<(), Error> {
            assert_eq!(frame.frame_index, ctx.frame_index);
            self.frames
                .push((frame.frame_index, frame.ts, frame.captured().to_vec()));
            Ok(())
        }
        fn teardown(&mut self) {
            self.torn_down = true;
        }
    }

    fn legacy_pcap(link_type: u32, nanos: bool, records: &[(u32, u32, &[u8])]) -> Vec<u8> {
        let magic: u32 = if nanos { 0xa1b2_3c4d } else { 0xa1b2_c3d4 };
        let mut v = Vec::new();
        v.extend_from_slice(&magic.to_le_bytes());
        v.extend_from_slice(&2u16.to_le_bytes());
        v.extend_from_slice(&4u16.to_le_bytes());
        v.extend_from_slice(&0i32.to_le_bytes());
        v.extend_from_slice(&0u32.to_le_bytes());
        v.extend_from_slice(&65535u32.to_le_bytes());
        v.extend_from_slice(&link_type.to_le_bytes());
        for (secs, frac, data) in records {
            v.extend_from_slice(&secs.to_le_bytes());
            v.extend_from_slice(&frac.to_le_bytes());
            v.extend_from_slice(&(data.len() as u32).to_le_bytes());
            v.extend_from_slice(&(data.len() as u32).to_le_bytes());
            v.extend_from_slice(data);
        }
        v
    }

    #[test]
    fn replay_legacy_pcap() {
        let f1 = [0xaau8; 60];
        let f2 = [0xbbu8; 42];
        let data = legacy_pcap(1, false, &[(100, 250_000, &f1), (101, 0, &f2)]);
        let mut engine = CaptureFileEngine::new(Recorder::default(), &Config::default());
        engine.run(&mut Cursor::new(data)).expect("replay");
        let rec = engine.analyzer();
        assert!(rec.torn_down);
        assert_eq!(rec.frames.len(), 2);
        assert_eq!(rec.frames[0].0, 1);
        assert_eq!(rec.frames[0].1, Timestamp::new(100, 250_000));
        assert_eq!(rec.frames[0].2, f1.to_vec());
        assert_eq!(rec.frames[1].0, 2);
        assert_eq!(rec.frames[1].2.len(), 42);
    }

    #[test]
    fn replay_nanosecond_precision() {
        let f1 = [0u8; 20];
        let data = legacy_pcap(1, true, &[(7, 500_000_000, &f1)]);
        let mut engine = CaptureFileEngine::new(Recorder::default(), &Config::default());
        engine.run(&mut Cursor::new(data)).expect("replay");
        assert_eq!(engine.analyzer().frames[0].1, Timestamp::new(7, 500_000));
    }

    #[test]
    fn replay_skips_non_ethernet() {
        let f1 = [0u8; 20];
        // LINKTYPE_RAW
        let data = legacy_pcap(101, false, &[(1, 0, &f1)]);
        let mut engine = CaptureFileEngine::new(Recorder::default(), &Config::default());
        engine.run(&mut Cursor::new(data)).expect("replay");
        assert!(engine.analyzer().frames.is_empty());
    }

    #[test]
    fn replay_honours_stop_flag() {
        let f1 = [0u8; 20];
        let data = legacy_pcap(1, false, &[(1, 0, &f1), (2, 0, &f1)]);
        let stop = Arc::new(AtomicBool::new(true));
        let mut engine =
            CaptureFileEngine::new(Recorder::default(), &Config::default()).with_stop_flag(stop);
        engine.run(&mut Cursor::new(data)).expect("replay");
        assert!(engine.analyzer().frames.is_empty());
        assert!(engine.analyzer().torn_down);
    }

    #[test]
    fn replay_rejects_non_pcap() {
        let mut engine = CaptureFileEngine::new(Recorder::default(), &Config::default());
        assert!(engine.run(&mut Cursor::new(b"not a capture file at all".to_vec())).is_err());
    }
}
