//! Line-oriented log of kernel activity.
//!
//! Each scheduled, executed or removed event produces one line:
//!
//! ```text
//! i <cur_uid> <cur_ts> <uid> <ts>    insert, issued by event cur_uid at cur_ts
//! e <uid> <ts>                       execution
//! r <cur_uid> <cur_ts> <uid> <ts>    removal
//! ```
//!
//! Timestamps are in time steps. Two runs of the same model produce the
//! same log, which makes it a cheap determinism check.

use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// One line of the trace log.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TraceRecord {
    Insert {
        cur_uid: u64,
        cur_ts: u64,
        uid: u64,
        ts: u64,
    },
    Execute {
        uid: u64,
        ts: u64,
    },
    Remove {
        cur_uid: u64,
        cur_ts: u64,
        uid: u64,
        ts: u64,
    },
}

impl TraceRecord {
    /// Parses a single log line. Returns `None` for malformed input.
    pub fn parse(line: &str) -> Option<TraceRecord> {
        let mut fields = line.split_whitespace();
        let tag = fields.next()?;
        let nums: Vec<u64> = fields.map(|f| f.parse().ok()).collect::<Option<_>>()?;
        match (tag, nums.as_slice()) {
            ("i", &[cur_uid, cur_ts, uid, ts]) => Some(TraceRecord::Insert {
                cur_uid,
                cur_ts,
                uid,
                ts,
            }),
            ("e", &[uid, ts]) => Some(TraceRecord::Execute { uid, ts }),
            ("r", &[cur_uid, cur_ts, uid, ts]) => Some(TraceRecord::Remove {
                cur_uid,
                cur_ts,
                uid,
                ts,
            }),
            _ => None,
        }
    }
}

impl fmt::Display for TraceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            TraceRecord::Insert {
                cur_uid,
                cur_ts,
                uid,
                ts,
            } => write!(f, "i {} {} {} {}", cur_uid, cur_ts, uid, ts),
            TraceRecord::Execute { uid, ts } => write!(f, "e {} {}", uid, ts),
            TraceRecord::Remove {
                cur_uid,
                cur_ts,
                uid,
                ts,
            } => write!(f, "r {} {} {} {}", cur_uid, cur_ts, uid, ts),
        }
    }
}

/// Trace sink attached to a simulator.
pub struct TraceLog {
    writer: Box<dyn Write + Send>,
    lines: u64,
}

impl TraceLog {
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self { writer, lines: 0 }
    }

    /// Creates (or truncates) `path` and logs to it through a buffer.
    pub fn to_file<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new(Box::new(BufWriter::new(file))))
    }

    pub fn write(&mut self, record: &TraceRecord) -> io::Result<()> {
        writeln!(self.writer, "{}", record)?;
        self.lines += 1;
        Ok(())
    }

    /// Number of lines written so far.
    pub fn lines(&self) -> u64 {
        self.lines
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

impl fmt::Debug for TraceLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraceLog").field("lines", &self.lines).finish()
    }
}
