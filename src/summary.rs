use std::fs::File;
use std::io::BufWriter;

use chrono::Utc;
use indoc::formatdoc;
use serde::Serialize;

use crate::crunch_processor::CrunchStats;
use crate::errors::HprofCrunchError;
use crate::utils::{percentage, pretty_bytes_size};

/// Outcome of a successful conversion.
#[derive(Debug, Serialize)]
pub struct CrunchSummary {
    pub input_len: u64,
    pub output_len: u64,
    pub stats: CrunchStats,
}

impl CrunchSummary {
    pub fn new(input_len: u64, stats: CrunchStats) -> Self {
        CrunchSummary {
            input_len,
            output_len: stats.bytes_written,
            stats,
        }
    }

    /// Output size as a percentage of the input size.
    pub fn compaction_ratio(&self) -> f64 {
        percentage(self.output_len, self.input_len)
    }

    pub fn render(&self) -> String {
        let stats = &self.stats;
        formatdoc!(
            "\nConversion summary:\n
            Input size: {}
            Output size: {} ({:.2}% of input)
            Strings: {}
            Classes loaded: {}
            Class definitions: {}
            Instance dumps: {}
            Legacy records copied: {}
            Records discarded: {}
            GC roots dropped: {}
            Object arrays skipped: {}
            Primitive arrays skipped: {}
            Object ids mapped: {}
            ",
            pretty_bytes_size(self.input_len),
            pretty_bytes_size(self.output_len),
            self.compaction_ratio(),
            stats.strings,
            stats.classes_loaded,
            stats.class_definitions,
            stats.instance_dumps,
            stats.legacy_records,
            stats.discarded_records,
            stats.gc_roots,
            stats.object_arrays_skipped,
            stats.primitive_arrays_skipped,
            stats.mapped_object_ids,
        )
    }

    pub fn save_as_file(&self) -> Result<(), HprofCrunchError> {
        let file_path = format!("hprof-crunch-{}.json", Utc::now().timestamp_millis());
        let file = File::create(&file_path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer(writer, &self)?;
        println!("Output JSON result file {file_path}");
        Ok(())
    }
}
