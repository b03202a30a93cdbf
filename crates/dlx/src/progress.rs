//! 📊 progress.rs: "Are we there yet?": every pipeline, every time, forever.
//!
//! 🚀 A progress bar per pipeline while it runs, and one comfy table at the end that
//! says how it all went. The bar counts records against the total the envelope
//! reported, so `/users` gets a real ETA and `/content` gets a bar that fills in one go.
//!
//! ⚠️  Warning: Watching this progress bar will not make it go faster.
//! Neither will refreshing it. We've tried. Science says no.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets::NOTHING, presets::UTF8_FULL_CONDENSED};
use indicatif::{ProgressBar, ProgressStyle};

use crate::supervisors::{PipelineOutcome, RunSummary};

/// 🔢 Formats a number with commas for the 3 people in the audience who like readability.
/// "1000000 records" → "1,000,000 records": you're welcome, eyes.
pub(crate) fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().enumerate() {
        if i > 0 && (s.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}

/// ⏱️ Formats a Duration into MM:SS or HH:MM:SS.
/// If it shows HH:MM:SS, the data server is having a day.
pub(crate) fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

struct Rates {
    records_per_sec: f64,
    percent_per_sec: f64,
}

/// 📊 Tracks records fetched for one pipeline and draws them on an indicatif bar.
///
/// Uses a sliding 5-second window for rates so one slow page doesn't scare anybody.
/// With `show == false` the bar is hidden but the counting still happens, which keeps
/// tests and `--quiet`-style runs on the same code path.
pub(crate) struct ProgressMetrics {
    label: String,
    /// 📏 records we expect. 0 until the first envelope tells us.
    total_records: u64,
    records_done: u64,
    progress_bar: ProgressBar,
    rate_samples: VecDeque<(Instant, u64)>,
    start_time: Instant,
}

impl std::fmt::Debug for ProgressMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // -- 🎭 ProgressBar is a diva and doesn't derive Debug
        f.debug_struct("ProgressMetrics")
            .field("label", &self.label)
            .field("total_records", &self.total_records)
            .field("records_done", &self.records_done)
            .finish()
    }
}

impl ProgressMetrics {
    pub(crate) fn new(label: String, show: bool) -> Self {
        let progress_bar = if show { ProgressBar::new(0) } else { ProgressBar::hidden() };
        if let Ok(style) = ProgressStyle::default_bar().template("{msg}\n| [{bar:40.cyan/blue}]") {
            progress_bar.set_style(style.progress_chars("=>-"));
        }

        let start_time = Instant::now();
        // -- 🔄 seed the rate window with t=0 so we don't divide by zero like animals
        let mut rate_samples = VecDeque::new();
        rate_samples.push_back((start_time, 0u64));

        Self {
            label,
            total_records: 0,
            records_done: 0,
            progress_bar,
            rate_samples,
            start_time,
        }
    }

    /// 📏 The envelope finally told us how big the collection is.
    pub(crate) fn set_total(&mut self, total_records: u64) {
        self.total_records = total_records;
        self.progress_bar.set_length(total_records);
    }

    pub(crate) fn records_done(&self) -> u64 {
        self.records_done
    }

    /// 🔄 Another page arrived. Accumulate, recalculate, redraw.
    pub(crate) fn update(&mut self, records: u64) {
        self.records_done += records;
        let rates = self.calculate_rates();
        self.render(rates);
        self.progress_bar.set_position(self.records_done);
    }

    /// ✅ Ring the bell. We made it.
    pub(crate) fn finish(&self) {
        self.progress_bar.finish();
    }

    /// 💀 Leave the bar where it stopped, so the last frame shows how far we got.
    pub(crate) fn abandon(&self) {
        self.progress_bar.abandon();
    }

    fn calculate_rates(&mut self) -> Rates {
        let now = Instant::now();
        let window = Duration::from_secs(5);
        while let Some(&(timestamp, _)) = self.rate_samples.front() {
            if now.duration_since(timestamp) > window {
                self.rate_samples.pop_front();
            } else {
                break;
            }
        }
        self.rate_samples.push_back((now, self.records_done));

        if let Some(&(oldest_time, oldest_records)) = self.rate_samples.front() {
            let elapsed = now.duration_since(oldest_time).as_secs_f64();
            if elapsed > 0.0 {
                let records_delta = self.records_done.saturating_sub(oldest_records);
                let percent_delta = if self.total_records > 0 {
                    (records_delta as f64 / self.total_records as f64) * 100.0
                } else {
                    0.0
                };
                return Rates {
                    records_per_sec: records_delta as f64 / elapsed,
                    percent_per_sec: percent_delta / elapsed,
                };
            }
        }

        // -- 💤 not enough elapsed time yet, return zeros and maintain composure
        Rates {
            records_per_sec: 0.0,
            percent_per_sec: 0.0,
        }
    }

    fn percent(&self) -> f64 {
        if self.total_records > 0 {
            (self.records_done as f64 / self.total_records as f64) * 100.0
        } else {
            0.0
        }
    }

    /// 🎨 Render the live table as the bar's message.
    ///
    /// ```text
    /// pipeline: <label>
    /// | [=====>----------]
    ///   <records/s>   <done / total>
    ///   <%/s>         <%>
    ///   <elapsed>     <remaining>
    /// ```
    fn render(&self, rates: Rates) {
        let percent = self.percent();
        let elapsed = self.start_time.elapsed();
        let remaining = if percent > 0.0 {
            // 🔮 linear extrapolation. assumes the future looks like the past.
            let total_estimated = elapsed.as_secs_f64() / (percent / 100.0);
            let remaining_secs = total_estimated - elapsed.as_secs_f64();
            if remaining_secs > 0.0 {
                format_duration(Duration::from_secs_f64(remaining_secs))
            } else {
                "--:--".to_string()
            }
        } else {
            "--:--".to_string()
        };

        let mut table = Table::new();
        table.load_preset(NOTHING);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.add_row(vec![
            Cell::new(format!("{} Records/s", format_number(rates.records_per_sec as u64)))
                .set_alignment(CellAlignment::Right),
            Cell::new(format!(
                "{} / {} Records",
                format_number(self.records_done),
                format_number(self.total_records)
            ))
            .set_alignment(CellAlignment::Right),
        ]);
        table.add_row(vec![
            Cell::new(format!("{:.2} %/s", rates.percent_per_sec)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.2}%", percent)).set_alignment(CellAlignment::Right),
        ]);
        table.add_row(vec![
            Cell::new(format!("{} elapsed", format_duration(elapsed))).set_alignment(CellAlignment::Right),
            Cell::new(format!("{} remaining", remaining)).set_alignment(CellAlignment::Right),
        ]);

        self.progress_bar
            .set_message(format!("pipeline: {}\n{}", self.label, table));
    }
}

/// 🍽️ The end-of-run table: one row per pipeline, in the order they ran.
pub fn summary_table(summary: &RunSummary) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Entity", "Status", "Records", "Objects", "Elapsed"]);

    for outcome in &summary.outcomes {
        match outcome {
            PipelineOutcome::Completed(report) => table.add_row(vec![
                Cell::new(report.entity.as_str()),
                Cell::new("✅ ok"),
                Cell::new(format_number(report.records)).set_alignment(CellAlignment::Right),
                Cell::new(format_number(report.objects.len() as u64)).set_alignment(CellAlignment::Right),
                Cell::new(format_duration(report.elapsed)).set_alignment(CellAlignment::Right),
            ]),
            PipelineOutcome::Failed { entity, .. } => table.add_row(vec![
                Cell::new(entity.as_str()),
                Cell::new("💀 failed"),
                Cell::new("-").set_alignment(CellAlignment::Right),
                Cell::new("-").set_alignment(CellAlignment::Right),
                Cell::new("-").set_alignment(CellAlignment::Right),
            ]),
        };
    }
    table
}
