pub mod queue_worker;
pub mod single_process;

/// The summary a CLI `run` invocation prints (§7 "User-visible
/// failures"): discovered/fetched/skipped-duplicate/expanded/parsed
/// counters plus the first ten per-phase errors, used both for the exit
/// code (0 clean, 2 completed-with-errors, 1 fatal) and for `-o json`.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct RunSummary {
    pub run_id: Option<uuid::Uuid>,
    pub discovered: usize,
    pub fetched: usize,
    pub skipped_duplicate: usize,
    pub expanded: usize,
    pub parsed: usize,
    pub total_rows: usize,
    pub valid_rows: usize,
    pub persisted: usize,
    pub price_changes: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

const MAX_REPORTED_ERRORS: usize = 10;

impl RunSummary {
    pub fn push_error(&mut self, message: impl Into<String>) {
        self.failed += 1;
        if self.errors.len() < MAX_REPORTED_ERRORS {
            self.errors.push(message.into());
        }
    }

    /// §7 exit codes: 0 clean, 2 completed-with-errors, 1 fatal. Fatal is
    /// signalled separately (a propagating error before this summary
    /// exists); this only distinguishes clean from completed-with-errors.
    pub fn exit_code(&self) -> i32 {
        if self.failed == 0 { 0 } else { 2 }
    }
}
