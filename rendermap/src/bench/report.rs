//! Result of a benchmark run.

use std::fmt;
use std::time::Duration;

/// What a run measured.
///
/// `Display` renders the classic report:
///
/// ```text
/// Running graph rendering with nsize = 1024
/// Generating iterations = 1
/// Num of partitions = 4
/// ELAPSED TIME =   0.412 s
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BenchmarkReport {
    /// Elements in the collection.
    pub nsize: u64,
    pub niter: i64,
    pub npar: i64,
    /// From just before the acquire until the release completed.
    pub elapsed: Duration,
    /// Element reads performed by all workers.
    pub elements_read: u64,
}

impl BenchmarkReport {
    /// Header lines, printed before the timing.
    pub fn header(&self) -> String {
        format!(
            "Running graph rendering with nsize = {}\nGenerating iterations = {}\nNum of partitions = {}",
            self.nsize, self.niter, self.npar
        )
    }

    pub fn elapsed_line(&self) -> String {
        format!("ELAPSED TIME = {:7.3} s", self.elapsed.as_secs_f64())
    }
}

impl fmt::Display for BenchmarkReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.header())?;
        write!(f, "{}", self.elapsed_line())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_format() {
        let report = BenchmarkReport {
            nsize: 1024,
            niter: 1,
            npar: 4,
            elapsed: Duration::from_millis(1500),
            elements_read: 4096,
        };

        assert_eq!(
            report.to_string(),
            "Running graph rendering with nsize = 1024\n\
             Generating iterations = 1\n\
             Num of partitions = 4\n\
             ELAPSED TIME =   1.500 s"
        );
    }

    #[test]
    fn test_elapsed_width() {
        let report = BenchmarkReport {
            nsize: 0,
            niter: 0,
            npar: 1,
            elapsed: Duration::from_secs(1234),
            elements_read: 0,
        };
        assert_eq!(report.elapsed_line(), "ELAPSED TIME = 1234.000 s");
    }
}
