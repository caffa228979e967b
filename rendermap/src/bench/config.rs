//! Benchmark parameters.

use crate::args::{atoi, flag_values};
use crate::config::{BenchmarkSettings, DEFAULT_ITERATIONS, DEFAULT_PARTITIONS, DEFAULT_SIZE};
use crate::serdez::DEFAULT_TEXTURE_SIDE;

/// Parameters of one benchmark run.
///
/// Values come from the config file and are then overridden by `-n`, `-i`
/// and `-p` in the runtime input arguments. Integers are taken as parsed,
/// so a negative size or iteration count simply does no work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BenchmarkConfig {
    /// Number of elements in the collection.
    pub nsize: i64,
    /// Dispatch rounds.
    pub niter: i64,
    /// Partition (and worker) count.
    pub npar: i64,
    /// Side of the texture stored in every element.
    pub texture_side: usize,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            nsize: DEFAULT_SIZE,
            niter: DEFAULT_ITERATIONS,
            npar: DEFAULT_PARTITIONS,
            texture_side: DEFAULT_TEXTURE_SIDE,
        }
    }
}

impl BenchmarkConfig {
    /// Overlays `-n`, `-i` and `-p` found in `args`. The last occurrence of
    /// a flag wins; every other argument is left for someone else.
    pub fn with_input_args(mut self, args: &[String]) -> Self {
        for (flag, value) in flag_values(args, &["-n", "-i", "-p"]) {
            let value = atoi(value);
            match flag {
                "-n" => self.nsize = value,
                "-i" => self.niter = value,
                "-p" => self.npar = value,
                _ => {}
            }
        }
        self
    }
}

impl From<&BenchmarkSettings> for BenchmarkConfig {
    fn from(settings: &BenchmarkSettings) -> Self {
        Self {
            nsize: settings.size,
            niter: settings.iterations,
            npar: settings.partitions,
            texture_side: settings.texture_side,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_defaults() {
        let config = BenchmarkConfig::default();
        assert_eq!(config.nsize, 1024);
        assert_eq!(config.niter, 1);
        assert_eq!(config.npar, 4);
        assert_eq!(config.texture_side, 512);
    }

    #[test]
    fn test_flags_override() {
        let config = BenchmarkConfig::default().with_input_args(&args(&["-n", "64", "-i", "3", "-p", "2"]));
        assert_eq!((config.nsize, config.niter, config.npar), (64, 3, 2));
    }

    #[test]
    fn test_unknown_flags_pass_through() {
        let config = BenchmarkConfig::default().with_input_args(&args(&["-ll:cpu", "8", "-x", "-p", "6"]));
        assert_eq!(config.npar, 6);
        assert_eq!(config.nsize, 1024);
    }

    #[test]
    fn test_last_occurrence_wins() {
        let config = BenchmarkConfig::default().with_input_args(&args(&["-n", "10", "-n", "20"]));
        assert_eq!(config.nsize, 20);
    }

    #[test]
    fn test_trailing_flag_ignored() {
        let config = BenchmarkConfig::default().with_input_args(&args(&["-i", "5", "-p"]));
        assert_eq!(config.niter, 5);
        assert_eq!(config.npar, 4);
    }

    #[test]
    fn test_atoi_semantics() {
        let config = BenchmarkConfig::default().with_input_args(&args(&["-n", "12abc", "-p", "x"]));
        assert_eq!(config.nsize, 12);
        assert_eq!(config.npar, 0);
    }

    #[test]
    fn test_from_settings() {
        let settings = BenchmarkSettings {
            size: 32,
            iterations: 2,
            partitions: 3,
            texture_side: 4,
        };
        let config = BenchmarkConfig::from(&settings);
        assert_eq!(config.nsize, 32);
        assert_eq!(config.texture_side, 4);
    }
}
