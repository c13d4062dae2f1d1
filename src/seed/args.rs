use crate::error::{ConfigError, Result};
use crate::seed::MAX_SAMPLE_STRATEGIES;

pub const DEFAULT_SEED_DAYS: u32 = 35;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearMode {
    /// Ask on stdin when the store already has data.
    Prompt,
    Always,
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedArgs {
    pub clear: ClearMode,
    pub strategies: usize,
    pub days: u32,
    pub rng_seed: Option<u64>,
    pub cleanup_only: bool,
}

impl Default for SeedArgs {
    fn default() -> Self {
        Self {
            clear: ClearMode::Prompt,
            strategies: MAX_SAMPLE_STRATEGIES,
            days: DEFAULT_SEED_DAYS,
            rng_seed: None,
            cleanup_only: false,
        }
    }
}

pub const USAGE: &str = "usage: seed_store [--yes | --no-clear] [--strategies N] [--days N] [--seed N] [--cleanup]";

fn invalid(message: String) -> crate::error::OpsError {
    ConfigError::InvalidConfig(format!("{message}\n{USAGE}")).into()
}

fn value_for<'a, I>(flag: &str, iter: &mut I) -> Result<String>
where
    I: Iterator<Item = &'a str>,
{
    iter.next()
        .map(str::to_string)
        .ok_or_else(|| invalid(format!("{flag} needs a value")))
}

pub fn parse_seed_args_from_iter<I, S>(args: I) -> Result<SeedArgs>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let supplied = args
        .into_iter()
        .map(|arg| arg.as_ref().to_string())
        .collect::<Vec<_>>();
    let mut iter = supplied.iter().map(String::as_str);
    let mut parsed = SeedArgs::default();

    while let Some(arg) = iter.next() {
        match arg {
            "--yes" | "-y" => parsed.clear = ClearMode::Always,
            "--no-clear" => parsed.clear = ClearMode::Never,
            "--cleanup" => parsed.cleanup_only = true,
            "--strategies" => {
                let raw = value_for(arg, &mut iter)?;
                parsed.strategies = raw
                    .parse::<usize>()
                    .ok()
                    .filter(|n| (1..=MAX_SAMPLE_STRATEGIES).contains(n))
                    .ok_or_else(|| {
                        invalid(format!(
                            "--strategies must be within 1..={MAX_SAMPLE_STRATEGIES}, got `{raw}`"
                        ))
                    })?;
            }
            "--days" => {
                let raw = value_for(arg, &mut iter)?;
                parsed.days = raw
                    .parse::<u32>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| invalid(format!("--days must be a positive integer, got `{raw}`")))?;
            }
            "--seed" => {
                let raw = value_for(arg, &mut iter)?;
                parsed.rng_seed = Some(
                    raw.parse::<u64>()
                        .map_err(|_| invalid(format!("--seed must be an unsigned integer, got `{raw}`")))?,
                );
            }
            other => return Err(invalid(format!("unknown argument `{other}`"))),
        }
    }
    Ok(parsed)
}

pub fn parse_seed_args() -> Result<SeedArgs> {
    parse_seed_args_from_iter(std::env::args().skip(1))
}

/// Interpret an answer to `Clear and recreate? (yes/no)`. Only `yes` (any case) clears.
pub fn answer_is_yes(answer: &str) -> bool {
    answer.trim_end_matches(['\r', '\n']).to_ascii_lowercase() == "yes"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_args_default_to_prompt_and_full_history() {
        let parsed = parse_seed_args_from_iter(Vec::<&str>::new()).expect("parse");
        assert_eq!(parsed, SeedArgs::default());
        assert_eq!(parsed.days, 35);
        assert_eq!(parsed.strategies, 4);
    }

    #[test]
    fn test_seed_args_parse_every_flag() {
        let parsed = parse_seed_args_from_iter([
            "--yes",
            "--strategies",
            "2",
            "--days",
            "12",
            "--seed",
            "99",
        ])
        .expect("parse");
        assert_eq!(parsed.clear, ClearMode::Always);
        assert_eq!(parsed.strategies, 2);
        assert_eq!(parsed.days, 12);
        assert_eq!(parsed.rng_seed, Some(99));

        let cleanup = parse_seed_args_from_iter(["--no-clear", "--cleanup"]).expect("parse");
        assert_eq!(cleanup.clear, ClearMode::Never);
        assert!(cleanup.cleanup_only);
    }

    #[test]
    fn test_seed_args_reject_bad_input() {
        for bad in [
            vec!["--strategies", "9"],
            vec!["--days", "0"],
            vec!["--seed"],
            vec!["--profile", "deep"],
        ] {
            let err = parse_seed_args_from_iter(bad.clone()).expect_err("should fail");
            assert!(err.to_string().contains("usage: seed_store"), "{bad:?}: {err}");
        }
    }

    #[test]
    fn test_only_yes_clears() {
        assert!(answer_is_yes("yes\n"));
        assert!(answer_is_yes("YES\r\n"));
        assert!(!answer_is_yes("y\n"));
        assert!(!answer_is_yes(" yes"));
        assert!(!answer_is_yes("no"));
        assert!(!answer_is_yes(""));
    }
}
