use std::{path::PathBuf, time::Duration};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use unstable_hash::{
    probe,
    stats::{
        compute_stats, generate_ascii_path, generate_counting, generate_n_random_bits,
        generate_random, generate_single_1_bit,
    },
    Tier,
};

/// Measures avalanche and bit independence of the unstable hash per tier.
#[derive(Parser, Debug)]
#[command(name = "hash_bias")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Tier to measure.  Tiers this processor lacks are skipped.
    #[arg(long, value_enum, default_value = "all")]
    tier: TierArg,

    /// Comma-separated input lengths, in 16-bit code units.
    #[arg(
        long,
        value_delimiter = ',',
        default_values_t = [4usize, 16, 64],
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
    )]
    units: Vec<usize>,

    /// Rounds for patterns without a fixed count.  Zero means one round per
    /// input bit.
    #[arg(long, default_value = "4096")]
    rounds: usize,

    /// Also measure the bit independence criterion.  Slow.
    #[arg(long)]
    bic: bool,

    /// Write each avalanche chart as a PNG into this directory.
    #[arg(long)]
    png_dir: Option<PathBuf>,

    /// Hide the progress bar.
    #[arg(long)]
    no_progress: bool,

    /// Verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only run patterns whose name contains one of these (case-insensitive).
    filters: Vec<String>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TierArg {
    Scalar,
    Wide128,
    Wide256,
    All,
}

impl TierArg {
    fn tiers(self) -> Vec<Tier> {
        match self {
            TierArg::Scalar => vec![Tier::Scalar],
            TierArg::Wide128 => vec![Tier::Wide128],
            TierArg::Wide256 => vec![Tier::Wide256],
            TierArg::All => Tier::ALL.to_vec(),
        }
    }
}

struct BitPattern<'a> {
    name: &'a str,
    gen_function: &'a dyn Fn(usize, &mut [u16]),

    /// Fixed round count for the pattern, overriding `--rounds`.  Zero means
    /// one round per input bit.
    rounds: Option<usize>,
}

const PATTERNS: &[BitPattern] = &[
    BitPattern {
        name: "random",
        gen_function: &generate_random,
        rounds: None,
    },
    BitPattern {
        name: "counting",
        gen_function: &generate_counting,
        rounds: None,
    },
    BitPattern {
        name: "8 random bits",
        gen_function: &|seed, units| generate_n_random_bits(seed, units, 8),
        rounds: None,
    },
    BitPattern {
        name: "ascii path",
        gen_function: &generate_ascii_path,
        rounds: None,
    },
    BitPattern {
        name: "single-bit",
        gen_function: &generate_single_1_bit,

        // Only one input per bit exists, so the statistics are noisier than
        // the other patterns at the same quality.
        rounds: Some(0),
    },
];

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let available = probe();
    tracing::info!(%available, "detected hash tier");

    if let Some(dir) = &cli.png_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating chart directory {}", dir.display()))?;
    }

    let filters: Vec<String> = cli.filters.iter().map(|f| f.to_lowercase()).collect();

    for tier in cli.tier.tiers() {
        if tier > available {
            tracing::warn!(%tier, %available, "tier not supported here, skipping");
            continue;
        }

        for &units in &cli.units {
            println!("\n================================");
            println!("{tier}, {units} code units");

            for pattern in PATTERNS {
                if !filters.is_empty()
                    && !filters.iter().any(|f| pattern.name.contains(f.as_str()))
                {
                    continue;
                }

                let rounds = resolve_rounds(pattern.rounds.unwrap_or(cli.rounds), units);
                let bar = progress_bar(!cli.no_progress, rounds, pattern.name);

                println!("\nInput bit pattern: {}", pattern.name);
                let stats = compute_stats(
                    pattern.gen_function,
                    tier,
                    units,
                    rounds,
                    true,
                    cli.bic,
                    |round| bar.set_position(round as u64),
                );
                bar.finish_and_clear();
                print!("{stats}");

                if let Some(dir) = &cli.png_dir {
                    let path = dir.join(format!("{tier} - {units} units - {}.png", pattern.name));
                    stats
                        .write_avalanche_png(&path)
                        .with_context(|| format!("writing {}", path.display()))?;
                    tracing::info!(path = %path.display(), "wrote avalanche chart");
                }
            }
        }
    }

    Ok(())
}

fn resolve_rounds(rounds: usize, units: usize) -> usize {
    if rounds == 0 {
        units * 16
    } else {
        rounds
    }
}

fn progress_bar(enabled: bool, rounds: usize, name: &str) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(rounds as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {pos}/{len} rounds")
    {
        bar.set_style(style.progress_chars("=>-"));
    }
    bar.set_message(name.to_owned());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::new("hash_bias=info,unstable_hash=info"),
        1 => EnvFilter::new("hash_bias=debug,unstable_hash=debug"),
        2 => EnvFilter::new("hash_bias=trace,unstable_hash=trace"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_units_are_rejected() {
        assert!(Cli::try_parse_from(["hash_bias", "--units", "0"]).is_err());
        assert!(Cli::try_parse_from(["hash_bias", "--units", "4,0,16"]).is_err());
        let cli = Cli::try_parse_from(["hash_bias", "--units", "1,32", "--rounds", "0"]).unwrap();
        assert_eq!(cli.units, vec![1, 32]);
    }

    #[test]
    fn units_stop_at_the_filter_list() {
        let cli = Cli::try_parse_from(["hash_bias", "--units", "8", "random", "path"]).unwrap();
        assert_eq!(cli.units, vec![8]);
        assert_eq!(cli.filters, vec!["random", "path"]);
    }

    #[test]
    fn single_bit_runs_once_per_input_bit() {
        let single = PATTERNS.iter().find(|p| p.name == "single-bit").unwrap();
        assert_eq!(resolve_rounds(single.rounds.unwrap_or(4096), 4), 64);

        let random = PATTERNS.iter().find(|p| p.name == "random").unwrap();
        assert_eq!(resolve_rounds(random.rounds.unwrap_or(4096), 4), 4096);
        assert_eq!(resolve_rounds(random.rounds.unwrap_or(0), 4), 64);
    }
}
