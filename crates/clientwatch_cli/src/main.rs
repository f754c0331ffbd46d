//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `clientwatch_core` linkage with deterministic output.
//! - `rank <xp>` prints the ladder position for one XP value.

use clientwatch_core::model::rank::xp_to_next_subrank;
use clientwatch_core::{xp_to_rank, RankConfig};
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.as_slice() {
        [] => {
            println!("clientwatch_core ping={}", clientwatch_core::ping());
            println!("clientwatch_core version={}", clientwatch_core::core_version());
            ExitCode::SUCCESS
        }
        [command, xp] if command == "rank" => match xp.trim().parse::<i64>() {
            Ok(xp) => {
                print_rank(xp);
                ExitCode::SUCCESS
            }
            Err(err) => {
                eprintln!("invalid xp `{xp}`: {err}");
                ExitCode::from(2)
            }
        },
        _ => {
            eprintln!("usage: clientwatch_cli [rank <xp>]");
            ExitCode::from(2)
        }
    }
}

fn print_rank(xp: i64) {
    let config = RankConfig::default();
    let rank = xp_to_rank(xp, &config);
    println!("xp={}", config.clamp_xp(xp));
    println!("rank={}", rank.title());
    println!("tier_progress={:.2}", rank.progress_in_tier);
    println!("subrank_progress={:.2}", rank.progress_in_subrank);
    println!("xp_to_next={}", xp_to_next_subrank(xp, &config));
}
