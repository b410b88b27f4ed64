#![allow(missing_docs)]

use std::collections::HashMap;
use std::fmt::Write as _;

use bucket_map::{BucketMap, StoreError, StoreKind};
use clap::{Parser, ValueEnum};
use color_eyre::eyre::bail;
use rand::prelude::*;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Backend {
    Linear,
    Quadratic,
    Chained,
    Bst,
    Avl,
    TwoThree,
}

impl Backend {
    fn kind(self) -> StoreKind {
        match self {
            Backend::Linear => StoreKind::LinearProbe,
            Backend::Quadratic => StoreKind::QuadraticProbe,
            Backend::Chained => StoreKind::ChainedList,
            Backend::Bst => StoreKind::BinaryTree,
            Backend::Avl => StoreKind::AvlTree,
            Backend::TwoThree => StoreKind::TwoThreeTree,
        }
    }
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Bucket store backend to exercise
    #[arg(value_enum)]
    backend: Backend,

    /// Number of home buckets, must be a power of two
    #[arg(long, default_value_t = 8)]
    buckets: usize,

    /// Insert attempts per round
    #[arg(long, default_value_t = 128)]
    entries: usize,

    /// Number of independently seeded rounds
    #[arg(long, default_value_t = 100)]
    rounds: u64,

    /// Also delete every entry after verification
    #[arg(long)]
    delete: bool,

    /// Seed to reproduce a failing run
    #[arg(long)]
    seed: Option<u64>,
}

/// Everything needed to diagnose a failed round offline.
struct Round {
    seed: u64,
    round: u64,
    reference: HashMap<i64, i64>,
    inserted: Vec<i64>,
    deleted: Vec<i64>,
}

impl Round {
    /// Dumps the round's state to `{seed}-{round}.log` and aborts the run.
    fn fail(&self, message: String) -> color_eyre::Result<()> {
        let path = format!("{}-{}.log", self.seed, self.round);
        let mut dump = String::new();
        let _ = writeln!(dump, "{message}");
        let _ = writeln!(dump, "entries: {:?}", self.reference);
        let _ = writeln!(dump, "inserted: {:?}", self.inserted);
        let _ = writeln!(dump, "deleted: {:?}", self.deleted);
        std::fs::write(&path, dump)?;
        log::error!("{message}, state dumped to {path}");
        bail!("round {} failed with seed {}", self.round, self.seed);
    }
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    bucket_map_logger::setup();

    let args = Args::parse();
    let seed = args.seed.unwrap_or_else(|| thread_rng().gen());
    log::info!("exercising {:?} with seed {seed}", args.backend);

    for round in 0..args.rounds {
        run_round(&args, seed, round)?;
    }
    log::info!("all {} rounds passed", args.rounds);
    Ok(())
}

fn run_round(args: &Args, seed: u64, round: u64) -> color_eyre::Result<()> {
    let mut rng = SmallRng::seed_from_u64(seed ^ round);
    let mut map = BucketMap::with_bucket_count(args.backend.kind(), args.buckets);
    let mut state = Round {
        seed,
        round,
        reference: HashMap::new(),
        inserted: Vec::new(),
        deleted: Vec::new(),
    };

    for _ in 0..args.entries {
        let mut key = rng.gen_range(-1024..1024);
        while state.reference.contains_key(&key) {
            key = rng.gen_range(-1024..1024);
        }
        let value = rng.gen();
        match map.set(key, value) {
            Ok(None) => {
                state.reference.insert(key, value);
                state.inserted.push(key);
            }
            Ok(Some(previous)) => {
                return state.fail(format!("fresh key {key} overwrote value {previous}"));
            }
            Err(StoreError::CapacityExhausted) => {
                // Expected for the probing backends once the probe sequences
                // fill up; the remaining checks still cover what went in.
                log::debug!("capacity reached after {} entries", state.inserted.len());
                break;
            }
            Err(err) => return state.fail(format!("set {key} failed: {err}")),
        }
    }

    if map.len() != state.reference.len() {
        return state.fail(format!(
            "live count {} disagrees with the {} entries inserted",
            map.len(),
            state.reference.len()
        ));
    }
    for (&key, &value) in &state.reference {
        if map.get(key) != Some(value) {
            return state.fail(format!("get {key} returned {:?}, expected {value}", map.get(key)));
        }
    }
    let mut visited: Vec<i64> = map.iter().map(|entry| entry.key).collect();
    visited.sort_unstable();
    let mut expected: Vec<i64> = state.reference.keys().copied().collect();
    expected.sort_unstable();
    if visited != expected {
        return state.fail(format!("iteration yielded {visited:?}, expected {expected:?}"));
    }

    if args.delete {
        let keys = state.inserted.clone();
        for key in keys {
            match map.del(key) {
                Ok(removed) if removed == state.reference.get(&key).copied() => {
                    state.deleted.push(key);
                }
                Ok(removed) => {
                    return state.fail(format!("del {key} returned {removed:?}"));
                }
                Err(err) => return state.fail(format!("del {key} failed: {err}")),
            }
            if map.get(key).is_some() {
                return state.fail(format!("key {key} still visible after deletion"));
            }
        }
        if !map.is_empty() {
            return state.fail(format!("{} entries left after deleting everything", map.len()));
        }
    }

    log::debug!("round {round} passed with {} entries", state.inserted.len());
    Ok(())
}
