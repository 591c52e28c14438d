//! rindex — random indexing of n-dimensional arrays.
//!
//! Demo driver: terms are represented by 2D distributional arrays
//! (co-occurrence × context), which for example enables analysis of
//! context dependence. The driver encodes a stream of random
//! co-occurrence observations, then recovers the most similar term pair
//! and the context in which that pair is most similar.

use anyhow::Context;
use clap::Parser;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use rindex::{DimIndex, DimSpec, Error, RandomIndexer, Weight};

/// Dense co-occurrence positions per term array.
const COOC_DIM: u32 = 2048;

/// Dense context positions per term array.
const CONTEXT_DIM: u32 = 32;

/// Random indexing demo over term x co-occurrence x context counts.
#[derive(Parser, Debug)]
#[command(
    name = "rindex",
    about = "rindex — random indexing of n-dimensional distributional arrays",
    version
)]
struct Cli {
    /// Number of term arrays to allocate.
    #[arg(short, long, default_value_t = 1024)]
    terms: usize,

    /// Number of random co-occurrence observations to encode.
    #[arg(short = 'n', long, default_value_t = 1_000_000)]
    encodes: usize,

    /// Explicit co-occurrence range (first dimension).
    #[arg(long, default_value_t = 10_000)]
    cooccurrences: u32,

    /// Explicit context range (second dimension).
    #[arg(long, default_value_t = 1_000)]
    contexts: u32,

    /// Seed for random index table generation.
    #[arg(long, default_value_t = 0x12345)]
    seed: u64,

    /// Seed for the synthetic observation stream.
    #[arg(long, default_value_t = 0x2345)]
    data_seed: u64,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let specs = [
        DimSpec {
            data_range: COOC_DIM,
            index_count: 8,
        },
        DimSpec {
            data_range: CONTEXT_DIM,
            index_count: 4,
        },
    ];
    let mut ri = RandomIndexer::new(&specs, cli.seed)?;
    ri.set_range(0, cli.cooccurrences)?;
    ri.set_range(1, cli.contexts)?;

    let numel = ri.data_numel() as usize;
    let mut terms = Array2::<Weight>::zeros((cli.terms, numel));
    tracing::info!(
        "created {} distributional arrays of size {}x{} ({} KiB each)",
        cli.terms,
        COOC_DIM,
        CONTEXT_DIM,
        ri.data_size() / 1024,
    );
    tracing::info!("random index tables occupy {} KiB", ri.index_size() / 1024);

    tracing::info!("encoding {} random co-occurrence weights...", cli.encodes);
    let mut rng = StdRng::seed_from_u64(cli.data_seed);
    for _ in 0..cli.encodes {
        let term = rng.gen_range(0..cli.terms);
        let cooc = rng.gen_range(0..cli.cooccurrences);
        let context = rng.gen_range(0..cli.contexts);
        let weight = rng.gen_range(0..=10) as Weight;

        let mut row = terms.row_mut(term);
        let buffer = row.as_slice_mut().context("term row is not contiguous")?;
        ri.encode(buffer, &[cooc, context], weight)?;
    }
    tracing::info!("saturated {} cells while encoding", ri.saturation());

    // Most similar term to term 0, averaging over both co-occurrences
    // and contexts.
    let base_row = terms.row(0);
    let base = base_row.as_slice().context("term row is not contiguous")?;
    let average = [DimIndex::Average, DimIndex::Average];
    let mut best_term = 0;
    let mut best_cosa = -1.0;
    for term in 1..cli.terms {
        let row = terms.row(term);
        let other = row.as_slice().context("term row is not contiguous")?;
        match ri.cosa(base, &average, other, &average) {
            Ok(c) if c > best_cosa => {
                best_term = term;
                best_cosa = c;
            }
            Ok(_) => {}
            // A term the stream never touched has no direction.
            Err(Error::ZeroNorm) => {}
            Err(e) => return Err(e.into()),
        }
    }
    tracing::info!(
        "term 0 is most similar to term {} with cos(alpha) {:.4}",
        best_term,
        best_cosa,
    );

    // Context-specific similarity for that pair: average co-occurrences,
    // index each context explicitly.
    tracing::info!("maximizing the context-specific cos(alpha) for these terms...");
    let other_row = terms.row(best_term);
    let other = other_row.as_slice().context("term row is not contiguous")?;
    let mut best_context = 0;
    let mut best_context_cosa = -1.0;
    for context in 0..cli.contexts {
        let ind = [DimIndex::Average, DimIndex::At(context)];
        match ri.cosa(base, &ind, other, &ind) {
            Ok(c) if c > best_context_cosa => {
                best_context = context;
                best_context_cosa = c;
            }
            Ok(_) => {}
            Err(Error::ZeroNorm) => {}
            Err(e) => return Err(e.into()),
        }
    }
    tracing::info!(
        "term 0 is most similar to term {} in context {} with cos(alpha) {:.4}",
        best_term,
        best_context,
        best_context_cosa,
    );

    Ok(())
}
