use clap::Parser;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use sweepmind::util::{autoplay, Board, Outcome};
use sweepmind::{Dimensions, KnowledgeEngine};
use tracing_subscriber::EnvFilter;

/// Play one game of minesweeper on a random board, deducing as far as
/// possible and guessing only when stuck
#[derive(Parser)]
#[command(name = "sweepmind")]
struct Cli {
    /// Number of rows
    #[arg(long, default_value_t = 8)]
    height: usize,
    /// Number of columns
    #[arg(long, default_value_t = 8)]
    width: usize,
    /// Number of mines to place
    #[arg(long, default_value_t = 8)]
    mines: usize,
    /// Seed for a reproducible game
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    let mut rng = match cli.seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_os_rng(),
    };
    let dims = Dimensions::new(cli.height, cli.width);
    let board = Board::random(dims, cli.mines, &mut rng)?;
    let mut engine = KnowledgeEngine::new(dims);

    let outcome = autoplay(&board, &mut engine, &mut rng)?;
    match outcome {
        Outcome::Won => println!("Won after {} moves", engine.moves_made().len()),
        Outcome::Lost(cell) => {
            println!(
                "Lost on {} after {} moves, {} of {} mines found",
                cell,
                engine.moves_made().len(),
                engine.mines().len(),
                board.mine_count()
            );
        },
        Outcome::Stuck => println!("No moves left"),
    }
    Ok(())
}
