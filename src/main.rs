mod simulation;

use clap::Parser;

#[derive(Parser)]
#[command(name = "drive_sim")]
#[command(about = "Headless driving-safety simulation")]
struct Cli {
    /// Number of fixed simulation ticks to run
    #[arg(long, default_value = "1000")]
    ticks: u32,

    /// Fixed tick duration in seconds
    #[arg(long, default_value = "0.02")]
    delta: f32,

    /// Run the sensing tick every N fixed ticks
    #[arg(long, default_value = "1")]
    sense_every: u32,

    /// RNG seed for reproducible runs
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Start with AEB enabled on the player vehicle
    #[arg(long)]
    aeb: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    println!("Running driving simulation in headless mode...");
    println!(
        "Ticks: {}, Delta: {}s, Seed: {}",
        cli.ticks, cli.delta, cli.seed
    );
    println!();

    let mut world = simulation::SimWorld::create_demo_world(cli.seed)?;

    if cli.aeb {
        world.toggle_player_aeb();
    }

    // Gentle constant throttle so the demo player actually drives
    world.set_player_input(0.6, 0.0, 0.0);

    println!("Initial state:");
    world.print_summary();
    println!();

    let summary_every = ((1.0 / cli.delta).ceil() as u32).max(1);
    for tick in 1..=cli.ticks {
        if cli.sense_every > 0 && tick % cli.sense_every == 0 {
            world.sense_tick(cli.delta * cli.sense_every as f32);
        }
        world.fixed_tick(cli.delta);

        if tick % (summary_every * 10) == 0 {
            println!(
                "--- After tick {} ({:.1}s simulated time) ---",
                tick,
                tick as f32 * cli.delta
            );
            world.print_summary();
            println!();
        }
    }

    println!("=== Final State ===");
    world.print_summary();
    Ok(())
}
