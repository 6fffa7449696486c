use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_anfis::{Anfis, AnfisConfig, Dataset, Metric};

const PROBES: [(f64, f64); 5] = [(0.0, 0.0), (50.0, 0.0), (-50.0, 0.0), (25.0, 5.0), (-25.0, -5.0)];

// Duty-cycle limits of the motor driver.
const OUTPUT_LIMIT: f64 = 100.0;

fn control_law(error: f64, delta_error: f64) -> f64 {
    (-0.5 * error - 2.0 * delta_error).clamp(-OUTPUT_LIMIT, OUTPUT_LIMIT)
}

fn print_response(model: &Anfis) -> rust_anfis::Result<()> {
    println!("{:>10} {:>12} {:>10} {:>10}", "error", "delta_error", "control", "target");
    println!("{}", "-".repeat(45));
    for (e, de) in PROBES {
        let u = model.infer_clamped(e, de, -OUTPUT_LIMIT, OUTPUT_LIMIT)?;
        println!("{e:10.1} {de:12.1} {u:10.3} {:10.3}", control_law(e, de));
    }
    Ok(())
}

fn main() -> rust_anfis::Result<()> {
    env_logger::init();

    let cfg = AnfisConfig::default();
    let mut model = cfg.build_model(42)?;

    println!("untrained controller:");
    print_response(&model)?;

    // Uniform samples over the operating range of both inputs.
    let mut rng = StdRng::seed_from_u64(7);
    let inputs: Vec<[f64; 2]> = (0..100)
        .map(|_| [rng.gen_range(-100.0..100.0), rng.gen_range(-10.0..10.0)])
        .collect();
    let train = Dataset::from_fn(&inputs, control_law)?;

    let report = model.fit(&train, cfg.train_config()?)?;
    println!(
        "\ntrained for {} epochs: final_rmse={:.6} converged={} clamp_events={}",
        report.epochs.len(),
        report.final_rmse,
        report.converged,
        report.total_clamp_events()
    );

    let mae = model.evaluate(&train, Metric::Mae)?;
    println!("train_mae={:.6} skipped={}", mae.value, mae.skipped);

    println!("\ntrained controller:");
    print_response(&model)
}
