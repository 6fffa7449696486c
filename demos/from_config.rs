#[cfg(not(feature = "serde"))]
fn main() {
    println!("enable the `serde` feature: cargo run --example from_config --features serde");
}

#[cfg(feature = "serde")]
fn main() -> rust_anfis::Result<()> {
    use rust_anfis::{AnfisConfig, Dataset, Input};

    env_logger::init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/anfis_config.json".to_owned());
    let cfg = AnfisConfig::load_json(&path)?;
    let train_cfg = cfg.train_config()?;
    let mut model = cfg.build_model(0)?;

    for var in Input::ALL {
        let input = model.input(var);
        println!("{}:", input.name());
        for (label, mf) in input.labels().iter().zip(input.mfs()) {
            println!("  {label:>3} {:?}", mf.params());
        }
    }
    println!("{} rules, {train_cfg:?}", model.num_rules());

    let mut inputs = Vec::new();
    for i in 0..=20 {
        for j in 0..=20 {
            inputs.push([-100.0 + 10.0 * i as f64, -10.0 + 1.0 * j as f64]);
        }
    }
    let train = Dataset::from_fn(&inputs, |e, de| 2.0 * e + 0.5 * de)?;
    let report = model.fit(&train, train_cfg)?;

    for r in &report.epochs {
        println!(
            "epoch {:>3}: rmse={:.6} step_size={:.5} {:?} lse={:?} rank={}",
            r.epoch, r.rmse, r.step_size, r.adjustment, r.lse_method, r.lse_rank
        );
    }
    println!("converged={} final_rmse={:.3e}", report.converged, report.final_rmse);
    Ok(())
}
