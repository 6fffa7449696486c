#[cfg(not(feature = "serde"))]
fn main() {
    println!("enable the `serde` feature: cargo run --example save_load_json --features serde");
}

#[cfg(feature = "serde")]
fn main() -> rust_anfis::Result<()> {
    use rust_anfis::{Anfis, AnfisBuilder, Dataset, TrainConfig};

    env_logger::init();

    let labels = ["N", "Z", "P"];
    let mut model = AnfisBuilder::new()
        .add_input(
            "error",
            &[[-10.0, -10.0, 0.0], [-10.0, 0.0, 10.0], [0.0, 10.0, 10.0]],
            &labels,
        )?
        .add_input(
            "delta_error",
            &[[-1.0, -1.0, 0.0], [-1.0, 0.0, 1.0], [0.0, 1.0, 1.0]],
            &labels,
        )?
        .build_with_seed(0)?;

    let mut inputs = Vec::new();
    for i in -5..=5 {
        for j in -5..=5 {
            inputs.push([2.0 * i as f64, 0.2 * j as f64]);
        }
    }
    let train = Dataset::from_fn(&inputs, |e, de| -(0.3 * e).tanh() * 5.0 - de)?;
    model.fit(
        &train,
        TrainConfig {
            epochs: 20,
            ..TrainConfig::default()
        },
    )?;

    let path = "target/tmp_anfis.json";
    model.save_json(path)?;

    let loaded = Anfis::load_json(path)?;
    let (a, b) = (model.infer(3.0, -0.4)?, loaded.infer(3.0, -0.4)?);
    println!("saved and loaded model: {path}");
    println!("infer(3.0, -0.4): trained={a} loaded={b}");
    Ok(())
}
