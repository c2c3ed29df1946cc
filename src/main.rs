use std::{env, fs};

use anyhow::{Context, Result};
use log::info;
use param_tree::{Layout, ParameterValue, ParametersCopy};
use rand::{SeedableRng, rngs::StdRng};

const DEFAULT_SEED: u64 = 42;
const INIT_LIMIT: f64 = 0.1;
const LEARNING_RATE: f64 = 0.01;

fn default_layout() -> Layout {
    let dense = |name: &str, rows, cols| Layout::Composite {
        name: name.into(),
        children: vec![
            Layout::Matrix {
                name: "w".into(),
                rows,
                cols,
            },
            Layout::Vector {
                name: "b".into(),
                len: cols,
            },
        ],
    };

    Layout::Composite {
        name: "model".into(),
        children: vec![dense("hidden", 4, 8), dense("output", 8, 1)],
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let layout = match env::args().nth(1) {
        Some(path) => {
            let json = fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
            Layout::from_json(&json).with_context(|| format!("parsing the layout in {path}"))?
        }
        None => default_layout(),
    };

    let seed = match env::var("SEED") {
        Ok(seed) => seed.parse().context("SEED must be an unsigned integer")?,
        Err(_) => DEFAULT_SEED,
    };

    let mut tree = layout.build_owned::<f32>()?;
    let mut rng = StdRng::seed_from_u64(seed);
    tree.random_fill(INIT_LIMIT, &mut rng);

    info!("built `{}` with {} parameters", tree.name(), tree.parameter_count());
    for (path, range) in layout.offsets() {
        println!("{path:<24} {range:?}");
    }
    println!("norm: {:.6}", tree.two_norm());

    let mut step = ParametersCopy::<f64>::new(tree.parameters()?)?;
    step.scale(0.5);
    tree.update(&step, LEARNING_RATE)?;
    println!("norm after one step: {:.6}", tree.two_norm());

    let mut bytes = Vec::new();
    tree.serialize(&mut bytes)?;
    info!("serialized {} bytes", bytes.len());

    Ok(())
}
