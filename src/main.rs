use log::info;
use rand::Rng;

use optim_core::{Hyper, Optimizer, Parameter, Result};

/// Fits a scalar linear model with SGD + momentum. Gradients are computed by
/// hand here: the engine only consumes them.
fn main() -> Result<()> {
    env_logger::init();

    const EPOCHS: usize = 200;
    const SAMPLES: usize = 64;

    let mut rng = rand::rng();

    // y = 3x - 1
    let xs: Vec<f32> = (0..SAMPLES).map(|_| rng.random_range(-2.0..2.0)).collect();
    let ys: Vec<f32> = xs.iter().map(|x| 3.0 * x - 1.0).collect();

    let w = Parameter::scalar(rng.random_range(-1.0..1.0));
    let b = Parameter::scalar(0.0);

    let mut optim = Optimizer::sgd(
        vec![w.clone(), b.clone()],
        Hyper::new(0.05).momentum(0.9),
    )?;

    for epoch in 0..EPOCHS {
        optim.zero_grad();

        let (wv, bv) = (w.item(), b.item());
        let mut loss = 0.0;
        let mut gw = 0.0;
        let mut gb = 0.0;

        for (&x, &y) in xs.iter().zip(&ys) {
            let err = wv * x + bv - y;
            loss += err * err;
            gw += 2.0 * err * x;
            gb += 2.0 * err;
        }

        let n = SAMPLES as f32;
        w.set_grad(ndarray::arr0(gw / n).into_dyn());
        b.set_grad(ndarray::arr0(gb / n).into_dyn());

        optim.step()?;

        if epoch % 20 == 0 {
            info!("epoch {epoch}: loss={:.6} w={wv:.4} b={bv:.4}", loss / n);
        }
    }

    println!("w: {:.4}, b: {:.4}", w.item(), b.item());
    Ok(())
}
