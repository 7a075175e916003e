use ellmat::utils::init_subscriber;
use ellmat::{
    add, gershgorin, multiply_x2, normalize, DistributionMode, EllpackMatrix, Result,
};

/// Sites in the demo chain
const N_SITES: usize = 64;

/// Drop tolerance used by every kernel in the demo
const THRESHOLD: f64 = 1e-8;

/// Builds a periodic chain Hamiltonian with alternating on-site energies
/// and nearest-neighbour hopping
fn chain_hamiltonian(n: usize, onsite: f64, hopping: f64) -> Result<EllpackMatrix<f64>> {
    let mut h = EllpackMatrix::new_sorted(n, n, DistributionMode::Sequential)?;
    for i in 0..n {
        let eps = if i % 2 == 0 { onsite } else { -onsite };
        h.set(i, i, eps)?;
        h.set(i, (i + 1) % n, hopping)?;
        h.set(i, (i + n - 1) % n, hopping)?;
    }
    Ok(h)
}

fn main() -> Result<()> {
    init_subscriber();

    println!("ellmat: ELLPACK/ELLSORT sparse matrix engine");
    println!("Density matrix of a {}-site chain by SP2 purification", N_SITES);

    let h = chain_hamiltonian(N_SITES, 0.5, -1.0)?;
    println!("\nHamiltonian (leading window):");
    h.print_leading()?;

    let bounds = gershgorin(&h);
    println!("\nGershgorin bounds: [{:.3}, {:.3}]", bounds.emin, bounds.emax);

    // X0 maps the spectrum onto [0, 1], lowest energies near 1
    let mut x = h.clone();
    normalize(&mut x, bounds.emin, bounds.emax)?;
    let mut x2 = x.zeros_like()?;

    let occupation = (N_SITES / 2) as f64;
    for iteration in 0..100 {
        let [tr_x, tr_x2] = multiply_x2(&x, &mut x2, THRESHOLD)?;
        let idempotency = (tr_x - tr_x2).abs();
        tracing::info!(iteration, tr_x, tr_x2, idempotency, nnz = x.nnz_total(), "sp2 step");
        if idempotency < 1e-9 {
            break;
        }

        // Move the trace towards the occupation: X ← X² lowers it, X ← 2X − X² raises it
        if (tr_x2 - occupation).abs() < (2.0 * tr_x - tr_x2 - occupation).abs() {
            x2.copy_into(&mut x)?;
        } else {
            add(&mut x, &x2, 2.0, -1.0, THRESHOLD)?;
        }
    }

    println!("\nDensity matrix (leading window):");
    x.print_leading()?;
    println!(
        "\nnnz = {}, max row occupancy = {} of {}",
        x.nnz_total(),
        x.max_row_occupancy(),
        x.m()
    );

    Ok(())
}
