use log::{info, LevelFilter};
use simple_logger::SimpleLogger;
use ionfront::boundary::{Face, Side};
use ionfront::chemistry::{ChemistryConfig, RadiationPlane};
use ionfront::config::{Config, InitialCondition, MeshConfig, RunConfig};
use ionfront::index_space::Axis;
use ionfront::simulation::Simulation;




const PARSEC: f64 = 3.0857e18;
const HYDROGEN_MASS: f64 = 1.6733e-24;
const BOLTZMANN: f64 = 1.380658e-16;




/// Primitive state of neutral atomic gas at number density `n` [cm^-3] and
/// temperature `t` [K].
fn neutral_gas(n: f64, t: f64) -> [f64; 9] {
    let rho = n * HYDROGEN_MASS;
    let mu = ChemistryConfig::default().mean_neutral_mass;
    [rho, 0.0, 0.0, 0.0, rho * BOLTZMANN * t / mu, 0.0, 0.0, 0.0, 1.0]
}




fn main() {
    SimpleLogger::new().with_level(LevelFilter::Info).init().unwrap();

    let config = Config {
        mesh: MeshConfig {
            upper: [PARSEC, 1.0, 1.0],
            cells: [128, 1, 1],
            blocks: [4, 1, 1],
            ..MeshConfig::default()
        },
        initial: InitialCondition::Discontinuity {
            axis: Axis::I,
            position: 0.5 * PARSEC,
            left: neutral_gas(10.0, 1000.0),
            right: neutral_gas(1.25, 800.0),
        },
        chemistry: Some(ChemistryConfig {
            temperature_floor: 10.0,
            temperature_ceiling: Some(1e5),
            radiation: vec![RadiationPlane::new(Face::new(Axis::I, Side::Lower), 1e10)],
            ..ChemistryConfig::default()
        }),
        run: RunConfig {
            end_time: 3e12,
            max_cycles: Some(200),
            ..RunConfig::default()
        },
        ..Config::default()
    };
    config.validate().unwrap();

    let mut sim = Simulation::from_config(&config).unwrap();
    let chemistry = config.chemistry.clone().unwrap();

    sim.run(config.run.end_time, config.run.max_cycles, |_, _| Ok(())).unwrap();

    for grid in sim.domain().grids() {
        for index in grid.interior().iter().step_by(8) {
            let u = grid.conserved_at(index);
            let (x, _, _) = grid.cell_center(index);
            info!(
                "x={:.3} pc rho={:.3e} x_HII={:.4} T={:.1}",
                x / PARSEC,
                u.mass_density(),
                chemistry.composition(&u).ionization_fraction(),
                chemistry.temperature(&u, config.hydro.gamma_law_index));
        }
    }
    for (label, value) in sim.domain().history() {
        info!("{:.<24} {:+.8e}", label, value);
    }
}
