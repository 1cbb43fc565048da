use glam::IVec2;
use miette::*;

use crate::simulation::{parse, Beam, Direction, Simulation};

/// A single beam enters the contraption at the top-left corner heading
/// right; the answer is how many tiles it energizes.
#[tracing::instrument]
pub fn process(input: &str) -> Result<String> {
    let grid = parse(input)?;

    let energized = Simulation::new(&grid).run(Beam {
        pos: IVec2::ZERO,
        dir: Direction::Right,
    })?;

    Ok(energized.to_string())
}
