use glam::IVec2;
use miette::*;
use rayon::prelude::*;

use crate::simulation::{parse, Beam, Direction, Grid, Simulation};

/// Every beam that can enter the grid from an edge, pointing inward.
/// Corner tiles show up twice, once per edge they touch.
fn edge_starts(grid: &Grid) -> Vec<Beam> {
    let top = (0..grid.width()).map(|x| Beam {
        pos: IVec2::new(x, 0),
        dir: Direction::Down,
    });
    let bottom = (0..grid.width()).map(|x| Beam {
        pos: IVec2::new(x, grid.height() - 1),
        dir: Direction::Up,
    });
    let left = (0..grid.height()).map(|y| Beam {
        pos: IVec2::new(0, y),
        dir: Direction::Right,
    });
    let right = (0..grid.height()).map(|y| Beam {
        pos: IVec2::new(grid.width() - 1, y),
        dir: Direction::Left,
    });

    top.chain(bottom).chain(left).chain(right).collect()
}

/// The beam may enter from any edge tile; find the entry that energizes the
/// most tiles. Runs are independent (the grid is read-only and each run owns
/// its own bookkeeping), so they fan out across threads.
#[tracing::instrument]
pub fn process(input: &str) -> Result<String> {
    let grid = parse(input)?;

    let counts = edge_starts(&grid)
        .into_par_iter()
        .map(|start| Simulation::new(&grid).run(start))
        .collect::<Result<Vec<_>>>()?;

    let best = counts.into_iter().max().unwrap_or(0);

    Ok(best.to_string())
}
