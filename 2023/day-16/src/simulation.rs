use std::collections::{HashSet, VecDeque};

use chumsky::prelude::*;
use glam::IVec2;
use miette::*;

/// One cell of the contraption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tile {
    Empty,
    /// `/`, ends in the top-right and bottom-left.
    MirrorForward,
    /// `\`, ends in the top-left and bottom-right.
    MirrorBackward,
    /// `|`
    SplitterVertical,
    /// `-`
    SplitterHorizontal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    /// Unit step in grid coordinates. The y axis grows downward, so `Up`
    /// moves toward row 0.
    pub fn delta(self) -> IVec2 {
        match self {
            Direction::Up => IVec2::NEG_Y,
            Direction::Right => IVec2::X,
            Direction::Down => IVec2::Y,
            Direction::Left => IVec2::NEG_X,
        }
    }
}

/// What a tile does to a beam travelling in a given direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    Redirect(Direction),
    Split(Direction, Direction),
}

impl Tile {
    /// The full reflection/splitting table. Splitters hit on their pointy
    /// ends behave like empty space; hit on a flat side they swallow the
    /// beam and emit one out of each end.
    pub fn outcome(self, incoming: Direction) -> Outcome {
        use Direction::*;

        match (self, incoming) {
            (Tile::Empty, _) => Outcome::Continue,
            (Tile::MirrorForward, Up) => Outcome::Redirect(Right),
            (Tile::MirrorForward, Right) => Outcome::Redirect(Up),
            (Tile::MirrorForward, Down) => Outcome::Redirect(Left),
            (Tile::MirrorForward, Left) => Outcome::Redirect(Down),
            (Tile::MirrorBackward, Up) => Outcome::Redirect(Left),
            (Tile::MirrorBackward, Right) => Outcome::Redirect(Down),
            (Tile::MirrorBackward, Down) => Outcome::Redirect(Right),
            (Tile::MirrorBackward, Left) => Outcome::Redirect(Up),
            (Tile::SplitterVertical, Up | Down) => Outcome::Continue,
            (Tile::SplitterVertical, Right | Left) => Outcome::Split(Up, Down),
            (Tile::SplitterHorizontal, Right | Left) => Outcome::Continue,
            (Tile::SplitterHorizontal, Up | Down) => Outcome::Split(Left, Right),
        }
    }
}

/// The contraption layout. Built once, read-only afterwards, so a single
/// grid can back any number of sequential or parallel simulation runs.
#[derive(Debug, Clone)]
pub struct Grid {
    width: i32,
    height: i32,
    tiles: Vec<Tile>,
}

impl Grid {
    /// Assembles a grid from parsed rows, rejecting ragged input.
    pub fn new(rows: Vec<Vec<Tile>>) -> Result<Self> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);

        for (y, row) in rows.iter().enumerate() {
            if row.len() != width {
                bail!("row {} is {} tiles wide, expected {}", y, row.len(), width);
            }
        }

        Ok(Self {
            width: width as i32,
            height: height as i32,
            tiles: rows.into_iter().flatten().collect(),
        })
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// Row and column bounds are checked independently; the grid does not
    /// have to be square.
    pub fn in_bounds(&self, pos: IVec2) -> bool {
        (0..self.width).contains(&pos.x) && (0..self.height).contains(&pos.y)
    }

    /// Callers must check `in_bounds` first; an out-of-bounds position here
    /// is a programming error and panics.
    pub fn tile_at(&self, pos: IVec2) -> Tile {
        debug_assert!(self.in_bounds(pos), "tile_at({pos}) outside {}x{} grid", self.width, self.height);
        self.tiles[(pos.y * self.width + pos.x) as usize]
    }
}

fn parser<'a>() -> impl Parser<'a, &'a str, Vec<Vec<Tile>>, extra::Err<Rich<'a, char>>> {
    let tile = choice((
        just('.').to(Tile::Empty),
        just('/').to(Tile::MirrorForward),
        just('\\').to(Tile::MirrorBackward),
        just('|').to(Tile::SplitterVertical),
        just('-').to(Tile::SplitterHorizontal),
    ));

    tile.repeated()
        .collect::<Vec<_>>()
        .separated_by(text::newline())
        .allow_trailing()
        .collect::<Vec<_>>()
        // Filter out empty rows to prevent "ragged" grids caused by trailing newlines
        .map(|rows| rows.into_iter().filter(|r| !r.is_empty()).collect())
}

/// Parses a character grid into a [`Grid`]. Any character outside the
/// five-tile alphabet fails the parse with the offending character and span.
pub fn parse(input: &str) -> Result<Grid> {
    let rows = parser()
        .parse(input)
        .into_result()
        .map_err(|e| miette!("Parse failed: {:?}", e))?;

    Grid::new(rows)
}

/// A beam identified by where it is and where it is going. Two beams with
/// the same position and direction are the same beam for deduplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Beam {
    pub pos: IVec2,
    pub dir: Direction,
}

/// Removal order of the pending-beam frontier. The final energized count is
/// the same either way; only the number of duplicate discards differs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FrontierOrder {
    #[default]
    Lifo,
    Fifo,
}

/// One simulation run: the visited-state set, the energized-tile set and
/// the frontier all live here, created per run and dropped with it. The
/// grid is only borrowed, so concurrent runs over the same grid are safe.
pub struct Simulation<'a> {
    grid: &'a Grid,
    order: FrontierOrder,
    visited: HashSet<Beam>,
    energized: HashSet<IVec2>,
    frontier: VecDeque<Beam>,
}

impl<'a> Simulation<'a> {
    pub fn new(grid: &'a Grid) -> Self {
        Self::with_order(grid, FrontierOrder::default())
    }

    pub fn with_order(grid: &'a Grid, order: FrontierOrder) -> Self {
        Self {
            grid,
            order,
            visited: HashSet::new(),
            energized: HashSet::new(),
            frontier: VecDeque::new(),
        }
    }

    /// Propagates `start` until every beam has left the grid or re-entered
    /// a previously seen state, and returns how many tiles were touched.
    ///
    /// Every processed state is distinct, so the loop runs at most
    /// `width * height * 4` productive iterations; blowing past that budget
    /// means the duplicate check is broken and is reported as an error
    /// instead of looping forever.
    pub fn run(&mut self, start: Beam) -> Result<usize> {
        let budget = self.grid.width() as usize * self.grid.height() as usize * 4;

        if self.grid.in_bounds(start.pos) {
            self.frontier.push_back(start);
        }

        while let Some(beam) = self.pop() {
            if !self.visited.insert(beam) {
                continue;
            }
            if self.visited.len() > budget {
                bail!(
                    "processed {} beam states on a grid that only admits {}",
                    self.visited.len(),
                    budget
                );
            }

            self.energized.insert(beam.pos);

            match self.grid.tile_at(beam.pos).outcome(beam.dir) {
                Outcome::Continue => self.advance(beam.pos, beam.dir),
                Outcome::Redirect(dir) => self.advance(beam.pos, dir),
                Outcome::Split(first, second) => {
                    self.advance(beam.pos, first);
                    self.advance(beam.pos, second);
                }
            }
        }

        Ok(self.energized.len())
    }

    /// Tiles touched by at least one beam, in any direction.
    pub fn energized(&self) -> &HashSet<IVec2> {
        &self.energized
    }

    /// Pushes the successor one step from `from` in `dir`, unless it leaves
    /// the grid; beams exit silently.
    fn advance(&mut self, from: IVec2, dir: Direction) {
        let next = Beam {
            pos: from + dir.delta(),
            dir,
        };
        if self.grid.in_bounds(next.pos) {
            self.frontier.push_back(next);
        }
    }

    fn pop(&mut self) -> Option<Beam> {
        match self.order {
            FrontierOrder::Lifo => self.frontier.pop_back(),
            FrontierOrder::Fifo => self.frontier.pop_front(),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    const EXAMPLE: &str = r".|...\....
|.-.\.....
.....|-...
........|.
..........
.........\
..../.\\..
.-.-/..|..
.|....-|.\
..//.|....";

    #[rstest]
    #[case(Direction::Up, Direction::Right)]
    #[case(Direction::Right, Direction::Up)]
    #[case(Direction::Down, Direction::Left)]
    #[case(Direction::Left, Direction::Down)]
    fn forward_mirror_reflects(#[case] incoming: Direction, #[case] outgoing: Direction) {
        assert_eq!(
            Tile::MirrorForward.outcome(incoming),
            Outcome::Redirect(outgoing)
        );
    }

    #[rstest]
    #[case(Direction::Up, Direction::Left)]
    #[case(Direction::Right, Direction::Down)]
    #[case(Direction::Down, Direction::Right)]
    #[case(Direction::Left, Direction::Up)]
    fn backward_mirror_reflects(#[case] incoming: Direction, #[case] outgoing: Direction) {
        assert_eq!(
            Tile::MirrorBackward.outcome(incoming),
            Outcome::Redirect(outgoing)
        );
    }

    #[rstest]
    fn empty_tile_never_bends(
        #[values(Direction::Up, Direction::Right, Direction::Down, Direction::Left)]
        incoming: Direction,
    ) {
        assert_eq!(Tile::Empty.outcome(incoming), Outcome::Continue);
    }

    #[rstest]
    fn vertical_splitter_passes_vertical_beams(
        #[values(Direction::Up, Direction::Down)] incoming: Direction,
    ) {
        assert_eq!(Tile::SplitterVertical.outcome(incoming), Outcome::Continue);
    }

    #[rstest]
    fn vertical_splitter_splits_horizontal_beams(
        #[values(Direction::Right, Direction::Left)] incoming: Direction,
    ) {
        assert_eq!(
            Tile::SplitterVertical.outcome(incoming),
            Outcome::Split(Direction::Up, Direction::Down)
        );
    }

    #[rstest]
    fn horizontal_splitter_passes_horizontal_beams(
        #[values(Direction::Right, Direction::Left)] incoming: Direction,
    ) {
        assert_eq!(
            Tile::SplitterHorizontal.outcome(incoming),
            Outcome::Continue
        );
    }

    #[rstest]
    fn horizontal_splitter_splits_vertical_beams(
        #[values(Direction::Up, Direction::Down)] incoming: Direction,
    ) {
        assert_eq!(
            Tile::SplitterHorizontal.outcome(incoming),
            Outcome::Split(Direction::Left, Direction::Right)
        );
    }

    #[test]
    fn straight_beam_energizes_one_row() -> Result<()> {
        let grid = parse("...\n...\n...")?;
        let mut simulation = Simulation::new(&grid);
        let count = simulation.run(Beam {
            pos: IVec2::ZERO,
            dir: Direction::Right,
        })?;

        assert_eq!(count, 3);
        let energized = simulation.energized();
        for x in 0..3 {
            assert!(energized.contains(&IVec2::new(x, 0)));
        }
        Ok(())
    }

    /// Four mirrors forming a closed ring: without the visited-state check
    /// the beam would orbit forever.
    #[test]
    fn mirror_ring_terminates() -> Result<()> {
        let grid = parse(
            r"/.\
...
\./",
        )?;
        let count = Simulation::new(&grid).run(Beam {
            pos: IVec2::new(1, 0),
            dir: Direction::Right,
        })?;

        // The ring energizes the border, never the center.
        assert_eq!(count, 8);
        Ok(())
    }

    #[test]
    fn repeated_runs_are_deterministic() -> Result<()> {
        let grid = parse(EXAMPLE)?;
        let start = Beam {
            pos: IVec2::ZERO,
            dir: Direction::Right,
        };

        let mut first = Simulation::new(&grid);
        let mut second = Simulation::new(&grid);
        assert_eq!(first.run(start)?, second.run(start)?);
        assert_eq!(first.energized(), second.energized());
        Ok(())
    }

    #[test]
    fn frontier_order_does_not_change_the_result() -> Result<()> {
        let grid = parse(EXAMPLE)?;
        let start = Beam {
            pos: IVec2::ZERO,
            dir: Direction::Right,
        };

        let mut stack = Simulation::with_order(&grid, FrontierOrder::Lifo);
        let mut queue = Simulation::with_order(&grid, FrontierOrder::Fifo);
        assert_eq!(stack.run(start)?, queue.run(start)?);
        assert_eq!(stack.energized(), queue.energized());
        Ok(())
    }

    #[test]
    fn start_outside_the_grid_energizes_nothing() -> Result<()> {
        let grid = parse("...\n...")?;
        let count = Simulation::new(&grid).run(Beam {
            pos: IVec2::new(-1, 0),
            dir: Direction::Right,
        })?;

        assert_eq!(count, 0);
        Ok(())
    }

    #[test]
    fn rejects_tiles_outside_the_alphabet() {
        assert!(parse("..x\n...").is_err());
    }

    #[test]
    fn rejects_ragged_rows() {
        assert!(parse("...\n....").is_err());
    }
}
