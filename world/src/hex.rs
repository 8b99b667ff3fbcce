//! Hex lattice generation and exclusive cell occupancy.

use std::collections::BTreeMap;

use hexa_core::{CellCoord, CellSnapshot, GridError, HexLayout, Point, UnitId};

const SQRT_3: f32 = 1.732_050_8;

#[derive(Clone, Debug)]
struct HexCell {
    coord: CellCoord,
    center: Point,
    distance_from_center: f32,
    occupant: Option<UnitId>,
}

/// Outcome of reconciling a set of units into a one-per-cell layout.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Reconciliation {
    /// Units that received a cell, alongside the cell center they snap to.
    pub(crate) assigned: Vec<(UnitId, CellCoord, Point)>,
    /// Units left without a cell because the grid ran out of free cells.
    pub(crate) unassigned: Vec<UnitId>,
}

/// Hex lattice with bidirectional unit/cell occupancy.
///
/// Each cell references at most one unit and each unit references at most
/// one cell. [`HexGrid::assign`] is the only way to occupy a cell.
#[derive(Clone, Debug, Default)]
pub(crate) struct HexGrid {
    layout: Option<HexLayout>,
    cells: Vec<HexCell>,
    assignments: BTreeMap<UnitId, usize>,
}

impl HexGrid {
    /// Creates a grid that has not been generated yet.
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Computes every cell center from the layout.
    ///
    /// Odd rows are shifted right by half a horizontal step and the lattice
    /// is centered on the layout's center point.
    pub(crate) fn generate(&mut self, layout: HexLayout) -> Result<u32, GridError> {
        if self.layout.is_some() {
            return Err(GridError::AlreadyGenerated);
        }

        let rows = layout.rows();
        let columns = layout.columns();
        let radius = layout.cell_radius();
        let margin = layout.cell_margin();

        let step_x = SQRT_3 * radius + margin;
        let step_y = radius * 1.5 + margin;
        let row_shift = step_x / 2.0;

        let span_x = columns.saturating_sub(1) as f32 * step_x
            + if rows > 1 { row_shift } else { 0.0 };
        let span_y = rows.saturating_sub(1) as f32 * step_y;
        let center = layout.center();
        let origin_x = center.x() - span_x / 2.0;
        let origin_y = center.y() - span_y / 2.0;

        let capacity = usize::try_from(layout.cell_count()).unwrap_or(0);
        let mut cells = Vec::with_capacity(capacity);
        for row in 0..rows {
            let shift = if row % 2 == 1 { row_shift } else { 0.0 };
            for column in 0..columns {
                let cell_center = Point::new(
                    origin_x + column as f32 * step_x + shift,
                    origin_y + row as f32 * step_y,
                );
                cells.push(HexCell {
                    coord: CellCoord::new(row, column),
                    center: cell_center,
                    distance_from_center: cell_center.distance(center),
                    occupant: None,
                });
            }
        }

        self.cells = cells;
        self.assignments.clear();
        self.layout = Some(layout);
        Ok(layout.cell_count())
    }

    /// Reports whether [`HexGrid::generate`] has run.
    pub(crate) fn is_generated(&self) -> bool {
        self.layout.is_some()
    }

    /// Reports whether the cell exists and holds no unit.
    pub(crate) fn is_free(&self, cell: CellCoord) -> bool {
        self.index(cell)
            .map_or(false, |index| self.cells[index].occupant.is_none())
    }

    /// Unit occupying the cell, if any.
    pub(crate) fn occupant(&self, cell: CellCoord) -> Option<UnitId> {
        self.index(cell)
            .and_then(|index| self.cells[index].occupant)
    }

    /// Cell currently referenced by the unit, if any.
    pub(crate) fn cell_of(&self, unit: UnitId) -> Option<CellCoord> {
        self.assignments
            .get(&unit)
            .map(|index| self.cells[*index].coord)
    }

    /// World-space center of the cell.
    pub(crate) fn center_of(&self, cell: CellCoord) -> Option<Point> {
        self.index(cell).map(|index| self.cells[index].center)
    }

    /// Cell whose center is closest to `point`.
    ///
    /// Every point maps to a cell, including points far outside the lattice.
    /// Ties keep the first cell in row-major order.
    pub(crate) fn nearest_cell(&self, point: Point) -> Result<CellCoord, GridError> {
        self.nearest_index(point, |_| true)
            .map(|index| self.cells[index].coord)
            .ok_or(GridError::NotReady)
    }

    /// Free cell whose center is closest to `point`.
    pub(crate) fn nearest_free_cell(&self, point: Point) -> Result<Option<CellCoord>, GridError> {
        if !self.is_generated() {
            return Err(GridError::NotReady);
        }

        Ok(self
            .nearest_index(point, |cell| cell.occupant.is_none())
            .map(|index| self.cells[index].coord))
    }

    /// Places `unit` on `cell`, releasing whichever cell it held before.
    ///
    /// Succeeds when the cell is free or already held by the same unit and
    /// returns the cell center the unit should move to. Leaves all state
    /// untouched on failure.
    pub(crate) fn assign(&mut self, unit: UnitId, cell: CellCoord) -> Result<Point, GridError> {
        if !self.is_generated() {
            return Err(GridError::NotReady);
        }
        let index = self.index(cell).ok_or(GridError::UnknownCell)?;

        match self.cells[index].occupant {
            Some(existing) if existing != unit => return Err(GridError::Occupied),
            _ => {}
        }

        if let Some(previous) = self.assignments.insert(unit, index) {
            if previous != index {
                self.cells[previous].occupant = None;
            }
        }
        self.cells[index].occupant = Some(unit);
        Ok(self.cells[index].center)
    }

    /// Releases the cell held by `unit`, returning it.
    pub(crate) fn vacate(&mut self, unit: UnitId) -> Option<CellCoord> {
        let index = self.assignments.remove(&unit)?;
        self.cells[index].occupant = None;
        Some(self.cells[index].coord)
    }

    /// Clears every assignment and gives each unit its nearest free cell.
    ///
    /// Units are processed in the order provided, so earlier units win
    /// contested cells. Units that find no free cell stay unassigned.
    pub(crate) fn initialize_occupancy<I>(&mut self, units: I) -> Result<Reconciliation, GridError>
    where
        I: IntoIterator<Item = (UnitId, Point)>,
    {
        if !self.is_generated() {
            return Err(GridError::NotReady);
        }

        for cell in &mut self.cells {
            cell.occupant = None;
        }
        self.assignments.clear();

        let mut reconciliation = Reconciliation::default();
        for (unit, position) in units {
            let Some(index) = self.nearest_index(position, |cell| cell.occupant.is_none()) else {
                reconciliation.unassigned.push(unit);
                continue;
            };

            let cell = &mut self.cells[index];
            cell.occupant = Some(unit);
            let _ = self.assignments.insert(unit, index);
            reconciliation.assigned.push((unit, cell.coord, cell.center));
        }

        Ok(reconciliation)
    }

    /// Immutable description of every cell in row-major order.
    pub(crate) fn snapshots(&self) -> Vec<CellSnapshot> {
        self.cells
            .iter()
            .map(|cell| CellSnapshot {
                coord: cell.coord,
                center: cell.center,
                distance_from_center: cell.distance_from_center,
                occupant: cell.occupant,
            })
            .collect()
    }

    fn nearest_index<F>(&self, point: Point, mut accept: F) -> Option<usize>
    where
        F: FnMut(&HexCell) -> bool,
    {
        let mut best: Option<(usize, f32)> = None;
        for (index, cell) in self.cells.iter().enumerate() {
            if !accept(cell) {
                continue;
            }

            let distance = cell.center.distance(point);
            match best {
                Some((_, best_distance)) if distance >= best_distance => {}
                _ => best = Some((index, distance)),
            }
        }
        best.map(|(index, _)| index)
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        let layout = self.layout?;
        if cell.row() < layout.rows() && cell.column() < layout.columns() {
            let row = usize::try_from(cell.row()).ok()?;
            let column = usize::try_from(cell.column()).ok()?;
            let width = usize::try_from(layout.columns()).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }
}
