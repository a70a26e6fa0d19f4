use crate::coords::Vec2;
use crate::render::{BatchError, SpriteBatch, SpriteId, Texture};

use super::{GridError, NodeId, Sprite, TransformNode, TransformTree};

/// Grid layout parameters.
#[derive(Debug, Clone, Default)]
pub struct SpriteGridSettings {
    pub columns: usize,
    pub rows: usize,
    /// Layer assigned to every cell sprite.
    pub layer: u32,
    /// Texture for plain grids, and the fallback for mapped digits with no texture.
    pub texture: Option<Texture>,
    /// Cell pitch; defaults to the pixel size of `texture`, then of each
    /// cell's own texture.
    pub cell_size: Option<Vec2>,
}

/// Sprite and transform node created for one cell.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct GridCell {
    pub sprite: SpriteId,
    pub node: NodeId,
}

/// A `columns x rows` arrangement of sprites parented to one root node.
///
/// Cell `(c, r)` sits at `(c * cell_w, r * cell_h)` relative to the root,
/// row 0 at the bottom. A mapped grid reads one digit per cell from a string
/// written top row first: `'0'` leaves the cell empty and `d` uses
/// `textures[d - 1]`.
#[derive(Debug)]
pub struct SpriteGrid {
    settings: SpriteGridSettings,
    map: Option<(String, Vec<Texture>)>,
    root: Option<NodeId>,
    cells: Vec<Option<GridCell>>,
}

impl SpriteGrid {
    pub fn new(settings: SpriteGridSettings) -> Self {
        Self { settings, map: None, root: None, cells: Vec::new() }
    }

    pub fn mapped(settings: SpriteGridSettings, map: impl Into<String>, textures: Vec<Texture>) -> Self {
        Self {
            settings,
            map: Some((map.into(), textures)),
            root: None,
            cells: Vec::new(),
        }
    }

    #[inline]
    pub fn settings(&self) -> &SpriteGridSettings {
        &self.settings
    }

    /// Root node all cells are parented to; move it to move the grid.
    #[inline]
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Number of occupied cells.
    pub fn occupied(&self) -> usize {
        self.cells.iter().flatten().count()
    }

    pub fn cell(&self, column: usize, row: usize) -> Option<GridCell> {
        if column >= self.settings.columns || row >= self.settings.rows {
            return None;
        }
        self.cells
            .get(row * self.settings.columns + column)
            .copied()
            .flatten()
    }

    /// (Re)creates all cells. The layout is validated first, so on error the
    /// batch and tree are left as they were.
    pub fn build(
        &mut self,
        batch: &mut SpriteBatch,
        transforms: &mut TransformTree,
    ) -> Result<usize, GridError> {
        let plan = self.plan()?;
        self.clear(batch, transforms);

        let root = match self.root.filter(|r| transforms.contains(*r)) {
            Some(root) => root,
            None => {
                let root = transforms.insert(TransformNode::new());
                self.root = Some(root);
                root
            }
        };

        let columns = self.settings.columns;
        self.cells = Vec::with_capacity(plan.len());
        for (index, texture) in plan.into_iter().enumerate() {
            let Some(texture) = texture else {
                self.cells.push(None);
                continue;
            };

            let position = self.cell_position(index % columns, index / columns, &texture);
            let node = transforms.insert(TransformNode::new().with_position(position));
            transforms.set_parent(node, Some(root));

            let sprite = Sprite::from_texture(texture)
                .with_layer(self.settings.layer)
                .with_transform(node);
            let sprite = match batch.add(sprite) {
                Ok(id) => id,
                Err(err) => {
                    transforms.remove(node);
                    return Err(err.into());
                }
            };
            self.cells.push(Some(GridCell { sprite, node }));
        }

        let count = self.occupied();
        log::debug!(
            "built {}x{} sprite grid: {count} cells",
            self.settings.columns,
            self.settings.rows
        );
        Ok(count)
    }

    /// Re-positions existing cells, e.g. after changing the cell size.
    pub fn layout(&self, batch: &SpriteBatch, transforms: &mut TransformTree) {
        let columns = self.settings.columns.max(1);
        for (index, cell) in self.cells.iter().enumerate() {
            let Some(cell) = cell else { continue };
            let Some(texture) = batch.sprite(cell.sprite).and_then(Sprite::texture) else {
                continue;
            };
            let position = self.cell_position(index % columns, index / columns, texture);
            if let Some(node) = transforms.get_mut(cell.node) {
                node.set_position(position);
            }
        }
    }

    pub fn set_cell_size(&mut self, cell_size: Option<Vec2>) {
        self.settings.cell_size = cell_size;
    }

    /// Removes every cell sprite and node. The root node is kept.
    pub fn clear(&mut self, batch: &mut SpriteBatch, transforms: &mut TransformTree) {
        for cell in self.cells.drain(..).flatten() {
            batch.remove(cell.sprite);
            transforms.remove(cell.node);
        }
    }

    fn cell_position(&self, column: usize, row: usize, texture: &Texture) -> Vec2 {
        let pitch = self.settings.cell_size.unwrap_or_else(|| {
            self.settings
                .texture
                .as_ref()
                .filter(|base| base.is_valid())
                .unwrap_or(texture)
                .size()
        });
        Vec2::new(column as f32 * pitch.x, row as f32 * pitch.y)
    }

    /// Texture per cell, indexed `row * columns + column` with row 0 at the bottom.
    fn plan(&self) -> Result<Vec<Option<Texture>>, GridError> {
        let SpriteGridSettings { columns, rows, .. } = self.settings;
        let expected = columns * rows;

        let Some((map, textures)) = &self.map else {
            let texture = self
                .settings
                .texture
                .clone()
                .ok_or(GridError::Batch(BatchError::MissingTexture))?;
            return Ok(vec![Some(texture); expected]);
        };

        let cells: Vec<char> = map.chars().collect();
        if cells.len() != expected {
            return Err(GridError::LayoutMismatch {
                columns,
                rows,
                expected,
                actual: cells.len(),
            });
        }

        let mut plan = Vec::with_capacity(expected);
        for row in 0..rows {
            for column in 0..columns {
                let index = (rows - 1 - row) * columns + column;
                let found = cells[index];
                let digit = found
                    .to_digit(10)
                    .ok_or(GridError::InvalidCell { index, found })?;
                if digit == 0 {
                    plan.push(None);
                    continue;
                }

                let texture_index = digit as usize - 1;
                let texture = textures
                    .get(texture_index)
                    .or(self.settings.texture.as_ref())
                    .cloned()
                    .ok_or(GridError::TextureIndex {
                        index,
                        texture_index,
                        available: textures.len(),
                    })?;
                plan.push(Some(texture));
            }
        }
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::test_support::solid;

    fn settings(columns: usize, rows: usize) -> SpriteGridSettings {
        SpriteGridSettings { columns, rows, layer: 4, ..Default::default() }
    }

    fn six_textures() -> Vec<Texture> {
        (1..=6).map(|i| solid(i, 16, 16)).collect()
    }

    fn texture_at(grid: &SpriteGrid, batch: &SpriteBatch, column: usize, row: usize) -> Option<u64> {
        let cell = grid.cell(column, row)?;
        batch.sprite(cell.sprite)?.texture().map(|t| t.id().raw())
    }

    // ── mapped layout ────────────────────────────────────────────────────

    #[test]
    fn mapped_grid_flips_rows_and_skips_zeros() {
        let textures = six_textures();
        let mut grid = SpriteGrid::mapped(settings(3, 3), "123000456", textures);
        let mut batch = SpriteBatch::new();
        let mut tree = TransformTree::new();

        assert_eq!(grid.build(&mut batch, &mut tree), Ok(6));
        assert_eq!(batch.len(), 6);

        // Bottom row comes from the last map row.
        assert_eq!(texture_at(&grid, &batch, 0, 0), Some(4));
        assert_eq!(texture_at(&grid, &batch, 2, 0), Some(6));
        assert_eq!(grid.cell(1, 1), None);
        assert_eq!(texture_at(&grid, &batch, 0, 2), Some(1));
        assert_eq!(texture_at(&grid, &batch, 2, 2), Some(3));

        let cell = grid.cell(2, 2).unwrap();
        assert_eq!(batch.sprite(cell.sprite).unwrap().layer(), 4);
        assert_eq!(tree.get(cell.node).unwrap().position(), Vec2::new(32.0, 32.0));
        assert_eq!(tree.get(cell.node).unwrap().parent(), grid.root());
    }

    #[test]
    fn layout_mismatch_creates_nothing() {
        let mut grid = SpriteGrid::mapped(settings(3, 3), "12", six_textures());
        let mut batch = SpriteBatch::new();
        let mut tree = TransformTree::new();

        let err = grid.build(&mut batch, &mut tree).unwrap_err();
        assert_eq!(
            err,
            GridError::LayoutMismatch { columns: 3, rows: 3, expected: 9, actual: 2 }
        );
        assert!(batch.is_empty());
        assert!(tree.is_empty());
    }

    #[test]
    fn non_digit_cell_is_rejected() {
        let mut grid = SpriteGrid::mapped(settings(2, 1), "1x", six_textures());
        let err = grid.build(&mut SpriteBatch::new(), &mut TransformTree::new()).unwrap_err();
        assert_eq!(err, GridError::InvalidCell { index: 1, found: 'x' });
    }

    #[test]
    fn out_of_range_digit_uses_fallback_texture() {
        let mut with_fallback = settings(2, 1);
        with_fallback.texture = Some(solid(99, 8, 8));
        let mut grid = SpriteGrid::mapped(with_fallback, "19", vec![solid(1, 8, 8)]);
        let mut batch = SpriteBatch::new();
        grid.build(&mut batch, &mut TransformTree::new()).unwrap();
        assert_eq!(texture_at(&grid, &batch, 1, 0), Some(99));

        let mut grid = SpriteGrid::mapped(settings(2, 1), "19", vec![solid(1, 8, 8)]);
        let err = grid.build(&mut SpriteBatch::new(), &mut TransformTree::new()).unwrap_err();
        assert_eq!(err, GridError::TextureIndex { index: 1, texture_index: 8, available: 1 });
    }

    #[test]
    fn mixed_texture_sizes_use_the_base_texture_pitch() {
        let mut base = settings(3, 1);
        base.texture = Some(solid(99, 16, 16));
        let textures = vec![solid(1, 8, 8), solid(2, 32, 32)];
        let mut grid = SpriteGrid::mapped(base, "122", textures);
        let mut batch = SpriteBatch::new();
        let mut tree = TransformTree::new();
        grid.build(&mut batch, &mut tree).unwrap();

        let x = |column| tree.get(grid.cell(column, 0).unwrap().node).unwrap().position().x;
        assert_eq!([x(0), x(1), x(2)], [0.0, 16.0, 32.0]);

        // Without a base texture each cell falls back to its own size.
        let mut grid = SpriteGrid::mapped(settings(3, 1), "122", vec![solid(1, 8, 8), solid(2, 32, 32)]);
        let mut tree = TransformTree::new();
        grid.build(&mut SpriteBatch::new(), &mut tree).unwrap();
        let x = |column| tree.get(grid.cell(column, 0).unwrap().node).unwrap().position().x;
        assert_eq!([x(1), x(2)], [32.0, 64.0]);
    }

    // ── plain grids ──────────────────────────────────────────────────────

    #[test]
    fn plain_grid_fills_every_cell() {
        let mut s = settings(4, 2);
        s.texture = Some(solid(1, 8, 8));
        s.cell_size = Some(Vec2::new(10.0, 12.0));
        let mut grid = SpriteGrid::new(s);
        let mut batch = SpriteBatch::new();
        let mut tree = TransformTree::new();

        assert_eq!(grid.build(&mut batch, &mut tree), Ok(8));
        let node = grid.cell(3, 1).unwrap().node;
        assert_eq!(tree.get(node).unwrap().position(), Vec2::new(30.0, 12.0));
        assert_eq!(grid.cell(4, 0), None);
    }

    #[test]
    fn plain_grid_without_texture_fails() {
        let mut grid = SpriteGrid::new(settings(2, 2));
        let err = grid.build(&mut SpriteBatch::new(), &mut TransformTree::new()).unwrap_err();
        assert_eq!(err, GridError::Batch(BatchError::MissingTexture));
    }

    #[test]
    fn rebuild_and_clear_release_previous_cells() {
        let mut s = settings(2, 2);
        s.texture = Some(solid(1, 8, 8));
        let mut grid = SpriteGrid::new(s);
        let mut batch = SpriteBatch::new();
        let mut tree = TransformTree::new();

        grid.build(&mut batch, &mut tree).unwrap();
        grid.build(&mut batch, &mut tree).unwrap();
        assert_eq!(batch.len(), 4);
        assert_eq!(tree.len(), 5);

        grid.clear(&mut batch, &mut tree);
        assert!(batch.is_empty());
        assert_eq!(tree.len(), 1);
        assert_eq!(grid.occupied(), 0);
    }

    #[test]
    fn layout_applies_new_cell_size() {
        let mut s = settings(2, 1);
        s.texture = Some(solid(1, 8, 8));
        let mut grid = SpriteGrid::new(s);
        let mut batch = SpriteBatch::new();
        let mut tree = TransformTree::new();
        grid.build(&mut batch, &mut tree).unwrap();

        grid.set_cell_size(Some(Vec2::new(20.0, 20.0)));
        grid.layout(&batch, &mut tree);
        let node = grid.cell(1, 0).unwrap().node;
        assert_eq!(tree.get(node).unwrap().position(), Vec2::new(20.0, 0.0));
    }
}
