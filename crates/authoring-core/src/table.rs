//! Table blocks
//!
//! A table is a block of type [`BlockType::Table`] carrying a 2-D grid of cells. Each
//! cell is a group of ordinary blocks (or empty). Cells are shared through `Arc`, so
//! inserting a row or column only shifts grid indices: cells that already exist keep
//! their blocks and keys.
//!
//! Table operations address a cell through a [`TableCursor`], the active cell tracked
//! by the store.

use crate::document::{Block, BlockKey, BlockType, Document, InlineStyle};
use crate::error::ModelError;
use crate::selection::Selection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A group of blocks forming one table cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableCell {
    blocks: Vec<Block>,
}

impl TableCell {
    /// Create a cell from blocks.
    pub fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    /// Blocks of the cell.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Cell text, blocks joined by newlines.
    pub fn text(&self) -> String {
        let texts: Vec<&str> = self.blocks.iter().map(Block::text).collect();
        texts.join("\n")
    }
}

/// Grid of cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    rows: usize,
    cols: usize,
    with_header: bool,
    cells: Vec<Vec<Option<Arc<TableCell>>>>,
}

impl Table {
    /// Empty `rows` x `cols` grid.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            with_header: false,
            cells: vec![vec![None; cols]; rows],
        }
    }

    /// Build a table from explicit cells. Missing trailing cells are padded with
    /// empty ones; extra cells are ignored.
    pub fn from_cells(
        rows: usize,
        cols: usize,
        with_header: bool,
        cells: Vec<Vec<Option<TableCell>>>,
    ) -> Self {
        let mut grid: Vec<Vec<Option<Arc<TableCell>>>> = vec![vec![None; cols]; rows];
        for (i, row) in cells.into_iter().enumerate().take(rows) {
            for (j, cell) in row.into_iter().enumerate().take(cols) {
                grid[i][j] = cell.map(Arc::new);
            }
        }
        Self {
            rows,
            cols,
            with_header,
            cells: grid,
        }
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Whether the first row is a header row.
    pub fn with_header(&self) -> bool {
        self.with_header
    }

    /// Cell at `(row, col)`; `None` for empty or out-of-range cells.
    pub fn cell(&self, row: usize, col: usize) -> Option<&TableCell> {
        self.cells.get(row)?.get(col)?.as_deref()
    }

    /// Every block nested in the grid, row-major.
    pub fn cell_blocks(&self) -> impl Iterator<Item = &Block> {
        self.cells
            .iter()
            .flatten()
            .flatten()
            .flat_map(|cell| cell.blocks.iter())
    }

    pub(crate) fn map_cell_blocks(&self, mut f: impl FnMut(&Block) -> Block) -> Table {
        let mut table = self.clone();
        for row in &mut table.cells {
            for cell in row.iter_mut().flatten() {
                let blocks = cell.blocks.iter().map(&mut f).collect();
                *cell = Arc::new(TableCell { blocks });
            }
        }
        table
    }

    fn check_bounds(&self, row: usize, col: usize) -> Result<(), ModelError> {
        if row >= self.rows || col >= self.cols {
            return Err(ModelError::CellOutOfBounds { row, col });
        }
        Ok(())
    }
}

/// The active table cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableCursor {
    /// Key of the table block.
    pub block: BlockKey,
    /// Row index.
    pub row: usize,
    /// Column index.
    pub col: usize,
}

impl TableCursor {
    /// Create a cursor.
    pub fn new(block: impl Into<BlockKey>, row: usize, col: usize) -> Self {
        Self {
            block: block.into(),
            row,
            col,
        }
    }
}

fn locate<'a>(doc: &'a Document, cursor: &TableCursor) -> Result<(usize, &'a Table), ModelError> {
    let index = doc
        .block_index(&cursor.block)
        .ok_or_else(|| ModelError::StaleSelection {
            key: cursor.block.clone(),
        })?;
    let table = doc
        .block_at(index)
        .and_then(Block::table)
        .ok_or_else(|| ModelError::NotATable {
            key: cursor.block.clone(),
        })?;
    table.check_bounds(cursor.row, cursor.col)?;
    Ok((index, table))
}

fn replace_table(doc: &Document, index: usize, table: Table) -> Document {
    match doc.block_at(index) {
        Some(block) => doc.replace_block(index, block.clone().with_table(table)),
        None => doc.clone(),
    }
}

/// Insert an empty `rows` x `cols` table after the block holding the selection focus.
pub fn add_table(
    doc: &Document,
    selection: &Selection,
    rows: usize,
    cols: usize,
) -> Result<(Document, TableCursor), ModelError> {
    if rows == 0 || cols == 0 {
        return Err(ModelError::InvalidTableSize);
    }
    let range = selection.resolve(doc)?;
    let key = doc.fresh_key();
    let block = Block::new(key.clone(), BlockType::Table, "").with_table(Table::new(rows, cols));
    let at = range.end_index() + 1;
    let doc = doc.splice_blocks(at..at, vec![block]);
    Ok((doc, TableCursor::new(key, 0, 0)))
}

/// Insert an empty row below the active cell.
pub fn add_row_after(doc: &Document, cursor: &TableCursor) -> Result<Document, ModelError> {
    let (index, table) = locate(doc, cursor)?;
    let mut table = table.clone();
    table.cells.insert(cursor.row + 1, vec![None; table.cols]);
    table.rows += 1;
    Ok(replace_table(doc, index, table))
}

/// Insert an empty column right of the active cell.
pub fn add_col_after(doc: &Document, cursor: &TableCursor) -> Result<Document, ModelError> {
    let (index, table) = locate(doc, cursor)?;
    let mut table = table.clone();
    for row in &mut table.cells {
        row.insert(cursor.col + 1, None);
    }
    table.cols += 1;
    Ok(replace_table(doc, index, table))
}

/// Remove the active row. A table keeps at least one row; the cursor is clamped.
pub fn remove_row(
    doc: &Document,
    cursor: &TableCursor,
) -> Result<(Document, TableCursor), ModelError> {
    let (index, table) = locate(doc, cursor)?;
    if table.rows <= 1 {
        return Ok((doc.clone(), cursor.clone()));
    }
    let mut table = table.clone();
    table.cells.remove(cursor.row);
    table.rows -= 1;
    let row = cursor.row.min(table.rows - 1);
    Ok((
        replace_table(doc, index, table),
        TableCursor::new(cursor.block.clone(), row, cursor.col),
    ))
}

/// Remove the active column. A table keeps at least one column; the cursor is clamped.
pub fn remove_col(
    doc: &Document,
    cursor: &TableCursor,
) -> Result<(Document, TableCursor), ModelError> {
    let (index, table) = locate(doc, cursor)?;
    if table.cols <= 1 {
        return Ok((doc.clone(), cursor.clone()));
    }
    let mut table = table.clone();
    for row in &mut table.cells {
        row.remove(cursor.col);
    }
    table.cols -= 1;
    let col = cursor.col.min(table.cols - 1);
    Ok((
        replace_table(doc, index, table),
        TableCursor::new(cursor.block.clone(), cursor.row, col),
    ))
}

/// Flip the header flag of the table.
pub fn toggle_table_header(doc: &Document, cursor: &TableCursor) -> Result<Document, ModelError> {
    let (index, table) = locate(doc, cursor)?;
    let mut table = table.clone();
    table.with_header = !table.with_header;
    Ok(replace_table(doc, index, table))
}

/// Toggle `style` over the whole text of the active cell.
pub fn toggle_cell_style(
    doc: &Document,
    cursor: &TableCursor,
    style: InlineStyle,
) -> Result<Document, ModelError> {
    let (index, table) = locate(doc, cursor)?;
    let Some(cell) = table.cell(cursor.row, cursor.col) else {
        return Ok(doc.clone());
    };
    let mut text_blocks = cell.blocks.iter().filter(|block| !block.is_empty()).peekable();
    if text_blocks.peek().is_none() {
        return Ok(doc.clone());
    }
    let uniform = text_blocks.all(|block| block.styles().covers(0, block.len(), &style));

    let blocks = cell
        .blocks
        .iter()
        .map(|block| block.set_style(0, block.len(), style, !uniform))
        .collect();
    let mut table = table.clone();
    table.cells[cursor.row][cursor.col] = Some(Arc::new(TableCell { blocks }));
    Ok(replace_table(doc, index, table))
}

/// Replace the content of the active cell with a single unstyled block.
pub fn set_cell_text(
    doc: &Document,
    cursor: &TableCursor,
    text: &str,
) -> Result<Document, ModelError> {
    let (index, table) = locate(doc, cursor)?;
    let key = table
        .cell(cursor.row, cursor.col)
        .and_then(|cell| cell.blocks.first())
        .map(|block| block.key().clone())
        .unwrap_or_else(|| doc.fresh_key());
    let mut table = table.clone();
    table.cells[cursor.row][cursor.col] = Some(Arc::new(TableCell {
        blocks: vec![Block::new(key, BlockType::Unstyled, text)],
    }));
    Ok(replace_table(doc, index, table))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_table() -> (Document, TableCursor) {
        let doc = Document::from_text("intro");
        add_table(&doc, &Selection::caret("b0", 0), 2, 2).unwrap()
    }

    #[test]
    fn test_add_table_inserts_after_caret_block() {
        let (doc, cursor) = with_table();
        assert_eq!(doc.block_count(), 2);
        let block = doc.block(&cursor.block).unwrap();
        assert_eq!(block.kind(), BlockType::Table);
        assert_eq!(block.table().map(|t| (t.rows(), t.cols())), Some((2, 2)));
    }

    #[test]
    fn test_add_row_preserves_existing_cells() {
        let (doc, cursor) = with_table();
        let doc = set_cell_text(&doc, &TableCursor::new(cursor.block.clone(), 1, 0), "kept").unwrap();
        let cell_key = doc
            .block(&cursor.block)
            .and_then(|b| b.table())
            .and_then(|t| t.cell(1, 0))
            .map(|c| c.blocks()[0].key().clone())
            .unwrap();

        let doc = add_row_after(&doc, &cursor).unwrap();
        let table = doc.block(&cursor.block).and_then(|b| b.table()).unwrap();
        assert_eq!(table.rows(), 3);
        assert!(table.cell(1, 0).is_none());
        let moved = table.cell(2, 0).unwrap();
        assert_eq!(moved.text(), "kept");
        assert_eq!(moved.blocks()[0].key(), &cell_key);
    }

    #[test]
    fn test_remove_keeps_last_row_and_col() {
        let doc = Document::from_text("x");
        let (doc, cursor) = add_table(&doc, &Selection::caret("b0", 0), 1, 1).unwrap();
        let (after, _) = remove_row(&doc, &cursor).unwrap();
        assert_eq!(after, doc);
        let (after, _) = remove_col(&doc, &cursor).unwrap();
        assert_eq!(after, doc);
    }

    #[test]
    fn test_toggle_cell_style() {
        let (doc, cursor) = with_table();
        let doc = set_cell_text(&doc, &cursor, "bold me").unwrap();
        let doc = toggle_cell_style(&doc, &cursor, InlineStyle::Bold).unwrap();
        let cell_block = &doc.block(&cursor.block).unwrap().table().unwrap().cell(0, 0).unwrap().blocks()[0];
        assert!(cell_block.styles().covers(0, 7, &InlineStyle::Bold));

        let doc = toggle_cell_style(&doc, &cursor, InlineStyle::Bold).unwrap();
        let cell_block = &doc.block(&cursor.block).unwrap().table().unwrap().cell(0, 0).unwrap().blocks()[0];
        assert!(cell_block.styles().is_empty());
    }

    #[test]
    fn test_out_of_bounds_cursor() {
        let (doc, cursor) = with_table();
        let bad = TableCursor::new(cursor.block, 5, 0);
        assert_eq!(
            add_row_after(&doc, &bad),
            Err(ModelError::CellOutOfBounds { row: 5, col: 0 })
        );
    }
}
