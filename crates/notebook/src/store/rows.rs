//! Row arithmetic shared by the store implementations

use super::entry::{COL_CONTENT, COL_CONTEXT, COL_ID, TempId};
use crate::error::StoreError;
use crate::sheets::RowSpan;

/// Next id to assign: one past the largest existing id, 1 for an empty table
///
/// Gaps left by deleted rows are never reused. A table already holding
/// `i64::MAX` has no next id and is rejected as a validation error.
pub fn next_temp_id(existing: impl IntoIterator<Item = TempId>) -> Result<TempId, StoreError> {
    let max = existing.into_iter().map(|id| id.0).max().unwrap_or(0);
    max.max(0)
        .checked_add(1)
        .map(TempId)
        .ok_or_else(|| StoreError::Validation(format!("id {} has no successor", max)))
}

/// Ids parsed from a column of data rows, skipping unparsable cells
pub fn ids_in(rows: &[Vec<String>]) -> impl Iterator<Item = TempId> + '_ {
    rows.iter()
        .filter_map(|row| row.get(COL_ID as usize))
        .filter_map(|cell| TempId::parse(cell))
}

/// Position (0-based within the data rows) of the first row with this id
pub fn find_row(rows: &[Vec<String>], id: TempId) -> Option<usize> {
    rows.iter().position(|row| {
        row.get(COL_ID as usize)
            .and_then(|cell| TempId::parse(cell))
            .is_some_and(|found| found == id)
    })
}

/// Sheet row number (1-based, header on row 1) of a data row position
pub fn sheet_row(position: usize) -> u32 {
    position as u32 + 2
}

/// Grid span deleting the single data row at `position`
pub fn single_row_span(position: usize) -> RowSpan {
    let start = position as u32 + 1;
    RowSpan {
        start,
        end: start + 1,
    }
}

/// Positions of data rows whose context and content are both blank
pub fn blank_rows(rows: &[Vec<String>]) -> Vec<usize> {
    let blank = |row: &Vec<String>, col: u32| {
        row.get(col as usize)
            .is_none_or(|cell| cell.trim().is_empty())
    };
    rows.iter()
        .enumerate()
        .filter(|(_, row)| blank(row, COL_CONTEXT) && blank(row, COL_CONTENT))
        .map(|(i, _)| i)
        .collect()
}

/// Merge sorted positions into contiguous grid spans, bottom-most first
///
/// Deleting in this order keeps every earlier span's indices valid.
pub fn merge_into_spans(positions: &[usize]) -> Vec<RowSpan> {
    let mut spans: Vec<(usize, usize)> = Vec::new();
    for &pos in positions {
        match spans.last_mut() {
            Some((_, hi)) if pos == *hi + 1 => *hi = pos,
            _ => spans.push((pos, pos)),
        }
    }

    spans
        .into_iter()
        .rev()
        .map(|(lo, hi)| RowSpan {
            start: lo as u32 + 1,
            end: hi as u32 + 2,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
        data.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_next_temp_id() {
        assert_eq!(next_temp_id([]).unwrap(), TempId(1));
        assert_eq!(next_temp_id([TempId(1), TempId(2)]).unwrap(), TempId(3));
        // Max, not count: gaps are not refilled
        assert_eq!(next_temp_id([TempId(1), TempId(7)]).unwrap(), TempId(8));
        assert_eq!(next_temp_id([TempId(-4)]).unwrap(), TempId(1));
    }

    #[test]
    fn test_next_temp_id_at_max_is_rejected() {
        assert_eq!(
            next_temp_id([TempId(i64::MAX - 1)]).unwrap(),
            TempId(i64::MAX)
        );
        assert!(matches!(
            next_temp_id([TempId(3), TempId(i64::MAX)]),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn test_ids_skip_unparsable() {
        let data = rows(&[&["1"], &["x"], &[], &["5"]]);
        let ids: Vec<TempId> = ids_in(&data).collect();
        assert_eq!(ids, vec![TempId(1), TempId(5)]);
    }

    #[test]
    fn test_find_row_first_match() {
        let data = rows(&[&["1"], &["3"], &["3"], &["2"]]);
        assert_eq!(find_row(&data, TempId(3)), Some(1));
        assert_eq!(find_row(&data, TempId(2)), Some(3));
        assert_eq!(find_row(&data, TempId(9)), None);
    }

    #[test]
    fn test_row_numbering() {
        assert_eq!(sheet_row(0), 2);
        assert_eq!(single_row_span(0), RowSpan { start: 1, end: 2 });
        assert_eq!(single_row_span(4), RowSpan { start: 5, end: 6 });
    }

    #[test]
    fn test_blank_rows() {
        let data = rows(&[
            &["1", "a", "b"],
            &["2", "", "  "],
            &["3", "", "x"],
            &["4", "", ""],
            &["5"],
        ]);
        assert_eq!(blank_rows(&data), vec![1, 3, 4]);
    }

    #[test]
    fn test_blank_rows_four_row_sheet() {
        let data = rows(&[&["1", "a", "b"], &["2", "", "  "], &["3", "", "x"], &["4", "", ""]]);
        let blank = blank_rows(&data);
        assert_eq!(blank, vec![1, 3]);
        assert_eq!(
            merge_into_spans(&blank),
            vec![RowSpan { start: 4, end: 5 }, RowSpan { start: 2, end: 3 }]
        );
    }

    #[test]
    fn test_merge_into_spans() {
        assert!(merge_into_spans(&[]).is_empty());
        assert_eq!(
            merge_into_spans(&[1, 3]),
            vec![RowSpan { start: 4, end: 5 }, RowSpan { start: 2, end: 3 }]
        );
        assert_eq!(
            merge_into_spans(&[0, 1, 2, 5, 6, 9]),
            vec![
                RowSpan { start: 10, end: 11 },
                RowSpan { start: 6, end: 8 },
                RowSpan { start: 1, end: 4 },
            ]
        );
    }
}
