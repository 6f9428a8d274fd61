/// Conservative effective bind-parameter ceiling, below the backend's
/// actual 100-parameter limit (§4.5 "Batch sizing", §6.2).
pub const MAX_BOUND_PARAMETERS: usize = 80;

/// `max(1, floor(ceiling / columns_per_row))` rows per insert statement.
pub fn batch_size(columns_per_row: usize) -> usize {
    (MAX_BOUND_PARAMETERS / columns_per_row.max(1)).max(1)
}

/// Splits `rows` into chunks no larger than `batch_size(columns_per_row)`,
/// the shape every batched insert in the persistence engine follows
/// (§4.5 "A statement-level pre-check computes the parameter count before
/// appending each row").
pub fn chunks<T>(rows: &[T], columns_per_row: usize) -> impl Iterator<Item = &[T]> {
    rows.chunks(batch_size(columns_per_row))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_size_never_exceeds_the_effective_ceiling() {
        assert_eq!(batch_size(8), 10);
        assert_eq!(batch_size(3), 26);
        assert_eq!(batch_size(1), 80);
    }

    #[test]
    fn batch_size_is_at_least_one_even_for_wide_rows() {
        assert_eq!(batch_size(200), 1);
    }

    #[test]
    fn chunks_covers_every_row_without_exceeding_the_ceiling() {
        let rows: Vec<u32> = (0..25).collect();
        let batches: Vec<&[u32]> = chunks(&rows, 8).collect();
        assert_eq!(batches.len(), 3);
        assert!(batches.iter().all(|b| b.len() * 8 <= MAX_BOUND_PARAMETERS));
        assert_eq!(batches.iter().map(|b| b.len()).sum::<usize>(), 25);
    }
}
