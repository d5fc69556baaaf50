/// Smallest nominal chunk handed to a worker.
pub const MIN_CHUNK_SIZE: u64 = 1 << 20;

/// A nominal byte range of the input. Scanners snap it to line boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub offset: u64,
    pub size: u64,
}

impl Chunk {
    #[inline]
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }
}

/// Lays out consecutive chunks of `max(file_size / workers, min_chunk)` bytes
/// from offset 0, truncating the last one to what remains.
pub fn partition(file_size: u64, workers: usize, min_chunk: u64) -> Vec<Chunk> {
    if file_size == 0 {
        return Vec::new();
    }
    let workers = workers.max(1) as u64;
    let chunk_size = (file_size / workers).max(min_chunk).max(1);

    let mut chunks = Vec::with_capacity(file_size.div_ceil(chunk_size) as usize);
    let mut offset = 0;
    while offset < file_size {
        let size = chunk_size.min(file_size - offset);
        chunks.push(Chunk { index: chunks.len(), offset, size });
        offset += size;
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_file_has_no_chunks() {
        assert!(partition(0, 8, MIN_CHUNK_SIZE).is_empty());
    }

    #[test]
    fn small_file_collapses_to_one_chunk() {
        let chunks = partition(1000, 4, MIN_CHUNK_SIZE);
        assert_eq!(chunks, vec![Chunk { index: 0, offset: 0, size: 1000 }]);
    }

    #[test]
    fn last_chunk_is_truncated() {
        let chunks = partition(10, 3, 1);
        let sizes: Vec<u64> = chunks.iter().map(|c| c.size).collect();
        assert_eq!(sizes, vec![3, 3, 3, 1]);
    }

    #[test]
    fn floor_limits_chunk_count() {
        let chunks = partition(5 * MIN_CHUNK_SIZE / 2, 64, MIN_CHUNK_SIZE);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].size, MIN_CHUNK_SIZE / 2);
    }

    proptest! {
        #[test]
        fn chunks_cover_file_contiguously(size in 1u64..1_000_000, workers in 1usize..64, floor in 1u64..4096) {
            let chunks = partition(size, workers, floor);
            let mut expected = 0;
            for (i, c) in chunks.iter().enumerate() {
                prop_assert_eq!(c.index, i);
                prop_assert_eq!(c.offset, expected);
                prop_assert!(c.size > 0);
                expected = c.end();
            }
            prop_assert_eq!(expected, size);
        }
    }
}
